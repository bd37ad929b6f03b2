//! Login and logout.

use crate::codec::{Fields, Payload, Request, Response};
use crate::codes::AccountType;
use crate::error::{Error, Result};
use crate::session::{Credentials, Endpoints, Session};
use crate::types::Status;

/// Request number used by the login call. Later calls continue from here.
pub(crate) const LOGIN_REQUEST_NO: u64 = 1;

pub struct LoginRequest<'a> {
    pub credentials: &'a Credentials,
}

impl Request for LoginRequest<'_> {
    const COMMAND: &'static str = "CLMAuthLoginRequest";
    const ACK: &'static str = "CLMAuthLoginAck";
    type Response = LoginResponse;

    fn encode_fields(&self, payload: &mut Payload) {
        payload.put("sUserId", self.credentials.user_id());
        payload.put("sPassword", self.credentials.password());
    }
}

/// Outcome of a login attempt.
#[derive(Debug, Clone)]
pub struct LoginResponse {
    pub status: Status,
    /// A regulatory document awaits acknowledgement on the broker's site.
    /// Trading may be refused until it is read; the session is still usable.
    pub unread_document: bool,
    pub account_type: Option<AccountType>,
    pub margin_account: Option<bool>,
    pub(crate) endpoints: Option<Endpoints>,
    pub(crate) user_id: String,
}

impl LoginResponse {
    /// Turn the login into its session. Fails with [`Error::NoSession`]
    /// unless the login succeeded. Consumes the response, so one login
    /// yields exactly one request counter.
    pub fn into_session(self) -> Result<Session> {
        if !self.status.is_success() {
            return Err(Error::NoSession(self.status));
        }
        let Some(endpoints) = self.endpoints else {
            return Err(Error::NoSession(self.status));
        };
        Ok(Session::new(self.user_id, endpoints, LOGIN_REQUEST_NO + 1))
    }
}

impl Response for LoginResponse {
    fn decode(fields: &Fields<'_>, status: Status) -> Result<Self> {
        let endpoints = if status.is_success() {
            Some(Endpoints {
                request: fields.required_text("sUrlRequest")?,
                master: fields.required_text("sUrlMaster")?,
                price: fields.required_text("sUrlPrice")?,
                event: fields.required_text("sUrlEvent")?,
                event_websocket: fields.text("sUrlEventWebSocket")?.filter(|s| !s.is_empty()),
            })
        } else {
            None
        };

        let unread_document = match fields.flag("sKinsyouhouMidokuFlg")? {
            Some(flag) => flag,
            None if status.is_success() => {
                return Err(Error::malformed(
                    "sKinsyouhouMidokuFlg",
                    "",
                    "required flag is missing",
                ));
            }
            None => false,
        };

        Ok(LoginResponse {
            unread_document,
            account_type: fields.code("sZyoutoekiKazeiC")?,
            margin_account: fields.flag("sSinyouKouzaKubun")?,
            endpoints,
            user_id: String::new(),
            status,
        })
    }
}

pub struct LogoutRequest;

impl Request for LogoutRequest {
    const COMMAND: &'static str = "CLMAuthLogoutRequest";
    const ACK: &'static str = "CLMAuthLogoutAck";
    type Response = LogoutResponse;

    fn encode_fields(&self, _payload: &mut Payload) {}
}

#[derive(Debug, Clone)]
pub struct LogoutResponse {
    pub status: Status,
}

impl Response for LogoutResponse {
    fn decode(_fields: &Fields<'_>, status: Status) -> Result<Self> {
        Ok(LogoutResponse { status })
    }
}
