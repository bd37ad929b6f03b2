//! Session manager: the client handle, login and logout.

use chrono::Local;
use log::{debug, info, warn};

use crate::api::auth::{LOGIN_REQUEST_NO, LoginRequest, LoginResponse, LogoutRequest, LogoutResponse};
use crate::codec::{self, Request};
use crate::config::ClientConfig;
use crate::error::{Error, Result};
use crate::session::{Credentials, Session};
use crate::transport::Transport;

/// Blocking client. Holds no session state; every authenticated call takes
/// the [`Session`] explicitly.
pub struct Client {
    config: ClientConfig,
    transport: Box<dyn Transport>,
}

impl Client {
    /// Client over HTTPS for the configured environment and API version.
    #[cfg(feature = "http")]
    pub fn new(config: ClientConfig) -> Result<Self> {
        let transport = crate::transport::HttpTransport::new(&config)?;
        Ok(Self::with_transport(config, transport))
    }

    /// Client over any transport (e.g. [`crate::mock::MockTransport`]).
    pub fn with_transport(config: ClientConfig, transport: impl Transport + 'static) -> Self {
        Self {
            config,
            transport: Box::new(transport),
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub(crate) fn transport(&self) -> &dyn Transport {
        self.transport.as_ref()
    }

    /// Log in. A rejected login comes back as `Ok` with a non-zero status;
    /// derive the session with [`LoginResponse::session`].
    pub fn login(&self, credentials: &Credentials) -> Result<LoginResponse> {
        credentials.validate()?;

        let request = LoginRequest { credentials };
        let payload = codec::encode(&request, LOGIN_REQUEST_NO, &Local::now());
        info!(
            "Logging in as {} ({:?}, {})",
            credentials.user_id(),
            self.config.environment,
            self.config.api_version
        );

        let body = self.transport.send(&self.config.auth_url(), &payload)?;
        let mut response = codec::decode::<LoginRequest<'_>>(&body)?;
        response.user_id = credentials.user_id().to_string();

        if response.status.is_success() {
            info!("Logged in as {}", credentials.user_id());
            if response.unread_document {
                warn!("Unread documents must be acknowledged before trading");
            }
        } else {
            warn!("Login rejected: {}", response.status);
        }
        Ok(response)
    }

    /// Log out. On success the session is closed locally as well.
    pub fn logout(&self, session: &Session) -> Result<LogoutResponse> {
        let response = self.call(session, &LogoutRequest)?;
        if response.status.is_success() {
            session.close();
            info!("Logged out {}", session.user_id());
        } else {
            warn!("Logout rejected: {}", response.status);
        }
        Ok(response)
    }

    /// Send one authenticated request on `session`.
    pub(crate) fn call<R: Request>(&self, session: &Session, request: &R) -> Result<R::Response> {
        session.ensure_live()?;

        let request_no = session.next_request_no();
        let payload = codec::encode(request, request_no, &Local::now());
        debug!("-> {} p_no={request_no}", R::COMMAND);

        let body = self
            .transport
            .send(&session.endpoints().request, &payload)?;

        match codec::decode::<R>(&body) {
            Err(Error::SessionExpired(message)) => {
                warn!("Session expired on the server: {message}");
                session.close();
                Err(Error::SessionExpired(message))
            }
            other => other,
        }
    }
}
