//! Credentials and the authenticated session.

use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use chrono::{DateTime, Local};
use zeroize::Zeroizing;

use crate::error::{Error, Result};

/// Login credentials. The password is wiped from memory on drop.
#[derive(Clone)]
pub struct Credentials {
    user_id: String,
    password: Zeroizing<String>,
}

impl Credentials {
    pub fn new(user_id: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            password: Zeroizing::new(password.into()),
        }
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    pub(crate) fn password(&self) -> &str {
        self.password.as_str()
    }

    /// Reject blank credentials before anything is sent.
    pub fn validate(&self) -> Result<()> {
        if self.user_id.trim().is_empty() {
            return Err(Error::InvalidCredentials("user id must not be empty"));
        }
        if self.password.is_empty() {
            return Err(Error::InvalidCredentials("password must not be empty"));
        }
        Ok(())
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("user_id", &self.user_id)
            .field("password", &"***")
            .finish()
    }
}

/// Virtual URLs issued at login. They embed the session token, so every
/// authenticated call is routed through them.
#[derive(Clone, PartialEq, Eq)]
pub struct Endpoints {
    pub request: String,
    pub master: String,
    pub price: String,
    pub event: String,
    pub event_websocket: Option<String>,
}

impl fmt::Debug for Endpoints {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // The URLs are bearer tokens.
        f.write_str("Endpoints(***)")
    }
}

/// A logged-in session.
///
/// Valid from a successful login until logout or server-side expiry; not
/// renewable. Fields are written once at login. The request counter and the
/// closed flag are atomic, so a `&Session` can be shared by concurrent
/// read-style calls.
pub struct Session {
    user_id: String,
    created_at: DateTime<Local>,
    endpoints: Endpoints,
    next_request_no: AtomicU64,
    closed: AtomicBool,
}

impl Session {
    /// `first_request_no` is the number the next request on this session uses.
    pub(crate) fn new(user_id: String, endpoints: Endpoints, first_request_no: u64) -> Self {
        Self {
            user_id,
            created_at: Local::now(),
            endpoints,
            next_request_no: AtomicU64::new(first_request_no),
            closed: AtomicBool::new(false),
        }
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    pub fn created_at(&self) -> DateTime<Local> {
        self.created_at
    }

    pub fn endpoints(&self) -> &Endpoints {
        &self.endpoints
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Fail fast if the session can no longer be used.
    pub fn ensure_live(&self) -> Result<()> {
        if self.is_closed() {
            return Err(Error::SessionClosed);
        }
        Ok(())
    }

    /// Strictly increasing request number for the next call.
    pub(crate) fn next_request_no(&self) -> u64 {
        self.next_request_no.fetch_add(1, Ordering::AcqRel)
    }

    pub(crate) fn close(&self) {
        self.closed.store(true, Ordering::Release);
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("user_id", &self.user_id)
            .field("created_at", &self.created_at)
            .field("closed", &self.is_closed())
            .finish_non_exhaustive()
    }
}
