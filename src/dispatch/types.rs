use std::fmt;
use std::sync::Arc;

use http::Method;
use serde_json::Value;
use smallvec::SmallVec;

use crate::ids::RequestId;
use crate::security::{basic_authorization, Credentials, Identity};
use crate::session::{Session, SessionError};

/// Maximum number of request parameters before heap allocation.
/// Most simulated requests carry a handful of form fields.
pub const MAX_INLINE_PARAMS: usize = 8;

/// Maximum inline headers before heap allocation.
pub const MAX_INLINE_HEADERS: usize = 16;

/// Stack-allocated parameter storage for the dispatch hot path.
pub type ParamVec = SmallVec<[(String, String); MAX_INLINE_PARAMS]>;

/// Stack-allocated header storage for the dispatch hot path.
pub type HeaderVec = SmallVec<[(String, String); MAX_INLINE_HEADERS]>;

pub(crate) fn get_param<'a>(params: &'a ParamVec, name: &str) -> Option<&'a str> {
    // last write wins for duplicate names
    params
        .iter()
        .rfind(|(k, _)| k == name)
        .map(|(_, v)| v.as_str())
}

pub(crate) fn get_header<'a>(headers: &'a HeaderVec, name: &str) -> Option<&'a str> {
    headers
        .iter()
        .find(|(k, _)| k.eq_ignore_ascii_case(name))
        .map(|(_, v)| v.as_str())
}

/// An already-parsed request handed to the engine by the transport
/// collaborator.
#[derive(Debug, Clone)]
pub struct RequestDescriptor {
    /// HTTP method (GET, POST, ...)
    pub method: Method,
    /// Full request path; may carry a query string and must include the
    /// context path when the application is mounted under one
    pub path: String,
    /// Submitted body/form parameters
    pub params: ParamVec,
    /// Request headers
    pub headers: HeaderVec,
    /// Explicit credentials, taking precedence over any Authorization header
    pub credentials: Option<Credentials>,
    /// Session token presented by the caller, if any
    pub session_id: Option<String>,
}

impl RequestDescriptor {
    #[must_use]
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            params: ParamVec::new(),
            headers: HeaderVec::new(),
            credentials: None,
            session_id: None,
        }
    }

    #[must_use]
    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    #[must_use]
    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    #[must_use]
    pub fn with_param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.push((name.into(), value.into()));
        self
    }

    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Attach explicit credentials.
    #[must_use]
    pub fn with_credentials(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.credentials = Some(Credentials::new(username, password));
        self
    }

    /// Attach credentials the way a browser would, as a `Basic`
    /// Authorization header.
    #[must_use]
    pub fn with_basic_auth(self, username: &str, password: &str) -> Self {
        let value = basic_authorization(username, password);
        self.with_header("authorization", value)
    }

    #[must_use]
    pub fn with_session(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = Some(session_id.into());
        self
    }
}

/// Request data passed to a handler invocation.
///
/// Carries the resolved path split, merged query/body parameters, the
/// authenticated identity (if any), and the request's session.
#[derive(Clone)]
pub struct HandlerRequest {
    /// Unique request id for tracing and correlation
    pub request_id: RequestId,
    /// HTTP method
    pub method: Method,
    /// Context-relative resolved path, without the query string
    pub path: String,
    /// The context path the application is mounted under (`""` for root)
    pub context_path: String,
    /// Remainder beyond the matched prefix for prefix matches
    pub path_info: Option<String>,
    /// Query and submitted parameters, query first
    pub params: ParamVec,
    /// Request headers
    pub headers: HeaderVec,
    /// The authenticated caller, when security established one
    pub identity: Option<Identity>,
    /// The session this request runs under
    pub session: Arc<Session>,
}

impl HandlerRequest {
    /// Get a parameter by name; duplicate names resolve to the last value.
    #[inline]
    #[must_use]
    pub fn param(&self, name: &str) -> Option<&str> {
        get_param(&self.params, name)
    }

    /// Get a header by name (case-insensitive).
    #[inline]
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        get_header(&self.headers, name)
    }

    /// The authenticated user name, if any.
    #[must_use]
    pub fn remote_user(&self) -> Option<&str> {
        self.identity.as_ref().map(|id| id.username.as_str())
    }

    /// Whether the authenticated caller carries the given role.
    #[must_use]
    pub fn is_user_in_role(&self, role: &str) -> bool {
        self.identity
            .as_ref()
            .is_some_and(|id| id.is_in_role(role))
    }
}

/// Response data produced by a handler invocation.
#[derive(Debug, Clone, PartialEq)]
pub struct HandlerReply {
    /// Status code (200, 404, ...)
    pub status: u16,
    /// Response headers
    pub headers: HeaderVec,
    /// Response body as JSON
    pub body: Value,
}

impl HandlerReply {
    #[must_use]
    pub fn new(status: u16, headers: HeaderVec, body: Value) -> Self {
        Self {
            status,
            headers,
            body,
        }
    }

    /// A JSON reply with a `content-type` header.
    #[must_use]
    pub fn json(status: u16, body: Value) -> Self {
        let mut headers = HeaderVec::new();
        headers.push(("content-type".to_string(), "application/json".to_string()));
        Self {
            status,
            headers,
            body,
        }
    }

    /// A 200 JSON reply.
    #[must_use]
    pub fn ok(body: Value) -> Self {
        Self::json(200, body)
    }

    /// Get a header by name (case-insensitive).
    #[inline]
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        get_header(&self.headers, name)
    }

    /// Add or replace a header.
    pub fn set_header(&mut self, name: &str, value: String) {
        self.headers.retain(|(k, _)| !k.eq_ignore_ascii_case(name));
        self.headers.push((name.to_string(), value));
    }
}

/// How a successful dispatch concluded.
#[derive(Debug, Clone, PartialEq)]
pub enum Disposition {
    /// The resolved handler ran and produced a reply
    Content(HandlerReply),
    /// The caller should re-request the given full path (redirect-login)
    Redirect(String),
}

/// Successful dispatch outcome.
#[derive(Debug, Clone, PartialEq)]
pub struct DispatchOutcome {
    /// Correlation id assigned to the dispatch
    pub request_id: RequestId,
    pub disposition: Disposition,
    /// Token for a session created during this dispatch, for the
    /// collaborator to persist across the simulated connection
    pub new_session: Option<String>,
}

impl DispatchOutcome {
    /// The handler reply, when the disposition is content.
    #[must_use]
    pub fn reply(&self) -> Option<&HandlerReply> {
        match &self.disposition {
            Disposition::Content(reply) => Some(reply),
            Disposition::Redirect(_) => None,
        }
    }

    /// The redirect target, when the disposition is a redirect.
    #[must_use]
    pub fn redirect_target(&self) -> Option<&str> {
        match &self.disposition {
            Disposition::Redirect(target) => Some(target),
            Disposition::Content(_) => None,
        }
    }

    /// Status code of the handler reply, if content was produced.
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        self.reply().map(|r| r.status)
    }
}

/// Dispatch failure, surfaced to the caller unrecovered.
#[derive(Debug)]
pub enum DispatchError {
    /// No mapping matched the path; terminal
    NotFound { path: String },
    /// Credential-challenge mode and the request carried no credentials;
    /// recoverable by resubmitting with credentials
    AuthenticationRequired {
        realm: String,
        scheme: &'static str,
    },
    /// Authenticated but not permitted; terminal for this identity
    Forbidden { path: String },
    /// An operation hit an invalidated session; indicates a caller bug
    Session(SessionError),
    /// Dispatch was attempted while the host is stopped
    NotRunning,
    /// The handler (or its factory) failed; propagated unchanged
    Handler(anyhow::Error),
}

impl fmt::Display for DispatchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DispatchError::NotFound { path } => write!(f, "no mapping matched '{}'", path),
            DispatchError::AuthenticationRequired { realm, scheme } => {
                write!(f, "authentication required: {} realm=\"{}\"", scheme, realm)
            }
            DispatchError::Forbidden { path } => write!(f, "access to '{}' is forbidden", path),
            DispatchError::Session(err) => write!(f, "{}", err),
            DispatchError::NotRunning => write!(f, "the application host is not running"),
            DispatchError::Handler(err) => write!(f, "handler failed: {}", err),
        }
    }
}

impl std::error::Error for DispatchError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            DispatchError::Session(err) => Some(err),
            DispatchError::Handler(err) => Some(err.as_ref()),
            _ => None,
        }
    }
}

impl From<SessionError> for DispatchError {
    fn from(err: SessionError) -> Self {
        DispatchError::Session(err)
    }
}
