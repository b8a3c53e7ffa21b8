use std::sync::Arc;
use std::time::Instant;

use http::Method;
use tracing::{debug, error, info, warn};

use crate::app::Application;
use crate::ids::RequestId;
use crate::mapping::Resolution;
use crate::security::{
    parse_basic_authorization, AuthMode, Credentials, Identity, BASIC_SCHEME,
    LOGIN_PASSWORD_FIELD, LOGIN_USERNAME_FIELD,
};
use crate::session::Session;

use super::types::{get_header, get_param};
use super::{
    Disposition, DispatchError, DispatchOutcome, HandlerRequest, HeaderVec, ParamVec,
    RequestDescriptor,
};

/// The session a dispatch runs under, and whether this dispatch created it.
struct Active {
    session: Arc<Session>,
    created: bool,
}

impl Active {
    fn token(&self) -> Option<String> {
        self.created.then(|| self.session.raw_id().to_string())
    }
}

/// Per-request orchestrator over a started [`Application`].
///
/// Stateless itself; every call composes the application's mapping
/// table, security policy, and session store for one logical request.
pub struct Dispatcher<'a> {
    app: &'a Application,
}

impl<'a> Dispatcher<'a> {
    #[must_use]
    pub fn new(app: &'a Application) -> Self {
        Self { app }
    }

    /// Dispatch one request: resolve, authorize, invoke, and surface the
    /// outcome.
    pub fn dispatch(&self, request: RequestDescriptor) -> Result<DispatchOutcome, DispatchError> {
        let request_id = RequestId::new();
        info!(
            request_id = %request_id,
            method = %request.method,
            path = %request.path,
            "Dispatch start"
        );
        let outcome = self.dispatch_inner(request, request_id, false);
        match &outcome {
            Ok(out) => info!(
                request_id = %request_id,
                status = out.status(),
                redirect = out.redirect_target(),
                "Dispatch complete"
            ),
            Err(err) => warn!(request_id = %request_id, error = %err, "Dispatch failed"),
        }
        outcome
    }

    fn dispatch_inner(
        &self,
        request: RequestDescriptor,
        request_id: RequestId,
        redispatch: bool,
    ) -> Result<DispatchOutcome, DispatchError> {
        let RequestDescriptor {
            method,
            path: raw_path,
            params: submitted,
            headers,
            credentials,
            session_id,
        } = request;

        let (path, query) = split_query(&raw_path);
        let rel = match self.app.mapping().relative(path) {
            Some(rel) => rel.to_string(),
            None => {
                return Err(DispatchError::NotFound {
                    path: path.to_string(),
                })
            }
        };

        let mut params = ParamVec::new();
        if let Some(query) = query {
            merge_query(&mut params, query);
        }
        params.extend(submitted);

        // The login-submit endpoint belongs to the engine, not the
        // mapping table; intercept it before resolution.
        if !redispatch {
            if let AuthMode::FormRedirect {
                error_path,
                submit_path,
                ..
            } = self.app.policy().mode().clone()
            {
                if rel == submit_path {
                    return self.login_submit(error_path, params, headers, session_id, request_id);
                }
            }
        }

        let resolution = self
            .app
            .mapping()
            .resolve_relative(&rel)
            .ok_or_else(|| DispatchError::NotFound { path: rel.clone() })?;

        let policy = self.app.policy();
        let mut active: Option<Active> = None;
        let mut identity: Option<Identity> = None;

        match policy.mode().clone() {
            AuthMode::None => {}
            AuthMode::Challenge { realm } => {
                if policy.requires_authorization(&rel) {
                    let creds = credentials.or_else(|| basic_credentials(&headers));
                    let Some(creds) = creds else {
                        debug!(request_id = %request_id, path = %rel, realm = %realm, "Challenging request without credentials");
                        return Err(DispatchError::AuthenticationRequired {
                            realm,
                            scheme: BASIC_SCHEME,
                        });
                    };
                    let Ok(id) = policy.authenticate(&creds) else {
                        return Err(DispatchError::Forbidden { path: rel });
                    };
                    if !policy.permits(&id, &rel) {
                        debug!(request_id = %request_id, path = %rel, username = %id.username, "Authenticated identity lacks a permitted role");
                        return Err(DispatchError::Forbidden { path: rel });
                    }
                    identity = Some(id);
                }
            }
            AuthMode::FormRedirect {
                login_path,
                error_path,
                ..
            } => {
                let joined = self.join_or_create(session_id.as_deref());
                identity = joined.session.identity()?;
                let open = rel == login_path || rel == error_path;
                if !open && policy.requires_authorization(&rel) {
                    match &identity {
                        Some(id) => {
                            if !policy.permits(id, &rel) {
                                return Err(DispatchError::Forbidden { path: rel });
                            }
                        }
                        None => {
                            let original = match query {
                                Some(q) => format!("{rel}?{q}"),
                                None => rel.clone(),
                            };
                            joined.session.set_pending_path(original)?;
                            let target =
                                format!("{}{}", self.app.mapping().context_path(), login_path);
                            info!(
                                request_id = %request_id,
                                path = %rel,
                                target = %target,
                                "Redirecting unauthenticated request to login"
                            );
                            return Ok(DispatchOutcome {
                                request_id,
                                disposition: Disposition::Redirect(target),
                                new_session: joined.token(),
                            });
                        }
                    }
                }
                active = Some(joined);
            }
        }

        let active = match active {
            Some(active) => active,
            None => self.join_or_create(session_id.as_deref()),
        };
        self.invoke(resolution, rel, method, params, headers, identity, active, request_id)
    }

    /// Handle a submission to the redirect-login endpoint: authenticate
    /// the posted fields, bind the identity to the session, and
    /// re-dispatch the pending request; on rejection, serve the error
    /// handler instead.
    fn login_submit(
        &self,
        error_path: String,
        params: ParamVec,
        headers: HeaderVec,
        session_id: Option<String>,
        request_id: RequestId,
    ) -> Result<DispatchOutcome, DispatchError> {
        let active = self.join_or_create(session_id.as_deref());

        let submitted = match (
            get_param(&params, LOGIN_USERNAME_FIELD),
            get_param(&params, LOGIN_PASSWORD_FIELD),
        ) {
            (Some(username), Some(password)) => Some(Credentials::new(username, password)),
            _ => None,
        };
        let identity = submitted.and_then(|creds| self.app.policy().authenticate(&creds).ok());

        match identity {
            Some(identity) => {
                let username = identity.username.clone();
                active.session.bind_identity(identity)?;
                let target = active
                    .session
                    .take_pending_path()?
                    .unwrap_or_else(|| "/".to_string());
                info!(
                    request_id = %request_id,
                    username = %username,
                    target = %target,
                    "Login accepted; re-dispatching original request"
                );
                let descriptor = RequestDescriptor::get(format!(
                    "{}{}",
                    self.app.mapping().context_path(),
                    target
                ))
                .with_session(active.session.raw_id());
                let descriptor = RequestDescriptor { headers, ..descriptor };
                let mut outcome = self.dispatch_inner(descriptor, request_id, true)?;
                // the login round created the session; its token must
                // still reach the caller
                if outcome.new_session.is_none() {
                    outcome.new_session = active.token();
                }
                Ok(outcome)
            }
            None => {
                warn!(request_id = %request_id, "Login rejected; dispatching error handler");
                let resolution = self
                    .app
                    .mapping()
                    .resolve_relative(&error_path)
                    .ok_or_else(|| DispatchError::NotFound {
                        path: error_path.clone(),
                    })?;
                self.invoke(
                    resolution,
                    error_path,
                    Method::GET,
                    params,
                    headers,
                    None,
                    active,
                    request_id,
                )
            }
        }
    }

    fn join_or_create(&self, presented: Option<&str>) -> Active {
        let store = self.app.sessions();
        if let Some(id) = presented {
            if let Some(session) = store.get(id) {
                session.access();
                return Active {
                    session,
                    created: false,
                };
            }
            debug!(session_id = %id, "Presented session token is stale");
        }
        Active {
            session: store.create(),
            created: true,
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn invoke(
        &self,
        resolution: Resolution,
        rel_path: String,
        method: Method,
        params: ParamVec,
        headers: HeaderVec,
        identity: Option<Identity>,
        active: Active,
        request_id: RequestId,
    ) -> Result<DispatchOutcome, DispatchError> {
        let handler = self
            .app
            .handler(&resolution.handler)
            .map_err(DispatchError::Handler)?;

        let handler_request = HandlerRequest {
            request_id,
            method,
            path: rel_path,
            context_path: resolution.context_path,
            path_info: resolution.path_info,
            params,
            headers,
            identity,
            session: Arc::clone(&active.session),
        };

        info!(
            request_id = %request_id,
            handler = %resolution.handler,
            path = %handler_request.path,
            path_info = ?handler_request.path_info,
            "Handler execution start"
        );
        let start = Instant::now();
        let reply = handler.handle(handler_request).map_err(|err| {
            error!(
                request_id = %request_id,
                handler = %resolution.handler,
                error = %err,
                "Handler failed"
            );
            DispatchError::Handler(err)
        })?;
        info!(
            request_id = %request_id,
            handler = %resolution.handler,
            status = reply.status,
            latency_us = start.elapsed().as_micros() as u64,
            "Handler execution complete"
        );

        Ok(DispatchOutcome {
            request_id,
            disposition: Disposition::Content(reply),
            new_session: active.token(),
        })
    }
}

fn split_query(path: &str) -> (&str, Option<&str>) {
    match path.split_once('?') {
        Some((path, query)) => (path, Some(query)),
        None => (path, None),
    }
}

fn merge_query(params: &mut ParamVec, query: &str) {
    for (name, value) in url::form_urlencoded::parse(query.as_bytes()) {
        params.push((name.into_owned(), value.into_owned()));
    }
}

fn basic_credentials(headers: &HeaderVec) -> Option<Credentials> {
    get_header(headers, "authorization").and_then(parse_basic_authorization)
}
