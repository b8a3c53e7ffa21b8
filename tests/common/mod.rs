#![allow(dead_code)]

use std::sync::{Arc, Mutex, PoisonError};

use serde_json::json;

use hostlet::config::{AppConfig, AuthConfig, ConstraintConfig, HandlerConfig};
use hostlet::dispatch::{HandlerReply, HandlerRequest};
use hostlet::events::{
    ApplicationEvent, ApplicationListener, SessionAttributeEvent, SessionAttributeListener,
    SessionEvent, SessionListener,
};
use hostlet::handler::{shared_handler, HandlerFactory};

/// Factory for a handler that echoes what it observed, so tests can
/// assert on resolution, identity, and session plumbing.
pub fn echo_handler(name: &'static str) -> Arc<dyn HandlerFactory> {
    shared_handler(move |req: HandlerRequest| {
        let params: serde_json::Map<String, serde_json::Value> = req
            .params
            .iter()
            .map(|(k, v)| (k.clone(), json!(v)))
            .collect();
        Ok(HandlerReply::ok(json!({
            "handler": name,
            "path": req.path,
            "path_info": req.path_info,
            "context_path": req.context_path,
            "remote_user": req.remote_user(),
            "session": req.session.id().ok(),
            "params": params,
        })))
    })
}

/// Collects strings in order across threads.
#[derive(Default)]
pub struct Recorder {
    log: Mutex<Vec<String>>,
}

impl Recorder {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn record(&self, entry: impl Into<String>) {
        self.log
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(entry.into());
    }

    pub fn entries(&self) -> Vec<String> {
        self.log
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

/// Listener registered under a label; every notification it receives is
/// recorded as `label:event[:detail]`.
pub struct TaggedListener {
    label: String,
    recorder: Arc<Recorder>,
}

impl TaggedListener {
    pub fn new(label: impl Into<String>, recorder: &Arc<Recorder>) -> Arc<Self> {
        Arc::new(Self {
            label: label.into(),
            recorder: Arc::clone(recorder),
        })
    }
}

impl ApplicationListener for TaggedListener {
    fn application_started(&self, _event: &ApplicationEvent) {
        self.recorder.record(format!("{}:started", self.label));
    }

    fn application_stopped(&self, _event: &ApplicationEvent) {
        self.recorder.record(format!("{}:stopped", self.label));
    }
}

impl SessionListener for TaggedListener {
    fn session_created(&self, event: &SessionEvent) {
        let id = event.session.id().map(str::to_string).unwrap_or_default();
        self.recorder.record(format!("{}:created:{}", self.label, id));
    }

    fn session_destroyed(&self, event: &SessionEvent) {
        let id = event.session.id().map(str::to_string).unwrap_or_default();
        self.recorder
            .record(format!("{}:destroyed:{}", self.label, id));
    }
}

impl SessionAttributeListener for TaggedListener {
    fn attribute_added(&self, event: &SessionAttributeEvent) {
        self.recorder.record(format!(
            "{}:added:{}={}",
            self.label,
            event.name,
            event.new.clone().unwrap_or_default()
        ));
    }

    fn attribute_replaced(&self, event: &SessionAttributeEvent) {
        self.recorder.record(format!(
            "{}:replaced:{}={}->{}",
            self.label,
            event.name,
            event.old.clone().unwrap_or_default(),
            event.new.clone().unwrap_or_default()
        ));
    }

    fn attribute_removed(&self, event: &SessionAttributeEvent) {
        self.recorder.record(format!(
            "{}:removed:{}={}",
            self.label,
            event.name,
            event.old.clone().unwrap_or_default()
        ));
    }
}

/// An application with one open handler, one protected handler, login
/// and login-error handlers, and two users.
///
/// `me` carries the `supervisor` role the constraint demands; `peon`
/// does not.
pub fn secured_config(auth: AuthConfig) -> AppConfig {
    AppConfig::new("secured")
        .with_handler(
            HandlerConfig::new("public").with_pattern("/public"),
            echo_handler("public"),
        )
        .with_handler(
            HandlerConfig::new("secret").with_pattern("/secret"),
            echo_handler("secret"),
        )
        .with_handler(
            HandlerConfig::new("login").with_pattern("/login"),
            echo_handler("login"),
        )
        .with_handler(
            HandlerConfig::new("login_error").with_pattern("/login_error"),
            echo_handler("login_error"),
        )
        .with_constraint(
            ConstraintConfig::new("secure-area")
                .with_pattern("/secret")
                .with_role("supervisor"),
        )
        .with_user("me", "secret", ["supervisor", "agent"])
        .with_user("peon", "secret", ["staff"])
        .with_auth(auth)
}

pub fn challenge_auth() -> AuthConfig {
    AuthConfig::Challenge {
        realm: "Sample Realm".to_string(),
    }
}

pub fn form_auth() -> AuthConfig {
    AuthConfig::Form {
        realm: "Sample Realm".to_string(),
        login_path: "/login".to_string(),
        error_path: "/login_error".to_string(),
        submit_path: "/login_check".to_string(),
    }
}
