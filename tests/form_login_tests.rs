//! Redirect-login flow: redirect to the login handler, submit
//! credentials, re-dispatch of the pending request, identity binding.

mod common;

use common::{form_auth, secured_config};
use hostlet::config::{AppConfig, ConfigError, HandlerConfig};
use hostlet::dispatch::{DispatchError, RequestDescriptor};
use hostlet::Host;
use tracing_util::TestTracing;

#[test]
fn protected_path_redirects_to_the_login_handler() {
    let _tracing = TestTracing::init();
    let host = Host::start(secured_config(form_auth())).unwrap();

    let outcome = host.dispatch(RequestDescriptor::get("/secret")).unwrap();
    assert_eq!(outcome.redirect_target(), Some("/login"));
    // the session carrying the pending request travels with the redirect
    let token = outcome.new_session.expect("session token attached");
    assert!(host.session(&token).is_some());
    host.stop();
}

#[test]
fn the_login_handler_itself_is_served_unauthenticated() {
    let _tracing = TestTracing::init();
    let host = Host::start(secured_config(form_auth())).unwrap();
    let outcome = host.dispatch(RequestDescriptor::get("/login")).unwrap();
    assert_eq!(outcome.reply().unwrap().body["handler"], "login");
    host.stop();
}

#[test]
fn successful_submit_redispatches_the_pending_request() {
    let _tracing = TestTracing::init();
    let host = Host::start(secured_config(form_auth())).unwrap();

    let redirect = host.dispatch(RequestDescriptor::get("/secret")).unwrap();
    let token = redirect.new_session.expect("session token attached");

    let outcome = host
        .dispatch(
            RequestDescriptor::post("/login_check")
                .with_session(&token)
                .with_param("username", "me")
                .with_param("password", "secret"),
        )
        .unwrap();
    let body = &outcome.reply().unwrap().body;
    assert_eq!(body["handler"], "secret");
    assert_eq!(body["remote_user"], "me");

    // the identity is bound to the session from here on
    let identity = host.session(&token).unwrap().identity().unwrap().unwrap();
    assert_eq!(identity.username, "me");
    assert!(identity.is_in_role("supervisor"));

    let again = host
        .dispatch(RequestDescriptor::get("/secret").with_session(&token))
        .unwrap();
    assert_eq!(again.reply().unwrap().body["remote_user"], "me");
    host.stop();
}

#[test]
fn pending_query_string_survives_the_round_trip() {
    let _tracing = TestTracing::init();
    let host = Host::start(secured_config(form_auth())).unwrap();

    let redirect = host
        .dispatch(RequestDescriptor::get("/secret?report=q3"))
        .unwrap();
    let token = redirect.new_session.expect("session token attached");

    let outcome = host
        .dispatch(
            RequestDescriptor::post("/login_check")
                .with_session(&token)
                .with_param("username", "me")
                .with_param("password", "secret"),
        )
        .unwrap();
    let body = &outcome.reply().unwrap().body;
    assert_eq!(body["handler"], "secret");
    assert_eq!(body["params"]["report"], "q3");
    host.stop();
}

#[test]
fn rejected_submit_serves_the_error_handler() {
    let _tracing = TestTracing::init();
    let host = Host::start(secured_config(form_auth())).unwrap();

    let redirect = host.dispatch(RequestDescriptor::get("/secret")).unwrap();
    let token = redirect.new_session.expect("session token attached");

    let outcome = host
        .dispatch(
            RequestDescriptor::post("/login_check")
                .with_session(&token)
                .with_param("username", "me")
                .with_param("password", "nope"),
        )
        .unwrap();
    assert_eq!(outcome.reply().unwrap().body["handler"], "login_error");

    // the pending request is still held; a later valid submit lands on it
    let retry = host
        .dispatch(
            RequestDescriptor::post("/login_check")
                .with_session(&token)
                .with_param("username", "me")
                .with_param("password", "secret"),
        )
        .unwrap();
    assert_eq!(retry.reply().unwrap().body["handler"], "secret");
    host.stop();
}

#[test]
fn authenticated_session_without_the_role_is_forbidden() {
    let _tracing = TestTracing::init();
    let host = Host::start(secured_config(form_auth())).unwrap();

    let redirect = host.dispatch(RequestDescriptor::get("/secret")).unwrap();
    let token = redirect.new_session.expect("session token attached");

    // peon authenticates fine, but the re-dispatch hits the constraint
    let err = host
        .dispatch(
            RequestDescriptor::post("/login_check")
                .with_session(&token)
                .with_param("username", "peon")
                .with_param("password", "secret"),
        )
        .unwrap_err();
    assert!(matches!(err, DispatchError::Forbidden { .. }));

    // and so does any later request through that session
    let err = host
        .dispatch(RequestDescriptor::get("/secret").with_session(&token))
        .unwrap_err();
    assert!(matches!(err, DispatchError::Forbidden { .. }));
    host.stop();
}

#[test]
fn unresolvable_login_endpoint_fails_at_start() {
    let _tracing = TestTracing::init();
    let config = AppConfig::new("broken")
        .with_handler(
            HandlerConfig::new("only").with_pattern("/only"),
            common::echo_handler("only"),
        )
        .with_auth(form_auth());
    let err = Host::start(config).unwrap_err();
    assert!(matches!(
        err,
        ConfigError::UnresolvedAuthPath { role: "login", .. }
    ));
}
