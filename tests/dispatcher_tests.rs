//! End-to-end dispatch plumbing: parameter merging, session tokens,
//! and outcome shapes.

mod common;

use common::echo_handler;
use hostlet::config::{AppConfig, HandlerConfig};
use hostlet::dispatch::RequestDescriptor;
use hostlet::Host;
use serde_json::json;
use tracing_util::TestTracing;

fn echo_host() -> Host {
    let config = AppConfig::new("echo").with_handler(
        HandlerConfig::new("echo").with_pattern("/echo/*"),
        echo_handler("echo"),
    );
    Host::start(config).unwrap()
}

#[test]
fn query_and_submitted_parameters_are_merged() {
    let _tracing = TestTracing::init();
    let host = echo_host();
    let outcome = host
        .dispatch(
            RequestDescriptor::post("/echo/form?source=query&shared=from_query")
                .with_param("field", "from_body")
                .with_param("shared", "from_body"),
        )
        .unwrap();
    let body = &outcome.reply().unwrap().body;
    assert_eq!(body["params"]["source"], "query");
    assert_eq!(body["params"]["field"], "from_body");
    // submitted parameters win over the query string on a name clash
    assert_eq!(body["params"]["shared"], "from_body");
    host.stop();
}

#[test]
fn query_strings_are_url_decoded() {
    let _tracing = TestTracing::init();
    let host = echo_host();
    let outcome = host
        .dispatch(RequestDescriptor::get("/echo/q?note=a+b%21"))
        .unwrap();
    assert_eq!(outcome.reply().unwrap().body["params"]["note"], "a b!");
    host.stop();
}

#[test]
fn first_dispatch_attaches_a_session_token() {
    let _tracing = TestTracing::init();
    let host = echo_host();

    let first = host.dispatch(RequestDescriptor::get("/echo/a")).unwrap();
    let token = first.new_session.clone().expect("token on first dispatch");
    assert_eq!(
        first.reply().unwrap().body["session"],
        json!(token.as_str())
    );

    // presenting the token joins the same session; no new token issued
    let second = host
        .dispatch(RequestDescriptor::get("/echo/b").with_session(&token))
        .unwrap();
    assert_eq!(second.new_session, None);
    assert_eq!(
        second.reply().unwrap().body["session"],
        json!(token.as_str())
    );
    host.stop();
}

#[test]
fn dispatches_without_a_token_get_distinct_sessions() {
    let _tracing = TestTracing::init();
    let host = echo_host();
    let first = host.dispatch(RequestDescriptor::get("/echo/a")).unwrap();
    let second = host.dispatch(RequestDescriptor::get("/echo/b")).unwrap();
    assert_ne!(first.new_session, second.new_session);
    host.stop();
}

#[test]
fn a_stale_token_is_replaced_with_a_fresh_session() {
    let _tracing = TestTracing::init();
    let host = echo_host();
    let outcome = host
        .dispatch(RequestDescriptor::get("/echo/a").with_session("12345"))
        .unwrap();
    let token = outcome.new_session.expect("fresh session issued");
    assert_ne!(token, "12345");
    host.stop();
}

#[test]
fn handlers_share_session_state_across_requests() {
    let _tracing = TestTracing::init();
    let counter = hostlet::handler::shared_handler(|req: hostlet::HandlerRequest| {
        let seen = req
            .session
            .attribute("count")?
            .and_then(|v| v.as_u64())
            .unwrap_or(0);
        req.session.set_attribute("count", json!(seen + 1))?;
        Ok(hostlet::HandlerReply::ok(json!({ "count": seen + 1 })))
    });
    let config = AppConfig::new("counting")
        .with_handler(HandlerConfig::new("count").with_pattern("/count"), counter);
    let host = Host::start(config).unwrap();

    let first = host.dispatch(RequestDescriptor::get("/count")).unwrap();
    let token = first.new_session.clone().expect("token issued");
    assert_eq!(first.reply().unwrap().body["count"], 1);

    let second = host
        .dispatch(RequestDescriptor::get("/count").with_session(&token))
        .unwrap();
    assert_eq!(second.reply().unwrap().body["count"], 2);
    host.stop();
}
