//! Resolution precedence and context-path mounting, exercised through a
//! running host.

mod common;

use common::echo_handler;
use hostlet::config::{AppConfig, HandlerConfig};
use hostlet::dispatch::{DispatchError, RequestDescriptor};
use hostlet::Host;
use tracing_util::TestTracing;

fn pattern_config() -> AppConfig {
    AppConfig::new("patterns")
        .with_handler(
            HandlerConfig::new("exact").with_pattern("/docs/index.html"),
            echo_handler("exact"),
        )
        .with_handler(
            HandlerConfig::new("docs").with_pattern("/docs/*"),
            echo_handler("docs"),
        )
        .with_handler(
            HandlerConfig::new("deep_docs").with_pattern("/docs/api/*"),
            echo_handler("deep_docs"),
        )
        .with_handler(
            HandlerConfig::new("pages").with_pattern("*.html"),
            echo_handler("pages"),
        )
        .with_handler(
            HandlerConfig::new("fallback").with_pattern("/"),
            echo_handler("fallback"),
        )
}

fn dispatched_handler(host: &Host, path: &str) -> String {
    let outcome = host.dispatch(RequestDescriptor::get(path)).unwrap();
    outcome.reply().unwrap().body["handler"]
        .as_str()
        .unwrap()
        .to_string()
}

#[test]
fn exact_match_beats_prefix_and_extension() {
    let _tracing = TestTracing::init();
    let host = Host::start(pattern_config()).unwrap();
    assert_eq!(dispatched_handler(&host, "/docs/index.html"), "exact");
    host.stop();
}

#[test]
fn longest_prefix_beats_shorter_prefix() {
    let _tracing = TestTracing::init();
    let host = Host::start(pattern_config()).unwrap();
    assert_eq!(dispatched_handler(&host, "/docs/api/list"), "deep_docs");
    assert_eq!(dispatched_handler(&host, "/docs/guide"), "docs");
    host.stop();
}

#[test]
fn extension_applies_outside_prefixes() {
    let _tracing = TestTracing::init();
    let host = Host::start(pattern_config()).unwrap();
    assert_eq!(dispatched_handler(&host, "/about/team.html"), "pages");
    host.stop();
}

#[test]
fn default_mapping_catches_the_rest() {
    let _tracing = TestTracing::init();
    let host = Host::start(pattern_config()).unwrap();
    assert_eq!(dispatched_handler(&host, "/anything/else"), "fallback");
    host.stop();
}

#[test]
fn prefix_match_reports_path_info() {
    let _tracing = TestTracing::init();
    let host = Host::start(pattern_config()).unwrap();
    let outcome = host
        .dispatch(RequestDescriptor::get("/docs/guide/intro"))
        .unwrap();
    let body = &outcome.reply().unwrap().body;
    assert_eq!(body["handler"], "docs");
    assert_eq!(body["path_info"], "/guide/intro");
    host.stop();
}

#[test]
fn unmatched_path_without_default_is_not_found() {
    let _tracing = TestTracing::init();
    let config = AppConfig::new("sparse").with_handler(
        HandlerConfig::new("only").with_pattern("/only"),
        echo_handler("only"),
    );
    let host = Host::start(config).unwrap();
    let err = host
        .dispatch(RequestDescriptor::get("/missing"))
        .unwrap_err();
    assert!(matches!(err, DispatchError::NotFound { .. }));
    host.stop();
}

#[test]
fn context_mount_resolves_inside_and_rejects_outside() {
    let _tracing = TestTracing::init();
    let config = AppConfig::new("mounted")
        .with_context_path("/mount")
        .with_handler(
            HandlerConfig::new("app").with_pattern("/app"),
            echo_handler("app"),
        );
    let host = Host::start(config).unwrap();

    let outcome = host.dispatch(RequestDescriptor::get("/mount/app")).unwrap();
    let body = &outcome.reply().unwrap().body;
    assert_eq!(body["handler"], "app");
    assert_eq!(body["context_path"], "/mount");
    assert_eq!(body["path"], "/app");

    let err = host.dispatch(RequestDescriptor::get("/app")).unwrap_err();
    assert!(matches!(err, DispatchError::NotFound { .. }));
    host.stop();
}
