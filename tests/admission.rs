//! Admission pipeline behavior through the public API.

use std::sync::Arc;

use app_gateway::admission::{AdmissionState, Dispatch};
use app_gateway::config::{GatewayConfig, SingleAppConfig};
use app_gateway::detect::AppType;
use app_gateway::headers::names;
use bumpalo::Bump;

mod common;

use common::{request, request_bytes, CountingDetector, RecordingAnalytics, RecordingHandoff};

fn analytics_config() -> GatewayConfig {
    let mut config = GatewayConfig::default();
    config.analytics.enabled = true;
    config
}

#[test]
fn test_flags_bd_with_body_buffers_request() {
    let arena = Bump::new();
    let mut p = common::pipeline(GatewayConfig::default(), CountingDetector::new(None));
    let mut handoff = RecordingHandoff::default();

    let mut req = request(
        &arena,
        &[
            (names::APP_GROUP_NAME, "blog"),
            (names::APP_ROOT, "/srv/blog"),
            (names::FLAGS, "BD"),
        ],
        &[],
    )
    .with_body(true);

    assert_eq!(p.on_request_begin(&mut req, &mut handoff), Dispatch::BufferBody);
    assert_eq!(handoff.buffered, 1);
    assert_eq!(handoff.checkouts, 0);
    assert!(req.flags.request_body_buffering);
    assert!(req.flags.dechunk_response);
    assert!(!req.flags.https);
    assert!(!req.flags.strip_100_continue_header);
}

#[test]
fn test_buffering_flag_without_body_checks_out() {
    let arena = Bump::new();
    let mut p = common::pipeline(GatewayConfig::default(), CountingDetector::new(None));
    let mut handoff = RecordingHandoff::default();

    let mut req = request(
        &arena,
        &[
            (names::APP_GROUP_NAME, "blog"),
            (names::APP_ROOT, "/srv/blog"),
            (names::FLAGS, "B"),
        ],
        &[],
    );

    assert_eq!(p.on_request_begin(&mut req, &mut handoff), Dispatch::Checkout);
    assert_eq!(handoff.checkouts, 1);
    assert!(!req.flags.request_body_buffering);
    assert_eq!(req.state(), AdmissionState::Dispatched);
}

#[test]
fn test_options_are_derived_once_and_shared() {
    let arena = Bump::new();
    let detector = CountingDetector::new(Some(AppType::Rack));
    let mut p = common::pipeline(GatewayConfig::default(), Arc::clone(&detector));
    let mut handoff = RecordingHandoff::default();
    let secure = [(names::APP_GROUP_NAME, "blog"), (names::APP_ROOT, "/srv/blog")];

    let mut first = request(&arena, &secure, &[]);
    p.on_request_begin(&mut first, &mut handoff);
    let mut second = request(&arena, &secure, &[]);
    p.on_request_begin(&mut second, &mut handoff);

    let a = first.options.as_ref().unwrap().snapshot();
    let b = second.options.as_ref().unwrap().snapshot();
    assert!(Arc::ptr_eq(a, b));
    assert_eq!(detector.calls(), 1);
    assert_eq!(p.cache().len(), 1);
    assert_eq!(a.app_type, "rack");
    assert_eq!(handoff.checkouts, 2);
}

#[test]
fn test_cache_keys_are_exact() {
    let arena = Bump::new();
    let mut p = common::pipeline(GatewayConfig::default(), CountingDetector::new(None));
    let mut handoff = RecordingHandoff::default();

    for group in ["blog", "Blog", "blog "] {
        let mut req = request(
            &arena,
            &[(names::APP_GROUP_NAME, group), (names::APP_ROOT, "/srv/blog")],
            &[],
        );
        p.on_request_begin(&mut req, &mut handoff);
    }
    assert_eq!(p.cache().len(), 3);
}

#[test]
fn test_cache_keys_compare_raw_bytes() {
    let arena = Bump::new();
    let mut p = common::pipeline(GatewayConfig::default(), CountingDetector::new(None));
    let mut handoff = RecordingHandoff::default();

    let mut first = request_bytes(
        &arena,
        &[(names::APP_GROUP_NAME, b"app\xff"), (names::APP_ROOT, b"/srv/one")],
    );
    let mut second = request_bytes(
        &arena,
        &[(names::APP_GROUP_NAME, b"app\xfe"), (names::APP_ROOT, b"/srv/two")],
    );
    p.on_request_begin(&mut first, &mut handoff);
    p.on_request_begin(&mut second, &mut handoff);

    assert_eq!(p.cache().len(), 2);
    assert_eq!(first.options.as_ref().unwrap().app_root, "/srv/one");
    assert_eq!(second.options.as_ref().unwrap().app_root, "/srv/two");
    assert_eq!(p.cache().lookup(b"app\xfe").unwrap().app_root, "/srv/two");
}

#[test]
fn test_single_app_mode_ignores_group_header() {
    let arena = Bump::new();
    let mut config = GatewayConfig::default();
    config.single_app = Some(SingleAppConfig {
        app_root: "/srv/only".to_string(),
        app_group_name: Some("only".to_string()),
        ..Default::default()
    });
    let detector = CountingDetector::new(Some(AppType::Node));
    let mut p = common::pipeline(config, Arc::clone(&detector));
    let mut handoff = RecordingHandoff::default();
    assert_eq!(p.cache().len(), 1);

    let mut with_group = request(&arena, &[(names::APP_GROUP_NAME, "other")], &[]);
    assert_eq!(p.on_request_begin(&mut with_group, &mut handoff), Dispatch::Checkout);
    let mut without_group = request(&arena, &[], &[]);
    assert_eq!(p.on_request_begin(&mut without_group, &mut handoff), Dispatch::Checkout);

    assert_eq!(with_group.app_group_name(), Some("only"));
    assert_eq!(without_group.app_group_name(), Some("only"));
    assert_eq!(p.cache().len(), 1);
    assert_eq!(detector.calls(), 1);
    assert!(handoff.errors.is_empty());
}

#[test]
fn test_missing_group_name_ends_request() {
    let arena = Bump::new();
    let detector = CountingDetector::new(None);
    let mut p = common::pipeline(GatewayConfig::default(), Arc::clone(&detector));

    for secure in [
        vec![(names::APP_ROOT, "/srv/blog")],
        vec![(names::APP_GROUP_NAME, ""), (names::APP_ROOT, "/srv/blog")],
    ] {
        let mut handoff = RecordingHandoff::default();
        let mut req = request(&arena, &secure, &[]);

        assert_eq!(p.on_request_begin(&mut req, &mut handoff), Dispatch::Terminated);
        assert_eq!(handoff.errors, vec!["the !~app_group_name header must be set"]);
        assert_eq!(handoff.calls(), 1);
        assert!(req.is_ended());
        assert!(req.options.is_none());
    }
    assert!(p.cache().is_empty());
    assert_eq!(detector.calls(), 0);
}

#[test]
fn test_missing_roots_insert_nothing() {
    let arena = Bump::new();
    let mut p = common::pipeline(GatewayConfig::default(), CountingDetector::new(None));
    let mut handoff = RecordingHandoff::default();

    let mut req = request(&arena, &[(names::APP_GROUP_NAME, "blog")], &[]);
    assert_eq!(p.on_request_begin(&mut req, &mut handoff), Dispatch::Terminated);
    assert_eq!(
        handoff.errors,
        vec!["client did not send a !~app_root or a !~document_root header"]
    );
    assert!(p.cache().is_empty());

    let mut handoff = RecordingHandoff::default();
    let mut req = request(
        &arena,
        &[(names::APP_GROUP_NAME, "blog"), (names::SCRIPT_NAME, "/blog")],
        &[],
    );
    assert_eq!(p.on_request_begin(&mut req, &mut handoff), Dispatch::Terminated);
    assert_eq!(handoff.errors, vec!["client did not send a !~document_root header"]);
    assert!(p.cache().is_empty());
}

#[test]
fn test_document_root_parent_is_app_root() {
    let arena = Bump::new();
    let mut p = common::pipeline(GatewayConfig::default(), CountingDetector::new(None));
    let mut handoff = RecordingHandoff::default();

    let mut req = request(
        &arena,
        &[
            (names::APP_GROUP_NAME, "blog"),
            (names::DOCUMENT_ROOT, "/srv/blog/public"),
        ],
        &[],
    );
    p.on_request_begin(&mut req, &mut handoff);

    let options = req.options.as_ref().unwrap();
    assert_eq!(options.app_root, "/srv/blog");
    assert_eq!(options.base_uri, "/");
    assert_eq!(options.app_group_name(), "blog");
}

#[test]
fn test_defaults_and_header_overlay() {
    let arena = Bump::new();
    let mut config = GatewayConfig::default();
    config.defaults.ruby = "/opt/ruby/bin/ruby".to_string();
    config.defaults.default_user = "app".to_string();
    let mut p = common::pipeline(config, CountingDetector::new(None));
    let mut handoff = RecordingHandoff::default();

    let mut req = request(
        &arena,
        &[
            (names::APP_GROUP_NAME, "blog"),
            (names::APP_ROOT, "/srv/blog"),
            (names::PYTHON, "/usr/bin/python3"),
            (names::START_TIMEOUT, "45"),
            (names::SPAWN_METHOD, ""),
            (names::LOAD_SHELL_ENVVARS, "true"),
        ],
        &[],
    );
    p.on_request_begin(&mut req, &mut handoff);

    let options = req.options.as_ref().unwrap();
    assert_eq!(options.ruby, "/opt/ruby/bin/ruby");
    assert_eq!(options.python, "/usr/bin/python3");
    assert_eq!(options.default_user, "app");
    assert_eq!(options.start_timeout_msec, 45_000);
    assert_eq!(options.spawn_method, "smart");
    assert!(options.load_shell_envvars);
}

#[test]
fn test_max_requests_never_reaches_cache() {
    let arena = Bump::new();
    let mut p = common::pipeline(GatewayConfig::default(), CountingDetector::new(None));
    let mut handoff = RecordingHandoff::default();

    let mut first = request(
        &arena,
        &[
            (names::APP_GROUP_NAME, "blog"),
            (names::APP_ROOT, "/srv/blog"),
            (names::MAX_REQUESTS, "5"),
        ],
        &[],
    );
    p.on_request_begin(&mut first, &mut handoff);
    let mut second = request(
        &arena,
        &[(names::APP_GROUP_NAME, "blog"), (names::APP_ROOT, "/srv/blog")],
        &[],
    );
    p.on_request_begin(&mut second, &mut handoff);

    assert_eq!(first.options.as_ref().unwrap().effective_max_requests(), 5);
    assert_eq!(second.options.as_ref().unwrap().effective_max_requests(), 0);
    assert_eq!(p.cache().lookup(b"blog").unwrap().max_requests, 0);
}

#[test]
fn test_sticky_session_cookie() {
    let arena = Bump::new();
    let mut p = common::pipeline(GatewayConfig::default(), CountingDetector::new(None));
    let secure = [
        (names::APP_GROUP_NAME, "blog"),
        (names::APP_ROOT, "/srv/blog"),
        (names::STICKY_SESSIONS, "true"),
        (names::STICKY_SESSIONS_COOKIE_NAME, "psc"),
    ];

    let mut handoff = RecordingHandoff::default();
    let mut req = request(&arena, &secure, &[("Cookie", "other=1; psc=777")]);
    p.on_request_begin(&mut req, &mut handoff);
    assert_eq!(req.sticky_session_id(), Some(777));
    assert_eq!(req.sticky_cookie_name.as_deref(), Some("psc"));

    let mut req = request(&arena, &secure, &[("Cookie", "other=1")]);
    p.on_request_begin(&mut req, &mut handoff);
    assert_eq!(req.sticky_session_id(), None);
}

#[test]
fn test_sticky_session_default_cookie_name() {
    let arena = Bump::new();
    let mut p = common::pipeline(GatewayConfig::default(), CountingDetector::new(None));
    let mut handoff = RecordingHandoff::default();

    let mut req = request(
        &arena,
        &[
            (names::APP_GROUP_NAME, "blog"),
            (names::APP_ROOT, "/srv/blog"),
            (names::STICKY_SESSIONS, "t"),
        ],
        &[("Cookie", "_app_route=3")],
    );
    p.on_request_begin(&mut req, &mut handoff);
    assert_eq!(req.sticky_session_id(), Some(3));
}

#[test]
fn test_sticky_session_disabled_ignores_cookie() {
    let arena = Bump::new();
    let mut p = common::pipeline(GatewayConfig::default(), CountingDetector::new(None));
    let mut handoff = RecordingHandoff::default();

    let mut req = request(
        &arena,
        &[
            (names::APP_GROUP_NAME, "blog"),
            (names::APP_ROOT, "/srv/blog"),
            (names::STICKY_SESSIONS, "false"),
        ],
        &[("Cookie", "_app_route=3")],
    );
    p.on_request_begin(&mut req, &mut handoff);
    assert_eq!(req.sticky_session_id(), None);
    assert!(req.sticky_cookie_name.is_none());
}

#[test]
fn test_analytics_without_key_is_rejected() {
    let arena = Bump::new();
    let analytics = RecordingAnalytics::new();
    let mut p = common::pipeline(analytics_config(), CountingDetector::new(None))
        .with_analytics(analytics.clone());
    let mut handoff = RecordingHandoff::default();

    let mut req = request(
        &arena,
        &[
            (names::APP_GROUP_NAME, "blog"),
            (names::APP_ROOT, "/srv/blog"),
            (names::ANALYTICS_SUPPORT, "true"),
        ],
        &[],
    );
    assert_eq!(p.on_request_begin(&mut req, &mut handoff), Dispatch::Terminated);
    assert_eq!(handoff.errors, vec!["header !~analytics_key must be set"]);
    assert_eq!(handoff.calls(), 1);
    assert_eq!(analytics.opened_count(), 0);
}

#[test]
fn test_analytics_filters_must_be_utf8() {
    let arena = Bump::new();
    let analytics = RecordingAnalytics::new();
    let mut p = common::pipeline(analytics_config(), CountingDetector::new(None))
        .with_analytics(analytics.clone());
    let mut handoff = RecordingHandoff::default();

    let mut req = request_bytes(
        &arena,
        &[
            (names::APP_GROUP_NAME, b"blog"),
            (names::APP_ROOT, b"/srv/blog"),
            (names::ANALYTICS_SUPPORT, b"true"),
            (names::ANALYTICS_KEY, b"k-123"),
            (names::ANALYTICS_FILTERS, b"status \xff 500"),
        ],
    );
    assert_eq!(p.on_request_begin(&mut req, &mut handoff), Dispatch::Terminated);
    assert_eq!(handoff.errors, vec!["header !~analytics_filters is not valid UTF-8"]);
    assert_eq!(analytics.opened_count(), 0);
}

#[test]
fn test_analytics_transaction_attached() {
    let arena = Bump::new();
    let analytics = RecordingAnalytics::new();
    let mut p = common::pipeline(analytics_config(), CountingDetector::new(None))
        .with_analytics(analytics.clone());
    let mut handoff = RecordingHandoff::default();

    let mut req = request(
        &arena,
        &[
            (names::APP_GROUP_NAME, "blog"),
            (names::APP_ROOT, "/srv/blog"),
            (names::ANALYTICS_SUPPORT, "true"),
            (names::ANALYTICS_KEY, "k-123"),
            (names::ANALYTICS_FILTERS, "status >= 500"),
        ],
        &[],
    );
    assert_eq!(p.on_request_begin(&mut req, &mut handoff), Dispatch::Checkout);

    let options = req.options.as_ref().unwrap();
    assert!(options.analytics);
    assert_eq!(options.analytics_key.as_deref(), Some("k-123"));
    assert!(options.transaction.is_some());

    let opened = analytics.opened.lock().unwrap();
    assert_eq!(opened.len(), 1);
    assert_eq!(opened[0].app_group_name, "blog");
    assert_eq!(opened[0].category, "requests");
    assert_eq!(opened[0].filters, "status >= 500");

    let txn = Arc::clone(&analytics.transactions.lock().unwrap()[0]);
    assert_eq!(*txn.scopes.lock().unwrap(), vec!["request processing"]);
    assert_eq!(
        *txn.lines.lock().unwrap(),
        vec!["Request method: GET", "URI: /posts/1"]
    );
}

#[test]
fn test_null_transaction_disables_analytics() {
    let arena = Bump::new();
    let analytics = RecordingAnalytics::declining();
    let mut p = common::pipeline(analytics_config(), CountingDetector::new(None))
        .with_analytics(analytics.clone());
    let mut handoff = RecordingHandoff::default();

    let mut req = request(
        &arena,
        &[
            (names::APP_GROUP_NAME, "blog"),
            (names::APP_ROOT, "/srv/blog"),
            (names::ANALYTICS_SUPPORT, "true"),
            (names::ANALYTICS_KEY, "k-123"),
        ],
        &[],
    );
    assert_eq!(p.on_request_begin(&mut req, &mut handoff), Dispatch::Checkout);
    let options = req.options.as_ref().unwrap();
    assert!(!options.analytics);
    assert!(options.transaction.is_none());
    assert_eq!(analytics.opened_count(), 1);
    assert!(handoff.errors.is_empty());
}

#[test]
fn test_analytics_globally_disabled() {
    let arena = Bump::new();
    let analytics = RecordingAnalytics::new();
    let mut p = common::pipeline(GatewayConfig::default(), CountingDetector::new(None))
        .with_analytics(analytics.clone());
    let mut handoff = RecordingHandoff::default();

    let mut req = request(
        &arena,
        &[
            (names::APP_GROUP_NAME, "blog"),
            (names::APP_ROOT, "/srv/blog"),
            (names::ANALYTICS_SUPPORT, "true"),
        ],
        &[],
    );
    assert_eq!(p.on_request_begin(&mut req, &mut handoff), Dispatch::Checkout);
    assert_eq!(analytics.opened_count(), 0);
    assert!(!req.options.as_ref().unwrap().analytics);
}

#[test]
fn test_failure_after_resolution_keeps_cache_entry() {
    let arena = Bump::new();
    let analytics = RecordingAnalytics::new();
    let mut p = common::pipeline(analytics_config(), CountingDetector::new(None))
        .with_analytics(analytics);
    let mut handoff = RecordingHandoff::default();

    let mut req = request(
        &arena,
        &[
            (names::APP_GROUP_NAME, "blog"),
            (names::APP_ROOT, "/srv/blog"),
            (names::ANALYTICS_SUPPORT, "t"),
        ],
        &[],
    );
    assert_eq!(p.on_request_begin(&mut req, &mut handoff), Dispatch::Terminated);
    assert_eq!(req.state(), AdmissionState::Ended);
    assert_eq!(p.cache().len(), 1);
}
