use crate::error::HookError;
use crate::hooks::after_fn;
use crate::syncer::test_helpers::{Reply, create_test_syncer};
use crate::types::{ProxyEntry, RequestOptions};
use std::sync::{Arc, Mutex};
use std::time::Duration;

const ORIGINAL: &str = "https://api.example/x?y=1";

fn host(url: &str) -> ProxyEntry {
    ProxyEntry::Host {
        url: url.to_string(),
        prefix: false,
    }
}

#[tokio::test]
async fn no_proxies_behaves_like_request() {
    let (syncer, transport) = create_test_syncer();
    transport.route(ORIGINAL, Reply::ok(b"direct"));

    let via_proxy = syncer
        .request_with_proxy(ORIGINAL, RequestOptions::default(), &[])
        .await
        .unwrap();
    let direct = syncer
        .request(ORIGINAL, RequestOptions::default())
        .await
        .unwrap();

    assert_eq!(via_proxy.url, direct.url);
    assert_eq!(via_proxy.code, direct.code);
    assert_eq!(via_proxy.msg, direct.msg);
    assert_eq!(via_proxy.data, direct.data);
    assert_eq!(transport.called_urls(), vec![ORIGINAL, ORIGINAL]);
}

#[tokio::test(start_paused = true)]
async fn no_proxies_keeps_the_regular_timeout() {
    let (syncer, transport) = create_test_syncer();
    transport.route(ORIGINAL, Reply::Hang);

    let result = syncer
        .request_with_proxy(ORIGINAL, RequestOptions::default(), &[])
        .await
        .unwrap();

    assert!(result.is_cancelled());
    assert!(result.duration >= Duration::from_millis(15_000));
}

#[tokio::test]
async fn falls_through_to_the_first_successful_proxy() {
    let (syncer, transport) = create_test_syncer();
    transport.route("https://p1.example/x?y=1", Reply::status(500));
    transport.route("https://p2.example/x?y=1", Reply::ok(b"from p2"));
    transport.route("https://p3.example/x?y=1", Reply::ok(b"from p3"));

    let proxies = [
        host("https://p1.example"),
        host("https://p2.example"),
        host("https://p3.example"),
    ];
    let result = syncer
        .request_with_proxy(ORIGINAL, RequestOptions::default(), &proxies)
        .await
        .unwrap();

    assert_eq!(result.code, Some(200));
    assert_eq!(result.url, "https://p2.example/x?y=1");
    assert_eq!(result.data.as_deref(), Some(&b"from p2"[..]));
    assert_eq!(
        transport.called_urls(),
        vec!["https://p1.example/x?y=1", "https://p2.example/x?y=1"],
        "must stop after the first success"
    );
}

#[tokio::test]
async fn all_failing_returns_the_last_result() {
    let (syncer, transport) = create_test_syncer();
    transport.route("https://p1.example/x?y=1", Reply::status(500));
    transport.route("https://p2.example/x?y=1", Reply::status(403));

    let proxies = [host("https://p1.example"), host("https://p2.example")];
    let result = syncer
        .request_with_proxy(ORIGINAL, RequestOptions::default(), &proxies)
        .await
        .unwrap();

    assert_eq!(result.code, Some(403));
    assert_eq!(result.msg, "forbidden");
    assert_eq!(result.url, "https://p2.example/x?y=1");
}

#[tokio::test]
async fn prefix_proxies_receive_the_full_url() {
    let (syncer, transport) = create_test_syncer();
    transport.route("https://cors.example/https://api.example/x?y=1", Reply::status(502));
    transport.route("https://full.examplehttps://api.example/x?y=1", Reply::ok(b"ok"));

    let proxies = [
        ProxyEntry::Prefix("https://cors.example/".into()),
        ProxyEntry::Host {
            url: "https://full.example".into(),
            prefix: true,
        },
    ];
    let result = syncer
        .request_with_proxy(ORIGINAL, RequestOptions::default(), &proxies)
        .await
        .unwrap();

    assert!(result.is_success());
    assert_eq!(
        transport.called_urls(),
        vec![
            "https://cors.example/https://api.example/x?y=1",
            "https://full.examplehttps://api.example/x?y=1"
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn proxy_attempts_use_the_tighter_default_timeout() {
    let (syncer, transport) = create_test_syncer();
    transport.route("https://slow.example/x?y=1", Reply::Hang);
    transport.route("https://fast.example/x?y=1", Reply::ok(b"ok"));

    let proxies = [host("https://slow.example"), host("https://fast.example")];
    let started = tokio::time::Instant::now();
    let result = syncer
        .request_with_proxy(ORIGINAL, RequestOptions::default(), &proxies)
        .await
        .unwrap();
    let elapsed = started.elapsed();

    assert!(result.is_success());
    assert!(elapsed >= Duration::from_millis(5_000), "elapsed: {elapsed:?}");
    assert!(elapsed < Duration::from_millis(15_000), "elapsed: {elapsed:?}");
    assert_eq!(transport.calls().len(), 2);
    assert!(transport.tokens()[0].is_cancelled());
}

#[tokio::test(start_paused = true)]
async fn caller_timeout_overrides_proxy_default() {
    let (syncer, transport) = create_test_syncer();
    transport.route("https://slow.example/x?y=1", Reply::Hang);

    let options = RequestOptions {
        timeout: Some(Duration::from_millis(100)),
        ..Default::default()
    };
    let result = syncer
        .request_with_proxy(ORIGINAL, options, &[host("https://slow.example")])
        .await
        .unwrap();

    assert!(result.is_cancelled());
    assert!(result.duration >= Duration::from_millis(100));
    assert!(result.duration < Duration::from_millis(5_000));
}

#[tokio::test]
async fn unparseable_url_yields_failure_tagged_with_proxy_url() {
    let (syncer, transport) = create_test_syncer();

    let result = syncer
        .request_with_proxy("not a url", RequestOptions::default(), &[host("https://p1.example")])
        .await
        .unwrap();

    assert_eq!(result.code, Some(-1));
    assert_eq!(result.url, "https://p1.example");
    assert!(result.msg.starts_with("invalid URL"), "msg: {}", result.msg);
    assert!(transport.calls().is_empty());
}

#[tokio::test]
async fn after_hook_error_is_absorbed_and_next_proxy_tried() {
    let (syncer, transport) = create_test_syncer();
    transport.route("https://p1.example/x?y=1", Reply::ok(b"p1"));
    transport.route("https://p2.example/x?y=1", Reply::ok(b"p2"));

    let calls = Arc::new(Mutex::new(0u32));
    let calls_clone = calls.clone();
    let options = RequestOptions {
        after: Some(after_fn(move |_, _| {
            let calls = calls_clone.clone();
            async move {
                let seen = {
                    let mut calls = calls.lock().unwrap();
                    *calls += 1;
                    *calls
                };
                if seen == 1 {
                    Err(HookError::new("first response rejected"))
                } else {
                    Ok(())
                }
            }
        })),
        ..Default::default()
    };

    let proxies = [host("https://p1.example"), host("https://p2.example")];
    let result = syncer
        .request_with_proxy(ORIGINAL, options, &proxies)
        .await
        .unwrap();

    assert_eq!(result.data.as_deref(), Some(&b"p2"[..]));
    assert_eq!(*calls.lock().unwrap(), 2);
}

#[tokio::test]
async fn after_hook_error_on_last_proxy_becomes_failure_record() {
    let (syncer, transport) = create_test_syncer();
    transport.route("https://p1.example/x?y=1", Reply::ok(b"p1"));

    let options = RequestOptions {
        after: Some(after_fn(|_, _| async {
            Err(HookError::with_code(-9, "rejected"))
        })),
        ..Default::default()
    };

    let result = syncer
        .request_with_proxy(ORIGINAL, options, &[host("https://p1.example")])
        .await
        .unwrap();

    assert_eq!(result.code, Some(-9));
    assert_eq!(result.msg, "hook error: rejected");
    assert_eq!(result.url, "https://p1.example");
    assert!(result.data.is_none());
}
