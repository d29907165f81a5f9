//! End-to-end behavior of the proxy over real sockets.

use cors_proxy::config::ProxyConfig;
use reqwest::Method;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

mod common;

const ORIGIN: &str = "https://site.test";

#[tokio::test]
async fn info_page_without_target() {
    let proxy = common::spawn_proxy(ProxyConfig::default()).await;
    let client = common::client();

    for url in [
        format!("http://{}/", proxy.addr),
        format!("http://{}/?", proxy.addr),
        format!("http://{}/anything/here", proxy.addr),
    ] {
        let response = client
            .post(&url)
            .header("origin", ORIGIN)
            .body("ignored")
            .send()
            .await
            .unwrap();

        assert_eq!(response.status(), 200, "{url}");
        assert_eq!(response.headers()["content-type"], "text/plain");
        let body = response.text().await.unwrap();
        assert!(body.starts_with("CLOUDFLARE-CORS-ANYWHERE"));
        assert!(body.contains(&format!("Usage:\nhttp://{}/?uri", proxy.addr)));
    }
}

#[tokio::test]
async fn preflight_never_reaches_upstream() {
    let upstream = MockServer::start().await;
    Mock::given(method("OPTIONS"))
        .respond_with(ResponseTemplate::new(500))
        .expect(0)
        .mount(&upstream)
        .await;

    let proxy = common::spawn_proxy(ProxyConfig::default()).await;
    let response = common::client()
        .request(Method::OPTIONS, proxy.url_for(&upstream.uri()))
        .header("origin", ORIGIN)
        .header("access-control-request-method", "PUT")
        .header("access-control-request-headers", "x-token")
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 200);
    let headers = response.headers();
    assert_eq!(headers["access-control-allow-origin"], ORIGIN);
    assert_eq!(headers["access-control-allow-methods"], "PUT");
    assert_eq!(headers["access-control-allow-headers"], "x-token");
    assert_eq!(headers["access-control-max-age"], "86400");
    assert!(response.bytes().await.unwrap().is_empty());
}

#[tokio::test]
async fn preflight_without_origin_allows_any() {
    let proxy = common::spawn_proxy(ProxyConfig::default()).await;
    let response = common::client()
        .request(Method::OPTIONS, proxy.url_for("https://example.com/"))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 200);
    assert_eq!(response.headers()["access-control-allow-origin"], "*");
    assert_eq!(
        response.headers()["access-control-allow-methods"],
        "GET, POST, PUT, DELETE, OPTIONS"
    );
}

#[tokio::test]
async fn forwarded_response_is_readable_cross_origin() {
    let upstream = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/data"))
        .respond_with(
            ResponseTemplate::new(418)
                .insert_header("x-rate-remaining", "41")
                .insert_header("access-control-allow-origin", "https://elsewhere.test")
                .set_body_string("short and stout"),
        )
        .mount(&upstream)
        .await;

    let proxy = common::spawn_proxy(ProxyConfig::default()).await;
    let target = format!("{}/data", upstream.uri());

    let response = common::client()
        .get(proxy.url_for(&target))
        .header("origin", ORIGIN)
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 418);
    let headers = response.headers();
    assert_eq!(headers["access-control-allow-origin"], ORIGIN);
    assert_eq!(headers["x-rate-remaining"], "41");

    let exposed = headers["access-control-expose-headers"].to_str().unwrap();
    let exposed: Vec<&str> = exposed.split(", ").collect();
    assert!(exposed.contains(&"x-rate-remaining"));
    assert!(exposed.contains(&"content-length"));
    assert!(exposed.contains(&"access-control-allow-origin"));

    assert_eq!(response.text().await.unwrap(), "short and stout");

    // No Origin on the way in means a wildcard on the way out.
    let response = common::client()
        .get(proxy.url_for(&target))
        .send()
        .await
        .unwrap();
    assert_eq!(response.headers()["access-control-allow-origin"], "*");
}

#[tokio::test]
async fn identity_headers_are_stripped() {
    let upstream = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&upstream)
        .await;

    let proxy = common::spawn_proxy(ProxyConfig::default()).await;
    common::client()
        .get(proxy.url_for(&upstream.uri()))
        .header("origin", ORIGIN)
        .header("referer", "https://site.test/page")
        .header("x-forwarded-for", "203.0.113.7")
        .header("cf-connecting-ip", "203.0.113.7")
        .header("cf-ipcountry", "NL")
        .header("x-api-key", "secret")
        .send()
        .await
        .unwrap();

    let received = upstream.received_requests().await.unwrap();
    assert_eq!(received.len(), 1);
    let headers = &received[0].headers;
    for name in ["origin", "referer", "x-forwarded-for", "cf-connecting-ip", "cf-ipcountry"] {
        assert!(headers.get(name).is_none(), "{name} leaked upstream");
    }
    assert_eq!(headers.get("x-api-key").unwrap(), "secret");

    // Host names the upstream, not the proxy.
    let upstream_host = upstream.address().to_string();
    assert_eq!(headers.get("host").unwrap(), upstream_host.as_str());
}

#[tokio::test]
async fn body_forwarded_only_for_body_methods() {
    let upstream = MockServer::start().await;
    Mock::given(path("/sink"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&upstream)
        .await;

    let proxy = common::spawn_proxy(ProxyConfig::default()).await;
    let client = common::client();
    let url = proxy.url_for(&format!("{}/sink", upstream.uri()));
    let payload = b"{\"n\":1}\x00\xff".to_vec();

    let cases = [
        (Method::POST, true),
        (Method::PUT, true),
        (Method::PATCH, true),
        (Method::GET, false),
        (Method::DELETE, false),
        (Method::HEAD, false),
    ];
    for (m, _) in &cases {
        let mut request = client.request(m.clone(), &url);
        if *m != Method::HEAD {
            request = request.body(payload.clone());
        }
        let response = request.send().await.unwrap();
        assert_eq!(response.status(), 200, "{m}");
    }

    let received = upstream.received_requests().await.unwrap();
    assert_eq!(received.len(), cases.len());
    for (request, (m, has_body)) in received.iter().zip(&cases) {
        assert_eq!(&request.method, m);
        if *has_body {
            assert_eq!(request.body, payload, "{m}");
        } else {
            assert!(request.body.is_empty(), "{m} forwarded a body");
        }
    }
}

#[tokio::test]
async fn target_is_decoded_twice() {
    let upstream = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api"))
        .and(query_param("x", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_string("decoded"))
        .expect(1)
        .mount(&upstream)
        .await;

    let proxy = common::spawn_proxy(ProxyConfig::default()).await;
    // The `?` is escaped once inside the target, and the whole target once more.
    let target = format!("{}/api%3Fx=1", upstream.uri());
    let query = urlencoding::encode(&target).into_owned();
    assert!(query.contains("api%253Fx%3D1"));

    let response = common::client()
        .get(proxy.url_for(&query))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 200);
    assert_eq!(response.text().await.unwrap(), "decoded");
}

#[tokio::test]
async fn default_policy_allows_any_origin() {
    let upstream = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(3)
        .mount(&upstream)
        .await;

    let proxy = common::spawn_proxy(ProxyConfig::default()).await;
    let client = common::client();

    for origin in [Some("https://a.test"), Some("null"), None] {
        let mut request = client.get(proxy.url_for(&upstream.uri()));
        if let Some(origin) = origin {
            request = request.header("origin", origin);
        }
        assert_eq!(request.send().await.unwrap().status(), 200, "{origin:?}");
    }
}

#[tokio::test]
async fn policy_rejections_are_forbidden() {
    let upstream = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&upstream)
        .await;

    let mut config = ProxyConfig::default();
    config.policy.blacklist_urls = vec!["/private".into()];
    config.policy.whitelist_origins = vec!["^https://trusted\\.test$".into()];
    let proxy = common::spawn_proxy(config).await;
    let client = common::client();

    // Blacklisted target, trusted origin.
    let response = client
        .get(proxy.url_for(&format!("{}/private/x", upstream.uri())))
        .header("origin", "https://trusted.test")
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 403);
    assert_eq!(response.headers()["content-type"], "text/html");
    assert!(response
        .text()
        .await
        .unwrap()
        .starts_with("Create your own CORS proxy</br>"));

    // Untrusted origin.
    let response = client
        .get(proxy.url_for(&upstream.uri()))
        .header("origin", "https://evil.test")
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 403);

    // A missing Origin always satisfies the whitelist.
    let response = client.get(proxy.url_for(&upstream.uri())).send().await.unwrap();
    assert_eq!(response.status(), 200);
}

#[tokio::test]
async fn unreachable_upstream_is_bad_gateway() {
    let proxy = common::spawn_proxy(ProxyConfig::default()).await;
    let response = common::client()
        .get(proxy.url_for("http://127.0.0.1:9/"))
        .header("origin", ORIGIN)
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 502);
    assert_eq!(response.headers()["access-control-allow-origin"], ORIGIN);
}

#[tokio::test]
async fn stalled_upstream_body_does_not_hold_the_client() {
    let backend = common::start_stalling_backend().await;

    let mut config = ProxyConfig::default();
    config.timeouts.upstream_secs = 1;
    config.timeouts.request_secs = 1;
    let proxy = common::spawn_proxy(config).await;

    let response = common::client()
        .get(proxy.url_for(&format!("http://{backend}/")))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);

    // Two of 100 bytes arrive; the rest must fail fast instead of hanging.
    let body = tokio::time::timeout(std::time::Duration::from_secs(5), response.bytes())
        .await
        .expect("response body outlived the upstream deadline");
    assert!(body.is_err());
}
