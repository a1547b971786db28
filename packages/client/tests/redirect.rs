//! Redirect navigation: method rewriting, loop detection and hop limits

mod common;

use std::collections::HashSet;

use common::{MockTransport, hosts_resolver};
use conduit_client::client::{ClientChain, EndpointClient};
use conduit_client::config::RedirectConfig;
use conduit_client::context::{RequestContext, Target};
use conduit_client::endpoint::Endpoint;
use conduit_client::http::{ClientRequest, ClientResponse};
use conduit_client::redirect::{Navigation, RedirectNavigator, RedirectSignature, RedirectingClient};
use conduit_client::Url;
use http::header::{AUTHORIZATION, CONTENT_TYPE, COOKIE, REFERER};
use http::{HeaderValue, Method, StatusCode};

fn url(s: &str) -> Url {
    Url::parse(s).expect("test url")
}

fn context(request: ClientRequest) -> RequestContext {
    let host = request.url().host_str().expect("host").to_string();
    let port = request.url().port_or_known_default().expect("port");
    RequestContext::for_endpoint(request, Endpoint::of(host, port))
}

fn endpoint_client(transport: std::sync::Arc<MockTransport>) -> EndpointClient<MockTransport> {
    EndpointClient::from_arc(
        transport,
        hosts_resolver(&[("a.example", "192.0.2.1"), ("b.example", "192.0.2.2")]),
    )
}

fn follow(navigator: &RedirectNavigator, ctx: &RequestContext, response: ClientResponse) -> RequestContext {
    match navigator.next(ctx, &response).expect("redirect should be followed") {
        Navigation::Follow(child) => child,
        Navigation::Terminal => panic!("expected a redirect to be followed"),
    }
}

#[test]
fn test_signature_ignores_fragment_but_not_method() {
    let plain = RedirectSignature::new(&url("http://a.example/p?q=1"), &Method::GET);
    let fragment = RedirectSignature::new(&url("http://a.example/p?q=1#top"), &Method::GET);
    let post = RedirectSignature::new(&url("http://a.example/p?q=1"), &Method::POST);

    assert_eq!(plain, fragment);
    assert_ne!(plain, post);

    let set: HashSet<_> = [plain, fragment, post].into_iter().collect();
    assert_eq!(set.len(), 2);
}

#[test]
fn test_relative_location_is_resolved() {
    let navigator = RedirectNavigator::default();
    let ctx = context(ClientRequest::get("http://a.example/dir/page").expect("request"));

    let child = follow(
        &navigator,
        &ctx,
        ClientResponse::redirect(StatusCode::FOUND, "other?x=1#frag"),
    );

    assert_eq!(child.request().url().as_str(), "http://a.example/dir/other?x=1");
    assert_eq!(child.request().method(), Method::GET);
    assert!(child.parent().expect("derived").ptr_eq(&ctx));
    assert_eq!(child.redirect_chain().hops(), 1);
    assert!(matches!(child.target(), Target::Endpoint(e) if e.host() == Some("a.example")));
}

#[test]
fn test_see_other_switches_to_get_and_drops_body() {
    let navigator = RedirectNavigator::default();
    let request = ClientRequest::post("http://a.example/form", "name=x")
        .expect("request")
        .with_header(CONTENT_TYPE, HeaderValue::from_static("application/x-www-form-urlencoded"));
    let ctx = context(request);

    let child = follow(&navigator, &ctx, ClientResponse::redirect(StatusCode::SEE_OTHER, "/done"));

    assert_eq!(child.request().method(), Method::GET);
    assert!(child.request().body().is_empty());
    assert!(!child.request().headers().contains_key(CONTENT_TYPE));
}

#[test]
fn test_temporary_redirect_keeps_method_and_body() {
    let navigator = RedirectNavigator::default();
    let ctx = context(ClientRequest::post("http://a.example/upload", "payload").expect("request"));

    let child = follow(
        &navigator,
        &ctx,
        ClientResponse::redirect(StatusCode::TEMPORARY_REDIRECT, "/upload-v2"),
    );

    assert_eq!(child.request().method(), Method::POST);
    assert_eq!(child.request().body().as_ref(), b"payload");
}

#[test]
fn test_non_redirect_responses_are_terminal() {
    let navigator = RedirectNavigator::default();
    let ctx = context(ClientRequest::get("http://a.example/").expect("request"));

    for response in [
        ClientResponse::new(StatusCode::OK),
        ClientResponse::new(StatusCode::FOUND),
        ClientResponse::new(StatusCode::NOT_MODIFIED),
    ] {
        let navigation = navigator.next(&ctx, &response).expect("no error");
        assert!(matches!(navigation, Navigation::Terminal));
    }
}

#[test]
fn test_redirect_to_self_is_a_loop() {
    let navigator = RedirectNavigator::default();
    let ctx = context(ClientRequest::get("http://a.example/a").expect("request"));

    let err = navigator
        .next(&ctx, &ClientResponse::redirect(StatusCode::FOUND, "/a#again"))
        .expect_err("self redirect");
    assert!(err.is_redirect_loop());
}

#[test]
fn test_revisiting_a_hop_is_a_loop() {
    let navigator = RedirectNavigator::default();
    let ctx = context(ClientRequest::get("http://a.example/a").expect("request"));

    let at_b = follow(&navigator, &ctx, ClientResponse::redirect(StatusCode::FOUND, "/b"));
    let err = navigator
        .next(&at_b, &ClientResponse::redirect(StatusCode::FOUND, "/a"))
        .expect_err("A -> B -> A");
    assert!(err.is_redirect_loop());
    assert_eq!(err.url().map(Url::as_str), Some("http://a.example/a"));
}

#[test]
fn test_same_url_with_new_method_is_not_a_loop() {
    let navigator = RedirectNavigator::default();
    let ctx = context(ClientRequest::post("http://a.example/a", "x").expect("request"));

    let child = follow(&navigator, &ctx, ClientResponse::redirect(StatusCode::SEE_OTHER, "/a"));
    assert_eq!(child.request().method(), Method::GET);
}

#[test]
fn test_hop_limit_is_enforced() {
    let navigator = RedirectNavigator::new(RedirectConfig::limited(2));
    let ctx = context(ClientRequest::get("http://a.example/0").expect("request"));

    let one = follow(&navigator, &ctx, ClientResponse::redirect(StatusCode::FOUND, "/1"));
    let two = follow(&navigator, &one, ClientResponse::redirect(StatusCode::FOUND, "/2"));
    let err = navigator
        .next(&two, &ClientResponse::redirect(StatusCode::FOUND, "/3"))
        .expect_err("third hop");
    assert!(err.is_too_many_redirects());

    let none = RedirectNavigator::new(RedirectConfig::limited(0));
    let err = none
        .next(&ctx, &ClientResponse::redirect(StatusCode::FOUND, "/1"))
        .expect_err("no hops allowed");
    assert!(err.is_too_many_redirects());
}

#[test]
fn test_loop_is_reported_before_hop_limit() {
    let navigator = RedirectNavigator::new(RedirectConfig::limited(1));
    let ctx = context(ClientRequest::get("http://a.example/a").expect("request"));

    let at_b = follow(&navigator, &ctx, ClientResponse::redirect(StatusCode::FOUND, "/b"));
    let err = navigator
        .next(&at_b, &ClientResponse::redirect(StatusCode::FOUND, "/a"))
        .expect_err("loop at the limit");
    assert!(err.is_redirect_loop());
    assert!(!err.is_too_many_redirects());
}

#[test]
fn test_cross_origin_redirect_strips_credentials() {
    let navigator = RedirectNavigator::default();
    let request = ClientRequest::get("http://a.example/start")
        .expect("request")
        .with_header(AUTHORIZATION, HeaderValue::from_static("Bearer secret"))
        .with_header(COOKIE, HeaderValue::from_static("session=1"));
    let ctx = context(request);

    let child = follow(
        &navigator,
        &ctx,
        ClientResponse::redirect(StatusCode::MOVED_PERMANENTLY, "https://b.example/landing"),
    );

    let headers = child.request().headers();
    assert!(!headers.contains_key(AUTHORIZATION));
    assert!(!headers.contains_key(COOKIE));
    assert_eq!(headers.get(REFERER).expect("referer"), "http://a.example/start");
    assert_eq!(child.endpoint(), Some(Endpoint::of("b.example", 443)));
}

#[test]
fn test_https_only_rejects_plain_targets() {
    let navigator = RedirectNavigator::new(RedirectConfig::default().with_https_only(true));
    let ctx = context(ClientRequest::get("https://a.example/").expect("request"));

    let err = navigator
        .next(&ctx, &ClientResponse::redirect(StatusCode::FOUND, "http://a.example/"))
        .expect_err("downgrade");
    assert!(err.is_redirect());

    let err = navigator
        .next(&ctx, &ClientResponse::redirect(StatusCode::FOUND, "ftp://a.example/f"))
        .expect_err("unsupported scheme");
    assert!(err.is_redirect());
}

#[tokio::test]
async fn test_redirecting_client_follows_to_final_response() {
    let transport = MockTransport::new(|_, request| match request.url().path() {
        "/old" => Ok(ClientResponse::redirect(StatusCode::MOVED_PERMANENTLY, "/new")),
        "/new" => Ok(ClientResponse::redirect(StatusCode::FOUND, "http://b.example:8080/final")),
        _ => Ok(ClientResponse::new(StatusCode::OK).with_body("done")),
    });
    let client = ClientChain::new(endpoint_client(transport.clone()))
        .decorate(RedirectingClient::new(RedirectConfig::default()))
        .build();

    let request = ClientRequest::get("http://a.example/old").expect("request");
    let response = client.execute(context(request.clone()), request).await.expect("final");

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.body().as_ref(), b"done");

    let seen = transport.seen();
    let hops: Vec<_> = seen
        .iter()
        .map(|(endpoint, request)| (endpoint.to_string(), request.url().path().to_string()))
        .collect();
    assert_eq!(hops.len(), 3);
    assert_eq!(hops[0].1, "/old");
    assert_eq!(hops[1].1, "/new");
    assert_eq!(seen[0].0.to_socket_addr(), Some("192.0.2.1:80".parse().expect("addr")));
    assert_eq!(
        seen[2].0,
        Endpoint::of("b.example", 8080).with_ip("192.0.2.2".parse().expect("ip"))
    );
}

#[tokio::test]
async fn test_redirecting_client_surfaces_loops() {
    let transport = MockTransport::new(|_, request| {
        let next = if request.url().path() == "/a" { "/b" } else { "/a" };
        Ok(ClientResponse::redirect(StatusCode::FOUND, next))
    });
    let client = ClientChain::new(endpoint_client(transport.clone()))
        .decorate(RedirectingClient::default())
        .build();

    let request = ClientRequest::get("http://a.example/a").expect("request");
    let err = client
        .execute(context(request.clone()), request)
        .await
        .expect_err("ping-pong");
    assert!(err.is_redirect_loop());
    assert_eq!(transport.calls(), 2);
}
