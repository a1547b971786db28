//! Request context attributes, derivation and lifecycle

use conduit_client::context::{AttributeKey, RequestContext, RequestId, Target};
use conduit_client::endpoint::Endpoint;
use conduit_client::http::ClientRequest;

fn request(url: &str) -> ClientRequest {
    ClientRequest::get(url).expect("test URL should parse")
}

fn root() -> RequestContext {
    RequestContext::for_endpoint(
        request("http://a.example/start"),
        Endpoint::of("a.example", 80),
    )
}

#[test]
fn test_attribute_keys_are_compared_by_identity() {
    let ctx = root();
    let first: AttributeKey<u32> = AttributeKey::new("tenant");
    let second: AttributeKey<u32> = AttributeKey::new("tenant");

    ctx.set_attribute(&first, 7).expect("open context");
    assert_eq!(ctx.attribute(&first).as_deref(), Some(&7));
    assert!(ctx.attribute(&second).is_none());
    assert_ne!(first, second);
}

#[test]
fn test_derived_context_snapshots_attributes() {
    let parent = root();
    let key: AttributeKey<String> = AttributeKey::new("user");
    let other: AttributeKey<String> = AttributeKey::new("trace");
    parent.set_attribute(&key, "alice".to_string()).expect("set");

    let child = parent.new_derived_context(
        RequestId::from_u64(2),
        request("http://a.example/child"),
        None,
    );
    assert_eq!(child.attribute(&key).as_deref().map(String::as_str), Some("alice"));

    child.set_attribute(&key, "bob".to_string()).expect("set on child");
    parent.set_attribute(&other, "t1".to_string()).expect("set on parent");

    assert_eq!(parent.attribute(&key).as_deref().map(String::as_str), Some("alice"));
    assert!(child.attribute(&other).is_none(), "later parent writes are not visible");
}

#[test]
fn test_derivation_links_parent_and_root() {
    let root = root();
    let child = root.new_derived_context(RequestId::random(), request("http://a.example/1"), None);
    let grandchild =
        child.new_derived_context(RequestId::from_u64(99), request("http://a.example/2"), None);

    assert!(root.is_root());
    assert!(root.root().ptr_eq(&root));
    assert!(grandchild.parent().expect("parent").ptr_eq(&child));
    assert!(grandchild.root().ptr_eq(&root));
    assert_eq!(grandchild.id(), RequestId::from_u64(99));
    assert_ne!(child.id(), root.id());
}

#[test]
fn test_endpoint_override_replaces_target() {
    let root = root();
    let override_to = Endpoint::of("b.example", 8080);
    let child = root.new_derived_context(
        RequestId::random(),
        request("http://b.example:8080/"),
        Some(override_to.clone()),
    );

    assert!(matches!(child.target(), Target::Endpoint(e) if *e == override_to));
    assert_eq!(child.endpoint(), Some(override_to));
}

#[test]
fn test_unprocessed_marker_is_not_inherited() {
    let parent = root();
    parent.mark_unprocessed(std::io::Error::other("quota exceeded"));
    parent.set_timed_out();

    let child = parent.new_derived_context(RequestId::random(), request("http://a.example/"), None);
    assert!(parent.unprocessed_cause().is_some());
    assert!(child.unprocessed_cause().is_none());
    assert!(parent.is_timed_out());
    assert!(!child.is_timed_out());

    let cause = parent.unprocessed_cause().expect("cause");
    child.mark_unprocessed_shared(cause.clone());
    let propagated = child.unprocessed_cause().expect("propagated");
    assert!(std::sync::Arc::ptr_eq(&cause, &propagated));
}

#[test]
fn test_completed_context_rejects_writes() {
    let ctx = root();
    let key: AttributeKey<u8> = AttributeKey::new("k");
    ctx.complete();

    assert!(ctx.is_complete());
    let err = ctx.set_attribute(&key, 1).expect_err("completed");
    assert!(err.is_context());
    assert!(ctx.set_endpoint(Endpoint::of("x.example", 1)).is_err());
    assert!(ctx.attribute(&key).is_none());
}
