//! Request context propagation

mod attribute;
mod request_context;

pub use attribute::AttributeKey;
pub use request_context::{RequestContext, RequestContextBuilder, RequestId, Target};
