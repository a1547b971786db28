//! HTTP values exchanged with the transport
//!
//! Wire encoding lives behind [`crate::client::Transport`]; this module only
//! carries requests, responses and path helpers.

pub mod into_url;
pub mod path;
pub mod request;
pub mod response;

pub use into_url::IntoUrl;
pub use path::{append_query_params, concat_paths};
pub use request::ClientRequest;
pub use response::ClientResponse;
