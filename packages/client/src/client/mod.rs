//! Client pipeline
//!
//! A pipeline is a chain of [`Decorator`]s in front of a terminal [`Client`],
//! usually an [`EndpointClient`] backed by a [`Transport`].

mod chain;
mod endpoint_client;
mod timeout;

pub use chain::{Client, ClientChain, Decorator, Next};
pub use endpoint_client::{EndpointClient, Transport};
pub use timeout::TimeoutDecorator;
