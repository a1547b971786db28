//! Redirect handling
//!
//! By default redirects are followed up to a chain of 10 hops. Every hop is
//! executed in a context derived from the previous one, and revisiting a
//! `(url, method)` pair fails the call instead of looping.

mod client;
mod headers;
mod navigator;
mod signature;

pub use client::RedirectingClient;
pub use navigator::{Navigation, RedirectNavigator, is_redirect};
pub use signature::{RedirectChain, RedirectSignature};
