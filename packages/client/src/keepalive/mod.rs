//! Connection keep-alive
//!
//! [`KeepAliveHandler`] decides when to ping, when to give up on a silent
//! peer and when a connection should be recycled. [`KeepAliveDriver`] runs it
//! on a task against a [`KeepAliveConnection`].

mod driver;
mod handler;

pub use driver::{KeepAliveConnection, KeepAliveDriver, KeepAliveStatus};
pub use handler::{
    CloseReason, ConnectionState, KeepAliveAction, KeepAliveHandler, Protocol,
};
