use std::io;
use std::time::Duration;

use futures::future::BoxFuture;
use tracing::debug;

use super::chain::{Decorator, Next};
use crate::context::RequestContext;

/// Bounds the rest of the pipeline by a response timeout.
///
/// On expiry the context is flagged timed out and the call fails with an
/// error for which `is_timeout` holds.
#[derive(Debug, Clone, Copy)]
pub struct TimeoutDecorator {
    timeout: Duration,
}

impl TimeoutDecorator {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

impl<Req: Send + 'static, Res: Send + 'static> Decorator<Req, Res> for TimeoutDecorator {
    fn execute(
        &self,
        next: Next<Req, Res>,
        ctx: RequestContext,
        req: Req,
    ) -> BoxFuture<'static, crate::Result<Res>> {
        let timeout = self.timeout;
        Box::pin(async move {
            match tokio::time::timeout(timeout, next.execute(ctx.clone(), req)).await {
                Ok(result) => result,
                Err(_) => {
                    debug!("context {} timed out after {:?}", ctx.id(), timeout);
                    ctx.set_timed_out();
                    Err(crate::error::transport(io::Error::new(
                        io::ErrorKind::TimedOut,
                        format!("response not received within {timeout:?}"),
                    ))
                    .with_url(ctx.request().url().clone()))
                }
            }
        })
    }
}
