use futures::future::BoxFuture;

use super::navigator::{Navigation, RedirectNavigator};
use crate::client::{Decorator, Next};
use crate::config::RedirectConfig;
use crate::context::RequestContext;
use crate::http::{ClientRequest, ClientResponse};

/// Decorator following redirects through derived contexts.
#[derive(Debug, Clone, Default)]
pub struct RedirectingClient {
    navigator: RedirectNavigator,
}

impl RedirectingClient {
    pub fn new(config: RedirectConfig) -> Self {
        Self {
            navigator: RedirectNavigator::new(config),
        }
    }
}

impl Decorator<ClientRequest, ClientResponse> for RedirectingClient {
    fn execute(
        &self,
        next: Next<ClientRequest, ClientResponse>,
        ctx: RequestContext,
        req: ClientRequest,
    ) -> BoxFuture<'static, crate::Result<ClientResponse>> {
        let navigator = self.navigator.clone();
        Box::pin(async move {
            let mut ctx = ctx;
            let mut req = req;
            loop {
                let response = next.execute(ctx.clone(), req).await?;
                match navigator.next(&ctx, &response)? {
                    Navigation::Terminal => return Ok(response),
                    Navigation::Follow(child) => {
                        req = child.request().clone();
                        ctx = child;
                    }
                }
            }
        })
    }
}
