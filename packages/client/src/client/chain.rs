//! Typed decorator pipeline

use std::sync::Arc;

use futures::future::BoxFuture;

use crate::context::RequestContext;

/// Something that executes a request within a context.
pub trait Client<Req, Res>: Send + Sync {
    fn execute(&self, ctx: RequestContext, req: Req) -> BoxFuture<'static, crate::Result<Res>>;
}

/// Wraps the rest of the pipeline.
///
/// A decorator may inspect or replace the request, derive new contexts, call
/// `next` any number of times, or fail without calling it at all.
pub trait Decorator<Req, Res>: Send + Sync {
    fn execute(
        &self,
        next: Next<Req, Res>,
        ctx: RequestContext,
        req: Req,
    ) -> BoxFuture<'static, crate::Result<Res>>;
}

impl<Req, Res, F> Decorator<Req, Res> for F
where
    F: Fn(Next<Req, Res>, RequestContext, Req) -> BoxFuture<'static, crate::Result<Res>>
        + Send
        + Sync,
{
    fn execute(
        &self,
        next: Next<Req, Res>,
        ctx: RequestContext,
        req: Req,
    ) -> BoxFuture<'static, crate::Result<Res>> {
        self(next, ctx, req)
    }
}

/// The remainder of the pipeline as seen by a decorator.
pub struct Next<Req, Res> {
    inner: Arc<dyn Client<Req, Res>>,
}

impl<Req, Res> Clone for Next<Req, Res> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<Req, Res> Next<Req, Res> {
    pub fn execute(&self, ctx: RequestContext, req: Req) -> BoxFuture<'static, crate::Result<Res>> {
        self.inner.execute(ctx, req)
    }
}

struct Decorated<Req, Res> {
    decorator: Arc<dyn Decorator<Req, Res>>,
    next: Next<Req, Res>,
}

impl<Req, Res> Client<Req, Res> for Decorated<Req, Res> {
    fn execute(&self, ctx: RequestContext, req: Req) -> BoxFuture<'static, crate::Result<Res>> {
        self.decorator.execute(self.next.clone(), ctx, req)
    }
}

/// Builder of a decorated client.
///
/// Decorators run in the order they were added: the first one added sees
/// the request first and the response last.
pub struct ClientChain<Req, Res> {
    terminal: Arc<dyn Client<Req, Res>>,
    decorators: Vec<Arc<dyn Decorator<Req, Res>>>,
}

impl<Req: 'static, Res: 'static> ClientChain<Req, Res> {
    pub fn new<C: Client<Req, Res> + 'static>(terminal: C) -> Self {
        Self {
            terminal: Arc::new(terminal),
            decorators: Vec::new(),
        }
    }

    #[must_use]
    pub fn decorate<D: Decorator<Req, Res> + 'static>(mut self, decorator: D) -> Self {
        self.decorators.push(Arc::new(decorator));
        self
    }

    pub fn build(self) -> Arc<dyn Client<Req, Res>> {
        self.decorators
            .into_iter()
            .rev()
            .fold(self.terminal, |next, decorator| {
                Arc::new(Decorated {
                    decorator,
                    next: Next { inner: next },
                }) as Arc<dyn Client<Req, Res>>
            })
    }
}
