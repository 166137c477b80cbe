use crate::ctx::Ctx;
use crate::error::Error;
use futures::future::BoxFuture;
use std::sync::Arc;

pub type HandlerResult = Result<(), Error>;

/// A request handler or middleware working on the application's context type `C`.
///
/// Handlers borrow the context for the duration of the returned future:
///
/// ```
/// use micro_app::{handler_fn, Ctx, DefaultCtx, Handler};
///
/// let ping: Handler<DefaultCtx> = handler_fn(|c: &mut DefaultCtx| Box::pin(async move { c.send_string("pong") }));
/// ```
pub type Handler<C> = Arc<dyn for<'c> Fn(&'c mut C) -> BoxFuture<'c, HandlerResult> + Send + Sync>;

/// Turns a handler error into a response written into the context.
pub type ErrorHandler<C> = Arc<dyn for<'c> Fn(&'c mut C, Error) -> BoxFuture<'c, ()> + Send + Sync>;

/// Wraps an async fn or closure into a shareable [`Handler`].
pub fn handler_fn<C, F>(f: F) -> Handler<C>
where
    F: for<'c> Fn(&'c mut C) -> BoxFuture<'c, HandlerResult> + Send + Sync + 'static,
{
    Arc::new(f)
}

/// Writes the error's status and message as a plain text response.
pub(crate) fn default_error_handler<C: Ctx>(ctx: &mut C, err: Error) -> BoxFuture<'_, ()> {
    Box::pin(async move {
        let status = err.status();
        let _ = ctx.status(status).send_string(err.to_string());
    })
}
