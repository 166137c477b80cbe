//! Walks the route stack for a context.
//!
//! A request runs the handlers of the first matching route in order. When the last handler
//! of a route calls [`Ctx::next`], matching resumes after that route, so a wildcard
//! middleware route can hand over to the endpoint registered after it.

use crate::ctx::{CustomCtx, Seal};
use crate::error::Error;
use crate::handler::{Handler, HandlerResult};
use crate::method::MethodSet;
use futures::future::{self, BoxFuture};
use http::HeaderValue;
use http::header::ALLOW;
use std::sync::Arc;
use tracing::debug;

/// Starts dispatching a freshly acquired context.
pub(crate) fn dispatch<C: CustomCtx>(ctx: &mut C) -> BoxFuture<'_, HandlerResult> {
    if ctx.method_code().is_none() {
        debug!(method = %ctx.method(), path = ctx.path(), "unsupported method");
        return Box::pin(future::ready(Err(Error::not_implemented())));
    }

    match match_route(ctx, 0) {
        Some(handler) => handler(ctx),
        None => {
            let err = unmatched(ctx);
            Box::pin(future::ready(Err(err)))
        }
    }
}

/// Runs the next handler of the current route, or the first handler of the next matching route.
pub(crate) fn next<C: CustomCtx>(ctx: &mut C) -> BoxFuture<'_, HandlerResult> {
    let seal = &Seal::new();
    let index_handler = ctx.index_handler() + 1;
    ctx.set_index_handler(seal, index_handler);

    let handler = ctx.route().and_then(|route| route.handlers().get(index_handler)).cloned();
    if let Some(handler) = handler {
        return handler(ctx);
    }

    let start = ctx.index_route().map_or(0, |index| index + 1);
    match match_route(ctx, start) {
        Some(handler) => handler(ctx),
        None => {
            let err = Error::not_found(format!("Cannot {} {}", ctx.method(), ctx.path()));
            Box::pin(future::ready(Err(err)))
        }
    }
}

/// Finds the first route from `start` matching the request and makes it current.
fn match_route<C: CustomCtx>(ctx: &mut C, start: usize) -> Option<Handler<C>> {
    let stack = Arc::clone(ctx.base().stack()?);
    let seal = &Seal::new();

    for (index, route) in stack.iter().enumerate().skip(start) {
        if !ctx.base_mut(seal).capture(route) {
            continue;
        }

        ctx.set_index_route(seal, index);
        ctx.set_index_handler(seal, 0);
        ctx.set_matched(seal, true);
        ctx.set_route(seal, Arc::clone(route));
        return route.handlers().first().cloned();
    }

    None
}

/// Builds the error for a request no route matched: `405` when the path is served for
/// other methods, `404` otherwise.
fn unmatched<C: CustomCtx>(ctx: &mut C) -> Error {
    let allowed = ctx.base().stack().map_or(MethodSet::EMPTY, |stack| {
        stack
            .iter()
            .filter(|route| route.accepts(ctx.detection_path()))
            .fold(MethodSet::EMPTY, |allowed, route| allowed.union(route.methods()))
    });

    if allowed.is_empty() {
        debug!(method = %ctx.method(), path = ctx.path(), "no route matched");
        return Error::not_found(format!("Cannot {} {}", ctx.method(), ctx.path()));
    }

    debug!(method = %ctx.method(), path = ctx.path(), %allowed, "method not allowed");
    if let Ok(value) = HeaderValue::try_from(allowed.to_string()) {
        ctx.set(ALLOW, value);
    }
    Error::method_not_allowed()
}
