//! The application: route registration, the context pool and request dispatch.
//!
//! An [`App`] is cheap to clone, all clones share the same routes and pool. Routes are
//! registered before serving; each registration publishes a new route stack, and a request
//! keeps the stack it started with until its context is released.
//!
//! ```
//! use bytes::Bytes;
//! use http::{Request, StatusCode};
//! use micro_app::{App, Ctx, DefaultCtx};
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), micro_app::RegisterError> {
//! let app = App::new();
//! app.route("/hello/{name}").get(
//!     |c: &mut DefaultCtx| {
//!         Box::pin(async move {
//!             let greeting = format!("hello {}", c.param("name").unwrap_or("world"));
//!             c.send_string(greeting)
//!         })
//!     },
//!     &[],
//! )?;
//!
//! let response = app.handle(Request::get("/hello/Ferris").body(Bytes::new()).unwrap()).await;
//! assert_eq!(response.status(), StatusCode::OK);
//! assert_eq!(response.body().as_bytes(), b"hello Ferris");
//! # Ok(())
//! # }
//! ```

mod builder;
pub(crate) mod dispatch;

pub use builder::AppBuilder;

use crate::body::ResponseBody;
use crate::config::Config;
use crate::ctx::{CustomCtx, DefaultCtx, Seal};
use crate::error::RegisterError;
use crate::handler::{ErrorHandler, Handler, HandlerResult, handler_fn};
use crate::method::{MethodCode, MethodSet};
use crate::pool::CtxPool;
use crate::router::{Registering, Route, RouteStack, get_group_path};
use crate::static_files::{StaticConfig, StaticMount, TokioFs};
use arc_swap::ArcSwap;
use bytes::Bytes;
use futures::future::BoxFuture;
use http::header::SERVER;
use http::{HeaderValue, Method, Request, Response};
use std::fmt;
use std::path::PathBuf;
use std::sync::{Arc, Weak};
use tracing::{debug, error, trace, warn};

macro_rules! app_method {
    ($method:ident, $code:ident, $name:literal) => {
        #[doc = concat!("Registers a route answering `", $name, "` requests on `path`.")]
        ///
        /// # Errors
        /// Fails when the path is not a valid pattern.
        pub fn $method<F>(&self, path: &str, handler: F, middleware: &[Handler<C>]) -> Result<&Self, RegisterError>
        where
            F: for<'c> Fn(&'c mut C) -> BoxFuture<'c, HandlerResult> + Send + Sync + 'static,
        {
            self.add(&[MethodCode::$code.as_str()], path, handler, middleware)
        }
    };
}

pub(crate) type NewCtxFunc<C> = Box<dyn Fn(&App<C>) -> C + Send + Sync>;

pub(crate) struct AppInner<C> {
    config: Arc<Config>,
    server_header: Option<HeaderValue>,
    stack: ArcSwap<RouteStack<C>>,
    pool: CtxPool<C>,
    new_ctx_func: Option<NewCtxFunc<C>>,
    error_handler: ErrorHandler<C>,
}

/// An application generic over its context type.
pub struct App<C> {
    inner: Arc<AppInner<C>>,
}

impl App<DefaultCtx> {
    /// An application with the default config and [`DefaultCtx`] contexts.
    pub fn new() -> Self {
        Self::builder().build()
    }
}

impl Default for App<DefaultCtx> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C> App<C> {
    pub(crate) fn from_inner(inner: Arc<AppInner<C>>) -> Self {
        Self { inner }
    }

    pub(crate) fn downgrade(&self) -> Weak<AppInner<C>> {
        Arc::downgrade(&self.inner)
    }

    pub(crate) fn shared_config(&self) -> &Arc<Config> {
        &self.inner.config
    }

    pub fn config(&self) -> &Config {
        &self.inner.config
    }

    /// A snapshot of the registered routes in registration order.
    pub fn stack(&self) -> Arc<RouteStack<C>> {
        self.inner.stack.load_full()
    }

    /// Number of contexts built so far, pooled or not.
    pub fn ctx_created(&self) -> usize {
        self.inner.pool.created()
    }

    /// Number of released contexts waiting for reuse.
    pub fn ctx_idle(&self) -> usize {
        self.inner.pool.idle()
    }
}

impl<C: CustomCtx> App<C> {
    pub fn builder() -> AppBuilder<C> {
        AppBuilder::new()
    }

    /// Builds a fresh context with the configured factory, or [`CustomCtx::from_app`].
    pub fn new_ctx(&self) -> Box<C> {
        let ctx = match &self.inner.new_ctx_func {
            Some(new_ctx_func) => new_ctx_func(self),
            None => C::from_app(self),
        };
        self.inner.pool.record_created();
        Box::new(ctx)
    }

    /// Takes a context from the pool, or builds one, and binds it to `request`.
    pub fn acquire_ctx(&self, request: Request<Bytes>) -> Box<C> {
        let mut ctx = self.inner.pool.pop().unwrap_or_else(|| {
            trace!(app = %self.inner.config.app_name, "context pool empty, building a new context");
            self.new_ctx()
        });

        let seal = &Seal::new();
        ctx.reset(seal, request);
        ctx.base_mut(seal).bind_stack(self.inner.stack.load_full());
        ctx
    }

    /// Clears a context and hands it back to the pool, dropping it when the pool is full.
    pub fn release_ctx(&self, mut ctx: Box<C>) {
        ctx.release(&Seal::new());
        if !self.inner.pool.push(ctx) {
            trace!(app = %self.inner.config.app_name, "context pool full, dropping context");
        }
    }

    /// Runs `request` through the routes and returns the response written by the handlers.
    ///
    /// Handler errors are turned into a response by the error handler; requests matching
    /// no route get `404`, or `405` with an `Allow` header when other methods match.
    ///
    /// The context goes back to the pool even when the returned future is dropped early or a
    /// handler panics.
    pub async fn handle(&self, request: Request<Bytes>) -> Response<ResponseBody> {
        let mut guard = ReleaseGuard { app: self, ctx: Some(self.acquire_ctx(request)) };
        let Some(ctx) = guard.ctx.as_deref_mut() else {
            unreachable!("context is only taken on drop");
        };

        if let Err(err) = dispatch::dispatch(ctx).await {
            let status = err.status();
            if status.is_server_error() {
                error!(cause = %err, method = %ctx.method(), path = ctx.path(), "request failed");
            } else {
                debug!(%status, method = %ctx.method(), path = ctx.path(), "request rejected");
            }
            (self.inner.error_handler)(ctx, err).await;
        }

        let head = *ctx.method() == Method::HEAD;
        let mut response = ctx.base_mut(&Seal::new()).take_response();
        drop(guard);

        if let Some(server) = &self.inner.server_header {
            response.headers_mut().entry(SERVER).or_insert_with(|| server.clone());
        }

        let (parts, body) = response.into_parts();
        let body = if head { ResponseBody::empty() } else { ResponseBody::once(body) };
        Response::from_parts(parts, body)
    }

    /// Returns a registrar bound to `path`.
    pub fn route(&self, path: &str) -> Registering<'_, C> {
        Registering::new(self, path.to_string())
    }

    /// Registers a route for several methods on `path`, `"USE"` matching every method.
    ///
    /// # Errors
    /// Fails on an empty or unknown method list, or when the path is not a valid pattern.
    pub fn add<S, F>(&self, methods: &[S], path: &str, handler: F, middleware: &[Handler<C>]) -> Result<&Self, RegisterError>
    where
        S: AsRef<str>,
        F: for<'c> Fn(&'c mut C) -> BoxFuture<'c, HandlerResult> + Send + Sync + 'static,
    {
        self.register(MethodSet::parse(methods)?, path, None, handler_fn(handler), middleware)?;
        Ok(self)
    }

    app_method!(get, Get, "GET");
    app_method!(head, Head, "HEAD");
    app_method!(post, Post, "POST");
    app_method!(put, Put, "PUT");
    app_method!(delete, Delete, "DELETE");
    app_method!(connect, Connect, "CONNECT");
    app_method!(options, Options, "OPTIONS");
    app_method!(trace, Trace, "TRACE");
    app_method!(patch, Patch, "PATCH");

    /// Registers a middleware route matching every method on `path` and every path below it.
    ///
    /// # Errors
    /// Fails when the path is not a valid pattern.
    pub fn all<F>(&self, path: &str, handler: F, middleware: &[Handler<C>]) -> Result<&Self, RegisterError>
    where
        F: for<'c> Fn(&'c mut C) -> BoxFuture<'c, HandlerResult> + Send + Sync + 'static,
    {
        self.register(MethodSet::ALL, path, None, handler_fn(handler), middleware)?;
        Ok(self)
    }

    /// Appends a route to the stack. `middleware` runs before `handler`, in order.
    ///
    /// An empty path registers `/`, a path without a leading slash gets one.
    ///
    /// # Errors
    /// Fails when the path is not a valid pattern or declares too many params.
    pub fn register(
        &self,
        methods: MethodSet,
        path: &str,
        group: Option<&str>,
        handler: Handler<C>,
        middleware: &[Handler<C>],
    ) -> Result<(), RegisterError> {
        if methods.is_empty() {
            return Err(RegisterError::EmptyMethods);
        }

        let path = match path {
            "" => "/".to_string(),
            path if path.starts_with('/') => path.to_string(),
            path => format!("/{path}"),
        };

        let mut handlers = Vec::with_capacity(middleware.len() + 1);
        handlers.extend(middleware.iter().cloned());
        handlers.push(handler);

        let route = Arc::new(Route::new(methods, path, group.map(str::to_string), handlers, &self.inner.config)?);
        debug!(methods = %route.methods(), path = route.path(), handlers = route.handlers().len(), "route registered");

        self.inner.stack.rcu(|stack| {
            let mut next = RouteStack::clone(stack);
            next.push(Arc::clone(&route));
            next
        });
        Ok(())
    }

    /// Serves files under `root` on `prefix` and every path below it, for `GET` and `HEAD`.
    ///
    /// # Errors
    /// Fails when the prefix is not a valid pattern.
    pub fn register_static<P: Into<PathBuf>>(
        &self,
        prefix: &str,
        root: P,
        config: Option<StaticConfig>,
    ) -> Result<(), RegisterError> {
        let mount = StaticMount::new(prefix, root.into(), config.unwrap_or_default(), Arc::new(TokioFs));
        debug!(prefix, root = %mount.root().display(), "static files registered");

        let handler = mount.into_handler();
        let methods = MethodSet::of(MethodCode::Get).with(MethodCode::Head);
        self.register(methods, prefix, Some(prefix), Arc::clone(&handler), &[])?;
        self.register(methods, &get_group_path(prefix, "/{*filepath}"), Some(prefix), handler, &[])
    }
}

/// Releases the context it holds when dropped.
struct ReleaseGuard<'app, C: CustomCtx> {
    app: &'app App<C>,
    ctx: Option<Box<C>>,
}

impl<C: CustomCtx> Drop for ReleaseGuard<'_, C> {
    fn drop(&mut self) {
        if let Some(ctx) = self.ctx.take() {
            self.app.release_ctx(ctx);
        }
    }
}

impl<C> Clone for App<C> {
    fn clone(&self) -> Self {
        Self { inner: Arc::clone(&self.inner) }
    }
}

impl<C> fmt::Debug for App<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("App")
            .field("config", &self.inner.config)
            .field("routes", &self.inner.stack.load().len())
            .field("pool", &self.inner.pool)
            .finish_non_exhaustive()
    }
}

impl<C> AppInner<C> {
    fn new(
        config: Config,
        new_ctx_func: Option<NewCtxFunc<C>>,
        error_handler: ErrorHandler<C>,
    ) -> Self {
        let server_header = config.server_header.as_deref().and_then(|value| match HeaderValue::from_str(value) {
            Ok(value) => Some(value),
            Err(e) => {
                warn!(cause = %e, value, "ignore invalid server header");
                None
            }
        });

        Self {
            pool: CtxPool::new(config.ctx_pool_capacity),
            config: Arc::new(config),
            server_header,
            stack: ArcSwap::from_pointee(RouteStack::default()),
            new_ctx_func,
            error_handler,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Ctx, Error};
    use futures::FutureExt;
    use futures::future;
    use http::StatusCode;
    use std::panic::AssertUnwindSafe;

    fn request(method: Method, uri: &str) -> Request<Bytes> {
        Request::builder().method(method).uri(uri).body(Bytes::new()).unwrap()
    }

    #[test]
    fn test_acquire_reuses_released_context() {
        let app = App::new();

        let ctx = app.acquire_ctx(request(Method::GET, "/a"));
        let first: *const DefaultCtx = &*ctx;
        app.release_ctx(ctx);
        assert_eq!(app.ctx_idle(), 1);

        let ctx = app.acquire_ctx(request(Method::POST, "/b"));
        assert_eq!(&*ctx as *const DefaultCtx, first);
        assert_eq!(ctx.path(), "/b");
        assert_eq!(ctx.method_code(), Some(MethodCode::Post));
        assert_eq!(app.ctx_created(), 1);
        app.release_ctx(ctx);
    }

    #[test]
    fn test_pool_capacity_bounds_idle_contexts() {
        let app = App::<DefaultCtx>::builder().ctx_pool_capacity(2).build();
        let contexts: Vec<_> = (0..4).map(|_| app.acquire_ctx(request(Method::GET, "/"))).collect();
        assert_eq!(app.ctx_created(), 4);

        for ctx in contexts {
            app.release_ctx(ctx);
        }
        assert_eq!(app.ctx_idle(), 2);
    }

    #[test]
    fn test_register_normalizes_path() {
        let app = App::new();
        let noop = handler_fn(|_: &mut DefaultCtx| Box::pin(async { Ok(()) }));
        app.register(MethodSet::ALL, "", None, Arc::clone(&noop), &[]).unwrap();
        app.register(MethodSet::ALL, "users", Some("/api"), noop, &[]).unwrap();

        let stack = app.stack();
        assert_eq!(stack.get(0).unwrap().path(), "/");
        assert_eq!(stack.get(1).unwrap().path(), "/users");
        assert_eq!(stack.get(1).unwrap().group(), Some("/api"));
    }

    #[tokio::test]
    async fn test_verb_shortcuts() {
        let app = App::new();
        app.get("/item", |c: &mut DefaultCtx| Box::pin(async move { c.send_string("read") }), &[])
            .and_then(|app| app.put("/item", |c: &mut DefaultCtx| Box::pin(async move { c.send_string("write") }), &[]))
            .unwrap();

        assert_eq!(app.handle(request(Method::GET, "/item")).await.body().as_bytes(), b"read");
        assert_eq!(app.handle(request(Method::PUT, "/item")).await.body().as_bytes(), b"write");
        assert_eq!(app.stack().len(), 2);
    }

    #[test]
    fn test_register_rejects_empty_methods() {
        let app = App::new();
        let noop = handler_fn(|_: &mut DefaultCtx| Box::pin(async { Ok(()) }));
        assert!(matches!(app.register(MethodSet::EMPTY, "/", None, noop, &[]), Err(RegisterError::EmptyMethods)));
    }

    #[test]
    fn test_context_keeps_stack_of_its_request() {
        let app = App::new();
        let ctx = app.acquire_ctx(request(Method::GET, "/"));
        app.all("/late", |_: &mut DefaultCtx| Box::pin(async { Ok(()) }), &[]).unwrap();

        assert!(ctx.base().stack().unwrap().is_empty());
        assert_eq!(app.stack().len(), 1);
        app.release_ctx(ctx);
    }

    #[tokio::test]
    async fn test_handle_adds_server_header_and_strips_head_body() {
        let app = App::<DefaultCtx>::builder().server_header("micro-app").build();
        app.add(&["GET", "HEAD"], "/", |c: &mut DefaultCtx| Box::pin(async move { c.send_string("index") }), &[])
            .unwrap();

        let response = app.handle(request(Method::GET, "/")).await;
        assert_eq!(response.headers().get(SERVER).unwrap(), "micro-app");
        assert_eq!(response.body().as_bytes(), b"index");

        let response = app.handle(request(Method::HEAD, "/")).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.body().as_bytes().is_empty());
        assert_eq!(app.ctx_idle(), 1);
    }

    #[tokio::test]
    async fn test_handle_releases_context_on_error() {
        let app = App::new();
        app.all("/fail", |_: &mut DefaultCtx| Box::pin(async { Err(Error::internal("boom")) }), &[]).unwrap();

        let response = app.handle(request(Method::DELETE, "/fail")).await;
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(response.body().as_bytes(), b"boom");
        assert_eq!(app.ctx_idle(), 1);
    }
    #[test]
    fn test_dropped_request_returns_context_to_pool() {
        let app = App::new();
        app.route("/stall").get(|_: &mut DefaultCtx| Box::pin(future::pending::<HandlerResult>()), &[]).unwrap();

        assert!(app.handle(request(Method::GET, "/stall")).now_or_never().is_none());
        assert_eq!(app.ctx_created(), 1);
        assert_eq!(app.ctx_idle(), 1);

        let ctx = app.acquire_ctx(request(Method::GET, "/"));
        assert!(ctx.route().is_none());
        assert_eq!(app.ctx_created(), 1);
        app.release_ctx(ctx);
    }

    #[tokio::test]
    async fn test_panicking_handler_returns_context_to_pool() {
        let app = App::new();
        app.route("/panic")
            .get(|_: &mut DefaultCtx| Box::pin(future::lazy(|_| -> HandlerResult { panic!("handler panicked") })), &[])
            .unwrap();

        let result = AssertUnwindSafe(app.handle(request(Method::GET, "/panic"))).catch_unwind().await;
        assert!(result.is_err());
        assert_eq!(app.ctx_idle(), 1);
    }
}
