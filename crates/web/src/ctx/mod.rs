//! Request contexts and the two capability layers the framework works with.
//!
//! - [`Ctx`] is the public capability: request accessors, response writers, path params
//!   and continuation through [`Ctx::next`]. Handlers only ever need this.
//! - [`CustomCtx`] is the engine capability, a strict superset of [`Ctx`]: resetting a
//!   context against a new request, releasing it, and reading or writing the routing
//!   bookkeeping. Only types implementing it can back an [`App`].
//!
//! Both layers are backed by a [`BaseCtx`] embedded in the concrete type. Every method that
//! mutates engine state requires a [`Seal`], which only this crate can create, so handler
//! code can read the bookkeeping but never corrupt it.
//!
//! # Custom contexts
//!
//! ```
//! use bytes::Bytes;
//! use http::Request;
//! use micro_app::{App, BaseCtx, Ctx, CustomCtx, Seal};
//!
//! struct UserCtx {
//!     base: BaseCtx<UserCtx>,
//!     user_id: Option<u64>,
//! }
//!
//! impl Ctx for UserCtx {
//!     fn base(&self) -> &BaseCtx<Self> {
//!         &self.base
//!     }
//!
//!     fn base_mut(&mut self, _seal: &Seal) -> &mut BaseCtx<Self> {
//!         &mut self.base
//!     }
//! }
//!
//! impl CustomCtx for UserCtx {
//!     fn from_app(app: &App<Self>) -> Self {
//!         Self { base: BaseCtx::new(app), user_id: None }
//!     }
//!
//!     fn reset(&mut self, seal: &Seal, request: Request<Bytes>) {
//!         self.user_id = None;
//!         self.base.reset(seal, request);
//!     }
//! }
//!
//! let app = App::<UserCtx>::builder().build();
//! ```

mod base;
mod default_ctx;

pub use base::{BaseCtx, MAX_PARAMS};
pub use default_ctx::DefaultCtx;

use crate::app::{self, App};
use crate::config::Config;
use crate::handler::HandlerResult;
use crate::method::MethodCode;
use crate::router::Route;
use bytes::Bytes;
use futures::future::BoxFuture;
use http::header::AsHeaderName;
use http::{HeaderMap, HeaderName, HeaderValue, Method, Request, StatusCode, Uri};
use mime::Mime;
use serde::Serialize;
use std::fmt;
use std::sync::Arc;

/// Proof that a call comes from the dispatch engine.
///
/// Required by every method that mutates engine-owned state. It cannot be constructed
/// outside this crate, and is only ever lent out by reference.
///
/// ```compile_fail
/// fn keep(seal: &micro_app::Seal) -> micro_app::Seal {
///     *seal
/// }
/// ```
pub struct Seal(());

impl Seal {
    #[inline]
    pub(crate) const fn new() -> Self {
        Seal(())
    }
}

impl fmt::Debug for Seal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Seal")
    }
}

/// The public capability of a request context.
pub trait Ctx: Send + Sized + 'static {
    fn base(&self) -> &BaseCtx<Self>;

    fn base_mut(&mut self, seal: &Seal) -> &mut BaseCtx<Self>;

    /// The owning application, `None` once it has been dropped.
    fn app(&self) -> Option<App<Self>> {
        self.base().app()
    }

    fn config(&self) -> &Config {
        self.base().config()
    }

    fn method(&self) -> &Method {
        self.base().request().method()
    }

    /// The request path as received, before normalization.
    fn path(&self) -> &str {
        self.base().path_original()
    }

    fn original_url(&self) -> &Uri {
        self.base().request().uri()
    }

    fn headers(&self) -> &HeaderMap {
        self.base().request().headers()
    }

    /// Returns a request header as a string, `None` if absent or not visible ASCII.
    fn get<K: AsHeaderName>(&self, key: K) -> Option<&str> {
        self.headers().get(key).and_then(|value| value.to_str().ok())
    }

    fn body(&self) -> &Bytes {
        self.base().request().body()
    }

    /// Returns the raw value of a query string parameter.
    fn query(&self, key: &str) -> Option<&str> {
        self.original_url().query()?.split('&').find_map(|pair| {
            let (name, value) = pair.split_once('=').unwrap_or((pair, ""));
            (name == key).then_some(value)
        })
    }

    /// Returns a path parameter of the matched route by name.
    fn param(&self, name: &str) -> Option<&str> {
        let position = self.route()?.params().iter().position(|param| param == name)?;
        self.base().values().get(position).map(String::as_str)
    }

    /// Iterates the `(name, value)` path parameters of the matched route.
    fn params(&self) -> impl Iterator<Item = (&str, &str)> {
        let names = self.route().map_or(&[][..], Route::params);
        names.iter().map(String::as_str).zip(self.base().values().iter().map(String::as_str))
    }

    /// Returns a value stored by an earlier handler of this request.
    fn local<T: Send + Sync + 'static>(&self) -> Option<&T> {
        self.base().locals().get::<T>()
    }

    /// Stores a value for later handlers of this request, returning the previous one.
    fn set_local<T: Clone + Send + Sync + 'static>(&mut self, value: T) -> Option<T> {
        self.base_mut(&Seal::new()).locals_mut().insert(value)
    }

    /// The route currently executing, if any matched.
    fn route(&self) -> Option<&Route<Self>> {
        self.base().route().map(Arc::as_ref)
    }

    fn status(&mut self, status: StatusCode) -> &mut Self {
        *self.base_mut(&Seal::new()).response_mut().status_mut() = status;
        self
    }

    /// Sets a response header, replacing previous values.
    fn set(&mut self, key: HeaderName, value: HeaderValue) -> &mut Self {
        self.base_mut(&Seal::new()).response_mut().headers_mut().insert(key, value);
        self
    }

    /// Appends a response header, keeping previous values.
    fn append(&mut self, key: HeaderName, value: HeaderValue) -> &mut Self {
        self.base_mut(&Seal::new()).response_mut().headers_mut().append(key, value);
        self
    }

    /// Sets the `Content-Type` response header.
    ///
    /// # Errors
    /// Fails when the mime type is not a valid header value.
    fn content_type(&mut self, mime: &Mime) -> HandlerResult {
        let value = HeaderValue::from_str(mime.as_ref())?;
        self.set(http::header::CONTENT_TYPE, value);
        Ok(())
    }

    /// Replaces the response body.
    ///
    /// # Errors
    /// Never fails; returns a result so handlers can end with it.
    fn send<B: Into<Bytes>>(&mut self, body: B) -> HandlerResult {
        *self.base_mut(&Seal::new()).response_mut().body_mut() = body.into();
        Ok(())
    }

    /// Replaces the response body with plain text.
    ///
    /// # Errors
    /// Never fails in practice; see [`Ctx::content_type`].
    fn send_string<S: Into<String>>(&mut self, body: S) -> HandlerResult {
        self.content_type(&mime::TEXT_PLAIN_UTF_8)?;
        self.send(body.into())
    }

    /// Sets the status and, when no body was written yet, its canonical reason as body.
    ///
    /// # Errors
    /// Never fails in practice; see [`Ctx::content_type`].
    fn send_status(&mut self, status: StatusCode) -> HandlerResult {
        self.status(status);
        if self.response_body().is_empty() {
            return self.send_string(status.canonical_reason().unwrap_or_default());
        }
        Ok(())
    }

    /// Serializes `value` as the JSON response body.
    ///
    /// # Errors
    /// Fails when `value` cannot be serialized.
    fn json<T: Serialize + ?Sized>(&mut self, value: &T) -> HandlerResult {
        let body = serde_json::to_vec(value)?;
        self.content_type(&mime::APPLICATION_JSON)?;
        self.send(body)
    }

    fn response_status(&self) -> StatusCode {
        self.base().response().status()
    }

    fn response_headers(&self) -> &HeaderMap {
        self.base().response().headers()
    }

    fn response_body(&self) -> &Bytes {
        self.base().response().body()
    }

    /// Runs the next handler of the current route, or the next route matching the request.
    ///
    /// # Errors
    /// Returns a not found error when the chain is exhausted, and propagates handler errors.
    fn next(&mut self) -> BoxFuture<'_, HandlerResult>
    where
        Self: CustomCtx,
    {
        app::dispatch::next(self)
    }
}

/// The engine capability of a request context.
///
/// The provided implementations delegate to the embedded [`BaseCtx`]. Custom types
/// override [`reset`](CustomCtx::reset) and [`release`](CustomCtx::release) to clear their
/// own fields, and must keep delegating to the base.
pub trait CustomCtx: Ctx {
    /// Builds a context for `app` when no custom factory is configured.
    fn from_app(app: &App<Self>) -> Self;

    /// Binds the context to a new request, clearing all bookkeeping.
    fn reset(&mut self, seal: &Seal, request: Request<Bytes>) {
        self.base_mut(seal).reset(seal, request);
    }

    /// Drops per-request references before the context goes back to the pool.
    fn release(&mut self, seal: &Seal) {
        self.base_mut(seal).release(seal);
    }

    fn method_code(&self) -> Option<MethodCode> {
        self.base().method_code()
    }

    fn index_route(&self) -> Option<usize> {
        self.base().index_route()
    }

    fn index_handler(&self) -> usize {
        self.base().index_handler()
    }

    fn tree_path(&self) -> &str {
        self.base().tree_path()
    }

    fn detection_path(&self) -> &str {
        self.base().detection_path()
    }

    fn path_original(&self) -> &str {
        self.base().path_original()
    }

    fn values(&self) -> &[String] {
        self.base().values()
    }

    fn matched(&self) -> bool {
        self.base().matched()
    }

    fn set_index_handler(&mut self, seal: &Seal, index: usize) {
        self.base_mut(seal).set_index_handler(index);
    }

    fn set_index_route(&mut self, seal: &Seal, index: usize) {
        self.base_mut(seal).set_index_route(index);
    }

    fn set_matched(&mut self, seal: &Seal, matched: bool) {
        self.base_mut(seal).set_matched(matched);
    }

    fn set_route(&mut self, seal: &Seal, route: Arc<Route<Self>>) {
        self.base_mut(seal).set_route(route);
    }
}
