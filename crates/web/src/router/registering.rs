use crate::app::App;
use crate::ctx::CustomCtx;
use crate::error::RegisterError;
use crate::handler::{Handler, HandlerResult, handler_fn};
use crate::method::{MethodCode, MethodSet};
use crate::router::get_group_path;
use crate::static_files::StaticConfig;
use futures::future::BoxFuture;
use std::fmt;
use std::path::PathBuf;

/// A fluent registrar bound to one path of an application.
///
/// Every registration forwards to the application with this path. [`route`](Self::route)
/// derives a registrar for a sub path and leaves this one untouched.
///
/// ```
/// use micro_app::{App, Ctx, DefaultCtx};
///
/// # fn main() -> Result<(), micro_app::RegisterError> {
/// let app = App::new();
/// let api = app.route("/api");
///
/// api.all(|c: &mut DefaultCtx| Box::pin(async move { c.next().await }), &[])?
///     .route("/users")
///     .get(|c: &mut DefaultCtx| Box::pin(async move { c.send_string("users") }), &[])?
///     .post(|c: &mut DefaultCtx| Box::pin(async move { c.send_string("created") }), &[])?;
///
/// assert_eq!(app.stack().len(), 3);
/// # Ok(())
/// # }
/// ```
pub struct Registering<'app, C> {
    app: &'app App<C>,
    path: String,
}

macro_rules! registering_method {
    ($method:ident, $code:ident, $name:literal) => {
        #[doc = concat!("Registers a route answering `", $name, "` requests on this path.")]
        ///
        /// # Errors
        /// Fails when the path is not a valid pattern.
        pub fn $method<F>(&self, handler: F, middleware: &[Handler<C>]) -> Result<&Self, RegisterError>
        where
            F: for<'c> Fn(&'c mut C) -> BoxFuture<'c, HandlerResult> + Send + Sync + 'static,
        {
            self.add(&[MethodCode::$code.as_str()], handler, middleware)
        }
    };
}

impl<'app, C: CustomCtx> Registering<'app, C> {
    pub(crate) fn new(app: &'app App<C>, path: String) -> Self {
        Self { app, path }
    }

    /// The path every registration of this registrar uses.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Registers a middleware route matching every method on this path and every path below it.
    ///
    /// # Errors
    /// Fails when the path is not a valid pattern.
    pub fn all<F>(&self, handler: F, middleware: &[Handler<C>]) -> Result<&Self, RegisterError>
    where
        F: for<'c> Fn(&'c mut C) -> BoxFuture<'c, HandlerResult> + Send + Sync + 'static,
    {
        self.app.register(MethodSet::ALL, &self.path, None, handler_fn(handler), middleware)?;
        Ok(self)
    }

    registering_method!(get, Get, "GET");
    registering_method!(head, Head, "HEAD");
    registering_method!(post, Post, "POST");
    registering_method!(put, Put, "PUT");
    registering_method!(delete, Delete, "DELETE");
    registering_method!(connect, Connect, "CONNECT");
    registering_method!(options, Options, "OPTIONS");
    registering_method!(trace, Trace, "TRACE");
    registering_method!(patch, Patch, "PATCH");

    /// Registers a route for several methods at once, `"USE"` matching every method.
    ///
    /// # Errors
    /// Fails on an empty or unknown method list, or when the path is not a valid pattern.
    pub fn add<S, F>(&self, methods: &[S], handler: F, middleware: &[Handler<C>]) -> Result<&Self, RegisterError>
    where
        S: AsRef<str>,
        F: for<'c> Fn(&'c mut C) -> BoxFuture<'c, HandlerResult> + Send + Sync + 'static,
    {
        let methods = MethodSet::parse(methods)?;
        self.app.register(methods, &self.path, None, handler_fn(handler), middleware)?;
        Ok(self)
    }

    /// Serves the files under `root` on this path.
    ///
    /// # Errors
    /// Fails when the path cannot be extended with the file parameter.
    pub fn static_files<P: Into<PathBuf>>(&self, root: P, config: Option<StaticConfig>) -> Result<&Self, RegisterError> {
        self.app.register_static(&self.path, root, config)?;
        Ok(self)
    }

    /// Returns a registrar for `path` nested under this one.
    #[must_use]
    pub fn route(&self, path: &str) -> Registering<'app, C> {
        Registering { app: self.app, path: get_group_path(&self.path, path) }
    }
}

impl<C> fmt::Debug for Registering<'_, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registering").field("path", &self.path).finish_non_exhaustive()
    }
}
