use crate::app::{App, AppInner, NewCtxFunc};
use crate::config::Config;
use crate::ctx::CustomCtx;
use crate::error::Error;
use crate::handler::{ErrorHandler, default_error_handler};
use futures::future::BoxFuture;
use std::fmt;
use std::sync::Arc;

/// Builds an [`App`], see [`App::builder`].
///
/// ```
/// use micro_app::{App, Config, DefaultCtx};
///
/// let app = App::<DefaultCtx>::builder()
///     .config(Config::default())
///     .case_sensitive(true)
///     .ctx_pool_capacity(128)
///     .new_ctx_func(DefaultCtx::new)
///     .build();
///
/// assert!(app.config().case_sensitive);
/// ```
pub struct AppBuilder<C> {
    config: Config,
    new_ctx_func: Option<NewCtxFunc<C>>,
    error_handler: Option<ErrorHandler<C>>,
}

impl<C: CustomCtx> AppBuilder<C> {
    pub(crate) fn new() -> Self {
        Self { config: Config::default(), new_ctx_func: None, error_handler: None }
    }

    /// Replaces the whole config, setters called afterwards still apply.
    pub fn config(mut self, config: Config) -> Self {
        self.config = config;
        self
    }

    pub fn app_name(mut self, app_name: impl Into<String>) -> Self {
        self.config.app_name = app_name.into();
        self
    }

    pub fn case_sensitive(mut self, case_sensitive: bool) -> Self {
        self.config.case_sensitive = case_sensitive;
        self
    }

    pub fn strict_routing(mut self, strict_routing: bool) -> Self {
        self.config.strict_routing = strict_routing;
        self
    }

    pub fn ctx_pool_capacity(mut self, capacity: usize) -> Self {
        self.config.ctx_pool_capacity = capacity;
        self
    }

    pub fn server_header(mut self, server_header: impl Into<String>) -> Self {
        self.config.server_header = Some(server_header.into());
        self
    }

    /// Sets the factory used whenever the pool has no context to hand out.
    pub fn new_ctx_func<F>(mut self, new_ctx_func: F) -> Self
    where
        F: Fn(&App<C>) -> C + Send + Sync + 'static,
    {
        self.new_ctx_func = Some(Box::new(new_ctx_func));
        self
    }

    /// Replaces the handler turning request errors into responses.
    pub fn error_handler<F>(mut self, error_handler: F) -> Self
    where
        F: for<'c> Fn(&'c mut C, Error) -> BoxFuture<'c, ()> + Send + Sync + 'static,
    {
        self.error_handler = Some(Arc::new(error_handler));
        self
    }

    pub fn build(self) -> App<C> {
        let error_handler = self.error_handler.unwrap_or_else(|| Arc::new(default_error_handler::<C>));
        App::from_inner(Arc::new(AppInner::new(self.config, self.new_ctx_func, error_handler)))
    }
}

impl<C> fmt::Debug for AppBuilder<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppBuilder")
            .field("config", &self.config)
            .field("new_ctx_func", &self.new_ctx_func.is_some())
            .field("error_handler", &self.error_handler.is_some())
            .finish()
    }
}
