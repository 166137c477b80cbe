//! A routing core built around poolable request contexts.
//!
//! An [`App`] owns an ordered stack of routes and a pool of contexts. Each request borrows
//! a context from the pool, runs the handlers of the matching routes through it, and hands
//! it back. Applications pick their context type: [`DefaultCtx`], or any type embedding a
//! [`BaseCtx`] and implementing [`CustomCtx`].
//!
//! Routes are registered with the fluent [`Registering`] returned by [`App::route`].

mod body;
mod config;
mod error;
mod handler;
mod method;
mod pool;
mod static_files;

pub mod app;
pub mod ctx;
pub mod router;

pub use app::App;
pub use app::AppBuilder;
pub use body::ResponseBody;
pub use config::{Config, ConfigError, DEFAULT_CTX_POOL_CAPACITY};
pub use ctx::{BaseCtx, Ctx, CustomCtx, DefaultCtx, MAX_PARAMS, Seal};
pub use error::{Error, RegisterError};
pub use handler::{ErrorHandler, Handler, HandlerResult, handler_fn};
pub use method::{METHOD_USE, MethodCode, MethodSet};
pub use router::{Registering, Route, RouteStack, get_group_path};
pub use static_files::{DirEntry, FileKind, FileSource, StaticConfig, TokioFs};
