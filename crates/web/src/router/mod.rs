//! Route registration entries and the ordered stack the dispatch engine walks.
//!
//! Every route owns a small [`matchit`] matcher compiled from its normalized pattern.
//! Routes are tried in registration order, so a route registered first always wins, and
//! [`Ctx::next`](crate::Ctx::next) can continue into the next route matching the request.
//!
//! Routes registered for every method act as middleware mounts: besides their own path they
//! match every path below it, so `/api` also answers `/api/users` but not `/apis`.
//!
//! Patterns use the matchit syntax: `{name}` captures one segment, `{*name}` captures the
//! rest of the path, `{{` and `}}` are literal braces.

mod path;
mod registering;

pub use path::get_group_path;
pub(crate) use path::{normalize_path, normalize_path_into};
pub use registering::Registering;

use crate::config::Config;
use crate::ctx::MAX_PARAMS;
use crate::error::RegisterError;
use crate::handler::Handler;
use crate::method::MethodSet;
use std::fmt;
use std::sync::Arc;

type Matcher = matchit::Router<()>;

/// Catch-all param appended to middleware mounts, never exposed as a route param.
const MOUNT_TAIL: &str = "__mount_tail";

/// A registered route: the verbs and pattern it answers to, and its handler chain.
pub struct Route<C> {
    methods: MethodSet,
    path: String,
    group: Option<String>,
    params: Vec<String>,
    handlers: Vec<Handler<C>>,
    matcher: Matcher,
}

impl<C> Route<C> {
    /// Compiles a route. `handlers` runs in order, middleware first.
    ///
    /// # Errors
    /// Fails when the pattern is malformed or declares more than [`MAX_PARAMS`] params.
    pub(crate) fn new(
        methods: MethodSet,
        path: String,
        group: Option<String>,
        handlers: Vec<Handler<C>>,
        config: &Config,
    ) -> Result<Self, RegisterError> {
        if !path.starts_with('/') {
            return Err(RegisterError::invalid_path(path, "must start with '/'"));
        }

        let params = parse_params(&path)?;
        if params.len() > MAX_PARAMS {
            return Err(RegisterError::TooManyParams { count: params.len(), max: MAX_PARAMS, path });
        }

        let pattern = normalize_path(&path, config);
        let tail = (methods.is_all() && !pattern.contains("{*")).then(|| mount_tail(&pattern));

        let mut matcher = Matcher::new();
        for pattern in std::iter::once(pattern).chain(tail) {
            if let Err(source) = matcher.insert(pattern, ()) {
                return Err(RegisterError::Insert { path, source });
            }
        }

        Ok(Self { methods, path, group, params, handlers, matcher })
    }

    #[inline]
    pub fn methods(&self) -> MethodSet {
        self.methods
    }

    /// The pattern as registered, including group prefixes.
    #[inline]
    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn group(&self) -> Option<&str> {
        self.group.as_deref()
    }

    /// Parameter names in pattern order.
    pub fn params(&self) -> &[String] {
        &self.params
    }

    pub fn handlers(&self) -> &[Handler<C>] {
        &self.handlers
    }

    /// Whether the pattern accepts an already normalized path, ignoring methods.
    pub fn accepts(&self, detection_path: &str) -> bool {
        self.matcher.at(detection_path).is_ok()
    }

    pub(crate) fn matcher(&self) -> &Matcher {
        &self.matcher
    }
}

impl<C> fmt::Debug for Route<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Route")
            .field("methods", &self.methods)
            .field("path", &self.path)
            .field("group", &self.group)
            .field("params", &self.params)
            .field("handlers", &self.handlers.len())
            .finish()
    }
}

fn mount_tail(pattern: &str) -> String {
    let sep = if pattern.ends_with('/') { "" } else { "/" };
    format!("{pattern}{sep}{{*{MOUNT_TAIL}}}")
}

/// The routes of an application in registration order.
pub struct RouteStack<C> {
    routes: Vec<Arc<Route<C>>>,
}

impl<C> RouteStack<C> {
    pub(crate) fn push(&mut self, route: Arc<Route<C>>) {
        self.routes.push(route);
    }

    #[inline]
    pub fn get(&self, index: usize) -> Option<&Arc<Route<C>>> {
        self.routes.get(index)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.routes.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<Route<C>>> {
        self.routes.iter()
    }
}

impl<C> Default for RouteStack<C> {
    fn default() -> Self {
        Self { routes: Vec::new() }
    }
}

impl<C> Clone for RouteStack<C> {
    fn clone(&self) -> Self {
        Self { routes: self.routes.clone() }
    }
}

impl<C> fmt::Debug for RouteStack<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.routes.iter()).finish()
    }
}

/// Extracts parameter names from a pattern, `{*rest}` yields `rest`.
fn parse_params(path: &str) -> Result<Vec<String>, RegisterError> {
    let mut params = Vec::new();
    let mut rest = path;

    while let Some(open) = rest.find(['{', '}']) {
        let tail = &rest[open..];
        if tail.starts_with("{{") || tail.starts_with("}}") {
            rest = &tail[2..];
            continue;
        }
        if tail.starts_with('}') {
            return Err(RegisterError::invalid_path(path, "unmatched '}'"));
        }

        let Some(close) = tail.find('}') else {
            return Err(RegisterError::invalid_path(path, "unclosed '{'"));
        };
        let name = tail[1..close].strip_prefix('*').unwrap_or(&tail[1..close]);
        if name.is_empty() {
            return Err(RegisterError::invalid_path(path, "empty parameter name"));
        }

        params.push(name.to_string());
        rest = &tail[close + 1..];
    }

    Ok(params)
}
