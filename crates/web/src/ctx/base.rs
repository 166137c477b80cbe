use crate::app::{App, AppInner};
use crate::config::Config;
use crate::ctx::Seal;
use crate::method::MethodCode;
use crate::router::{Route, RouteStack, normalize_path_into};
use bytes::Bytes;
use http::{Extensions, Request, Response};
use std::fmt;
use std::sync::{Arc, Weak};

/// Capacity of the path parameter slots of a context.
pub const MAX_PARAMS: usize = 30;

/// The state every context carries: the bound request, the response being written and
/// the routing bookkeeping of the dispatch engine.
///
/// Reading is open to everyone. Writing engine fields is limited to this crate, and
/// [`reset`](BaseCtx::reset) / [`release`](BaseCtx::release) require a [`Seal`].
pub struct BaseCtx<C> {
    app: Weak<AppInner<C>>,
    config: Arc<Config>,

    request: Request<Bytes>,
    response: Response<Bytes>,
    locals: Extensions,

    method_code: Option<MethodCode>,
    index_route: Option<usize>,
    index_handler: usize,
    tree_path: String,
    detection_path: String,
    path_original: String,
    values: [String; MAX_PARAMS],
    value_count: usize,
    matched: bool,
    route: Option<Arc<Route<C>>>,
    stack: Option<Arc<RouteStack<C>>>,
}

impl<C> BaseCtx<C> {
    pub fn new(app: &App<C>) -> Self {
        Self {
            app: app.downgrade(),
            config: Arc::clone(app.shared_config()),
            request: Request::default(),
            response: Response::default(),
            locals: Extensions::new(),
            method_code: None,
            index_route: None,
            index_handler: 0,
            tree_path: String::new(),
            detection_path: String::new(),
            path_original: String::new(),
            values: std::array::from_fn(|_| String::new()),
            value_count: 0,
            matched: false,
            route: None,
            stack: None,
        }
    }

    /// Binds a new request and clears every bookkeeping field.
    ///
    /// String buffers are cleared in place, their capacity is reused.
    pub fn reset(&mut self, _seal: &Seal, request: Request<Bytes>) {
        self.method_code = MethodCode::from_method(request.method());
        self.index_route = None;
        self.index_handler = 0;
        self.matched = false;
        self.route = None;
        self.tree_path.clear();
        self.clear_values();

        self.path_original.clear();
        self.path_original.push_str(request.uri().path());
        normalize_path_into(&mut self.detection_path, &self.path_original, &self.config);

        self.response = Response::default();
        self.locals.clear();
        self.request = request;
    }

    /// Drops the request, the response and route references held for the last request.
    pub fn release(&mut self, _seal: &Seal) {
        self.request = Request::default();
        self.response = Response::default();
        self.locals.clear();
        self.route = None;
        self.stack = None;
        self.matched = false;
        self.index_route = None;
        self.index_handler = 0;
        self.clear_values();
    }

    pub fn app(&self) -> Option<App<C>> {
        self.app.upgrade().map(App::from_inner)
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn request(&self) -> &Request<Bytes> {
        &self.request
    }

    pub fn response(&self) -> &Response<Bytes> {
        &self.response
    }

    /// Values handlers attach to the request, cleared on reset.
    pub fn locals(&self) -> &Extensions {
        &self.locals
    }

    pub(crate) fn locals_mut(&mut self) -> &mut Extensions {
        &mut self.locals
    }

    pub fn method_code(&self) -> Option<MethodCode> {
        self.method_code
    }

    pub fn index_route(&self) -> Option<usize> {
        self.index_route
    }

    pub fn index_handler(&self) -> usize {
        self.index_handler
    }

    /// The pattern of the route being executed, empty until a route matched.
    pub fn tree_path(&self) -> &str {
        &self.tree_path
    }

    /// The normalized path routes are matched against.
    pub fn detection_path(&self) -> &str {
        &self.detection_path
    }

    pub fn path_original(&self) -> &str {
        &self.path_original
    }

    /// Parameter values captured by the matched route, in pattern order.
    pub fn values(&self) -> &[String] {
        &self.values[..self.value_count]
    }

    pub fn matched(&self) -> bool {
        self.matched
    }

    pub fn route(&self) -> Option<&Arc<Route<C>>> {
        self.route.as_ref()
    }

    pub(crate) fn stack(&self) -> Option<&Arc<RouteStack<C>>> {
        self.stack.as_ref()
    }

    pub(crate) fn bind_stack(&mut self, stack: Arc<RouteStack<C>>) {
        self.stack = Some(stack);
    }

    pub(crate) fn response_mut(&mut self) -> &mut Response<Bytes> {
        &mut self.response
    }

    pub(crate) fn take_response(&mut self) -> Response<Bytes> {
        std::mem::take(&mut self.response)
    }

    pub(crate) fn set_index_handler(&mut self, index: usize) {
        self.index_handler = index;
    }

    pub(crate) fn set_index_route(&mut self, index: usize) {
        self.index_route = Some(index);
    }

    pub(crate) fn set_matched(&mut self, matched: bool) {
        self.matched = matched;
    }

    pub(crate) fn set_route(&mut self, route: Arc<Route<C>>) {
        self.tree_path.clear();
        self.tree_path.push_str(route.path());
        self.route = Some(route);
    }

    /// Checks `route` against the request and fills the parameter slots when it matches.
    ///
    /// Values are cut from the original path so they keep their case when matching is
    /// case insensitive.
    pub(crate) fn capture(&mut self, route: &Route<C>) -> bool {
        let Some(code) = self.method_code else {
            return false;
        };
        if !route.methods().contains(code) {
            return false;
        }
        let Ok(matched) = route.matcher().at(&self.detection_path) else {
            return false;
        };

        self.value_count = 0;
        let params = matched.params.iter().take(route.params().len());
        for (slot, (_, value)) in self.values.iter_mut().zip(params) {
            let original = offset_in(&self.detection_path, value)
                .and_then(|start| self.path_original.get(start..start + value.len()))
                .unwrap_or(value);
            slot.clear();
            slot.push_str(original);
            self.value_count += 1;
        }
        true
    }

    fn clear_values(&mut self) {
        for value in &mut self.values[..self.value_count] {
            value.clear();
        }
        self.value_count = 0;
    }
}

fn offset_in(haystack: &str, part: &str) -> Option<usize> {
    let start = (part.as_ptr() as usize).checked_sub(haystack.as_ptr() as usize)?;
    (start + part.len() <= haystack.len()).then_some(start)
}

impl<C> fmt::Debug for BaseCtx<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BaseCtx")
            .field("method_code", &self.method_code)
            .field("index_route", &self.index_route)
            .field("index_handler", &self.index_handler)
            .field("tree_path", &self.tree_path)
            .field("detection_path", &self.detection_path)
            .field("path_original", &self.path_original)
            .field("values", &self.values())
            .field("matched", &self.matched)
            .finish_non_exhaustive()
    }
}
