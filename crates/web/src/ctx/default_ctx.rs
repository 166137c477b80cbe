use crate::app::App;
use crate::ctx::{BaseCtx, Ctx, CustomCtx, Seal};
use std::fmt;

/// The context used by [`App::new`], carrying nothing beyond the base state.
pub struct DefaultCtx {
    base: BaseCtx<DefaultCtx>,
}

impl DefaultCtx {
    pub fn new(app: &App<DefaultCtx>) -> Self {
        Self { base: BaseCtx::new(app) }
    }
}

impl Ctx for DefaultCtx {
    #[inline]
    fn base(&self) -> &BaseCtx<Self> {
        &self.base
    }

    #[inline]
    fn base_mut(&mut self, _seal: &Seal) -> &mut BaseCtx<Self> {
        &mut self.base
    }
}

impl CustomCtx for DefaultCtx {
    fn from_app(app: &App<Self>) -> Self {
        Self::new(app)
    }
}

impl fmt::Debug for DefaultCtx {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DefaultCtx").field("base", &self.base).finish()
    }
}
