//! Hook chains run before each generated endpoint
//!
//! A hook receives the request context and either lets the pipeline go on
//! ([`HookOutcome::Next`]), answers the request itself
//! ([`HookOutcome::Respond`]), or fails with a [`RestError`]. The last two
//! end the pipeline: no later hook runs and the store is never touched.
//!
//! `pre_all` always runs first, then the chain of the operation:
//!
//! ```rust,ignore
//! let hooks = Hooks::new()
//!     .pre_all(hook_fn("identify", |ctx| {
//!         if let Some(user) = ctx.query_param("user").map(String::from) {
//!             ctx.set_user(user);
//!         }
//!         Ok(HookOutcome::Next)
//!     }))
//!     .pre_delete(hook_fn("admins-only", |ctx| match ctx.user() {
//!         Some("admin") => Ok(HookOutcome::Next),
//!         _ => Err(RestError::forbidden("only admins can delete")),
//!     }));
//! ```

use crate::core::context::{Operation, RequestContext};
use crate::core::error::RestError;
use async_trait::async_trait;
use axum::response::Response;
use std::fmt;
use std::sync::Arc;

/// What the pipeline does after a hook
pub enum HookOutcome {
    /// Run the next hook, or the operation itself after the last one
    Next,

    /// Send this response and stop
    Respond(Response),
}

impl HookOutcome {
    pub fn is_next(&self) -> bool {
        matches!(self, HookOutcome::Next)
    }
}

impl fmt::Debug for HookOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HookOutcome::Next => f.write_str("Next"),
            HookOutcome::Respond(r) => write!(f, "Respond({})", r.status()),
        }
    }
}

/// A request-processing step
#[async_trait]
pub trait Hook: Send + Sync {
    /// Name used in logs
    fn name(&self) -> &str {
        "hook"
    }

    async fn call(&self, ctx: &mut RequestContext) -> Result<HookOutcome, RestError>;
}

/// Hook backed by a synchronous closure, see [`hook_fn`]
pub struct FnHook<F> {
    name: String,
    f: F,
}

#[async_trait]
impl<F> Hook for FnHook<F>
where
    F: Fn(&mut RequestContext) -> Result<HookOutcome, RestError> + Send + Sync,
{
    fn name(&self) -> &str {
        &self.name
    }

    async fn call(&self, ctx: &mut RequestContext) -> Result<HookOutcome, RestError> {
        (self.f)(ctx)
    }
}

/// Wrap a closure as a named hook
pub fn hook_fn<F>(name: impl Into<String>, f: F) -> FnHook<F>
where
    F: Fn(&mut RequestContext) -> Result<HookOutcome, RestError> + Send + Sync,
{
    FnHook {
        name: name.into(),
        f,
    }
}

/// Ordered list of hooks
#[derive(Clone, Default)]
pub struct HookChain {
    hooks: Vec<Arc<dyn Hook>>,
}

impl HookChain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, hook: impl Hook + 'static) -> Self {
        self.hooks.push(Arc::new(hook));
        self
    }

    pub fn push(&mut self, hook: Arc<dyn Hook>) {
        self.hooks.push(hook);
    }

    pub fn len(&self) -> usize {
        self.hooks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hooks.is_empty()
    }

    /// Run every hook in order until one does not return `Next`
    pub async fn run(&self, ctx: &mut RequestContext) -> Result<HookOutcome, RestError> {
        for hook in &self.hooks {
            match hook.call(ctx).await {
                Ok(HookOutcome::Next) => continue,
                Ok(outcome) => {
                    tracing::debug!(
                        request_id = %ctx.request_id(),
                        operation = %ctx.operation(),
                        hook = hook.name(),
                        "hook answered the request"
                    );
                    return Ok(outcome);
                }
                Err(err) => {
                    tracing::warn!(
                        request_id = %ctx.request_id(),
                        operation = %ctx.operation(),
                        hook = hook.name(),
                        error = %err,
                        "hook rejected the request"
                    );
                    return Err(err);
                }
            }
        }
        Ok(HookOutcome::Next)
    }
}

impl fmt::Debug for HookChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.hooks.iter().map(|h| h.name()))
            .finish()
    }
}

/// Hook chains of a model, one per operation category plus `pre_all`
#[derive(Clone, Default, Debug)]
pub struct Hooks {
    pub pre_all: HookChain,
    pub pre_list: HookChain,
    pub pre_get: HookChain,
    pub pre_create: HookChain,
    pub pre_update: HookChain,
    pub pre_delete: HookChain,
}

impl Hooks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pre_all(mut self, hook: impl Hook + 'static) -> Self {
        self.pre_all = self.pre_all.with(hook);
        self
    }

    pub fn pre_list(mut self, hook: impl Hook + 'static) -> Self {
        self.pre_list = self.pre_list.with(hook);
        self
    }

    pub fn pre_get(mut self, hook: impl Hook + 'static) -> Self {
        self.pre_get = self.pre_get.with(hook);
        self
    }

    pub fn pre_create(mut self, hook: impl Hook + 'static) -> Self {
        self.pre_create = self.pre_create.with(hook);
        self
    }

    pub fn pre_update(mut self, hook: impl Hook + 'static) -> Self {
        self.pre_update = self.pre_update.with(hook);
        self
    }

    pub fn pre_delete(mut self, hook: impl Hook + 'static) -> Self {
        self.pre_delete = self.pre_delete.with(hook);
        self
    }

    /// Chain specific to an operation
    pub fn chain(&self, operation: Operation) -> &HookChain {
        match operation {
            Operation::List => &self.pre_list,
            Operation::Get => &self.pre_get,
            Operation::Create => &self.pre_create,
            Operation::Update => &self.pre_update,
            Operation::Delete => &self.pre_delete,
        }
    }

    /// Run `pre_all` then the chain of the context's operation
    pub async fn run(&self, ctx: &mut RequestContext) -> Result<HookOutcome, RestError> {
        match self.pre_all.run(ctx).await? {
            HookOutcome::Next => self.chain(ctx.operation()).run(ctx).await,
            outcome => Ok(outcome),
        }
    }
}
