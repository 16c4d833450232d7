use std::future::Future;
use std::sync::Arc;

use futures::future::BoxFuture;
use serde_json::Value;

use crate::context::Context;
use crate::error::{BoxError, SharedError};

/// The frame passed as the first argument to every hook — the shared
/// process [`Context`] merged (non-destructively, per spec §3.2) with the
/// action's own `extras`.
#[derive(Clone)]
pub struct ActionFrame {
    pub context: Arc<Context>,
    pub name: String,
    pub extras: Value,
}

type InitHook = Box<dyn Fn(ActionFrame) -> BoxFuture<'static, Result<(), BoxError>> + Send + Sync>;
type ExecuteHook =
    Box<dyn Fn(ActionFrame) -> BoxFuture<'static, Result<Value, BoxError>> + Send + Sync>;
type RetryHook = Box<
    dyn Fn(ActionFrame, BoxError) -> BoxFuture<'static, Result<(), BoxError>> + Send + Sync,
>;
type RollbackHook = Box<dyn Fn(ActionFrame, SharedError) -> BoxFuture<'static, ()> + Send + Sync>;
type FailureHook = Box<dyn Fn(ActionFrame, SharedError) -> BoxFuture<'static, ()> + Send + Sync>;
type SuccessHook = Box<dyn Fn(ActionFrame) -> BoxFuture<'static, ()> + Send + Sync>;

/// A named unit of work with up to six optional hook methods (spec §3.2).
/// Build one with [`action`] (single `execute` closure) or
/// [`ActionBuilder`] (partial hook set).
pub struct Action {
    name: String,
    extras: Value,
    init: Option<InitHook>,
    execute: Option<ExecuteHook>,
    retry: Option<RetryHook>,
    rollback: Option<RollbackHook>,
    failure: Option<FailureHook>,
    success: Option<SuccessHook>,
}

impl Action {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn extras(&self) -> &Value {
        &self.extras
    }

    fn frame(&self, context: &Arc<Context>) -> ActionFrame {
        ActionFrame {
            context: context.clone(),
            name: self.name.clone(),
            extras: self.extras.clone(),
        }
    }

    pub(crate) async fn call_init(&self, context: &Arc<Context>) -> Result<(), BoxError> {
        match &self.init {
            Some(hook) => hook(self.frame(context)).await,
            None => Ok(()),
        }
    }

    pub(crate) async fn call_execute(&self, context: &Arc<Context>) -> Result<Value, BoxError> {
        match &self.execute {
            Some(hook) => hook(self.frame(context)).await,
            None => Ok(Value::Null),
        }
    }

    /// Default retry policy: reject with the original error (no retry).
    pub(crate) async fn call_retry(
        &self,
        context: &Arc<Context>,
        err: BoxError,
    ) -> Result<(), BoxError> {
        match &self.retry {
            Some(hook) => hook(self.frame(context), err).await,
            None => Err(err),
        }
    }

    pub(crate) async fn call_rollback(&self, context: &Arc<Context>, err: SharedError) {
        if let Some(hook) = &self.rollback {
            hook(self.frame(context), err).await;
        }
    }

    pub(crate) async fn call_failure(&self, context: &Arc<Context>, err: SharedError) {
        if let Some(hook) = &self.failure {
            hook(self.frame(context), err).await;
        }
    }

    pub(crate) async fn call_success(&self, context: &Arc<Context>) {
        if let Some(hook) = &self.success {
            hook(self.frame(context)).await;
        }
    }
}

/// Builds an [`Action`] from a partial set of hooks — the static-typing
/// translation of the source's "pass an object with some of these method
/// names" pattern (spec §9, "Dynamic hook dispatch").
pub struct ActionBuilder {
    name: String,
    extras: Value,
    init: Option<InitHook>,
    execute: Option<ExecuteHook>,
    retry: Option<RetryHook>,
    rollback: Option<RollbackHook>,
    failure: Option<FailureHook>,
    success: Option<SuccessHook>,
}

impl ActionBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            extras: Value::Object(serde_json::Map::new()),
            init: None,
            execute: None,
            retry: None,
            rollback: None,
            failure: None,
            success: None,
        }
    }

    /// Instance data merged into every hook's frame alongside the shared
    /// context (spec §3.2).
    pub fn extras(mut self, extras: Value) -> Self {
        self.extras = extras;
        self
    }

    pub fn on_init<F, Fut>(mut self, hook: F) -> Self
    where
        F: Fn(ActionFrame) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), BoxError>> + Send + 'static,
    {
        self.init = Some(Box::new(move |frame| Box::pin(hook(frame))));
        self
    }

    pub fn on_execute<F, Fut>(mut self, hook: F) -> Self
    where
        F: Fn(ActionFrame) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Value, BoxError>> + Send + 'static,
    {
        self.execute = Some(Box::new(move |frame| Box::pin(hook(frame))));
        self
    }

    pub fn on_retry<F, Fut>(mut self, hook: F) -> Self
    where
        F: Fn(ActionFrame, BoxError) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), BoxError>> + Send + 'static,
    {
        self.retry = Some(Box::new(move |frame, err| Box::pin(hook(frame, err))));
        self
    }

    pub fn on_rollback<F, Fut>(mut self, hook: F) -> Self
    where
        F: Fn(ActionFrame, SharedError) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.rollback = Some(Box::new(move |frame, err| Box::pin(hook(frame, err))));
        self
    }

    pub fn on_failure<F, Fut>(mut self, hook: F) -> Self
    where
        F: Fn(ActionFrame, SharedError) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.failure = Some(Box::new(move |frame, err| Box::pin(hook(frame, err))));
        self
    }

    pub fn on_success<F, Fut>(mut self, hook: F) -> Self
    where
        F: Fn(ActionFrame) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.success = Some(Box::new(move |frame| Box::pin(hook(frame))));
        self
    }

    pub fn build(self) -> Action {
        Action {
            name: self.name,
            extras: self.extras,
            init: self.init,
            execute: self.execute,
            retry: self.retry,
            rollback: self.rollback,
            failure: self.failure,
            success: self.success,
        }
    }
}

/// Builds an [`Action`] whose only hook is `execute` — the common case
/// (spec §6: "Accepts either a single function ... or a partial hook
/// map").
pub fn action<F, Fut>(name: impl Into<String>, execute: F) -> Action
where
    F: Fn(ActionFrame) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Value, BoxError>> + Send + 'static,
{
    ActionBuilder::new(name).on_execute(execute).build()
}
