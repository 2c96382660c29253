//! Registered handler callables.
//!
//! A handler either produces its value immediately or returns a future that
//! resolves to it. [`Callback::invoke`] awaits both the same way, so the
//! registries never care which kind they hold.

use std::any::Any;
use std::future::Future;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use futures::future::BoxFuture;
use futures::FutureExt;

type ImmediateFn<I, O> = dyn Fn(I) -> anyhow::Result<O> + Send + Sync;
type DeferredFn<I, O> = dyn Fn(I) -> BoxFuture<'static, anyhow::Result<O>> + Send + Sync;

pub enum Callback<I, O> {
    Immediate(Arc<ImmediateFn<I, O>>),
    Deferred(Arc<DeferredFn<I, O>>),
}

impl<I, O> Clone for Callback<I, O> {
    fn clone(&self) -> Self {
        match self {
            Callback::Immediate(f) => Callback::Immediate(Arc::clone(f)),
            Callback::Deferred(f) => Callback::Deferred(Arc::clone(f)),
        }
    }
}

impl<I, O> std::fmt::Debug for Callback<I, O> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Callback::Immediate(_) => f.write_str("Callback::Immediate"),
            Callback::Deferred(_) => f.write_str("Callback::Deferred"),
        }
    }
}

impl<I: Send + 'static, O: Send + 'static> Callback<I, O> {
    pub fn immediate<F>(f: F) -> Self
    where
        F: Fn(I) -> anyhow::Result<O> + Send + Sync + 'static,
    {
        Callback::Immediate(Arc::new(f))
    }

    pub fn deferred<F, Fut>(f: F) -> Self
    where
        F: Fn(I) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<O>> + Send + 'static,
    {
        Callback::Deferred(Arc::new(move |input| f(input).boxed()))
    }

    pub fn is_deferred(&self) -> bool {
        matches!(self, Callback::Deferred(_))
    }

    /// Run the handler and wait for its value.
    pub async fn invoke(&self, input: I) -> anyhow::Result<O> {
        match self {
            Callback::Immediate(f) => f(input),
            Callback::Deferred(f) => f(input).await,
        }
    }

    /// Like [`invoke`](Self::invoke), but a panic inside the handler comes
    /// back as an error instead of unwinding into the caller.
    pub async fn invoke_guarded(&self, input: I) -> anyhow::Result<O> {
        match self {
            Callback::Immediate(f) => {
                catch_unwind(AssertUnwindSafe(|| f(input))).unwrap_or_else(|p| Err(panic_error(p)))
            }
            Callback::Deferred(f) => {
                let fut = match catch_unwind(AssertUnwindSafe(|| f(input))) {
                    Ok(fut) => fut,
                    Err(p) => return Err(panic_error(p)),
                };
                AssertUnwindSafe(fut)
                    .catch_unwind()
                    .await
                    .unwrap_or_else(|p| Err(panic_error(p)))
            }
        }
    }
}

/// Best-effort message for a caught panic payload.
pub fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "handler panicked".to_string()
    }
}

fn panic_error(payload: Box<dyn Any + Send>) -> anyhow::Error {
    anyhow::anyhow!(panic_message(payload.as_ref()))
}
