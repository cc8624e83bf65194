//! Call lifecycle observation.
//!
//! A dispatch layer invokes, per outbound call: `on_call_started` before the
//! first attempt, `on_call_retried` before each further attempt, exactly one
//! of `on_call_succeeded` / `on_call_failed` once the outcome is final, and
//! `on_call_finished` last. Hooks are fire-and-forget and must not panic.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use crate::metrics::CoreMetrics;

/// Opaque per-call value handed back to every later hook of the same call.
#[derive(Default)]
pub struct CallToken(Option<Box<dyn Any + Send + Sync>>);

impl CallToken {
    pub fn empty() -> Self {
        Self(None)
    }

    pub fn new<T: Any + Send + Sync>(value: T) -> Self {
        Self(Some(Box::new(value)))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_none()
    }

    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.0.as_ref().and_then(|v| v.downcast_ref::<T>())
    }
}

impl fmt::Debug for CallToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("CallToken")
            .field(&if self.is_empty() { "empty" } else { "set" })
            .finish()
    }
}

pub trait CallMonitor: Send + Sync {
    fn on_call_started(&self, service: &str, operation: &str) -> CallToken;

    fn on_call_succeeded(
        &self,
        service: &str,
        operation: &str,
        metrics: &CoreMetrics,
        token: &CallToken,
    );

    fn on_call_failed(
        &self,
        service: &str,
        operation: &str,
        metrics: &CoreMetrics,
        token: &CallToken,
    );

    fn on_call_retried(&self, service: &str, operation: &str, token: &CallToken);

    fn on_call_finished(&self, service: &str, operation: &str, token: &CallToken);
}

type MonitorFactoryFn = Box<dyn Fn() -> Arc<dyn CallMonitor> + Send + Sync>;

/// Constructor functions a host registers to obtain its monitors.
#[derive(Default)]
pub struct MonitorRegistry {
    factories: Vec<MonitorFactoryFn>,
}

impl MonitorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<F>(&mut self, factory: F) -> &mut Self
    where
        F: Fn() -> Arc<dyn CallMonitor> + Send + Sync + 'static,
    {
        self.factories.push(Box::new(factory));
        self
    }

    pub fn len(&self) -> usize {
        self.factories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }

    /// One fresh monitor per registered factory, in registration order.
    pub fn create_monitors(&self) -> Vec<Arc<dyn CallMonitor>> {
        self.factories.iter().map(|f| f()).collect()
    }
}
