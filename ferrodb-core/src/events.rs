//! # Event Bus Module
//!
//! A synchronous observer registry for cache operations. Observers can be
//! registered against a single named cache, or globally across all of them;
//! on dispatch, cache-scoped observers run before global ones. A panicking
//! or erroring observer is isolated — its failure never reaches the
//! triggering operation or the other observers.
//!
//! Observers run inline on the worker that triggered the event. Per the
//! concurrency contract in the crate-level documentation, an observer must
//! not call back into the [`crate::cache_manager::CacheManager`]'s mutating
//! API; nothing here enforces that, callers must honor it.

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::value::Value;

/// The closed set of events a named cache can emit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    Get,
    Set,
    Delete,
    Expire,
    Clear,
    CreateCache,
    DeleteCache,
}

/// Context delivered to an observer when an event fires.
#[derive(Debug, Clone)]
pub struct EventContext {
    pub cache_name: String,
    pub key: Option<String>,
    pub new_value: Option<Value>,
    pub old_value: Option<Value>,
    pub event_kind: EventKind,
    pub timestamp: DateTime<Utc>,
}

impl EventContext {
    pub fn new(cache_name: impl Into<String>, event_kind: EventKind) -> Self {
        Self {
            cache_name: cache_name.into(),
            key: None,
            new_value: None,
            old_value: None,
            event_kind,
            timestamp: Utc::now(),
        }
    }

    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.key = Some(key.into());
        self
    }

    pub fn with_new_value(mut self, value: Value) -> Self {
        self.new_value = Some(value);
        self
    }

    pub fn with_old_value(mut self, value: Value) -> Self {
        self.old_value = Some(value);
        self
    }
}

/// An observer callback. Boxed so the registry can hold a heterogeneous set
/// of closures; wrapped in `Arc` so registration handles can be compared by
/// pointer identity for `off`.
pub type Observer = Arc<dyn Fn(&EventContext) + Send + Sync>;

#[derive(Default)]
pub struct EventBus {
    scoped: DashMap<(String, EventKind), Vec<Observer>>,
    global: DashMap<EventKind, Vec<Observer>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `observer` for `kind`, scoped to `cache_name` if given, or
    /// global otherwise. Returns a handle that can later be passed to
    /// [`EventBus::off`].
    pub fn on(&self, kind: EventKind, cache_name: Option<&str>, observer: Observer) {
        match cache_name {
            Some(name) => {
                self.scoped
                    .entry((name.to_string(), kind))
                    .or_default()
                    .push(observer);
            }
            None => {
                self.global.entry(kind).or_default().push(observer);
            }
        }
    }

    /// Removes a previously registered observer, matched by `Arc` pointer
    /// identity. Returns `true` if an observer was actually removed;
    /// removing an unregistered observer is a soft no-op, not an error.
    pub fn off(&self, kind: EventKind, cache_name: Option<&str>, observer: &Observer) -> bool {
        let target = Arc::as_ptr(observer);
        match cache_name {
            Some(name) => {
                if let Some(mut list) = self.scoped.get_mut(&(name.to_string(), kind)) {
                    let before = list.len();
                    list.retain(|o| !std::ptr::eq(Arc::as_ptr(o), target));
                    return list.len() != before;
                }
                false
            }
            None => {
                if let Some(mut list) = self.global.get_mut(&kind) {
                    let before = list.len();
                    list.retain(|o| !std::ptr::eq(Arc::as_ptr(o), target));
                    return list.len() != before;
                }
                false
            }
        }
    }

    /// Delivers `context` to every matching observer: cache-scoped first,
    /// then global. Any observer that panics is caught and swallowed so the
    /// triggering operation, and the remaining observers, are unaffected.
    pub fn dispatch(&self, kind: EventKind, context: EventContext) {
        if let Some(list) = self.scoped.get(&(context.cache_name.clone(), kind)) {
            for observer in list.iter() {
                invoke_isolated(observer, &context);
            }
        }
        if let Some(list) = self.global.get(&kind) {
            for observer in list.iter() {
                invoke_isolated(observer, &context);
            }
        }
    }
}

fn invoke_isolated(observer: &Observer, context: &EventContext) {
    let observer = observer.clone();
    let context = context.clone();
    if let Err(panic) = std::panic::catch_unwind(std::panic::AssertUnwindSafe(move || {
        observer(&context)
    })) {
        tracing::warn!(?panic, "event observer panicked; isolated from the triggering operation");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn scoped_observer_fires_before_global() {
        let bus = EventBus::new();
        let order: Arc<std::sync::Mutex<Vec<&'static str>>> = Arc::default();

        let o1 = {
            let order = order.clone();
            Arc::new(move |_: &EventContext| order.lock().unwrap().push("scoped")) as Observer
        };
        let o2 = {
            let order = order.clone();
            Arc::new(move |_: &EventContext| order.lock().unwrap().push("global")) as Observer
        };

        bus.on(EventKind::Set, Some("users"), o1);
        bus.on(EventKind::Set, None, o2);

        bus.dispatch(EventKind::Set, EventContext::new("users", EventKind::Set));

        assert_eq!(*order.lock().unwrap(), vec!["scoped", "global"]);
    }

    #[test]
    fn failing_observer_does_not_prevent_others_from_running() {
        let bus = EventBus::new();
        let ran = Arc::new(AtomicUsize::new(0));

        let panics: Observer = Arc::new(|_: &EventContext| panic!("boom"));
        let counts = {
            let ran = ran.clone();
            Arc::new(move |_: &EventContext| {
                ran.fetch_add(1, Ordering::SeqCst);
            }) as Observer
        };

        bus.on(EventKind::Get, None, panics);
        bus.on(EventKind::Get, None, counts);

        bus.dispatch(EventKind::Get, EventContext::new("any", EventKind::Get));
        assert_eq!(ran.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn off_is_a_soft_no_op_for_an_unregistered_observer() {
        let bus = EventBus::new();
        let observer: Observer = Arc::new(|_: &EventContext| {});
        assert!(!bus.off(EventKind::Clear, None, &observer));
    }
}
