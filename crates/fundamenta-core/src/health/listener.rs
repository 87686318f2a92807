//! Status-change listeners and their subscription handles.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Weak};

use super::registry::ApiHealthMonitor;

/// Callback invoked with the new health value on every transition.
pub type StatusListener = Arc<dyn Fn(bool) + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerId(pub(crate) u64);

/// Handle returned by [`ApiHealthMonitor::on_status_change`].
///
/// Dropping the handle leaves the listener registered.
#[must_use = "keep the Subscription to be able to unsubscribe later"]
#[derive(Debug)]
pub struct Subscription {
    monitor: Weak<ApiHealthMonitor>,
    api_name: String,
    id: ListenerId,
}

impl Subscription {
    pub(crate) fn new(monitor: Weak<ApiHealthMonitor>, api_name: String, id: ListenerId) -> Self {
        Self { monitor, api_name, id }
    }

    pub fn id(&self) -> ListenerId {
        self.id
    }

    pub fn api_name(&self) -> &str {
        &self.api_name
    }

    /// Remove the listener. Returns false if it was already gone.
    pub fn unsubscribe(self) -> bool {
        self.monitor
            .upgrade()
            .is_some_and(|monitor| monitor.remove_listener(&self.api_name, self.id))
    }
}

/// Invoke every listener, isolating panics so one bad listener cannot stop
/// the rest or the probe that triggered the notification.
pub(crate) fn notify_all(api_name: &str, listeners: &[StatusListener], is_healthy: bool) {
    for listener in listeners {
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| listener(is_healthy)));
        if let Err(payload) = outcome {
            tracing::error!(
                api = %api_name,
                is_healthy,
                panic = %panic_message(payload.as_ref()),
                "Status listener panicked"
            );
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
