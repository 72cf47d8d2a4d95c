//! Telemetry facade for error and product analytics events.
//!
//! Sinks are injected at construction time; there is no global instance.
//! Every event is fire-and-forget: a failing sink is logged with `warn!`
//! and never affects the caller's request outcome. Tests pass
//! `NoopSink` (or no sinks at all) instead of mocking at module level.

use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, warn};
use uuid::Uuid;

/// One telemetry event, keyed by (category, name) with free-form
/// attributes.
#[derive(Debug, Clone)]
pub struct TelemetryEvent {
    pub category: String,
    pub name: String,
    pub attributes: Value,
}

impl TelemetryEvent {
    pub fn new(category: impl Into<String>, name: impl Into<String>, attributes: Value) -> Self {
        Self {
            category: category.into(),
            name: name.into(),
            attributes,
        }
    }
}

/// A single telemetry destination (error tracker, session tracker, ...).
pub trait TelemetrySink: Send + Sync {
    fn record(&self, event: &TelemetryEvent) -> anyhow::Result<()>;

    fn identify(&self, user_id: Uuid, traits: &Value) -> anyhow::Result<()> {
        let _ = (user_id, traits);
        Ok(())
    }
}

/// Sink that drops everything. Default for tests.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopSink;

impl TelemetrySink for NoopSink {
    fn record(&self, _event: &TelemetryEvent) -> anyhow::Result<()> {
        Ok(())
    }
}

/// Sink that forwards events to the tracing subscriber. Used when no
/// external tracker is configured.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

impl TelemetrySink for LogSink {
    fn record(&self, event: &TelemetryEvent) -> anyhow::Result<()> {
        debug!(
            category = %event.category,
            name = %event.name,
            attributes = %event.attributes,
            "telemetry event"
        );
        Ok(())
    }

    fn identify(&self, user_id: Uuid, traits: &Value) -> anyhow::Result<()> {
        debug!(%user_id, traits = %traits, "telemetry identify");
        Ok(())
    }
}

/// Fan-out facade over the configured sinks.
#[derive(Clone, Default)]
pub struct Telemetry {
    sinks: Vec<Arc<dyn TelemetrySink>>,
}

impl Telemetry {
    pub fn new(sinks: Vec<Arc<dyn TelemetrySink>>) -> Self {
        Self { sinks }
    }

    /// Facade with no sinks; every call is a no-op.
    pub fn disabled() -> Self {
        Self { sinks: Vec::new() }
    }

    pub fn record(&self, event: TelemetryEvent) {
        for sink in &self.sinks {
            if let Err(err) = sink.record(&event) {
                warn!(
                    category = %event.category,
                    name = %event.name,
                    "telemetry sink failed: {err}"
                );
            }
        }
    }

    pub fn identify(&self, user_id: Uuid, traits: Value) {
        for sink in &self.sinks {
            if let Err(err) = sink.identify(user_id, &traits) {
                warn!(%user_id, "telemetry identify failed: {err}");
            }
        }
    }

    pub fn track_error(&self, source: &str, message: &str) {
        self.record(TelemetryEvent::new(
            "error",
            source,
            serde_json::json!({ "message": message }),
        ));
    }

    pub fn track_user_action(&self, action: &str, attributes: Value) {
        self.record(TelemetryEvent::new("user_action", action, attributes));
    }

    pub fn track_campaign(&self, action: &str, campaign_id: Uuid) {
        self.record(TelemetryEvent::new(
            "campaign",
            action,
            serde_json::json!({ "campaign_id": campaign_id }),
        ));
    }

    pub fn track_sales_activity(&self, channel: &str, attributes: Value) {
        self.record(TelemetryEvent::new("sales_activity", channel, attributes));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingSink {
        seen: AtomicUsize,
    }

    impl TelemetrySink for CountingSink {
        fn record(&self, _event: &TelemetryEvent) -> anyhow::Result<()> {
            self.seen.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    struct FailingSink;

    impl TelemetrySink for FailingSink {
        fn record(&self, _event: &TelemetryEvent) -> anyhow::Result<()> {
            Err(anyhow::anyhow!("tracker unreachable"))
        }
    }

    #[test]
    fn failing_sink_does_not_stop_the_fanout() {
        let counting = Arc::new(CountingSink {
            seen: AtomicUsize::new(0),
        });
        let telemetry = Telemetry::new(vec![Arc::new(FailingSink), counting.clone()]);

        telemetry.track_error("billing", "webhook rejected");
        telemetry.track_campaign("created", Uuid::new_v4());

        assert_eq!(counting.seen.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn disabled_facade_accepts_events() {
        let telemetry = Telemetry::disabled();
        telemetry.track_user_action("login", serde_json::json!({}));
        telemetry.identify(Uuid::new_v4(), serde_json::json!({"plan": "starter"}));
    }
}
