//! Tracing layer that streams prepull progress events over a channel.
//!
//! Every event (optionally only those under a target prefix) is converted
//! into a serializable [`PrepullEvent`] carrying its own fields plus the
//! fields of all enclosing spans, e.g. the `task` of a wait worker.

use serde_json::{Map, Value};
use std::collections::HashMap;
use tokio::sync::mpsc;
use tracing::span::{Attributes, Id, Record};
use tracing::{Event, Subscriber};
use tracing_subscriber::Layer;
use tracing_subscriber::layer::Context;
use tracing_subscriber::registry::LookupSpan;

/// Event data sent to listeners
#[derive(Debug, Clone, serde::Serialize)]
pub struct PrepullEvent {
    /// Event target (e.g., "prepull_execution::parallel")
    pub target: String,
    /// Log level (INFO, DEBUG, WARN, ERROR)
    pub level: String,
    pub message: String,
    /// Structured fields from the event
    pub fields: HashMap<String, Value>,
    /// Fields of the enclosing spans, innermost wins on conflicts
    pub span: HashMap<String, Value>,
    pub timestamp: String,
}

impl PrepullEvent {
    /// Single-line JSON, as written by the CLI's event stream.
    pub fn to_json_line(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| {
            let mut fallback = Map::new();
            fallback.insert("message".to_string(), Value::String(self.message.clone()));
            Value::Object(fallback).to_string()
        })
    }
}

/// Span fields stored in the span's extensions.
#[derive(Default)]
struct SpanFields(HashMap<String, Value>);

/// A tracing layer that forwards events to an unbounded channel.
pub struct PrepullEventLayer {
    sender: mpsc::UnboundedSender<PrepullEvent>,
    target_prefix: Option<String>,
}

impl PrepullEventLayer {
    pub fn new(sender: mpsc::UnboundedSender<PrepullEvent>) -> Self {
        Self {
            sender,
            target_prefix: None,
        }
    }

    /// Creates a layer and the receiving end of its channel.
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<PrepullEvent>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self::new(sender), receiver)
    }

    /// Only forward events whose target starts with `prefix`.
    pub fn with_target_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.target_prefix = Some(prefix.into());
        self
    }

    fn accepts(&self, target: &str) -> bool {
        self.target_prefix
            .as_deref()
            .is_none_or(|prefix| target.starts_with(prefix))
    }
}

impl<S> Layer<S> for PrepullEventLayer
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    fn on_new_span(&self, attrs: &Attributes<'_>, id: &Id, ctx: Context<'_, S>) {
        let Some(span) = ctx.span(id) else {
            return;
        };
        let mut fields = HashMap::new();
        attrs.record(&mut FieldVisitor(&mut fields));
        span.extensions_mut().insert(SpanFields(fields));
    }

    fn on_record(&self, id: &Id, values: &Record<'_>, ctx: Context<'_, S>) {
        let Some(span) = ctx.span(id) else {
            return;
        };
        let mut extensions = span.extensions_mut();
        if let Some(SpanFields(fields)) = extensions.get_mut::<SpanFields>() {
            values.record(&mut FieldVisitor(fields));
        }
    }

    fn on_event(&self, event: &Event<'_>, ctx: Context<'_, S>) {
        let metadata = event.metadata();
        if !self.accepts(metadata.target()) {
            return;
        }

        let mut fields = HashMap::new();
        event.record(&mut FieldVisitor(&mut fields));

        // Root first so inner spans override outer ones
        let mut span_fields = HashMap::new();
        if let Some(scope) = ctx.event_scope(event) {
            for span in scope.from_root() {
                if let Some(SpanFields(stored)) = span.extensions().get::<SpanFields>() {
                    span_fields.extend(stored.iter().map(|(k, v)| (k.clone(), v.clone())));
                }
            }
        }

        let message = match fields.remove("message") {
            Some(Value::String(message)) => message,
            Some(other) => other.to_string(),
            None => String::new(),
        };

        let prepull_event = PrepullEvent {
            target: metadata.target().to_string(),
            level: metadata.level().to_string(),
            message,
            fields,
            span: span_fields,
            timestamp: chrono::Utc::now().to_rfc3339(),
        };

        // Non-blocking send - if the receiver is dropped, we just skip
        let _ = self.sender.send(prepull_event);
    }
}

/// Field visitor that extracts tracing fields into a HashMap
struct FieldVisitor<'a>(&'a mut HashMap<String, Value>);

impl tracing::field::Visit for FieldVisitor<'_> {
    fn record_f64(&mut self, field: &tracing::field::Field, value: f64) {
        self.0.insert(field.name().to_string(), serde_json::json!(value));
    }

    fn record_i64(&mut self, field: &tracing::field::Field, value: i64) {
        self.0.insert(field.name().to_string(), serde_json::json!(value));
    }

    fn record_u64(&mut self, field: &tracing::field::Field, value: u64) {
        self.0.insert(field.name().to_string(), serde_json::json!(value));
    }

    fn record_bool(&mut self, field: &tracing::field::Field, value: bool) {
        self.0.insert(field.name().to_string(), serde_json::json!(value));
    }

    fn record_str(&mut self, field: &tracing::field::Field, value: &str) {
        self.0.insert(field.name().to_string(), serde_json::json!(value));
    }

    fn record_debug(&mut self, field: &tracing::field::Field, value: &dyn std::fmt::Debug) {
        self.0.insert(
            field.name().to_string(),
            serde_json::json!(format!("{:?}", value)),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing_subscriber::layer::SubscriberExt;

    #[test]
    fn test_event_carries_message_fields_and_span() {
        let (layer, mut rx) = PrepullEventLayer::channel();
        let subscriber = tracing_subscriber::registry().with(layer);

        tracing::subscriber::with_default(subscriber, || {
            let outer = tracing::info_span!("prepull", tasks = 2u64);
            let _outer = outer.enter();
            let inner = tracing::info_span!("wait", task = "etcd");
            let _inner = inner.enter();
            tracing::info!(attempt = 1u64, "ready");
        });

        let event = rx.try_recv().expect("event should be forwarded");
        assert_eq!(event.message, "ready");
        assert_eq!(event.level, "INFO");
        assert_eq!(event.fields.get("attempt"), Some(&serde_json::json!(1)));
        assert!(!event.fields.contains_key("message"));
        assert_eq!(event.span.get("task"), Some(&serde_json::json!("etcd")));
        assert_eq!(event.span.get("tasks"), Some(&serde_json::json!(2)));
    }

    #[test]
    fn test_target_prefix_filters_events() {
        let (layer, mut rx) = PrepullEventLayer::channel();
        let subscriber = tracing_subscriber::registry().with(layer.with_target_prefix("prepull"));

        tracing::subscriber::with_default(subscriber, || {
            tracing::info!(target: "other_crate", "ignored");
            tracing::info!(target: "prepull_execution::parallel", "kept");
        });

        let event = rx.try_recv().expect("prefixed event should be forwarded");
        assert_eq!(event.message, "kept");
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_recorded_span_fields_are_visible() {
        let (layer, mut rx) = PrepullEventLayer::channel();
        let subscriber = tracing_subscriber::registry().with(layer);

        tracing::subscriber::with_default(subscriber, || {
            let span = tracing::info_span!("wait", task = tracing::field::Empty);
            span.record("task", "kube-scheduler");
            let _entered = span.enter();
            tracing::warn!("slow");
        });

        let event = rx.try_recv().unwrap();
        assert_eq!(event.span.get("task"), Some(&serde_json::json!("kube-scheduler")));
        assert!(event.to_json_line().contains("\"level\":\"WARN\""));
    }

    #[test]
    fn test_dropped_receiver_does_not_panic() {
        let (layer, rx) = PrepullEventLayer::channel();
        drop(rx);
        let subscriber = tracing_subscriber::registry().with(layer);

        tracing::subscriber::with_default(subscriber, || {
            tracing::error!("nobody listening");
        });
    }
}
