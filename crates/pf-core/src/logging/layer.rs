//! Tracing layer for JSONL output.
//!
//! Writes one JSON object per event to stderr, keeping stdout free for
//! command output. Fields whose name looks like a credential are masked.

use std::io::{self, Write};
use std::sync::Mutex;

use chrono::Utc;
use pf_redact::looks_sensitive;
use tracing::{Event, Subscriber};
use tracing_subscriber::layer::Context;
use tracing_subscriber::Layer;

use super::events::Level;

const MASK: &str = "[REDACTED]";

/// Fields lifted to the top level of each line.
const TOP_LEVEL_FIELDS: &[&str] = &["run_id", "command", "stage"];

struct JsonFieldVisitor {
    top: serde_json::Map<String, serde_json::Value>,
    fields: serde_json::Map<String, serde_json::Value>,
    message: Option<String>,
}

impl JsonFieldVisitor {
    fn new() -> Self {
        JsonFieldVisitor {
            top: serde_json::Map::new(),
            fields: serde_json::Map::new(),
            message: None,
        }
    }

    fn put(&mut self, name: &str, value: serde_json::Value) {
        if TOP_LEVEL_FIELDS.contains(&name) {
            self.top.insert(name.to_string(), value);
        } else if looks_sensitive(name) {
            self.fields
                .insert(name.to_string(), serde_json::Value::String(MASK.to_string()));
        } else {
            self.fields.insert(name.to_string(), value);
        }
    }
}

impl tracing::field::Visit for JsonFieldVisitor {
    fn record_str(&mut self, field: &tracing::field::Field, value: &str) {
        if field.name() == "message" {
            self.message = Some(value.to_string());
        } else {
            self.put(field.name(), serde_json::Value::String(value.to_string()));
        }
    }

    fn record_debug(&mut self, field: &tracing::field::Field, value: &dyn std::fmt::Debug) {
        let s = format!("{:?}", value);
        if field.name() == "message" {
            self.message = Some(s);
        } else {
            self.put(field.name(), serde_json::Value::String(s));
        }
    }

    fn record_i64(&mut self, field: &tracing::field::Field, value: i64) {
        self.put(field.name(), serde_json::Value::Number(value.into()));
    }

    fn record_u64(&mut self, field: &tracing::field::Field, value: u64) {
        self.put(field.name(), serde_json::Value::Number(value.into()));
    }

    fn record_f64(&mut self, field: &tracing::field::Field, value: f64) {
        if let Some(n) = serde_json::Number::from_f64(value) {
            self.put(field.name(), serde_json::Value::Number(n));
        }
    }

    fn record_bool(&mut self, field: &tracing::field::Field, value: bool) {
        self.put(field.name(), serde_json::Value::Bool(value));
    }
}

/// JSONL tracing layer.
pub struct JsonlLayer<W = io::Stderr> {
    writer: Mutex<W>,
}

impl JsonlLayer<io::Stderr> {
    /// Create a new JSONL layer writing to stderr.
    pub fn stderr() -> Self {
        JsonlLayer {
            writer: Mutex::new(io::stderr()),
        }
    }
}

impl<W: Write> JsonlLayer<W> {
    /// Create a JSONL layer with a custom writer.
    pub fn new(writer: W) -> Self {
        JsonlLayer {
            writer: Mutex::new(writer),
        }
    }
}

impl<S, W> Layer<S> for JsonlLayer<W>
where
    S: Subscriber,
    W: Write + 'static,
{
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let mut visitor = JsonFieldVisitor::new();
        event.record(&mut visitor);

        let level: Level = (*event.metadata().level()).into();
        let mut obj = serde_json::Map::new();
        obj.insert("ts".to_string(), serde_json::json!(Utc::now().to_rfc3339()));
        obj.insert("level".to_string(), serde_json::json!(level));
        obj.insert(
            "event".to_string(),
            serde_json::json!(event.metadata().target()),
        );
        obj.extend(visitor.top);
        if let Some(msg) = visitor.message {
            obj.insert("message".to_string(), serde_json::json!(msg));
        }
        if !visitor.fields.is_empty() {
            obj.insert(
                "fields".to_string(),
                serde_json::Value::Object(visitor.fields),
            );
        }

        let json = serde_json::to_string(&serde_json::Value::Object(obj)).unwrap_or_default();
        if let Ok(mut writer) = self.writer.lock() {
            let _ = writeln!(writer, "{}", json);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use tracing_subscriber::layer::SubscriberExt;

    struct BufWriter(Arc<Mutex<Vec<u8>>>);

    impl Write for BufWriter {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().write(buf)
        }
        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    fn capture(f: impl FnOnce()) -> serde_json::Value {
        let buffer = Arc::new(Mutex::new(Vec::new()));
        let layer = JsonlLayer::new(BufWriter(buffer.clone()));
        let subscriber = tracing_subscriber::registry().with(layer);
        tracing::subscriber::with_default(subscriber, f);

        let output = buffer.lock().unwrap();
        let line = String::from_utf8_lossy(&output);
        serde_json::from_str(line.trim()).unwrap()
    }

    #[test]
    fn test_layer_writes_event_line() {
        let parsed = capture(|| {
            tracing::info!(target: "convert.source_done", run_id = "run-1", stage = "write", extracted = 2u64, message = "done");
        });

        assert_eq!(parsed["event"], "convert.source_done");
        assert_eq!(parsed["level"], "info");
        assert_eq!(parsed["run_id"], "run-1");
        assert_eq!(parsed["stage"], "write");
        assert_eq!(parsed["message"], "done");
        assert_eq!(parsed["fields"]["extracted"], 2);
        assert!(parsed["ts"].is_string());
    }

    #[test]
    fn test_sensitive_field_names_are_masked() {
        let parsed = capture(|| {
            tracing::warn!(target: "test", db_password = "hunter2", variable = "DB_PASSWORD", message = "x");
        });

        assert_eq!(parsed["fields"]["db_password"], MASK);
        assert_eq!(parsed["fields"]["variable"], "DB_PASSWORD");
        assert_eq!(parsed["level"], "warn");
    }

    #[test]
    fn test_no_fields_key_when_only_message() {
        let parsed = capture(|| {
            tracing::error!(target: "test", message = "only");
        });
        assert!(parsed.get("fields").is_none());
    }
}
