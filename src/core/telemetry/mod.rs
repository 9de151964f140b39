//! Observability collector.
//!
//! [`Telemetry`] is a cheap, cloneable handle created once per process and
//! passed down to every session. Recording is fire-and-forget: records go
//! through an unbounded channel to a collector task which hands them to a
//! [`TelemetrySink`]. A disabled or stopped collector silently drops records,
//! so telemetry can never affect a session.

mod monitor;

use std::fmt;
use std::sync::{Arc, Mutex};

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

pub use monitor::LiveEventMonitor;

/// `tracing` target used by [`TracingSink`].
pub const TELEMETRY_TARGET: &str = "live_voice_gateway::telemetry";

// =============================================================================
// Records
// =============================================================================

/// Attribute value attached to a span record.
#[derive(Debug, Clone, PartialEq)]
pub enum AttributeValue {
    Str(String),
    Bool(bool),
    Int(i64),
}

impl fmt::Display for AttributeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttributeValue::Str(s) => write!(f, "{s:?}"),
            AttributeValue::Bool(b) => write!(f, "{b}"),
            AttributeValue::Int(i) => write!(f, "{i}"),
        }
    }
}

impl From<&str> for AttributeValue {
    fn from(value: &str) -> Self {
        AttributeValue::Str(value.to_string())
    }
}

impl From<String> for AttributeValue {
    fn from(value: String) -> Self {
        AttributeValue::Str(value)
    }
}

impl From<bool> for AttributeValue {
    fn from(value: bool) -> Self {
        AttributeValue::Bool(value)
    }
}

impl From<u32> for AttributeValue {
    fn from(value: u32) -> Self {
        AttributeValue::Int(i64::from(value))
    }
}

/// One span-like record.
#[derive(Debug, Clone, PartialEq)]
pub struct SpanRecord {
    pub name: &'static str,
    pub attributes: Vec<(&'static str, AttributeValue)>,
}

impl SpanRecord {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            attributes: Vec::new(),
        }
    }

    pub fn with(mut self, key: &'static str, value: impl Into<AttributeValue>) -> Self {
        self.attributes.push((key, value.into()));
        self
    }

    pub fn attribute(&self, key: &str) -> Option<&AttributeValue> {
        self.attributes
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, v)| v)
    }
}

impl fmt::Display for SpanRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)?;
        for (key, value) in &self.attributes {
            write!(f, " {key}={value}")?;
        }
        Ok(())
    }
}

// =============================================================================
// Sinks
// =============================================================================

/// Destination for span records.
pub trait TelemetrySink: Send + Sync {
    fn export(&self, record: SpanRecord);
}

/// Writes each record as a structured `tracing` event.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl TelemetrySink for TracingSink {
    fn export(&self, record: SpanRecord) {
        tracing::info!(
            target: TELEMETRY_TARGET,
            span = record.name,
            attributes = %record,
            "telemetry span"
        );
    }
}

/// Keeps records in memory.
#[derive(Debug, Default, Clone)]
pub struct RecordingSink {
    records: Arc<Mutex<Vec<SpanRecord>>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> Vec<SpanRecord> {
        self.records
            .lock()
            .map(|records| records.clone())
            .unwrap_or_default()
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.records().iter().map(|r| r.name).collect()
    }
}

impl TelemetrySink for RecordingSink {
    fn export(&self, record: SpanRecord) {
        if let Ok(mut records) = self.records.lock() {
            records.push(record);
        }
    }
}

// =============================================================================
// Handle
// =============================================================================

/// Process-scoped telemetry handle.
#[derive(Debug, Clone)]
pub struct Telemetry {
    tx: Option<mpsc::UnboundedSender<SpanRecord>>,
}

impl Telemetry {
    /// Start a collector task exporting to `sink`.
    ///
    /// The task ends once every handle clone has been dropped.
    pub fn spawn(sink: Arc<dyn TelemetrySink>) -> (Self, JoinHandle<()>) {
        let (tx, mut rx) = mpsc::unbounded_channel::<SpanRecord>();
        let handle = tokio::spawn(async move {
            while let Some(record) = rx.recv().await {
                sink.export(record);
            }
            tracing::debug!("Telemetry collector stopped");
        });
        (Self { tx: Some(tx) }, handle)
    }

    /// Handle that drops every record.
    pub fn disabled() -> Self {
        Self { tx: None }
    }

    /// Fire-and-forget.
    pub fn record(&self, record: SpanRecord) {
        if let Some(tx) = &self.tx {
            let _ = tx.send(record);
        }
    }
}
