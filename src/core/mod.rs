pub mod live;
pub mod telemetry;

// Re-export commonly used types for convenience
pub use live::{
    LiveBackend, LiveBackendKind, LiveError, LiveEvent, LiveRequestQueue, LiveResult, LiveSession,
    RunConfig, SessionRequest, SharedLiveBackend, create_live_backend,
    get_supported_live_backends,
};

pub use telemetry::{LiveEventMonitor, SpanRecord, Telemetry, TelemetrySink, TracingSink};
