pub mod telemetry_adapter;

pub use telemetry_adapter::TelemetryAdapter;
