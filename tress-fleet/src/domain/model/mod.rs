pub mod connection_status;
pub mod device_reading;
pub mod device_state;
pub mod route;
pub mod route_computation;
pub mod selection;

pub use connection_status::ConnectionStatus;
pub use device_reading::{DeviceReading, DistanceSample};
pub use device_state::{DeviceSnapshot, DeviceState, UpsertOutcome};
pub use route::{RouteRequest, RouteResult, RouteStop, RouteSummary, StrategyKind};
pub use route_computation::{RouteComputation, RouteComputationState};
pub use selection::SelectionContext;
