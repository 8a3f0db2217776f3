pub mod cancellation;
pub mod delegated_strategy;
pub mod exact_strategy;
pub mod route_optimizer;

pub use cancellation::CancellationFlag;
pub use delegated_strategy::{DelegatedRoutePlanner, remap_waypoints};
pub use exact_strategy::ExactRouteSolver;
pub use route_optimizer::{RouteOptimizer, RouteStrategyPolicy, resolve_stops};
