//! 应用层：遥测写入、路线规划与只读查询

pub mod ingestion_service;
pub mod query_service;
pub mod route_planning_service;
pub mod session;

pub use ingestion_service::IngestionService;
pub use query_service::{FillAlert, FleetQueryService, FleetView, RouteStopView, RouteView};
pub use route_planning_service::RoutePlanningService;
pub use session::FleetSession;
