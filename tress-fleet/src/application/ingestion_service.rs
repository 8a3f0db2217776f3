use std::sync::Arc;

use tracing::{debug, info};
use tress_core::FleetMetrics;

use crate::application::FleetSession;
use crate::domain::DeviceStateRepository;
use crate::domain::model::{DeviceReading, UpsertOutcome};

/// 遥测写入服务：合并读数并驱动首设备自动聚焦
pub struct IngestionService {
    store: Arc<dyn DeviceStateRepository>,
    session: Arc<FleetSession>,
    metrics: Arc<FleetMetrics>,
}

impl IngestionService {
    pub fn new(
        store: Arc<dyn DeviceStateRepository>,
        session: Arc<FleetSession>,
        metrics: Arc<FleetMetrics>,
    ) -> Self {
        Self {
            store,
            session,
            metrics,
        }
    }

    pub fn ingest(&self, reading: DeviceReading) -> UpsertOutcome {
        let outcome = self.store.upsert(&reading);
        self.metrics.readings_ingested_total.inc();

        if let UpsertOutcome::Created { .. } = outcome {
            self.metrics.devices_known.set(self.store.len() as i64);
            info!(device = %reading.identity, "Discovered new device");
        }

        if self.session.observe_upsert(&reading.identity, outcome) {
            info!(device = %reading.identity, "Focused first discovered device");
        }

        debug!(
            device = %reading.identity,
            has_location = reading.latitude.is_some() && reading.longitude.is_some(),
            fills = reading.category_fills.len(),
            "Merged telemetry reading"
        );
        outcome
    }
}
