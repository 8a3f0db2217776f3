use indexmap::IndexMap;
use indexmap::map::Entry;
use parking_lot::RwLock;

use crate::domain::DeviceStateRepository;
use crate::domain::model::{DeviceReading, DeviceSnapshot, DeviceState, UpsertOutcome};
use crate::domain::value_object::{DeviceIdentity, FillGauge};

/// 内存版设备状态存储
///
/// 写锁内完成整条读数的合并，快照在读锁内整体复制，
/// 因此快照只会反映完整应用过的 upsert。按首次出现顺序迭代。
pub struct InMemoryDeviceStateStore {
    devices: RwLock<IndexMap<DeviceIdentity, DeviceState>>,
    gauge: FillGauge,
}

impl InMemoryDeviceStateStore {
    pub fn new(gauge: FillGauge) -> Self {
        Self {
            devices: RwLock::new(IndexMap::new()),
            gauge,
        }
    }

    pub fn get(&self, identity: &DeviceIdentity) -> Option<DeviceState> {
        self.devices.read().get(identity).cloned()
    }
}

impl Default for InMemoryDeviceStateStore {
    fn default() -> Self {
        Self::new(FillGauge::default())
    }
}

impl DeviceStateRepository for InMemoryDeviceStateStore {
    fn upsert(&self, reading: &DeviceReading) -> UpsertOutcome {
        let mut map = self.devices.write();
        let was_empty = map.is_empty();

        match map.entry(reading.identity.clone()) {
            Entry::Occupied(mut entry) => {
                entry.get_mut().merge(reading, &self.gauge);
                UpsertOutcome::Merged
            }
            Entry::Vacant(entry) => {
                entry.insert(DeviceState::from_reading(reading, &self.gauge));
                UpsertOutcome::Created {
                    first_in_store: was_empty,
                }
            }
        }
    }

    fn snapshot(&self) -> DeviceSnapshot {
        let map = self.devices.read();
        DeviceSnapshot::new(map.values().cloned().collect())
    }

    fn len(&self) -> usize {
        self.devices.read().len()
    }
}
