pub mod device_state_store;

pub use device_state_store::InMemoryDeviceStateStore;
