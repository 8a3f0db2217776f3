pub mod bootstrap;
pub mod wire;

pub use bootstrap::FleetBootstrap;
pub use wire::{FleetContext, build_context, initialize};
