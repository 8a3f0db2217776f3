pub mod osrm_client;

pub use osrm_client::OsrmTripClient;
