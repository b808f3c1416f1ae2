pub mod config;
pub mod join;
pub mod topics;
pub mod types;

pub use config::{BridgeConfig, ConfigError, MqttConfig, NetatmoConfig};
pub use join::{join_rooms, latest_readings, JoinError};
pub use topics::*;
pub use types::{AccessToken, HomeTopology, RoomReading, TemperatureRecord};
