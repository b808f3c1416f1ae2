use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::topics::{DEFAULT_CLIENT_ID, DEFAULT_TOPIC_PREFIX};

pub const DEFAULT_API_URL: &str = "https://api.netatmo.com";
pub const DEFAULT_MQTT_HOST: &str = "localhost";
pub const DEFAULT_MQTT_PORT: u16 = 1883;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("{0} must not be empty")]
    Empty(&'static str),
    #[error("mqtt port must be between 1 and 65535")]
    InvalidPort,
    #[error("mqtt password is set but mqtt username is not")]
    PasswordWithoutUsername,
}

/// Credentials and endpoint for the Netatmo cloud API.
#[derive(Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NetatmoConfig {
    pub client_id: String,
    pub client_secret: String,
    pub refresh_token: String,
    pub api_url: String,
    /// Home to read; the first home of the account when unset.
    #[serde(default)]
    pub home_id: Option<String>,
}

impl NetatmoConfig {
    pub fn new(
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
        refresh_token: impl Into<String>,
    ) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            refresh_token: refresh_token.into(),
            api_url: DEFAULT_API_URL.to_string(),
            home_id: None,
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.client_id.trim().is_empty() {
            return Err(ConfigError::Empty("oauth client id"));
        }
        if self.client_secret.trim().is_empty() {
            return Err(ConfigError::Empty("oauth client secret"));
        }
        if self.refresh_token.trim().is_empty() {
            return Err(ConfigError::Empty("oauth refresh token"));
        }
        if self.api_url.trim().is_empty() {
            return Err(ConfigError::Empty("netatmo api url"));
        }
        Ok(())
    }
}

// Secrets stay out of log lines.
impl std::fmt::Debug for NetatmoConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NetatmoConfig")
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .field("refresh_token", &"<redacted>")
            .field("api_url", &self.api_url)
            .field("home_id", &self.home_id)
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MqttConfig {
    pub host: String,
    pub port: u16,
    pub topic_prefix: String,
    pub client_id: String,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default, skip_serializing)]
    pub password: Option<String>,
    #[serde(default)]
    pub retain: bool,
}

impl Default for MqttConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_MQTT_HOST.to_string(),
            port: DEFAULT_MQTT_PORT,
            topic_prefix: DEFAULT_TOPIC_PREFIX.to_string(),
            client_id: DEFAULT_CLIENT_ID.to_string(),
            username: None,
            password: None,
            retain: false,
        }
    }
}

impl MqttConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.host.trim().is_empty() {
            return Err(ConfigError::Empty("mqtt hostname"));
        }
        if self.port == 0 {
            return Err(ConfigError::InvalidPort);
        }
        if self.client_id.is_empty() {
            return Err(ConfigError::Empty("mqtt client id"));
        }
        if self.password.is_some() && self.username.is_none() {
            return Err(ConfigError::PasswordWithoutUsername);
        }
        Ok(())
    }
}

/// Everything a single bridge run needs, resolved once at startup.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BridgeConfig {
    pub netatmo: NetatmoConfig,
    #[serde(default)]
    pub mqtt: MqttConfig,
}

impl BridgeConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.netatmo.validate()?;
        self.mqtt.validate()
    }
}
