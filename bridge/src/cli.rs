use clap::builder::BoolishValueParser;
use clap::Parser;

use netatmo2mqtt_common::config::{DEFAULT_API_URL, DEFAULT_MQTT_HOST, DEFAULT_MQTT_PORT};
use netatmo2mqtt_common::{
    BridgeConfig, MqttConfig, NetatmoConfig, DEFAULT_CLIENT_ID, DEFAULT_TOPIC_PREFIX,
};

/// Read room temperatures from the Netatmo API and publish them to an MQTT broker.
#[derive(Clone, Debug, Parser)]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Netatmo OAuth client id (get it from https://dev.netatmo.com/apps/)
    #[arg(env = "OAUTH_CLIENT_ID", long = "oauth-client-id", value_name = "id")]
    pub oauth_client_id: String,

    /// Netatmo OAuth client secret
    #[arg(
        env = "OAUTH_CLIENT_SECRET",
        long = "oauth-client-secret",
        value_name = "secret",
        hide_env_values = true
    )]
    pub oauth_client_secret: String,

    /// Netatmo OAuth refresh token
    #[arg(
        env = "OAUTH_REFRESH_TOKEN",
        long = "oauth-refresh-token",
        value_name = "token",
        hide_env_values = true
    )]
    pub oauth_refresh_token: String,

    /// Netatmo API base URL
    #[arg(
        env = "NETATMO_API_URL",
        long = "netatmo-api-url",
        value_name = "url",
        default_value = DEFAULT_API_URL
    )]
    pub netatmo_api_url: String,

    /// Home to read; defaults to the first home of the account
    #[arg(env = "NETATMO_HOME_ID", long = "netatmo-home-id", value_name = "id")]
    pub netatmo_home_id: Option<String>,

    /// MQTT server hostname
    #[arg(
        env = "MQTT_HOSTNAME",
        long = "mqtt-hostname",
        value_name = "host",
        default_value = DEFAULT_MQTT_HOST
    )]
    pub mqtt_hostname: String,

    /// MQTT server port
    #[arg(
        env = "MQTT_PORT",
        long = "mqtt-port",
        value_name = "port",
        default_value_t = DEFAULT_MQTT_PORT
    )]
    pub mqtt_port: u16,

    /// MQTT topic prefix
    #[arg(
        env = "MQTT_TOPIC_PREFIX",
        long = "mqtt-topic-prefix",
        value_name = "prefix",
        default_value = DEFAULT_TOPIC_PREFIX
    )]
    pub mqtt_topic_prefix: String,

    /// MQTT client identifier
    #[arg(
        env = "MQTT_CLIENT_ID",
        long = "mqtt-client-id",
        value_name = "id",
        default_value = DEFAULT_CLIENT_ID
    )]
    pub mqtt_client_id: String,

    /// MQTT username
    #[arg(env = "MQTT_USERNAME", long = "mqtt-username", value_name = "user")]
    pub mqtt_username: Option<String>,

    /// MQTT password
    #[arg(
        env = "MQTT_PASSWORD",
        long = "mqtt-password",
        value_name = "pass",
        hide_env_values = true,
        requires = "mqtt_username"
    )]
    pub mqtt_password: Option<String>,

    /// Publish readings as retained messages (env accepts true/false, 1/0, yes/no, on/off)
    #[arg(
        env = "MQTT_RETAIN",
        long = "mqtt-retain",
        value_parser = BoolishValueParser::new()
    )]
    pub mqtt_retain: bool,

    /// Fetch and join readings but only log what would be published
    #[arg(long = "dry-run")]
    pub dry_run: bool,
}

impl Cli {
    pub fn into_config(self) -> BridgeConfig {
        BridgeConfig {
            netatmo: NetatmoConfig {
                client_id: self.oauth_client_id,
                client_secret: self.oauth_client_secret,
                refresh_token: self.oauth_refresh_token,
                api_url: self.netatmo_api_url,
                home_id: self.netatmo_home_id,
            },
            mqtt: MqttConfig {
                host: self.mqtt_hostname,
                port: self.mqtt_port,
                topic_prefix: self.mqtt_topic_prefix,
                client_id: self.mqtt_client_id,
                username: self.mqtt_username,
                password: self.mqtt_password,
                retain: self.mqtt_retain,
            },
        }
    }
}
