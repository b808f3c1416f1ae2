use anyhow::Context;
use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use netatmo2mqtt_common::{join_rooms, room_topic, BridgeConfig, MqttConfig, TemperatureRecord};

use crate::cli::Cli;
use crate::error::RunError;
use crate::mqtt::{DryRunPublisher, MqttPublisher, PublishError, Publisher};
use crate::netatmo::NetatmoClient;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub home_id: String,
    pub published: usize,
}

pub async fn run() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let dry_run = cli.dry_run;
    let config = cli.into_config();

    let api = NetatmoClient::new(config.netatmo.api_url.clone())
        .context("failed to build netatmo http client")?;

    let result = if dry_run {
        run_once(&config, &api, &mut DryRunPublisher).await
    } else {
        let mut publisher = MqttPublisher::new(config.mqtt.clone());
        run_once(&config, &api, &mut publisher).await
    };
    let summary = result.inspect_err(|err| error!(kind = ?err.kind(), "bridge run failed"))?;

    info!(
        home_id = %summary.home_id,
        "done, published {} room temperatures",
        summary.published
    );
    Ok(())
}

/// One pass of the bridge: token, topology, telemetry, join, publish.
///
/// The config is validated here, before any network call. Every step must
/// succeed before the next starts, so a failure before the join leaves the
/// broker untouched.
pub async fn run_once<P: Publisher>(
    config: &BridgeConfig,
    api: &NetatmoClient,
    publisher: &mut P,
) -> Result<RunSummary, RunError> {
    config.validate()?;

    let token = api.access_token(&config.netatmo).await?;
    info!("new access token: {}", token.masked());

    let topology = api
        .home_topology(&token, config.netatmo.home_id.as_deref())
        .await?;
    info!(home_id = %topology.home_id, "home loaded");
    info!("room names: {:?}", topology.room_names);

    let readings = api.room_temperatures(&token, &topology.home_id).await?;
    info!(
        "room temperatures: {:?}",
        readings
            .iter()
            .map(|reading| (reading.room_id.as_str(), reading.temperature))
            .collect::<Vec<_>>()
    );

    let records = join_rooms(&topology, &readings)?;
    let published = publish_records(&config.mqtt, &records, publisher).await?;

    Ok(RunSummary {
        home_id: topology.home_id,
        published,
    })
}

/// Publishes each record on `<prefix><slug>`, stopping at the first failure.
pub async fn publish_records<P: Publisher>(
    mqtt: &MqttConfig,
    records: &[TemperatureRecord],
    publisher: &mut P,
) -> Result<usize, PublishError> {
    for record in records {
        let topic = room_topic(&mqtt.topic_prefix, &record.slug);
        let payload = record.to_payload().map_err(|source| PublishError::Payload {
            topic: topic.clone(),
            source,
        })?;

        publisher.publish(&topic, payload).await?;
        info!("mqtt published: {topic}");
    }
    Ok(records.len())
}
