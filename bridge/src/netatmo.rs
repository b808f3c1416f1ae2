use std::collections::BTreeMap;

use reqwest::{header, Client, RequestBuilder, StatusCode};
use serde::{de::DeserializeOwned, Deserialize};
use thiserror::Error;
use tracing::{debug, field, warn};

use netatmo2mqtt_common::{
    latest_readings, AccessToken, HomeTopology, NetatmoConfig, RoomReading,
};

use crate::error::ErrorKind;

const TOKEN_PATH: &str = "/oauth2/token";
const HOMES_DATA_PATH: &str = "/api/homesdata";
const HOME_STATUS_PATH: &str = "/api/homestatus";

/// Errors returned by the Netatmo API client.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The token endpoint refused the refresh grant.
    #[error("/oauth2/token did not return HTTP 200 (got {0})")]
    TokenRejected(StatusCode),

    #[error("no access_token in /oauth2/token response")]
    MissingAccessToken,

    /// A data endpoint refused the access token.
    #[error("{endpoint} rejected the access token (HTTP {status})")]
    Unauthorized {
        endpoint: &'static str,
        status: StatusCode,
    },

    #[error("{endpoint} did not return HTTP 200 (got {status})")]
    Status {
        endpoint: &'static str,
        status: StatusCode,
    },

    #[error("{endpoint} returned data in unknown format: {reason}")]
    Schema {
        endpoint: &'static str,
        reason: String,
    },

    #[error("request to {endpoint} failed: {source}")]
    Transport {
        endpoint: &'static str,
        #[source]
        source: reqwest::Error,
    },
}

impl ApiError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::TokenRejected(_) | Self::MissingAccessToken | Self::Unauthorized { .. } => {
                ErrorKind::Authentication
            }
            Self::Schema { .. } => ErrorKind::Schema,
            Self::Status { .. } | Self::Transport { .. } => ErrorKind::Transport,
        }
    }

    fn schema(endpoint: &'static str, reason: impl Into<String>) -> Self {
        Self::Schema {
            endpoint,
            reason: reason.into(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: Option<String>,
    refresh_token: Option<String>,
    expires_in: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    body: T,
}

#[derive(Debug, Deserialize)]
struct HomesData {
    homes: Vec<HomeEntry>,
}

#[derive(Debug, Deserialize)]
struct HomeEntry {
    id: String,
    rooms: Option<Vec<RoomEntry>>,
}

#[derive(Debug, Deserialize)]
struct RoomEntry {
    id: String,
    name: String,
}

#[derive(Debug, Deserialize)]
struct HomeStatusBody {
    home: Option<HomeStatus>,
}

#[derive(Debug, Deserialize)]
struct HomeStatus {
    modules: Option<Vec<serde_json::Value>>,
    rooms: Option<Vec<RoomStatus>>,
}

#[derive(Debug, Deserialize)]
struct RoomStatus {
    id: String,
    therm_measured_temperature: Option<f64>,
}

/// Client for the three Netatmo endpoints a bridge run needs.
#[derive(Debug, Clone)]
pub struct NetatmoClient {
    http: Client,
    base_url: String,
}

impl NetatmoClient {
    pub fn new(base_url: impl Into<String>) -> Result<Self, reqwest::Error> {
        let http = Client::builder()
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            http,
            base_url: base_url.into(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url.trim_end_matches('/'))
    }

    /// Exchanges the configured refresh token for a fresh access token.
    pub async fn access_token(&self, config: &NetatmoConfig) -> Result<AccessToken, ApiError> {
        let form = [
            ("grant_type", "refresh_token"),
            ("refresh_token", config.refresh_token.as_str()),
            ("client_id", config.client_id.as_str()),
            ("client_secret", config.client_secret.as_str()),
        ];

        debug!("requesting access token");
        let response = self
            .http
            .post(self.url(TOKEN_PATH))
            .header(
                header::CONTENT_TYPE,
                "application/x-www-form-urlencoded; charset=UTF-8",
            )
            .form(&form)
            .send()
            .await
            .map_err(|source| ApiError::Transport {
                endpoint: TOKEN_PATH,
                source,
            })?;

        let status = response.status();
        if status != StatusCode::OK {
            warn!(response = field::display(status), "token request rejected");
            return Err(ApiError::TokenRejected(status));
        }

        let body = response.text().await.map_err(|source| ApiError::Transport {
            endpoint: TOKEN_PATH,
            source,
        })?;
        let token: TokenResponse = serde_json::from_str(&body)
            .map_err(|err| ApiError::schema(TOKEN_PATH, err.to_string()))?;

        if let Some(expires_in) = token.expires_in {
            debug!("access token expires in {expires_in}s");
        }
        if token
            .refresh_token
            .as_deref()
            .is_some_and(|rotated| rotated != config.refresh_token)
        {
            warn!("netatmo rotated the refresh token; the configured one may stop working");
        }

        match token.access_token {
            Some(access_token) if !access_token.is_empty() => Ok(AccessToken::new(access_token)),
            _ => Err(ApiError::MissingAccessToken),
        }
    }

    /// Loads the home id and room names of the selected home.
    ///
    /// Without `home_id` the first home of the account is used.
    pub async fn home_topology(
        &self,
        token: &AccessToken,
        home_id: Option<&str>,
    ) -> Result<HomeTopology, ApiError> {
        let request = self
            .http
            .get(self.url(HOMES_DATA_PATH))
            .bearer_auth(token.as_str());
        let data: Envelope<HomesData> = self.fetch(request, HOMES_DATA_PATH).await?;

        let home = select_home(data.body.homes, home_id)?;
        let rooms = home
            .rooms
            .ok_or_else(|| ApiError::schema(HOMES_DATA_PATH, "home has no rooms field"))?;

        Ok(HomeTopology {
            home_id: home.id,
            room_names: rooms
                .into_iter()
                .map(|room| (room.id, room.name))
                .collect::<BTreeMap<_, _>>(),
        })
    }

    /// Loads the measured temperature of every room of `home_id`, in API order.
    ///
    /// A room listed more than once keeps its first position and its last value.
    pub async fn room_temperatures(
        &self,
        token: &AccessToken,
        home_id: &str,
    ) -> Result<Vec<RoomReading>, ApiError> {
        let request = self
            .http
            .get(self.url(HOME_STATUS_PATH))
            .bearer_auth(token.as_str())
            .query(&[("home_id", home_id)]);
        let data: Envelope<HomeStatusBody> = self.fetch(request, HOME_STATUS_PATH).await?;

        let home = data
            .body
            .home
            .ok_or_else(|| ApiError::schema(HOME_STATUS_PATH, "missing body.home"))?;
        // modules is checked for presence only; readings come from rooms.
        if home.modules.is_none() {
            return Err(ApiError::schema(HOME_STATUS_PATH, "missing body.home.modules"));
        }
        let rooms = home
            .rooms
            .ok_or_else(|| ApiError::schema(HOME_STATUS_PATH, "missing body.home.rooms"))?;

        let readings = rooms
            .into_iter()
            .map(|room| match room.therm_measured_temperature {
                Some(temperature) => Ok(RoomReading {
                    room_id: room.id,
                    temperature,
                }),
                None => Err(ApiError::schema(
                    HOME_STATUS_PATH,
                    format!("room {} has no therm_measured_temperature", room.id),
                )),
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(latest_readings(&readings))
    }

    async fn fetch<T>(&self, request: RequestBuilder, endpoint: &'static str) -> Result<T, ApiError>
    where
        T: DeserializeOwned,
    {
        let response = request
            .send()
            .await
            .map_err(|source| ApiError::Transport { endpoint, source })?;

        let status = response.status();
        debug!(endpoint, response = field::display(status), "received response");
        match status {
            StatusCode::OK => {}
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                return Err(ApiError::Unauthorized { endpoint, status })
            }
            _ => return Err(ApiError::Status { endpoint, status }),
        }

        let body = response
            .text()
            .await
            .map_err(|source| ApiError::Transport { endpoint, source })?;
        serde_json::from_str(&body).map_err(|err| ApiError::schema(endpoint, err.to_string()))
    }
}

fn select_home(homes: Vec<HomeEntry>, home_id: Option<&str>) -> Result<HomeEntry, ApiError> {
    let total = homes.len();
    match home_id {
        Some(wanted) => homes
            .into_iter()
            .find(|home| home.id == wanted)
            .ok_or_else(|| ApiError::schema(HOMES_DATA_PATH, format!("no home with id {wanted}"))),
        None => {
            if total > 1 {
                warn!(
                    "account has {total} homes; using the first, {} ignored",
                    total - 1
                );
            }
            homes
                .into_iter()
                .next()
                .ok_or_else(|| ApiError::schema(HOMES_DATA_PATH, "body.homes is empty"))
        }
    }
}
