use std::collections::BTreeMap;

use serde::Serialize;

/// Short-lived bearer token for the Netatmo API. Lives for one run only.
#[derive(Clone, PartialEq, Eq)]
pub struct AccessToken(String);

impl AccessToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Last eight characters, enough to tell tokens apart in logs.
    pub fn masked(&self) -> String {
        let tail: String = self
            .0
            .chars()
            .rev()
            .take(8)
            .collect::<Vec<_>>()
            .into_iter()
            .rev()
            .collect();
        format!("...{tail}")
    }
}

impl std::fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("AccessToken").field(&self.masked()).finish()
    }
}

/// Identity of the selected home and the names of its rooms.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HomeTopology {
    pub home_id: String,
    pub room_names: BTreeMap<String, String>,
}

/// A measured room temperature as reported by the home status endpoint.
#[derive(Debug, Clone, PartialEq)]
pub struct RoomReading {
    pub room_id: String,
    pub temperature: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TemperatureRecord {
    #[serde(rename = "roomId")]
    pub room_id: String,
    pub slug: String,
    #[serde(rename = "roomName")]
    pub room_name: String,
    pub temperature: f64,
}

impl TemperatureRecord {
    pub fn to_payload(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }
}
