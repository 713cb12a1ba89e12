use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{de::DeserializeOwned, Deserialize, Deserializer};
use slog::{debug, warn, Logger};
use std::collections::HashMap;
use std::time::Duration;
use thiserror::Error;

use crate::AgentConfig;

/// Decoded METAR record as returned by CheckWX. Every group is optional,
/// as is every value inside a group. A group of the wrong shape reads as
/// absent without affecting the others.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct RawObservation {
    #[serde(default, deserialize_with = "lenient_text")]
    pub icao: Option<String>,
    #[serde(default, deserialize_with = "lenient_group")]
    pub elevation: Option<Elevation>,
    #[serde(default, deserialize_with = "lenient_group")]
    pub temperature: Option<Temperature>,
    #[serde(default, deserialize_with = "lenient_group")]
    pub dewpoint: Option<Temperature>,
    #[serde(default, deserialize_with = "lenient_group")]
    pub wind: Option<Wind>,
    #[serde(default, deserialize_with = "lenient_group")]
    pub visibility: Option<Visibility>,
    #[serde(default, deserialize_with = "lenient_group")]
    pub barometer: Option<Barometer>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Elevation {
    #[serde(default, deserialize_with = "lenient_number")]
    pub feet: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Temperature {
    #[serde(default, deserialize_with = "lenient_number")]
    pub celsius: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Wind {
    #[serde(default, deserialize_with = "lenient_number")]
    pub speed_kts: Option<f64>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub gust_kts: Option<f64>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub degrees: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Visibility {
    #[serde(default, deserialize_with = "lenient_number")]
    pub meters: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Barometer {
    #[serde(default, deserialize_with = "lenient_number")]
    pub mb: Option<f64>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum NumberOrText {
    Number(f64),
    Text(String),
    Other(serde::de::IgnoredAny),
}

/// CheckWX renders some values as strings with thousands separators
/// ("16,093"). Anything that is not a finite number reads as absent.
fn lenient_number<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = match Option::<NumberOrText>::deserialize(deserializer)? {
        Some(NumberOrText::Number(n)) => Some(n),
        Some(NumberOrText::Text(s)) => s.trim().replace(',', "").parse::<f64>().ok(),
        Some(NumberOrText::Other(_)) | None => None,
    };
    Ok(value.filter(|n| n.is_finite()))
}

fn lenient_group<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(value
        .filter(serde_json::Value::is_object)
        .and_then(|group| serde_json::from_value(group).ok()))
}

fn lenient_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(value.and_then(|v| v.as_str().map(str::to_string)))
}

/// Response envelope. `data` is kept loosely typed because CheckWX puts
/// plain strings in it for stations it does not know.
#[derive(Debug, Default, Deserialize)]
pub struct CheckWxResponse {
    #[serde(default)]
    pub data: Vec<serde_json::Value>,
}

impl CheckWxResponse {
    pub fn into_observations(self, logger: &Logger) -> Vec<RawObservation> {
        self.data
            .into_iter()
            .filter_map(|value| match serde_json::from_value::<RawObservation>(value.clone()) {
                Ok(observation) => Some(observation),
                Err(e) => {
                    warn!(logger, "ignoring entry {} in CheckWX payload: {}", value, e);
                    None
                }
            })
            .collect()
    }
}

#[derive(Debug, Clone, Error, PartialEq)]
pub enum FetchError {
    #[error("request to CheckWX failed: {0}")]
    Request(String),

    #[error("CheckWX returned status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("CheckWX returned no observations")]
    EmptyPayload,

    #[error("could not decode CheckWX response: {0}")]
    Decode(String),

    #[error("no observation for this airport in the CheckWX response")]
    MissingAirport,
}

pub type FetchResults = HashMap<String, Result<RawObservation, FetchError>>;

/// Source of raw observations. Every requested airport gets exactly one
/// entry in the returned map.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ObservationSource: Send + Sync {
    async fn fetch(&self, airports: &[String]) -> FetchResults;
}

pub struct CheckWxClient {
    logger: Logger,
    client: Client,
    base_url: String,
    api_key: String,
    per_airport_requests: bool,
}

impl CheckWxClient {
    pub fn new(logger: Logger, config: &AgentConfig) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .user_agent(config.user_agent())
            .timeout(Duration::from_secs(config.request_timeout))
            .build()?;
        Ok(Self {
            logger,
            client,
            base_url: config.checkwx_base_url.trim_end_matches('/').to_string(),
            api_key: config.checkwx_api_key.clone(),
            per_airport_requests: config.per_airport_requests,
        })
    }

    pub fn decoded_metar_url(&self, codes: &[String]) -> String {
        format!("{}/metar/{}/decoded", self.base_url, codes.join(","))
    }

    async fn fetch_records(&self, codes: &[String]) -> Result<Vec<RawObservation>, FetchError> {
        let url = self.decoded_metar_url(codes);
        debug!(self.logger, "requesting: {}", url);
        let response = self
            .client
            .get(&url)
            .header("X-API-Key", &self.api_key)
            .send()
            .await
            .map_err(|e| FetchError::Request(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| FetchError::Request(format!("error reading body: {}", e)))?;
        if status != StatusCode::OK {
            return Err(FetchError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let envelope: CheckWxResponse =
            serde_json::from_str(&body).map_err(|e| FetchError::Decode(e.to_string()))?;
        let records = envelope.into_observations(&self.logger);
        if records.is_empty() {
            return Err(FetchError::EmptyPayload);
        }
        Ok(records)
    }

    async fn fetch_group(&self, codes: &[String]) -> FetchResults {
        match self.fetch_records(codes).await {
            Ok(records) => attribute(&self.logger, codes, records),
            Err(e) => codes
                .iter()
                .map(|code| (code.clone(), Err(e.clone())))
                .collect(),
        }
    }
}

#[async_trait]
impl ObservationSource for CheckWxClient {
    async fn fetch(&self, airports: &[String]) -> FetchResults {
        if !self.per_airport_requests {
            return self.fetch_group(airports).await;
        }

        let mut results = FetchResults::with_capacity(airports.len());
        for code in airports {
            results.extend(self.fetch_group(std::slice::from_ref(code)).await);
        }
        results
    }
}

/// Match records to the requested codes by `icao`. A record without an
/// `icao` can only be attributed when a single airport was requested, and
/// then takes that airport's code.
fn attribute(logger: &Logger, codes: &[String], records: Vec<RawObservation>) -> FetchResults {
    let mut found: HashMap<String, RawObservation> = HashMap::new();
    for mut record in records {
        if record.icao.is_none() && codes.len() == 1 {
            record.icao = Some(codes[0].clone());
        }
        let code = match record.icao.as_deref() {
            Some(icao) => icao.trim().to_ascii_uppercase(),
            None => {
                warn!(logger, "dropping observation without icao from batched response");
                continue;
            }
        };
        if !codes.contains(&code) {
            warn!(logger, "dropping observation for unrequested station {}", code);
            continue;
        }
        found.entry(code).or_insert(record);
    }

    codes
        .iter()
        .map(|code| {
            let result = found.remove(code).ok_or(FetchError::MissingAirport);
            (code.clone(), result)
        })
        .collect()
}
