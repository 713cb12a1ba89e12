use async_trait::async_trait;
use reqwest::{header, Client, StatusCode};
use slog::{debug, info, Logger};
use std::time::Duration;
use thiserror::Error;

use crate::{AgentConfig, Point, AIRPORT_TAG};

/// A point InfluxDB accepted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ack {
    pub airport: String,
}

#[derive(Debug, Clone, Error, PartialEq)]
pub enum WriteError {
    #[error("request to InfluxDB failed: {0}")]
    Request(String),

    #[error("InfluxDB rejected the write with status {status}: {body}")]
    Rejected { status: u16, body: String },
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PointWriter: Send + Sync {
    async fn write(&self, point: &Point) -> Result<Ack, WriteError>;
}

/// Writes points one at a time to the InfluxDB v2 write API with
/// second precision.
pub struct InfluxWriter {
    logger: Logger,
    client: Client,
    write_url: String,
    org: String,
    bucket: String,
    token: String,
}

impl InfluxWriter {
    pub fn new(logger: Logger, config: &AgentConfig) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .user_agent(config.user_agent())
            .timeout(Duration::from_secs(config.request_timeout))
            .build()?;
        Ok(Self {
            logger,
            client,
            write_url: format!("{}/api/v2/write", config.influx_base_url()),
            org: config.influxdb_org.clone(),
            bucket: config.influxdb_bucket.clone(),
            token: config.influxdb_api_key.clone(),
        })
    }

    pub fn write_url(&self) -> &str {
        &self.write_url
    }
}

#[async_trait]
impl PointWriter for InfluxWriter {
    async fn write(&self, point: &Point) -> Result<Ack, WriteError> {
        let airport = point.tag_value(AIRPORT_TAG).unwrap_or_default().to_string();
        let body = point.to_line();
        debug!(self.logger, "writing point: {}", body);

        let response = self
            .client
            .post(&self.write_url)
            .query(&[
                ("org", self.org.as_str()),
                ("bucket", self.bucket.as_str()),
                ("precision", "s"),
            ])
            .header(header::AUTHORIZATION, format!("Token {}", self.token))
            .header(header::CONTENT_TYPE, "text/plain; charset=utf-8")
            .body(body)
            .send()
            .await
            .map_err(|e| WriteError::Request(e.to_string()))?;

        let status = response.status();
        if status != StatusCode::NO_CONTENT {
            let body = response
                .text()
                .await
                .unwrap_or_else(|e| format!("<unreadable body: {}>", e));
            return Err(WriteError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        info!(
            self.logger,
            "Successfully sent data to InfluxDB for airport {}", airport
        );
        Ok(Ack { airport })
    }
}
