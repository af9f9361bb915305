//! PostgREST table endpoint sink.

use super::{InsertOutcome, Sink, SinkError};
use crate::config::Config;
use crate::record::Record;
use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use serde::Serialize;
use std::time::Duration;

const BULK_TIMEOUT: Duration = Duration::from_secs(30);
const SINGLE_TIMEOUT: Duration = Duration::from_secs(10);

/// Insert-if-absent: duplicates are merged instead of failing the batch.
const PREFER_MERGE: &str = "return=minimal,resolution=merge-duplicates";

pub struct RestSink {
    client: Client,
    base_url: String,
    headers: HeaderMap,
}

impl RestSink {
    pub fn new(config: &Config) -> anyhow::Result<Self> {
        let mut headers = config.auth_headers()?;
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert("prefer", HeaderValue::from_static(PREFER_MERGE));

        Ok(Self {
            client: Client::builder().build()?,
            base_url: format!("{}/rest/v1", config.api_url),
            headers,
        })
    }

    pub fn table_url(&self, table: &str) -> String {
        format!("{}/{}", self.base_url, table)
    }

    fn post<T: Serialize + ?Sized>(
        &self,
        table: &str,
        payload: &T,
        timeout: Duration,
    ) -> Result<InsertOutcome, SinkError> {
        let body = serde_json::to_vec(payload)?;
        let resp = self
            .client
            .post(self.table_url(table))
            .headers(self.headers.clone())
            .timeout(timeout)
            .body(body)
            .send()?;

        let status = resp.status().as_u16();
        let body = if resp.status().is_success() {
            String::new()
        } else {
            resp.text().unwrap_or_default()
        };
        tracing::debug!(table, status, "Insert response");
        Ok(InsertOutcome::from_status(status, body))
    }
}

impl Sink for RestSink {
    fn insert_many(&mut self, table: &str, records: &[Record]) -> Result<InsertOutcome, SinkError> {
        self.post(table, records, BULK_TIMEOUT)
    }

    fn insert_one(&mut self, table: &str, record: &Record) -> Result<InsertOutcome, SinkError> {
        self.post(table, record, SINGLE_TIMEOUT)
    }
}
