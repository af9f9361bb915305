//! Compendium rows and image objects behind the REST and storage APIs.

use super::error::StoreError;
use super::{CompendiumStore, ImageCounts};
use crate::config::Config;
use reqwest::blocking::{Client, Response};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, CONTENT_TYPE};
use reqwest::Url;
use serde_json::{json, Map, Value as JsonValue};
use std::time::Duration;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);
const COUNT_TIMEOUT: Duration = Duration::from_secs(10);
const MAX_FETCH: usize = 1000;

pub struct RestStore {
    client: Client,
    api_url: String,
    bucket: String,
    headers: HeaderMap,
}

impl RestStore {
    pub fn new(config: &Config, bucket: impl Into<String>) -> anyhow::Result<Self> {
        Ok(Self {
            client: Client::builder().timeout(REQUEST_TIMEOUT).build()?,
            api_url: config.api_url.clone(),
            bucket: bucket.into(),
            headers: config.auth_headers()?,
        })
    }

    /// Upload endpoint with every path segment percent-encoded.
    pub fn object_url(&self, path: &str) -> Result<Url, StoreError> {
        let mut url = Url::parse(&format!("{}/storage/v1/object/{}", self.api_url, self.bucket))
            .map_err(|e| StoreError::Parse(e.to_string()))?;
        url.path_segments_mut()
            .map_err(|_| StoreError::Parse(format!("cannot build object url for {path}")))?
            .extend(path.split('/'));
        Ok(url)
    }

    pub fn public_url(&self, path: &str) -> String {
        format!(
            "{}/storage/v1/object/public/{}/{}",
            self.api_url, self.bucket, path
        )
    }

    /// Rows of `table` matching the `image_url` filter, counted server side.
    fn count_where(&self, table: &str, image_filter: &str) -> Result<usize, StoreError> {
        let mut headers = self.headers.clone();
        headers.insert("prefer", HeaderValue::from_static("count=exact"));

        let resp = self
            .client
            .get(format!("{}/rest/v1/{}", self.api_url, table))
            .headers(headers)
            .timeout(COUNT_TIMEOUT)
            .query(&[("select", "id"), ("image_url", image_filter)])
            .send()?;
        let resp = check(resp)?;

        if let Some(total) = resp
            .headers()
            .get("content-range")
            .and_then(|v| v.to_str().ok())
            .and_then(content_range_total)
        {
            return Ok(total);
        }

        let rows: Vec<JsonValue> = serde_json::from_str(&resp.text()?)?;
        Ok(rows.len())
    }

    fn json_headers(&self) -> HeaderMap {
        let mut headers = self.headers.clone();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        headers.insert("prefer", HeaderValue::from_static("return=representation"));
        headers
    }
}

fn check(resp: Response) -> Result<Response, StoreError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let message = resp.text().unwrap_or_default();
    Err(StoreError::Api {
        status: status.as_u16(),
        message,
    })
}

/// Total from a `content-range` header such as `0-24/311`. An unknown
/// total (`*`) gives `None`.
pub fn content_range_total(header: &str) -> Option<usize> {
    header.rsplit_once('/')?.1.trim().parse().ok()
}

/// Entries whose `image_url` is missing, null, or empty, up to `limit`.
pub fn without_image(entries: Vec<JsonValue>, limit: usize) -> Vec<Map<String, JsonValue>> {
    entries
        .into_iter()
        .filter_map(|e| match e {
            JsonValue::Object(map) => Some(map),
            _ => None,
        })
        .filter(|map| match map.get("image_url") {
            None | Some(JsonValue::Null) => true,
            Some(JsonValue::String(s)) => s.is_empty(),
            Some(_) => false,
        })
        .take(limit)
        .collect()
}

impl CompendiumStore for RestStore {
    fn entries_without_images(
        &self,
        table: &str,
        limit: usize,
    ) -> Result<Vec<Map<String, JsonValue>>, StoreError> {
        // Over-fetch and filter here; `is.null` filters miss empty strings
        let fetch = (limit.saturating_mul(3)).min(MAX_FETCH).to_string();
        let resp = self
            .client
            .get(format!("{}/rest/v1/{}", self.api_url, table))
            .headers(self.json_headers())
            .query(&[("select", "*"), ("limit", fetch.as_str())])
            .send()?;

        let entries: Vec<JsonValue> = serde_json::from_str(&check(resp)?.text()?)?;
        Ok(without_image(entries, limit))
    }

    fn upload_image(&self, path: &str, png: Vec<u8>) -> Result<String, StoreError> {
        let mut headers = self.headers.clone();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("image/png"));
        headers.insert("x-upsert", HeaderValue::from_static("true"));
        headers.insert(
            "cache-control",
            HeaderValue::from_static("public, max-age=3600"),
        );

        let resp = self
            .client
            .post(self.object_url(path)?)
            .headers(headers)
            .body(png)
            .send()?;
        check(resp)?;

        Ok(self.public_url(path))
    }

    fn set_image_url(&self, table: &str, id: &str, image_url: &str) -> Result<bool, StoreError> {
        let body = json!({
            "image_url": image_url,
            "image_generated_at": chrono::Utc::now()
                .to_rfc3339_opts(chrono::SecondsFormat::Millis, true),
        });

        let resp = self
            .client
            .patch(format!("{}/rest/v1/{}", self.api_url, table))
            .headers(self.json_headers())
            .query(&[("id", format!("eq.{id}"))])
            .json(&body)
            .send()?;

        let text = check(resp)?.text()?;
        if text.trim().is_empty() {
            return Ok(false);
        }
        let updated: JsonValue = serde_json::from_str(&text)?;
        Ok(updated.as_array().is_some_and(|rows| !rows.is_empty()))
    }

    fn count_images(&self, table: &str) -> Result<ImageCounts, StoreError> {
        Ok(ImageCounts {
            with_image: self.count_where(table, "not.is.null")?,
            without_image: self.count_where(table, "is.null")?,
        })
    }
}
