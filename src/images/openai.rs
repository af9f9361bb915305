//! OpenAI image generation backend.

use super::error::ImageError;
use super::prompt::{dalle_prompt, dalle_size};
use super::ImageBackend;
use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

const BASE_URL: &str = "https://api.openai.com/v1";
const MODEL: &str = "dall-e-3";
const GENERATE_TIMEOUT: Duration = Duration::from_secs(300);
const DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Debug, Serialize)]
struct GenerationRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    size: &'a str,
    quality: &'a str,
    n: u8,
}

#[derive(Debug, Deserialize)]
struct GenerationResponse {
    data: Vec<GeneratedImage>,
}

#[derive(Debug, Deserialize)]
struct GeneratedImage {
    url: Option<String>,
}

pub struct OpenAiImages {
    client: Client,
    api_key: String,
    base_url: String,
}

impl OpenAiImages {
    pub fn new(api_key: String) -> Result<Self, ImageError> {
        Ok(Self {
            client: Client::builder().build()?,
            api_key,
            base_url: BASE_URL.to_string(),
        })
    }

    /// Point at a different API root (proxies, test servers).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    fn request_image_url(&self, prompt: &str, size: &str) -> Result<String, ImageError> {
        let body = GenerationRequest {
            model: MODEL,
            prompt,
            size,
            quality: "hd",
            n: 1,
        };

        let resp = self
            .client
            .post(format!("{}/images/generations", self.base_url))
            .bearer_auth(&self.api_key)
            .timeout(GENERATE_TIMEOUT)
            .json(&body)
            .send()?;

        let status = resp.status();
        if status.as_u16() == 429 {
            return Err(ImageError::RateLimited);
        }
        if !status.is_success() {
            let message = resp.text().unwrap_or_default();
            return Err(ImageError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let parsed: GenerationResponse = serde_json::from_str(&resp.text()?)?;
        parsed
            .data
            .into_iter()
            .find_map(|img| img.url)
            .ok_or(ImageError::MissingImage)
    }

    fn download(&self, url: &str) -> Result<Vec<u8>, ImageError> {
        let resp = self.client.get(url).timeout(DOWNLOAD_TIMEOUT).send()?;
        let status = resp.status();
        if !status.is_success() {
            return Err(ImageError::Api {
                status: status.as_u16(),
                message: format!("download failed: {url}"),
            });
        }
        Ok(resp.bytes()?.to_vec())
    }
}

impl ImageBackend for OpenAiImages {
    fn generate(&self, prompt: &str, width: u32, height: u32) -> Result<Vec<u8>, ImageError> {
        let prompt = dalle_prompt(prompt);
        let size = dalle_size(width, height);
        tracing::debug!(size, prompt = %crate::loader::truncate(&prompt, 80), "Requesting image");

        let url = self.request_image_url(&prompt, size)?;
        let bytes = self.download(&url)?;
        tracing::info!(bytes = bytes.len(), "Generated image");
        Ok(bytes)
    }
}
