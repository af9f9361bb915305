//! Artwork generation for compendium entries.
//!
//! For each entry without an image: build a prompt, generate a PNG (with
//! retries), shrink and recompress it, upload it to object storage, and patch
//! the row with the public URL. Entries are processed one at a time and a failing entry never stops
//! the run.

pub mod error;
pub mod openai;
pub mod optimize;
pub mod prompt;
pub mod store;

pub use error::{EntryError, ImageError, StoreError};
pub use openai::OpenAiImages;
pub use store::RestStore;

use crate::config::ImageGenConfig;
use serde_json::{Map, Value as JsonValue};
use std::thread;
use std::time::Duration;

/// Compendium category; each maps to one table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum EntryType {
    Monsters,
    Equipment,
    Relics,
    Jobs,
}

impl EntryType {
    pub const ALL: [EntryType; 4] = [
        EntryType::Monsters,
        EntryType::Equipment,
        EntryType::Relics,
        EntryType::Jobs,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EntryType::Monsters => "monsters",
            EntryType::Equipment => "equipment",
            EntryType::Relics => "relics",
            EntryType::Jobs => "jobs",
        }
    }

    pub fn table(&self) -> &'static str {
        match self {
            EntryType::Monsters => "compendium_monsters",
            EntryType::Equipment => "compendium_equipment",
            EntryType::Relics => "compendium_relics",
            EntryType::Jobs => "compendium_jobs",
        }
    }
}

impl std::str::FromStr for EntryType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "monsters" => Ok(EntryType::Monsters),
            "equipment" => Ok(EntryType::Equipment),
            "relics" => Ok(EntryType::Relics),
            "jobs" => Ok(EntryType::Jobs),
            _ => Err(format!(
                "Unknown entry type: {}. Valid options: monsters, equipment, relics, jobs",
                s
            )),
        }
    }
}

impl std::fmt::Display for EntryType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Text-to-image service.
pub trait ImageBackend {
    fn generate(&self, prompt: &str, width: u32, height: u32) -> Result<Vec<u8>, ImageError>;
}

/// Where entries are read from and images are written to.
pub trait CompendiumStore {
    fn entries_without_images(
        &self,
        table: &str,
        limit: usize,
    ) -> Result<Vec<Map<String, JsonValue>>, StoreError>;

    /// Store `png` at `path`, returning its public URL.
    fn upload_image(&self, path: &str, png: Vec<u8>) -> Result<String, StoreError>;

    /// Returns false when no row matched `id`.
    fn set_image_url(&self, table: &str, id: &str, image_url: &str) -> Result<bool, StoreError>;

    /// Rows with and without an `image_url`.
    fn count_images(&self, table: &str) -> Result<ImageCounts, StoreError>;
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImageCounts {
    pub with_image: usize,
    pub without_image: usize,
}

impl ImageCounts {
    pub fn total(&self) -> usize {
        self.with_image + self.without_image
    }

    /// Share of rows that have an image, 0-100. Empty tables report 0.
    pub fn percent_done(&self) -> f64 {
        match self.total() {
            0 => 0.0,
            total => self.with_image as f64 * 100.0 / total as f64,
        }
    }
}

/// Image counts for every entry type, in [`EntryType::ALL`] order. A failed
/// count is reported for its type and does not stop the others.
pub fn image_status<S: CompendiumStore + ?Sized>(
    store: &S,
) -> Vec<(EntryType, Result<ImageCounts, StoreError>)> {
    EntryType::ALL
        .iter()
        .map(|&entry_type| (entry_type, store.count_images(entry_type.table())))
        .collect()
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImageRunSummary {
    pub attempted: usize,
    pub generated: usize,
}

pub struct ImagePipeline<'a, B: ImageBackend, S: CompendiumStore> {
    backend: &'a B,
    store: &'a S,
    config: &'a ImageGenConfig,
}

impl<'a, B: ImageBackend, S: CompendiumStore> ImagePipeline<'a, B, S> {
    pub fn new(backend: &'a B, store: &'a S, config: &'a ImageGenConfig) -> Self {
        Self {
            backend,
            store,
            config,
        }
    }

    /// Generate images for up to `limit` entries of `entry_type`.
    pub fn run(&self, entry_type: EntryType, limit: usize) -> Result<ImageRunSummary, StoreError> {
        let entries = self.store.entries_without_images(entry_type.table(), limit)?;
        let mut summary = ImageRunSummary::default();

        if entries.is_empty() {
            println!("No entries without images found for {}", entry_type);
            return Ok(summary);
        }

        println!("Found {} entries to process", entries.len());

        for (i, entry) in entries.iter().enumerate() {
            println!(
                "[{}/{}] {}",
                i + 1,
                entries.len(),
                entry_name(entry).unwrap_or("Unknown")
            );
            summary.attempted += 1;

            match self.process_entry(entry, entry_type) {
                Ok(url) => {
                    summary.generated += 1;
                    println!("  ✓ {}", url);
                }
                Err(e) => println!("  ✗ {}", e),
            }

            if i + 1 < entries.len() {
                pause(self.config.batch.delay_seconds);
            }
        }

        Ok(summary)
    }

    /// Generate, upload, and link one entry's image. Returns the public URL.
    pub fn process_entry(
        &self,
        entry: &Map<String, JsonValue>,
        entry_type: EntryType,
    ) -> Result<String, EntryError> {
        let id = entry_id(entry).ok_or(EntryError::MissingId)?;
        let name = entry_name(entry).unwrap_or("unknown");

        let prompt = prompt::build_prompt(entry, entry_type, self.config);
        tracing::debug!(id = %id, prompt = %crate::loader::truncate(&prompt, 100), "Built prompt");

        let png = optimize::optimize_png(self.generate_with_retry(&prompt)?);

        let path = prompt::storage_path(entry_type, &id, name);
        let url = self.store.upload_image(&path, png)?;

        if self.store.set_image_url(entry_type.table(), &id, &url)? {
            Ok(url)
        } else {
            Err(EntryError::NotUpdated(id))
        }
    }

    /// Returns the last generation error once attempts run out.
    fn generate_with_retry(&self, prompt: &str) -> Result<Vec<u8>, ImageError> {
        let retry = self.config.retry;
        let dims = self.config.dimensions;
        let attempts = retry.max_attempts.max(1);

        let mut attempt = 1;
        loop {
            match self.backend.generate(prompt, dims.width, dims.height) {
                Ok(png) => return Ok(png),
                Err(e) if attempt >= attempts => {
                    tracing::warn!(attempt, error = %e, "Image generation failed, giving up");
                    return Err(e);
                }
                Err(e) => {
                    tracing::warn!(attempt, error = %e, "Image generation failed");
                    pause(match e {
                        ImageError::RateLimited => retry.rate_limit_seconds,
                        _ => retry.delay_seconds,
                    });
                    attempt += 1;
                }
            }
        }
    }
}

fn entry_id(entry: &Map<String, JsonValue>) -> Option<String> {
    match entry.get("id")? {
        JsonValue::String(s) if !s.is_empty() => Some(s.clone()),
        JsonValue::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn entry_name(entry: &Map<String, JsonValue>) -> Option<&str> {
    entry.get("name").and_then(JsonValue::as_str)
}

fn pause(seconds: u64) {
    if seconds > 0 {
        thread::sleep(Duration::from_secs(seconds));
    }
}
