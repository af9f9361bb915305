//! Prompt construction for compendium artwork.

use super::EntryType;
use crate::config::ImageGenConfig;
use serde_json::{Map, Value as JsonValue};

const DESCRIPTION_LIMIT: usize = 200;
const TAG_LIMIT: usize = 5;
const DALLE_PROMPT_LIMIT: usize = 1000;
const STYLE_PREFIX: &str = "Solo Leveling manhwa style";
const STYLE_KEYWORDS: [&str; 4] = ["Solo Leveling", "manhwa", "painterly", "dark fantasy"];

/// Fill the entry type's template from the entry's fields and prepend the
/// base prompt.
pub fn build_prompt(entry: &Map<String, JsonValue>, entry_type: EntryType, config: &ImageGenConfig) -> String {
    let description: String = field(entry, "description").chars().take(DESCRIPTION_LIMIT).collect();
    let tags = entry
        .get("tags")
        .and_then(JsonValue::as_array)
        .map(|tags| {
            tags.iter()
                .take(TAG_LIMIT)
                .map(|t| t.as_str().map(str::to_string).unwrap_or_else(|| t.to_string()))
                .collect::<Vec<_>>()
                .join(", ")
        })
        .unwrap_or_default();

    let prompt = config
        .template_for(entry_type.as_str())
        .replace("{name}", &field(entry, "name"))
        .replace("{description}", &description)
        .replace("{gate_rank}", &field(entry, "gate_rank"))
        .replace("{rarity}", &field(entry, "rarity"))
        .replace("{equipment_type}", &field(entry, "equipment_type"))
        .replace("{tags}", &tags);

    format!("{}, {}", config.base_prompt, prompt)
}

/// Text form of a field; missing and null fields are empty.
fn field(entry: &Map<String, JsonValue>, key: &str) -> String {
    match entry.get(key) {
        None | Some(JsonValue::Null) => String::new(),
        Some(JsonValue::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

/// Adjust a prompt for the DALL-E endpoint: make sure the house style leads,
/// keep it within the length the model handles well, and ask for a painterly
/// finish.
pub fn dalle_prompt(prompt: &str) -> String {
    let mut out = if prompt.contains("Solo Leveling") {
        prompt.to_string()
    } else {
        format!("{STYLE_PREFIX}, {prompt}")
    };

    if out.chars().count() > DALLE_PROMPT_LIMIT {
        out = shorten(&out);
    }

    if !out.to_lowercase().contains("painterly") {
        out = format!("painterly artwork, {out}");
    }
    out
}

fn shorten(prompt: &str) -> String {
    let parts: Vec<&str> = prompt.split(',').map(str::trim).collect();
    let mut kept: Vec<&str> = parts
        .iter()
        .copied()
        .filter(|p| {
            let lower = p.to_lowercase();
            STYLE_KEYWORDS.iter().any(|kw| lower.contains(&kw.to_lowercase()))
        })
        .collect();

    for &part in &parts {
        if kept.contains(&part) {
            continue;
        }
        let candidate_len = kept.join(", ").chars().count() + 2 + part.chars().count();
        if candidate_len < DALLE_PROMPT_LIMIT {
            kept.push(part);
        }
    }

    kept.join(", ").chars().take(DALLE_PROMPT_LIMIT).collect()
}

/// DALL-E 3 only offers square, landscape, and portrait sizes.
pub fn dalle_size(width: u32, height: u32) -> &'static str {
    if width == 1024 && height == 1024 {
        "1024x1024"
    } else if width >= height {
        "1792x1024"
    } else {
        "1024x1792"
    }
}

/// Object path for an entry's image: `{type}/{id}-{slug}.png`.
pub fn storage_path(entry_type: EntryType, id: &str, name: &str) -> String {
    let slug = name.to_lowercase().replace([' ', '/'], "-");
    format!("{}/{}-{}.png", entry_type.as_str(), id, slug)
}
