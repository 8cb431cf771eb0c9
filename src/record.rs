//! The persisted content record and its builder.
//!
//! A [`ContentRecord`] is assembled exactly once per run from whatever the
//! fallback chain produced. Serialised field names follow the site builder's
//! import format (`date`, `content`, `image_path`, ...).

use crate::models::LOCAL_PROVIDER;
use chrono::{DateTime, Datelike, Local};
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Display format for `created_at`, e.g. `17.03.2025 09:30`.
pub const CREATED_AT_FORMAT: &str = "%d.%m.%Y %H:%M";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RecordError {
    #[error("article body is empty")]
    EmptyBody,
}

/// Title, tag and summary settings.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct RecordSettings {
    /// Rotated by day of month; a single entry acts as a fixed title.
    pub titles: Vec<String>,
    pub tags: Vec<String>,
    /// Maximum characters of the body kept in `short_description`.
    pub description_budget: usize,
    pub ellipsis: String,
}

impl Default for RecordSettings {
    fn default() -> Self {
        Self {
            titles: vec![
                "Новости ИИ и нейросетей".to_string(),
                "Дайджест искусственного интеллекта".to_string(),
                "Нейросети: главное за день".to_string(),
            ],
            tags: vec![
                "AI".to_string(),
                "нейросети".to_string(),
                "технологии".to_string(),
                "машинное обучение".to_string(),
            ],
            description_budget: 150,
            ellipsis: "...".to_string(),
        }
    }
}

/// Final normalized unit of output. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentRecord {
    title: String,
    #[serde(rename = "date")]
    created_at: String,
    #[serde(rename = "content")]
    body: String,
    #[serde(rename = "image_path")]
    image_reference: Option<String>,
    short_description: String,
    tags: Vec<String>,
    source_provider: String,
    generated_with_ai: bool,
}

impl ContentRecord {
    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn created_at(&self) -> &str {
        &self.created_at
    }

    pub fn body(&self) -> &str {
        &self.body
    }

    pub fn image_reference(&self) -> Option<&str> {
        self.image_reference.as_deref()
    }

    pub fn short_description(&self) -> &str {
        &self.short_description
    }

    pub fn tags(&self) -> &[String] {
        &self.tags
    }

    pub fn source_provider(&self) -> &str {
        &self.source_provider
    }

    /// `true` unless the body came from the local synthesizer.
    pub fn generated_with_ai(&self) -> bool {
        self.generated_with_ai
    }
}

/// Truncate `body` to `budget` characters, appending `ellipsis` only if anything was cut.
pub fn short_description(body: &str, budget: usize, ellipsis: &str) -> String {
    match body.char_indices().nth(budget) {
        None => body.to_string(),
        Some((cut, _)) => format!("{}{}", &body[..cut], ellipsis),
    }
}

#[derive(Debug, Clone)]
pub struct RecordBuilder {
    settings: RecordSettings,
}

impl RecordBuilder {
    /// An empty title list is replaced by the default rotation.
    pub fn new(mut settings: RecordSettings) -> Self {
        if settings.titles.is_empty() {
            settings.titles = RecordSettings::default().titles;
        }
        Self { settings }
    }

    pub fn build(
        &self,
        body: &str,
        image_reference: Option<String>,
        source_provider: &str,
    ) -> Result<ContentRecord, RecordError> {
        self.build_at(body, image_reference, source_provider, Local::now())
    }

    /// Assemble the record for a run that finished at `now`.
    ///
    /// # Arguments
    ///
    /// * `body` - Cleaned article text
    /// * `image_reference` - Stored file name, URL or data URI of the illustration, if any
    /// * `source_provider` - Name of the provider that produced `body`
    /// * `now` - Local time used for `created_at` and title rotation
    ///
    /// # Returns
    ///
    /// The finished [`ContentRecord`].
    ///
    /// # Errors
    ///
    /// Returns [`RecordError::EmptyBody`] if `body` is empty or whitespace only.
    pub fn build_at(
        &self,
        body: &str,
        image_reference: Option<String>,
        source_provider: &str,
        now: DateTime<Local>,
    ) -> Result<ContentRecord, RecordError> {
        if body.trim().is_empty() {
            return Err(RecordError::EmptyBody);
        }
        let settings = &self.settings;
        Ok(ContentRecord {
            title: self.title_for(now),
            created_at: now.format(CREATED_AT_FORMAT).to_string(),
            body: body.to_string(),
            image_reference,
            short_description: short_description(body, settings.description_budget, &settings.ellipsis),
            tags: settings.tags.iter().unique().cloned().collect(),
            source_provider: source_provider.to_string(),
            generated_with_ai: source_provider != LOCAL_PROVIDER,
        })
    }

    fn title_for(&self, now: DateTime<Local>) -> String {
        let titles = &self.settings.titles;
        titles[now.day() as usize % titles.len()].clone()
    }
}
