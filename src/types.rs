//! Core data model and the crate-wide error taxonomy.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::store::StoreError;

/// The five credit categories a chunk can be classified into.
///
/// Classifier output is a free-form string; [`CreditType::from_label`]
/// normalizes anything it does not recognize to [`CreditType::General`]
/// instead of failing the ingestion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CreditType {
    EnergyEfficiency,
    WaterConservation,
    SustainableMaterials,
    IndoorEnvironmentalQuality,
    General,
}

impl CreditType {
    /// Normalize a classifier label into a credit type.
    ///
    /// Accepts both the display form (`"Energy Efficiency"`) and the stored
    /// snake_case form, case-insensitively. Anything else falls back to
    /// [`CreditType::General`].
    pub fn from_label(label: &str) -> Self {
        let normalized = label.trim().to_lowercase().replace([' ', '-'], "_");
        match normalized.as_str() {
            "energy_efficiency" => Self::EnergyEfficiency,
            "water_conservation" => Self::WaterConservation,
            "sustainable_materials" => Self::SustainableMaterials,
            "indoor_environmental_quality" => Self::IndoorEnvironmentalQuality,
            _ => Self::General,
        }
    }

    /// Stable snake_case name, as stored in the metadata artifact.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::EnergyEfficiency => "energy_efficiency",
            Self::WaterConservation => "water_conservation",
            Self::SustainableMaterials => "sustainable_materials",
            Self::IndoorEnvironmentalQuality => "indoor_environmental_quality",
            Self::General => "general",
        }
    }
}

impl fmt::Display for CreditType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One page of extracted document text. Page numbering starts at 1.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageText {
    pub number: u32,
    pub text: String,
}

impl PageText {
    pub fn new(number: u32, text: impl Into<String>) -> Self {
        Self {
            number,
            text: text.into(),
        }
    }
}

/// An ordered slice of word tokens from one page, joined by single spaces.
///
/// Chunks are created by the chunker and consumed once by the embedder and
/// classifier; they are not persisted on their own, only as part of a
/// [`StoredEntry`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    pub text: String,
    pub source_page: u32,
}

/// The metadata record paired with one vector in the index.
///
/// Append-only: entries are created at ingestion time and never mutated or
/// deleted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredEntry {
    pub chunk_text: String,
    pub credit_type: CreditType,
    pub page_number: u32,
}

/// Errors surfaced by the ingestion and query pipeline.
///
/// Every failure is local to the request that produced it: nothing is retried
/// by the core and nothing is process-fatal. Ingestion failures carry the
/// offending page and chunk via [`RagError::Chunk`].
#[derive(Debug, Error)]
pub enum RagError {
    #[error("embedding request failed: {0}")]
    Embedding(String),

    #[error("classification request failed: {0}")]
    Classification(String),

    #[error("answer generation failed: {0}")]
    AnswerGeneration(String),

    #[error("document processing failed: {message}")]
    Document { message: String, details: String },

    #[error("chunk {index} on page {page}: {source}")]
    Chunk {
        page: u32,
        index: usize,
        source: Box<RagError>,
    },

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl RagError {
    /// Build a [`RagError::Document`] from a message and its underlying detail.
    pub fn document(message: impl Into<String>, details: impl Into<String>) -> Self {
        Self::Document {
            message: message.into(),
            details: details.into(),
        }
    }

    /// Wrap a provider failure with the page and chunk it occurred on.
    pub(crate) fn for_chunk(page: u32, index: usize, source: RagError) -> Self {
        Self::Chunk {
            page,
            index,
            source: Box::new(source),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_label_accepts_display_and_snake_case_forms() {
        assert_eq!(
            CreditType::from_label("Energy Efficiency"),
            CreditType::EnergyEfficiency
        );
        assert_eq!(
            CreditType::from_label("water_conservation"),
            CreditType::WaterConservation
        );
        assert_eq!(
            CreditType::from_label("  Indoor Environmental Quality  "),
            CreditType::IndoorEnvironmentalQuality
        );
        assert_eq!(
            CreditType::from_label("SUSTAINABLE MATERIALS"),
            CreditType::SustainableMaterials
        );
    }

    #[test]
    fn from_label_falls_back_to_general_for_unrecognized_labels() {
        assert_eq!(CreditType::from_label("Thermal Comfort"), CreditType::General);
        assert_eq!(CreditType::from_label(""), CreditType::General);
        assert_eq!(CreditType::from_label("energy"), CreditType::General);
    }

    #[test]
    fn credit_type_serializes_as_snake_case() {
        let json = serde_json::to_string(&CreditType::EnergyEfficiency).unwrap();
        assert_eq!(json, "\"energy_efficiency\"");
        let back: CreditType = serde_json::from_str(&json).unwrap();
        assert_eq!(back, CreditType::EnergyEfficiency);
    }
}
