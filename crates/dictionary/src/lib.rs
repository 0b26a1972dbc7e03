//! UK Biobank data dictionary lookups
//!
//! [`DictionaryStore`] is the contract the assistant's tools are written
//! against; [`SqliteDictionary`] serves it from the showcase schema dump.

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub mod sqlite;

pub use sqlite::SqliteDictionary;

/// Largest page any lookup will return
pub const MAX_LIMIT: u32 = 200;

/// Lookup failures
#[derive(Error, Debug)]
pub enum DictionaryError {
    #[error("Field {0} not found in database")]
    FieldNotFound(i64),

    #[error("Encoding {0} not found in database")]
    EncodingNotFound(i64),

    #[error("Category '{0}' not found in database")]
    CategoryNotFound(String),

    #[error("invalid {field}: {message}")]
    InvalidArgument { field: String, message: String },

    #[error("database error: {message}")]
    Database {
        message: String,
        query: Option<String>,
    },
}

impl From<rusqlite::Error> for DictionaryError {
    fn from(e: rusqlite::Error) -> Self {
        DictionaryError::Database {
            message: e.to_string(),
            query: None,
        }
    }
}

pub type Result<T> = std::result::Result<T, DictionaryError>;

/// Category reference attached to a field
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryRef {
    pub category_id: i64,
    pub title: String,
}

/// One coded value of an encoding
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EncodingValue {
    pub value: String,
    pub meaning: String,
}

/// Full description of one field
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldDetail {
    pub field_id: i64,
    pub title: String,
    pub value_type: Option<String>,
    pub units: Option<String>,
    pub category: Option<CategoryRef>,
    pub encoding_id: Option<i64>,
    pub notes: Option<String>,
    pub participants: Option<i64>,
    pub item_count: Option<i64>,
    /// First coded values when the field is encoded
    pub encoding_values: Vec<EncodingValue>,
    pub showcase_url: String,
}

/// Compact field listing entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldSummary {
    pub field_id: i64,
    pub title: String,
    pub value_type: Option<String>,
    pub units: Option<String>,
    pub category: Option<String>,
    pub participants: Option<i64>,
}

/// Fields under one category
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoryFields {
    pub category_id: i64,
    pub title: String,
    pub description: Option<String>,
    pub fields: Vec<FieldSummary>,
}

/// Values of one encoding
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EncodingValues {
    pub encoding_id: i64,
    pub title: Option<String>,
    pub description: Option<String>,
    pub total: i64,
    pub values: Vec<EncodingValue>,
}

/// Fields related to a reference field
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelatedFields {
    pub field_id: i64,
    pub title: String,
    pub category: Option<CategoryRef>,
    pub related: Vec<FieldSummary>,
}

/// Category listing entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategorySummary {
    pub category_id: i64,
    pub title: String,
    pub field_count: i64,
}

/// Curated field
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecommendedField {
    #[serde(flatten)]
    pub field: FieldSummary,
    pub reason: Option<String>,
}

/// Read-only lookups over the data dictionary
pub trait DictionaryStore: Send + Sync {
    fn explain_field(&self, field_id: i64) -> Result<FieldDetail>;

    fn search_fields(&self, keyword: &str, limit: u32) -> Result<Vec<FieldSummary>>;

    /// `category_name` matches case-insensitively and partially
    fn category_fields(&self, category_name: &str, limit: u32) -> Result<CategoryFields>;

    fn encoding_values(&self, encoding_id: i64, limit: u32) -> Result<EncodingValues>;

    fn related_fields(&self, field_id: i64, limit: u32) -> Result<RelatedFields>;

    fn all_categories(&self) -> Result<Vec<CategorySummary>>;

    fn recommended_fields(
        &self,
        category_name: Option<&str>,
        limit: u32,
    ) -> Result<Vec<RecommendedField>>;
}

/// Clamp a caller-supplied page size into `1..=MAX_LIMIT`
pub fn clamp_limit(limit: u32) -> u32 {
    limit.clamp(1, MAX_LIMIT)
}

/// Public showcase page for a field
pub fn showcase_url(field_id: i64) -> String {
    format!(
        "https://biobank.ndph.ox.ac.uk/showcase/field.cgi?id={}",
        field_id
    )
}
