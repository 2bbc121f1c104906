use std::collections::BTreeMap;
use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::url::CanonicalUrl;

/// Store text cells are capped at this many characters; longer values are cut.
pub const MAX_FIELD_CHARS: usize = 100_000;

// --- Rating ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Rating {
    High,
    Medium,
    Low,
}

impl Rating {
    /// Accepts English or Korean labels, case-insensitively.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_lowercase().as_str() {
            "high" | "높음" | "상" => Some(Rating::High),
            "medium" | "보통" | "중" => Some(Rating::Medium),
            "low" | "낮음" | "하" => Some(Rating::Low),
            _ => None,
        }
    }

    /// Label stored in the rating column.
    pub fn label_ko(&self) -> &'static str {
        match self {
            Rating::High => "높음",
            Rating::Medium => "보통",
            Rating::Low => "낮음",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Rating::High => "high",
            Rating::Medium => "medium",
            Rating::Low => "low",
        }
    }
}

impl fmt::Display for Rating {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// --- Typed field map ---

/// Every column a record can carry. The store adapter maps these to
/// concrete column names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordField {
    SiteName,
    Url,
    Category,
    UseCase,
    Rating,
    Summary,
    ScriptKo,
    ScriptEn,
    TtsUrl,
    TtsFilename,
    TtsFileId,
    RegisteredDate,
}

impl RecordField {
    pub const ALL: [RecordField; 12] = [
        RecordField::SiteName,
        RecordField::Url,
        RecordField::Category,
        RecordField::UseCase,
        RecordField::Rating,
        RecordField::Summary,
        RecordField::ScriptKo,
        RecordField::ScriptEn,
        RecordField::TtsUrl,
        RecordField::TtsFilename,
        RecordField::TtsFileId,
        RecordField::RegisteredDate,
    ];
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum FieldValue {
    Text(String),
    Tags(Vec<String>),
    Rating(Rating),
    Date(NaiveDate),
}

impl FieldValue {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            FieldValue::Text(s) => Some(s),
            _ => None,
        }
    }
}

/// The non-empty fields of a record, ready to send to the store.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldSet(BTreeMap<RecordField, FieldValue>);

impl FieldSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a text value. Blank text is ignored; long text is cut to
    /// [`MAX_FIELD_CHARS`].
    pub fn set_text(&mut self, field: RecordField, value: &str) {
        let value = value.trim();
        if value.is_empty() {
            return;
        }
        self.0
            .insert(field, FieldValue::Text(clip_chars(value, MAX_FIELD_CHARS)));
    }

    pub fn set_tags(&mut self, field: RecordField, tags: &[String]) {
        let tags: Vec<String> = tags
            .iter()
            .map(|t| t.trim())
            .filter(|t| !t.is_empty())
            .map(|t| clip_chars(t, MAX_FIELD_CHARS))
            .collect();
        if !tags.is_empty() {
            self.0.insert(field, FieldValue::Tags(tags));
        }
    }

    pub fn set(&mut self, field: RecordField, value: FieldValue) {
        match value {
            FieldValue::Text(s) => self.set_text(field, &s),
            FieldValue::Tags(t) => self.set_tags(field, &t),
            other => {
                self.0.insert(field, other);
            }
        }
    }

    pub fn get(&self, field: RecordField) -> Option<&FieldValue> {
        self.0.get(&field)
    }

    pub fn text(&self, field: RecordField) -> Option<&str> {
        self.get(field).and_then(FieldValue::as_text)
    }

    pub fn contains(&self, field: RecordField) -> bool {
        self.0.contains_key(&field)
    }

    pub fn iter(&self) -> impl Iterator<Item = (RecordField, &FieldValue)> {
        self.0.iter().map(|(k, v)| (*k, v))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// `s` cut to at most `max` characters.
pub fn clip_chars(s: &str, max: usize) -> String {
    match s.char_indices().nth(max) {
        Some((end, _)) => s[..end].to_string(),
        None => s.to_string(),
    }
}

// --- Record ---

/// One summarized web resource.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    pub url: String,
    pub site_name: String,
    pub category: Vec<String>,
    pub use_case: String,
    pub rating: Option<Rating>,
    pub summary: String,
    pub script_ko: String,
    pub script_en: String,
    pub tts_url: Option<String>,
    pub tts_filename: Option<String>,
    pub tts_file_id: Option<String>,
    pub registered_date: Option<NaiveDate>,
}

impl Record {
    pub fn new(url: &str) -> Self {
        Self {
            url: url.trim().to_string(),
            ..Default::default()
        }
    }

    pub fn canonical_url(&self) -> CanonicalUrl {
        CanonicalUrl::normalize(&self.url)
    }

    /// Site name when known, the URL otherwise.
    pub fn display_name(&self) -> &str {
        if self.site_name.trim().is_empty() {
            &self.url
        } else {
            &self.site_name
        }
    }

    /// Sanitized field map: empty fields are dropped, long text is clipped.
    pub fn to_field_set(&self) -> FieldSet {
        let mut fields = FieldSet::new();
        fields.set_text(RecordField::SiteName, &self.site_name);
        fields.set_text(RecordField::Url, &self.url);
        fields.set_tags(RecordField::Category, &self.category);
        fields.set_text(RecordField::UseCase, &self.use_case);
        if let Some(rating) = self.rating {
            fields.set(RecordField::Rating, FieldValue::Rating(rating));
        }
        fields.set_text(RecordField::Summary, &self.summary);
        fields.set_text(RecordField::ScriptKo, &self.script_ko);
        fields.set_text(RecordField::ScriptEn, &self.script_en);
        for (field, value) in [
            (RecordField::TtsUrl, &self.tts_url),
            (RecordField::TtsFilename, &self.tts_filename),
            (RecordField::TtsFileId, &self.tts_file_id),
        ] {
            if let Some(v) = value {
                fields.set_text(field, v);
            }
        }
        if let Some(date) = self.registered_date {
            fields.set(RecordField::RegisteredDate, FieldValue::Date(date));
        }
        fields
    }

    /// Rebuild a record from whatever fields the store returned.
    pub fn from_field_set(fields: &FieldSet) -> Self {
        let text = |f| fields.text(f).unwrap_or_default().to_string();
        let opt = |f| fields.text(f).map(str::to_string);
        Self {
            url: text(RecordField::Url),
            site_name: text(RecordField::SiteName),
            category: match fields.get(RecordField::Category) {
                Some(FieldValue::Tags(tags)) => tags.clone(),
                _ => Vec::new(),
            },
            use_case: text(RecordField::UseCase),
            rating: match fields.get(RecordField::Rating) {
                Some(FieldValue::Rating(r)) => Some(*r),
                _ => None,
            },
            summary: text(RecordField::Summary),
            script_ko: text(RecordField::ScriptKo),
            script_en: text(RecordField::ScriptEn),
            tts_url: opt(RecordField::TtsUrl),
            tts_filename: opt(RecordField::TtsFilename),
            tts_file_id: opt(RecordField::TtsFileId),
            registered_date: match fields.get(RecordField::RegisteredDate) {
                Some(FieldValue::Date(d)) => Some(*d),
                _ => None,
            },
        }
    }
}

// --- Store identity ---

/// Opaque id assigned by the store.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(pub String);

impl RecordId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RecordId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredRecord {
    pub id: RecordId,
    pub record: Record,
}

// --- Duplicate check ---

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DuplicateCheckResult {
    pub is_duplicate: bool,
    pub existing_record_id: Option<RecordId>,
    pub existing_record: Option<Record>,
    pub error: Option<String>,
}

impl DuplicateCheckResult {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn found(existing: StoredRecord) -> Self {
        Self {
            is_duplicate: true,
            existing_record_id: Some(existing.id),
            existing_record: Some(existing.record),
            error: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            error: Some(error.into()),
            ..Self::default()
        }
    }

    /// The matched record, when the check found one.
    pub fn existing(&self) -> Option<StoredRecord> {
        match (&self.existing_record_id, &self.existing_record) {
            (Some(id), Some(record)) if self.is_duplicate => Some(StoredRecord {
                id: id.clone(),
                record: record.clone(),
            }),
            _ => None,
        }
    }
}

// --- Outcome ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    Created,
    Updated,
    Skipped,
    Error,
}

impl Action {
    pub fn as_str(&self) -> &'static str {
        match self {
            Action::Created => "created",
            Action::Updated => "updated",
            Action::Skipped => "skipped",
            Action::Error => "error",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What happened to one URL, handed to notifiers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Outcome {
    pub success: bool,
    pub action: Action,
    pub record_id: Option<RecordId>,
    pub message: String,
    /// Whether an existing record was found for the URL.
    pub is_duplicate: bool,
}

impl Outcome {
    pub fn created(id: RecordId) -> Self {
        Self {
            success: true,
            action: Action::Created,
            message: format!("Created record {id}"),
            record_id: Some(id),
            is_duplicate: false,
        }
    }

    pub fn updated(id: RecordId) -> Self {
        Self {
            success: true,
            action: Action::Updated,
            message: format!("Updated existing record {id}"),
            record_id: Some(id),
            is_duplicate: true,
        }
    }

    pub fn skipped(existing_id: Option<RecordId>, message: impl Into<String>) -> Self {
        Self {
            success: true,
            action: Action::Skipped,
            record_id: existing_id,
            message: message.into(),
            is_duplicate: true,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            success: false,
            action: Action::Error,
            record_id: None,
            message: message.into(),
            is_duplicate: false,
        }
    }

    pub fn with_duplicate(mut self, is_duplicate: bool) -> Self {
        self.is_duplicate = is_duplicate;
        self
    }
}
