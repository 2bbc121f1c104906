//! Airtable-backed [`RecordStore`]. This is the only place the typed
//! [`FieldSet`] is converted to and from Airtable's untyped column map.

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::NaiveDate;
use serde_json::Value;
use tracing::{debug, info};

use airtable_client::{formula_field, formula_string, AirtableClient, AirtableRecord, Fields, ListQuery};
use linkbrief_common::{
    clip_chars, CanonicalUrl, FieldSet, FieldValue, Rating, Record, RecordField, RecordId,
    StoredRecord, MAX_FIELD_CHARS,
};

use crate::traits::RecordStore;

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Column names in the table.
#[derive(Debug, Clone)]
pub struct Columns {
    pub site_name: String,
    pub url: String,
    pub category: String,
    pub use_case: String,
    pub rating: String,
    pub summary: String,
    pub script_ko: String,
    pub script_en: String,
    pub tts_url: String,
    pub tts_filename: String,
    pub tts_file_id: String,
    pub registered_date: String,
}

impl Default for Columns {
    fn default() -> Self {
        Self {
            site_name: "사이트 이름".into(),
            url: "URL".into(),
            category: "카테고리".into(),
            use_case: "활용 사례".into(),
            rating: "평가/효용성".into(),
            summary: "요약 설명".into(),
            script_ko: "스크립트".into(),
            script_en: "Script".into(),
            tts_url: "TTS_URL".into(),
            tts_filename: "TTS_파일명".into(),
            tts_file_id: "Drive_파일ID".into(),
            registered_date: "등록일".into(),
        }
    }
}

impl Columns {
    pub fn name(&self, field: RecordField) -> &str {
        match field {
            RecordField::SiteName => &self.site_name,
            RecordField::Url => &self.url,
            RecordField::Category => &self.category,
            RecordField::UseCase => &self.use_case,
            RecordField::Rating => &self.rating,
            RecordField::Summary => &self.summary,
            RecordField::ScriptKo => &self.script_ko,
            RecordField::ScriptEn => &self.script_en,
            RecordField::TtsUrl => &self.tts_url,
            RecordField::TtsFilename => &self.tts_filename,
            RecordField::TtsFileId => &self.tts_file_id,
            RecordField::RegisteredDate => &self.registered_date,
        }
    }
}

pub struct AirtableStore {
    client: AirtableClient,
    columns: Columns,
}

impl AirtableStore {
    pub fn new(client: AirtableClient) -> Self {
        Self {
            client,
            columns: Columns::default(),
        }
    }

    pub fn with_columns(mut self, columns: Columns) -> Self {
        self.columns = columns;
        self
    }

    /// Typed fields → Airtable cells. Tags become one comma-joined cell,
    /// clipped like any other text cell.
    pub fn to_cells(&self, fields: &FieldSet) -> Fields {
        fields
            .iter()
            .map(|(field, value)| {
                let cell = match value {
                    FieldValue::Text(s) => Value::String(s.clone()),
                    FieldValue::Tags(tags) => {
                        Value::String(clip_chars(&tags.join(", "), MAX_FIELD_CHARS))
                    }
                    FieldValue::Rating(r) => Value::String(r.label_ko().to_string()),
                    FieldValue::Date(d) => Value::String(d.format(DATE_FORMAT).to_string()),
                };
                (self.columns.name(field).to_string(), cell)
            })
            .collect()
    }

    /// Airtable row → typed record. Unparseable cells are dropped.
    pub fn to_stored(&self, row: &AirtableRecord) -> StoredRecord {
        let mut fields = FieldSet::new();
        for field in RecordField::ALL {
            let Some(text) = row.text(self.columns.name(field)) else {
                continue;
            };
            match field {
                RecordField::Category => fields.set_tags(field, &split_tags(&text)),
                RecordField::Rating => {
                    if let Some(rating) = Rating::parse(&text) {
                        fields.set(field, FieldValue::Rating(rating));
                    }
                }
                RecordField::RegisteredDate => {
                    if let Some(date) = parse_date(&text) {
                        fields.set(field, FieldValue::Date(date));
                    }
                }
                _ => fields.set_text(field, &text),
            }
        }
        StoredRecord {
            id: RecordId(row.id.clone()),
            record: Record::from_field_set(&fields),
        }
    }

    /// Case-insensitive substring prefilter on the URL column. Every stored
    /// URL that normalizes to `url` contains `url` without its scheme.
    pub fn lookup_formula(&self, url: &CanonicalUrl) -> String {
        format!(
            "FIND({}, LOWER({}))",
            formula_string(url.without_scheme()),
            formula_field(&self.columns.url)
        )
    }
}

fn split_tags(text: &str) -> Vec<String> {
    text.split(',')
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .collect()
}

fn parse_date(text: &str) -> Option<NaiveDate> {
    let head = text.get(..10).unwrap_or(text);
    NaiveDate::parse_from_str(head, DATE_FORMAT).ok()
}

#[async_trait]
impl RecordStore for AirtableStore {
    async fn find_by_url(&self, url: &CanonicalUrl) -> Result<Vec<StoredRecord>> {
        let query = ListQuery::formula(self.lookup_formula(url));
        let rows = self
            .client
            .list_all(&query)
            .await
            .with_context(|| format!("Airtable lookup failed for {url}"))?;
        debug!(url = %url, candidates = rows.len(), "Airtable URL lookup");
        Ok(rows.iter().map(|row| self.to_stored(row)).collect())
    }

    async fn create(&self, fields: &FieldSet) -> Result<RecordId> {
        let row = self
            .client
            .create_record(&self.to_cells(fields), true)
            .await
            .context("Airtable create failed")?;
        Ok(RecordId(row.id))
    }

    async fn update(&self, id: &RecordId, fields: &FieldSet) -> Result<()> {
        self.client
            .update_record(id.as_str(), &self.to_cells(fields), true)
            .await
            .with_context(|| format!("Airtable update failed for {id}"))?;
        Ok(())
    }

    async fn list_urls(&self) -> Result<Vec<String>> {
        let query = ListQuery::default().with_fields(&[self.columns.url.as_str()]);
        let rows = self
            .client
            .list_all(&query)
            .await
            .context("Airtable listing failed")?;
        let urls: Vec<String> = rows
            .iter()
            .filter_map(|row| row.text(&self.columns.url))
            .filter(|u| !u.trim().is_empty())
            .collect();
        info!(table = self.client.table(), urls = urls.len(), "Loaded stored URLs");
        Ok(urls)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn store() -> AirtableStore {
        AirtableStore::new(AirtableClient::new("pat", "appBase", "Tools").unwrap())
    }

    #[test]
    fn cells_use_korean_columns_and_labels() {
        let mut record = Record::new("https://tool.example");
        record.site_name = "Tool".into();
        record.category = vec!["AI".into(), "Writing".into()];
        record.rating = Some(Rating::Low);
        record.registered_date = NaiveDate::from_ymd_opt(2024, 5, 1);

        let cells = store().to_cells(&record.to_field_set());

        assert_eq!(cells["사이트 이름"], json!("Tool"));
        assert_eq!(cells["카테고리"], json!("AI, Writing"));
        assert_eq!(cells["평가/효용성"], json!("낮음"));
        assert_eq!(cells["등록일"], json!("2024-05-01"));
        assert!(!cells.contains_key("활용 사례"));
    }

    #[test]
    fn joined_category_cell_is_clipped() {
        let mut record = Record::new("https://tool.example");
        record.site_name = "Tool".into();
        record.category = vec!["a".repeat(60_000), "b".repeat(60_000)];

        let cells = store().to_cells(&record.to_field_set());

        let category = cells["카테고리"].as_str().unwrap();
        assert_eq!(category.chars().count(), MAX_FIELD_CHARS);
        assert!(category.starts_with("aaa"));
        assert!(category.ends_with('b'));
    }

    #[test]
    fn row_parses_into_record() {
        let row: AirtableRecord = serde_json::from_value(json!({
            "id": "recABC",
            "fields": {
                "URL": "https://www.tool.example/",
                "사이트 이름": "Tool",
                "카테고리": "AI,  Writing, ",
                "평가/효용성": "high",
                "등록일": "2024-05-01T00:00:00.000Z"
            }
        }))
        .unwrap();

        let stored = store().to_stored(&row);

        assert_eq!(stored.id.as_str(), "recABC");
        assert_eq!(stored.record.url, "https://www.tool.example/");
        assert_eq!(stored.record.category, vec!["AI", "Writing"]);
        assert_eq!(stored.record.rating, Some(Rating::High));
        assert_eq!(stored.record.registered_date, NaiveDate::from_ymd_opt(2024, 5, 1));
    }

    #[test]
    fn lookup_formula_escapes_quotes() {
        let url = CanonicalUrl::normalize("https://x.example/it's");
        assert_eq!(
            store().lookup_formula(&url),
            r"FIND('x.example/it\'s', LOWER({URL}))"
        );
    }
}
