pub mod error;
pub mod types;

pub use error::{AirtableError, Result};
pub use types::{AirtableRecord, Fields, ListQuery, RecordPage};

use std::time::Duration;

use reqwest::{Response, Url};
use types::{ListResponse, WriteRequest};

const BASE_URL: &str = "https://api.airtable.com/v0";

/// Airtable caps `pageSize` at 100.
pub const MAX_PAGE_SIZE: u32 = 100;

/// Client bound to one table of one base.
#[derive(Clone)]
pub struct AirtableClient {
    client: reqwest::Client,
    token: String,
    base_id: String,
    table: String,
    base_url: String,
}

impl AirtableClient {
    pub fn new(token: &str, base_id: &str, table: &str) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;

        Ok(Self {
            client,
            token: token.to_string(),
            base_id: base_id.to_string(),
            table: table.to_string(),
            base_url: BASE_URL.to_string(),
        })
    }

    pub fn with_base_url(mut self, url: &str) -> Self {
        self.base_url = url.trim_end_matches('/').to_string();
        self
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    /// `{base}/{base_id}/{table}[/{record_id}]`, with each segment percent-encoded.
    fn endpoint(&self, record_id: Option<&str>) -> Result<Url> {
        let mut url = Url::parse(&self.base_url)?;
        {
            let mut segments = url
                .path_segments_mut()
                .map_err(|_| AirtableError::InvalidRequest("base URL cannot be a base".into()))?;
            segments.push(&self.base_id).push(&self.table);
            if let Some(id) = record_id {
                segments.push(id);
            }
        }
        Ok(url)
    }

    async fn check(resp: Response) -> Result<Response> {
        let status = resp.status();
        if !status.is_success() {
            let message = resp.text().await.unwrap_or_default();
            return Err(AirtableError::Api {
                status: status.as_u16(),
                message,
            });
        }
        Ok(resp)
    }

    /// Fetch one page of records in the table's native order.
    pub async fn list_page(&self, query: &ListQuery) -> Result<RecordPage> {
        let mut params: Vec<(&str, String)> = Vec::new();
        if let Some(ref formula) = query.filter_by_formula {
            params.push(("filterByFormula", formula.clone()));
        }
        if let Some(size) = query.page_size {
            params.push(("pageSize", size.min(MAX_PAGE_SIZE).to_string()));
        }
        if let Some(ref offset) = query.offset {
            params.push(("offset", offset.clone()));
        }
        for field in &query.fields {
            params.push(("fields[]", field.clone()));
        }

        let resp = self
            .client
            .get(self.endpoint(None)?)
            .bearer_auth(&self.token)
            .query(&params)
            .send()
            .await?;
        let resp = Self::check(resp).await?;

        let body: ListResponse = resp.json().await?;
        tracing::debug!(
            table = %self.table,
            count = body.records.len(),
            has_more = body.offset.is_some(),
            "Listed Airtable page"
        );

        Ok(RecordPage {
            records: body.records,
            offset: body.offset,
        })
    }

    /// Follow `offset` cursors until the listing is exhausted.
    pub async fn list_all(&self, query: &ListQuery) -> Result<Vec<AirtableRecord>> {
        let mut query = query.clone();
        if query.page_size.is_none() {
            query.page_size = Some(MAX_PAGE_SIZE);
        }

        let mut records = Vec::new();
        loop {
            let page = self.list_page(&query).await?;
            records.extend(page.records);
            match page.offset {
                Some(offset) => query.offset = Some(offset),
                None => break,
            }
        }
        Ok(records)
    }

    pub async fn create_record(&self, fields: &Fields, typecast: bool) -> Result<AirtableRecord> {
        let resp = self
            .client
            .post(self.endpoint(None)?)
            .bearer_auth(&self.token)
            .json(&WriteRequest { fields, typecast })
            .send()
            .await?;
        let resp = Self::check(resp).await?;

        let record: AirtableRecord = resp.json().await?;
        tracing::info!(table = %self.table, record_id = %record.id, "Created Airtable record");
        Ok(record)
    }

    /// PATCH: only the supplied columns change; others keep their values.
    pub async fn update_record(
        &self,
        record_id: &str,
        fields: &Fields,
        typecast: bool,
    ) -> Result<AirtableRecord> {
        let resp = self
            .client
            .patch(self.endpoint(Some(record_id))?)
            .bearer_auth(&self.token)
            .json(&WriteRequest { fields, typecast })
            .send()
            .await?;
        let resp = Self::check(resp).await?;

        let record: AirtableRecord = resp.json().await?;
        tracing::info!(table = %self.table, record_id = %record.id, "Updated Airtable record");
        Ok(record)
    }
}

/// Quote a value as an Airtable formula string literal.
pub fn formula_string(value: &str) -> String {
    let escaped = value.replace('\\', "\\\\").replace('\'', "\\'");
    format!("'{escaped}'")
}

/// Reference a column by name inside a formula.
pub fn formula_field(name: &str) -> String {
    format!("{{{name}}}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_percent_encodes_table_name() {
        let client = AirtableClient::new("tok", "appXYZ", "도구 목록").unwrap();
        let url = client.endpoint(None).unwrap();
        assert!(url.as_str().starts_with("https://api.airtable.com/v0/appXYZ/"));
        assert!(!url.as_str().contains(' '));

        let with_id = client.endpoint(Some("rec123")).unwrap();
        assert!(with_id.as_str().ends_with("/rec123"));
    }

    #[test]
    fn formula_string_escapes_quotes_and_backslashes() {
        assert_eq!(formula_string("plain"), "'plain'");
        assert_eq!(formula_string("it's"), r"'it\'s'");
        assert_eq!(formula_string(r"a\b"), r"'a\\b'");
    }

    #[test]
    fn formula_field_wraps_in_braces() {
        assert_eq!(formula_field("URL"), "{URL}");
        assert_eq!(formula_field("사이트 이름"), "{사이트 이름}");
    }

    #[test]
    fn record_text_reads_strings_and_arrays() {
        let record: AirtableRecord = serde_json::from_str(
            r#"{"id":"rec1","createdTime":"2024-01-01T00:00:00.000Z",
                "fields":{"Name":"Glasp","Tags":["ai","notes"],"Count":3}}"#,
        )
        .unwrap();
        assert_eq!(record.text("Name").as_deref(), Some("Glasp"));
        assert_eq!(record.text("Tags").as_deref(), Some("ai, notes"));
        assert_eq!(record.text("Count").as_deref(), Some("3"));
        assert_eq!(record.text("Missing"), None);
    }
}
