use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;
use url::Url;

use crate::auth::ServiceAccountAuth;
use crate::error::{check, GoogleError, Result};

const SHEETS_API_URL: &str = "https://sheets.googleapis.com/v4";

#[derive(Debug, Deserialize)]
struct ValueRange {
    #[serde(default)]
    values: Vec<Vec<String>>,
}

#[derive(Debug, Serialize)]
struct ValueUpdate<'a> {
    range: &'a str,
    #[serde(rename = "majorDimension")]
    major_dimension: &'static str,
    values: Vec<Vec<&'a str>>,
}

pub struct Sheets {
    auth: Arc<ServiceAccountAuth>,
    http: reqwest::Client,
    base_url: String,
}

impl Sheets {
    pub fn new(auth: Arc<ServiceAccountAuth>) -> Self {
        Self {
            auth,
            http: reqwest::Client::new(),
            base_url: SHEETS_API_URL.to_string(),
        }
    }

    pub fn with_base_url(mut self, url: &str) -> Self {
        self.base_url = url.trim_end_matches('/').to_string();
        self
    }

    fn values_url(&self, spreadsheet_id: &str, range: &str) -> Result<Url> {
        let mut url = Url::parse(&self.base_url)?;
        url.path_segments_mut()
            .map_err(|_| GoogleError::Parse(format!("cannot-be-a-base url: {}", self.base_url)))?
            .extend(["spreadsheets", spreadsheet_id, "values", range]);
        Ok(url)
    }

    /// Read a range as rows of cell strings. Trailing empty cells are
    /// omitted by the API, so rows may be ragged.
    pub async fn get_values(&self, spreadsheet_id: &str, range: &str) -> Result<Vec<Vec<String>>> {
        let url = self.values_url(spreadsheet_id, range)?;
        let token = self.auth.access_token().await?;

        let resp = self.http.get(url).bearer_auth(token).send().await?;
        let resp = check(resp).await?;

        let body: ValueRange = resp.json().await?;
        debug!(range, rows = body.values.len(), "Read sheet values");
        Ok(body.values)
    }

    /// Overwrite a single cell with a raw string value.
    pub async fn update_cell(&self, spreadsheet_id: &str, cell: &str, value: &str) -> Result<()> {
        let url = self.values_url(spreadsheet_id, cell)?;
        let token = self.auth.access_token().await?;

        let resp = self
            .http
            .put(url)
            .bearer_auth(token)
            .query(&[("valueInputOption", "RAW")])
            .json(&ValueUpdate {
                range: cell,
                major_dimension: "ROWS",
                values: vec![vec![value]],
            })
            .send()
            .await?;
        check(resp).await?;
        Ok(())
    }
}

/// A1 notation for `sheet!range`, quoting the sheet name when needed.
pub fn a1(sheet: &str, range: &str) -> String {
    let plain = sheet
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_');
    if plain {
        format!("{sheet}!{range}")
    } else {
        format!("'{}'!{range}", sheet.replace('\'', "''"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn a1_leaves_simple_names_bare() {
        assert_eq!(a1("migration_tooly", "A:B"), "migration_tooly!A:B");
    }

    #[test]
    fn a1_quotes_names_with_spaces_and_quotes() {
        assert_eq!(a1("My Sheet", "B2"), "'My Sheet'!B2");
        assert_eq!(a1("Bob's", "A1"), "'Bob''s'!A1");
    }

    #[test]
    fn update_body_is_single_row() {
        let json = serde_json::to_value(ValueUpdate {
            range: "S!B2",
            major_dimension: "ROWS",
            values: vec![vec!["완료"]],
        })
        .unwrap();
        assert_eq!(json["values"][0][0], "완료");
        assert_eq!(json["majorDimension"], "ROWS");
    }
}
