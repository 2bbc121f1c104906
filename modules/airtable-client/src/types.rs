use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Untyped column → value map, exactly as Airtable stores it.
pub type Fields = Map<String, Value>;

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AirtableRecord {
    pub id: String,
    #[serde(default)]
    pub fields: Fields,
    #[serde(default)]
    pub created_time: Option<String>,
}

impl AirtableRecord {
    /// Read a column as text. Numbers and booleans are stringified; arrays
    /// are joined with ", ".
    pub fn text(&self, column: &str) -> Option<String> {
        match self.fields.get(column)? {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            Value::Bool(b) => Some(b.to_string()),
            Value::Array(items) => Some(
                items
                    .iter()
                    .filter_map(|v| v.as_str())
                    .collect::<Vec<_>>()
                    .join(", "),
            ),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ListResponse {
    #[serde(default)]
    pub records: Vec<AirtableRecord>,
    pub offset: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct WriteRequest<'a> {
    pub fields: &'a Fields,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub typecast: bool,
}

/// Options for a single list page.
#[derive(Debug, Clone, Default)]
pub struct ListQuery {
    pub filter_by_formula: Option<String>,
    pub page_size: Option<u32>,
    pub offset: Option<String>,
    pub fields: Vec<String>,
}

impl ListQuery {
    pub fn formula(formula: impl Into<String>) -> Self {
        Self {
            filter_by_formula: Some(formula.into()),
            ..Self::default()
        }
    }

    pub fn with_page_size(mut self, size: u32) -> Self {
        self.page_size = Some(size);
        self
    }

    pub fn with_fields(mut self, fields: &[&str]) -> Self {
        self.fields = fields.iter().map(|f| f.to_string()).collect();
        self
    }
}

/// One page of list results plus the cursor for the next page.
#[derive(Debug, Clone)]
pub struct RecordPage {
    pub records: Vec<AirtableRecord>,
    pub offset: Option<String>,
}
