use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use tracing::{debug, info};

use ai_client::{strip_code_blocks, truncate_chars, TextGenerator};
use linkbrief_common::{Rating, Record};

use crate::traits::Summarizer;

/// Page text beyond this many characters is not sent to the model.
const MAX_PAGE_CHARS: usize = 8_000;

const MAX_CATEGORIES: usize = 5;
const MAX_CATEGORY_CHARS: usize = 100;

pub struct GeminiSummarizer {
    model: Arc<dyn TextGenerator>,
}

impl GeminiSummarizer {
    pub fn new(model: Arc<dyn TextGenerator>) -> Self {
        Self { model }
    }
}

#[async_trait]
impl Summarizer for GeminiSummarizer {
    async fn summarize(&self, url: &str, page_text: &str) -> Result<Record> {
        let prompt = build_prompt(url, page_text);
        info!(url, model = self.model.model(), page_chars = page_text.chars().count(), "Summarizing page");

        let response = self
            .model
            .generate(&prompt)
            .await
            .context("Summary generation failed")?;
        debug!(url, response_chars = response.len(), "Model responded");

        let record = parse_summary(strip_code_blocks(&response), url);
        if record.site_name.is_empty() && record.summary.is_empty() {
            anyhow::bail!("Model response had no recognizable fields");
        }
        Ok(record)
    }
}

pub fn build_prompt(url: &str, page_text: &str) -> String {
    let body = truncate_chars(page_text, MAX_PAGE_CHARS);
    format!(
        r#"다음 웹페이지 본문을 분석해서 아래 항목을 채워줘.
각 항목은 반드시 한 줄에 하나씩, "키: 값" 형태로만 출력해줘. 값 안에서 줄을 바꾸지 마.

**중요 지침:**
1. 사이트 이름은 서비스의 정확한 공식 이름으로 작성해줘.
2. 카테고리는 쉼표로 구분하여 최대 {MAX_CATEGORIES}개까지.
3. 평가/효용성은 높음/보통/낮음 중 하나만.
4. 요약 설명은 최소 200자 이상으로, 핵심 기능, 대상 사용자, 장점을 포함해줘.
5. 스크립트(한국어)와 Script(영어)는 60초 영상 기준 400-500자 분량으로 작성해줘.
   Hook - 기능 소개 - 사용 예시 - 장점 - 마무리 순서로.

**출력 형식:**
사이트 이름: [웹사이트나 서비스의 이름]
URL: {url}
카테고리: [관련 카테고리, 쉼표로 구분]
활용 사례: [구체적인 사용 사례]
평가/효용성: [높음/보통/낮음]
요약 설명: [200자 이상의 상세한 설명]
스크립트: [한국어 60초 스크립트]
Script: [English 60-second script]

본문:
{body}
"#
    )
}

/// Field a response key maps to. Accepts Korean and English labels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Key {
    SiteName,
    Url,
    Category,
    UseCase,
    Rating,
    Summary,
    ScriptKo,
    ScriptEn,
}

fn key_for(label: &str) -> Option<Key> {
    let label = label.trim().trim_matches(|c| c == '*' || c == '-').trim();
    // "Script" and "스크립트" differ only by language.
    if label == "Script" {
        return Some(Key::ScriptEn);
    }
    match label.to_lowercase().as_str() {
        "사이트 이름" | "site name" | "name" => Some(Key::SiteName),
        "url" => Some(Key::Url),
        "카테고리" | "태그" | "category" | "categories" => Some(Key::Category),
        "활용 사례" | "use case" | "use cases" => Some(Key::UseCase),
        "평가/효용성" | "평가" | "rating" => Some(Key::Rating),
        "요약 설명" | "요약" | "summary" => Some(Key::Summary),
        "스크립트" | "한국어 스크립트" | "korean script" => Some(Key::ScriptKo),
        "english script" | "영어 스크립트" => Some(Key::ScriptEn),
        _ => None,
    }
}

fn is_empty_value(value: &str) -> bool {
    let v = value.trim();
    v.is_empty() || matches!(v.to_lowercase().as_str(), "없음" | "none" | "-" | "정보 없음" | "n/a")
}

/// Parse `key: value` lines into a record. Unknown keys are ignored, the
/// first `:` splits each line, and a missing URL falls back to `url`.
pub fn parse_summary(text: &str, url: &str) -> Record {
    let mut record = Record::default();

    for line in text.lines() {
        let Some((label, value)) = line.split_once(':') else {
            continue;
        };
        let Some(key) = key_for(label) else {
            continue;
        };
        let value = value.trim().trim_matches('"').trim();
        if is_empty_value(value) {
            continue;
        }

        match key {
            Key::SiteName => record.site_name = value.to_string(),
            Key::Url => record.url = value.to_string(),
            Key::Category => record.category = parse_categories(value),
            Key::UseCase => record.use_case = value.to_string(),
            Key::Rating => record.rating = Rating::parse(value),
            Key::Summary => record.summary = value.to_string(),
            Key::ScriptKo => record.script_ko = value.to_string(),
            Key::ScriptEn => record.script_en = value.to_string(),
        }
    }

    if record.url.is_empty() {
        record.url = url.trim().to_string();
    }
    record
}

/// JSON array or comma list. Blank and overlong items are dropped.
fn parse_categories(value: &str) -> Vec<String> {
    let items: Vec<String> = if value.starts_with('[') && value.ends_with(']') {
        match serde_json::from_str::<Vec<serde_json::Value>>(value) {
            Ok(items) => items
                .into_iter()
                .map(|v| match v {
                    serde_json::Value::String(s) => s,
                    other => other.to_string(),
                })
                .collect(),
            Err(_) => value
                .trim_matches(|c| c == '[' || c == ']')
                .split(',')
                .map(|s| s.trim().trim_matches(|c| c == '"' || c == '\'').to_string())
                .collect(),
        }
    } else {
        value.split(',').map(|s| s.to_string()).collect()
    };

    items
        .into_iter()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty() && s.chars().count() <= MAX_CATEGORY_CHARS)
        .take(MAX_CATEGORIES)
        .collect()
}
