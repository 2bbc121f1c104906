use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::auth::ServiceAccountAuth;
use crate::error::{check, Result};

const DRIVE_API_URL: &str = "https://www.googleapis.com/drive/v3";
const DRIVE_UPLOAD_URL: &str = "https://www.googleapis.com/upload/drive/v3";
const BOUNDARY: &str = "linkbrief-drive-upload-boundary";

#[derive(Debug, Clone, Deserialize)]
pub struct DriveFile {
    pub id: String,
    #[serde(default)]
    pub name: String,
}

impl DriveFile {
    /// Direct-download link usable once the file is shared publicly.
    pub fn download_url(&self) -> String {
        format!("https://drive.google.com/uc?id={}", self.id)
    }
}

#[derive(Debug, Serialize)]
struct FileMetadata<'a> {
    name: &'a str,
    #[serde(rename = "mimeType")]
    mime_type: &'a str,
    parents: Vec<&'a str>,
}

#[derive(Debug, Serialize)]
struct Permission {
    role: &'static str,
    #[serde(rename = "type")]
    kind: &'static str,
}

pub struct Drive {
    auth: Arc<ServiceAccountAuth>,
    http: reqwest::Client,
    api_url: String,
    upload_url: String,
}

impl Drive {
    pub fn new(auth: Arc<ServiceAccountAuth>) -> Self {
        Self {
            auth,
            http: reqwest::Client::new(),
            api_url: DRIVE_API_URL.to_string(),
            upload_url: DRIVE_UPLOAD_URL.to_string(),
        }
    }

    pub fn with_base_urls(mut self, api_url: &str, upload_url: &str) -> Self {
        self.api_url = api_url.trim_end_matches('/').to_string();
        self.upload_url = upload_url.trim_end_matches('/').to_string();
        self
    }

    /// Upload `bytes` as a new file inside `folder_id` (use `"root"` for My Drive).
    pub async fn upload(
        &self,
        name: &str,
        folder_id: &str,
        mime_type: &str,
        bytes: &[u8],
    ) -> Result<DriveFile> {
        let metadata = serde_json::to_vec(&FileMetadata {
            name,
            mime_type,
            parents: vec![folder_id],
        })?;
        let body = multipart_related(BOUNDARY, &metadata, mime_type, bytes);
        let token = self.auth.access_token().await?;

        let resp = self
            .http
            .post(format!("{}/files", self.upload_url))
            .bearer_auth(token)
            .query(&[("uploadType", "multipart"), ("fields", "id,name")])
            .header(
                "Content-Type",
                format!("multipart/related; boundary={BOUNDARY}"),
            )
            .body(body)
            .send()
            .await?;
        let resp = check(resp).await?;

        let file: DriveFile = resp.json().await?;
        info!(file_id = %file.id, name, size = bytes.len(), "Uploaded file to Drive");
        Ok(file)
    }

    /// Grant read access to anyone with the link.
    pub async fn share_public(&self, file_id: &str) -> Result<()> {
        let token = self.auth.access_token().await?;
        let resp = self
            .http
            .post(format!("{}/files/{}/permissions", self.api_url, file_id))
            .bearer_auth(token)
            .json(&Permission {
                role: "reader",
                kind: "anyone",
            })
            .send()
            .await?;
        check(resp).await?;
        Ok(())
    }
}

/// Build a `multipart/related` body: JSON metadata part, then the media part.
pub(crate) fn multipart_related(
    boundary: &str,
    metadata_json: &[u8],
    mime_type: &str,
    media: &[u8],
) -> Vec<u8> {
    let mut body = Vec::with_capacity(metadata_json.len() + media.len() + 256);
    body.extend_from_slice(format!("--{boundary}\r\n").as_bytes());
    body.extend_from_slice(b"Content-Type: application/json; charset=UTF-8\r\n\r\n");
    body.extend_from_slice(metadata_json);
    body.extend_from_slice(format!("\r\n--{boundary}\r\n").as_bytes());
    body.extend_from_slice(format!("Content-Type: {mime_type}\r\n\r\n").as_bytes());
    body.extend_from_slice(media);
    body.extend_from_slice(format!("\r\n--{boundary}--\r\n").as_bytes());
    body
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn multipart_body_has_both_parts_and_closing_boundary() {
        let body = multipart_related("b", br#"{"name":"x.mp3"}"#, "audio/mpeg", b"ID3");
        let text = String::from_utf8_lossy(&body);

        assert!(text.starts_with("--b\r\nContent-Type: application/json"));
        assert!(text.contains(r#"{"name":"x.mp3"}"#));
        assert!(text.contains("--b\r\nContent-Type: audio/mpeg\r\n\r\nID3"));
        assert!(text.ends_with("\r\n--b--\r\n"));
    }

    #[test]
    fn metadata_lists_parent_folder() {
        let json = serde_json::to_value(FileMetadata {
            name: "a.mp3",
            mime_type: "audio/mpeg",
            parents: vec!["folder123"],
        })
        .unwrap();
        assert_eq!(json["parents"][0], "folder123");
        assert_eq!(json["mimeType"], "audio/mpeg");
    }

    #[test]
    fn download_url_uses_file_id() {
        let file = DriveFile {
            id: "abc".into(),
            name: "a.mp3".into(),
        };
        assert_eq!(file.download_url(), "https://drive.google.com/uc?id=abc");
    }
}
