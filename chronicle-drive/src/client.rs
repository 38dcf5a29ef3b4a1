//! Google Drive v3 REST client.
//!
//! Only the three calls the activity fetcher needs: list recently modified
//! files, read a file's type, and export a Google Doc as plain text.

use std::sync::Arc;

use reqwest::{Client, Response, Url};
use serde::de::DeserializeOwned;
use tracing::{debug, info, instrument};

use crate::auth::CredentialProvider;
use crate::error::{DriveError, Result};
use crate::model::{DriveFile, FileList, FileMetadata, GOOGLE_DOC_MIME};

pub const DRIVE_API_BASE: &str = "https://www.googleapis.com/drive/v3";

const LIST_FIELDS: &str = "nextPageToken, files(id, name, mimeType, modifiedTime, webViewLink)";
const METADATA_FIELDS: &str = "mimeType, name";

/// Drive API client
pub struct DriveClient {
    http: Client,
    base_url: String,
    credentials: Arc<dyn CredentialProvider>,
}

impl DriveClient {
    pub fn new(credentials: Arc<dyn CredentialProvider>) -> Self {
        Self {
            http: Client::new(),
            base_url: DRIVE_API_BASE.to_string(),
            credentials,
        }
    }

    /// Point the client at another endpoint (proxies, tests).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Most recently modified files first.
    #[instrument(skip(self))]
    pub async fn list_recent_files(&self, page_size: u32) -> Result<Vec<DriveFile>> {
        let url = self.endpoint(&["files"])?;
        let page_size = page_size.to_string();

        let list: FileList = self
            .get_json(
                url,
                &[
                    ("orderBy", "modifiedTime desc"),
                    ("pageSize", page_size.as_str()),
                    ("fields", LIST_FIELDS),
                ],
            )
            .await?;

        debug!(count = list.files.len(), more = list.next_page_token.is_some(), "listed files");
        Ok(list.files)
    }

    #[instrument(skip(self))]
    pub async fn get_metadata(&self, file_id: &str) -> Result<FileMetadata> {
        let url = self.endpoint(&["files", file_id])?;
        self.get_json(url, &[("fields", METADATA_FIELDS)]).await
    }

    /// Export a Google Doc as plain text.
    ///
    /// Returns `Ok(None)` when the file is not a Google Doc; other Workspace
    /// types need different export formats.
    #[instrument(skip(self))]
    pub async fn export_text(&self, file_id: &str) -> Result<Option<String>> {
        let metadata = self.get_metadata(file_id).await?;
        let mime_type = metadata.mime_type.as_deref().unwrap_or_default();

        if mime_type != GOOGLE_DOC_MIME {
            info!(
                "File '{}' (ID: {}) is not a Google Document (mimeType: {}). Cannot export as plain text.",
                metadata.name.as_deref().unwrap_or("?"),
                file_id,
                mime_type
            );
            return Ok(None);
        }

        let url = self.endpoint(&["files", file_id, "export"])?;
        let response = self.get(url, &[("mimeType", "text/plain")]).await?;
        let text = response.text().await?;
        Ok(Some(text))
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let bad_base = || DriveError::BaseUrl {
            url: self.base_url.clone(),
        };
        let mut url = Url::parse(&self.base_url).map_err(|_| bad_base())?;
        url.path_segments_mut()
            .map_err(|_| bad_base())?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn get(&self, url: Url, query: &[(&str, &str)]) -> Result<Response> {
        let token = self.credentials.access_token().await?;

        let response = self
            .http
            .get(url)
            .query(query)
            .bearer_auth(&token.secret)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(DriveError::api(status, body));
        }

        Ok(response)
    }

    async fn get_json<T: DeserializeOwned>(&self, url: Url, query: &[(&str, &str)]) -> Result<T> {
        let response = self.get(url, query).await?;
        Ok(response.json().await?)
    }
}
