//! Google Sheets report sink

use async_trait::async_trait;
use reqwest::Response;
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use tokio::sync::OnceCell;
use url::Url;

use super::{AccessTokenProvider, AttributionEvent, ReportError, ReportSink};

pub const DEFAULT_SHEETS_BASE: &str = "https://sheets.googleapis.com";
pub const DEFAULT_DRIVE_BASE: &str = "https://www.googleapis.com";

const SPREADSHEET_MIME: &str = "application/vnd.google-apps.spreadsheet";

/// How the spreadsheet is identified
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpreadsheetRef {
    Id(String),
    /// Looked up by title through the Drive API
    Name(String),
}

/// Spreadsheet and worksheet that receive report rows
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpreadsheetTarget {
    pub spreadsheet: SpreadsheetRef,
    /// Worksheet title; the first worksheet when unset
    pub worksheet: Option<String>,
}

impl SpreadsheetTarget {
    pub fn by_id(id: impl Into<String>) -> Self {
        Self {
            spreadsheet: SpreadsheetRef::Id(id.into()),
            worksheet: None,
        }
    }

    pub fn by_name(name: impl Into<String>) -> Self {
        Self {
            spreadsheet: SpreadsheetRef::Name(name.into()),
            worksheet: None,
        }
    }

    pub fn with_worksheet(mut self, worksheet: Option<String>) -> Self {
        self.worksheet = worksheet;
        self
    }
}

/// API base URLs, overridable for tests
#[derive(Debug, Clone)]
pub struct GoogleEndpoints {
    pub sheets: String,
    pub drive: String,
}

impl Default for GoogleEndpoints {
    fn default() -> Self {
        Self {
            sheets: DEFAULT_SHEETS_BASE.to_string(),
            drive: DEFAULT_DRIVE_BASE.to_string(),
        }
    }
}

impl GoogleEndpoints {
    /// Both APIs served from one base URL
    pub fn single(base: impl Into<String>) -> Self {
        let base = base.into();
        Self {
            sheets: base.clone(),
            drive: base,
        }
    }
}

#[derive(Debug, Clone)]
struct ResolvedSheet {
    spreadsheet_id: String,
    worksheet: String,
}

#[derive(Deserialize)]
struct DriveFileList {
    #[serde(default)]
    files: Vec<DriveFile>,
}

#[derive(Deserialize)]
struct DriveFile {
    id: String,
}

#[derive(Deserialize)]
struct SpreadsheetMeta {
    #[serde(default)]
    sheets: Vec<SheetMeta>,
}

#[derive(Deserialize)]
struct SheetMeta {
    properties: SheetProperties,
}

#[derive(Deserialize)]
struct SheetProperties {
    title: String,
}

/// Appends attribution rows to a Google spreadsheet
///
/// The spreadsheet id and worksheet title are resolved on the first append and
/// reused afterwards.
pub struct GoogleSheetsSink {
    http: reqwest::Client,
    auth: Arc<dyn AccessTokenProvider>,
    target: SpreadsheetTarget,
    endpoints: GoogleEndpoints,
    resolved: OnceCell<ResolvedSheet>,
}

impl GoogleSheetsSink {
    pub fn new(
        http: reqwest::Client,
        auth: Arc<dyn AccessTokenProvider>,
        target: SpreadsheetTarget,
        endpoints: GoogleEndpoints,
    ) -> Self {
        Self {
            http,
            auth,
            target,
            endpoints,
            resolved: OnceCell::new(),
        }
    }

    async fn resolved(&self, token: &str) -> Result<&ResolvedSheet, ReportError> {
        self.resolved
            .get_or_try_init(|| async {
                let spreadsheet_id = match &self.target.spreadsheet {
                    SpreadsheetRef::Id(id) => id.clone(),
                    SpreadsheetRef::Name(name) => self.find_spreadsheet(token, name).await?,
                };
                let worksheet = match &self.target.worksheet {
                    Some(title) => title.clone(),
                    None => self.first_worksheet(token, &spreadsheet_id).await?,
                };

                log::info!("Reporting to spreadsheet {} worksheet '{}'", spreadsheet_id, worksheet);
                Ok::<_, ReportError>(ResolvedSheet {
                    spreadsheet_id,
                    worksheet,
                })
            })
            .await
    }

    async fn find_spreadsheet(&self, token: &str, name: &str) -> Result<String, ReportError> {
        let url = endpoint(&self.endpoints.drive, &["drive", "v3", "files"])?;
        let query = format!(
            "name = '{}' and mimeType = '{}' and trashed = false",
            escape_drive_literal(name),
            SPREADSHEET_MIME
        );

        let response = self
            .http
            .get(url)
            .bearer_auth(token)
            .query(&[
                ("q", query.as_str()),
                ("fields", "files(id)"),
                ("pageSize", "1"),
                ("supportsAllDrives", "true"),
                ("includeItemsFromAllDrives", "true"),
            ])
            .send()
            .await?;
        let list: DriveFileList = error_for_status(response).await?.json().await?;

        list.files
            .into_iter()
            .next()
            .map(|file| file.id)
            .ok_or_else(|| ReportError::SpreadsheetNotFound(name.to_string()))
    }

    async fn first_worksheet(&self, token: &str, spreadsheet_id: &str) -> Result<String, ReportError> {
        let url = endpoint(&self.endpoints.sheets, &["v4", "spreadsheets", spreadsheet_id])?;

        let response = self
            .http
            .get(url)
            .bearer_auth(token)
            .query(&[("fields", "sheets.properties.title")])
            .send()
            .await?;
        let meta: SpreadsheetMeta = error_for_status(response).await?.json().await?;

        meta.sheets
            .into_iter()
            .next()
            .map(|sheet| sheet.properties.title)
            .ok_or_else(|| ReportError::NoWorksheet(spreadsheet_id.to_string()))
    }
}

#[async_trait]
impl ReportSink for GoogleSheetsSink {
    async fn append(&self, event: &AttributionEvent) -> Result<(), ReportError> {
        let token = self.auth.access_token().await?;
        let sheet = self.resolved(&token).await?;

        let range = format!("{}:append", quote_sheet_title(&sheet.worksheet));
        let url = endpoint(
            &self.endpoints.sheets,
            &["v4", "spreadsheets", &sheet.spreadsheet_id, "values", &range],
        )?;

        let response = self
            .http
            .post(url)
            .bearer_auth(&token)
            .query(&[("valueInputOption", "RAW"), ("insertDataOption", "INSERT_ROWS")])
            .json(&json!({ "values": [event.row()] }))
            .send()
            .await?;
        error_for_status(response).await?;

        Ok(())
    }
}

/// Turn a non-2xx response into [`ReportError::Status`], keeping the body
pub(crate) async fn error_for_status(response: Response) -> Result<Response, ReportError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    Err(ReportError::Status {
        status: status.as_u16(),
        body,
    })
}

fn endpoint(base: &str, segments: &[&str]) -> Result<Url, ReportError> {
    let mut url = Url::parse(base).map_err(|e| ReportError::Endpoint(format!("{}: {}", base, e)))?;
    url.path_segments_mut()
        .map_err(|_| ReportError::Endpoint(format!("{} cannot be a base URL", base)))?
        .pop_if_empty()
        .extend(segments);
    Ok(url)
}

/// A1-notation sheet reference: single quotes, inner quotes doubled
fn quote_sheet_title(title: &str) -> String {
    format!("'{}'", title.replace('\'', "''"))
}

fn escape_drive_literal(value: &str) -> String {
    value.replace('\\', "\\\\").replace('\'', "\\'")
}
