//! Implements the `Sheet` trait using the `sheets::Client` to interact with a Google sheet.

use crate::api::{Sheet, TokenProvider};
use crate::error::{ErrorType, IntoResult};
use crate::{Error, Result};
use anyhow::Context;
use reqwest::StatusCode;
use serde::Deserialize;
use sheets::types::{
    BatchUpdateValuesRequest, DateTimeRenderOption, Dimension, ValueInputOption, ValueRange,
    ValueRenderOption,
};
use sheets::ClientError;
use tracing::trace;
use url::Url;

const SHEETS_API: &str = "https://sheets.googleapis.com/v4/spreadsheets";

/// Implements the `Sheet` trait against the first worksheet of a Google spreadsheet. It takes a
/// `TokenProvider`, on which it calls refresh to keep the token up-to-date.
pub(super) struct GoogleSheet {
    spreadsheet_id: String,
    token_provider: TokenProvider,
    client: Option<sheets::Client>,
    worksheet: Option<Worksheet>,
}

/// The title and numeric id of the worksheet that holds the ledger.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Worksheet {
    sheet_id: i64,
    title: String,
}

#[derive(Debug, Deserialize)]
struct SpreadsheetMetadata {
    #[serde(default)]
    sheets: Vec<SheetEntry>,
}

#[derive(Debug, Deserialize)]
struct SheetEntry {
    properties: Worksheet,
}

impl GoogleSheet {
    pub(super) fn new(spreadsheet_id: impl Into<String>, token_provider: TokenProvider) -> Self {
        Self {
            spreadsheet_id: spreadsheet_id.into(),
            token_provider,
            client: None,
            worksheet: None,
        }
    }

    /// Refreshes the sheets client with a new access token if needed.
    async fn refresh_client(&mut self) -> Result<&sheets::Client> {
        let access_token = self.token_provider.token_with_refresh().await?;
        // The sheets crate wants the full set of OAuth fields but API calls only use the token.
        let client = sheets::Client::new(
            String::new(),
            String::new(),
            String::new(),
            access_token.to_string(),
            String::new(),
        );
        Ok(self.client.insert(client))
    }

    /// Looks up the first worksheet once and remembers it.
    async fn worksheet(&mut self) -> Result<Worksheet> {
        if let Some(worksheet) = &self.worksheet {
            return Ok(worksheet.clone());
        }
        let mut url = self.spreadsheet_url()?;
        url.query_pairs_mut()
            .append_pair("fields", "sheets.properties");
        let token = self.token_provider.token_with_refresh().await?.to_string();
        let response = reqwest::Client::new()
            .get(url)
            .bearer_auth(token)
            .send()
            .await
            .context("Failed to send the spreadsheet metadata request")
            .pub_result(ErrorType::StoreUnavailable)?;
        let response = check_response(response, "read the spreadsheet metadata").await?;
        let metadata: SpreadsheetMetadata = response
            .json()
            .await
            .context("Failed to parse the spreadsheet metadata")
            .pub_result(ErrorType::StoreUnavailable)?;
        let worksheet = metadata
            .sheets
            .into_iter()
            .next()
            .map(|entry| entry.properties)
            .context("The spreadsheet does not have any worksheets")
            .pub_result(ErrorType::StoreUnavailable)?;
        trace!(
            "Using worksheet '{}' with id {}",
            worksheet.title,
            worksheet.sheet_id
        );
        self.worksheet = Some(worksheet.clone());
        Ok(worksheet)
    }

    fn spreadsheet_url(&self) -> Result<Url> {
        let mut url = Url::parse(SHEETS_API)
            .context("Invalid Sheets API URL")
            .pub_result(ErrorType::Config)?;
        url.path_segments_mut()
            .map_err(|_| Error::msg(ErrorType::Config, "The Sheets API URL cannot have a path"))?
            .push(&self.spreadsheet_id);
        Ok(url)
    }
}

#[async_trait::async_trait]
impl Sheet for GoogleSheet {
    async fn get(&mut self) -> Result<Vec<Vec<String>>> {
        let worksheet = self.worksheet().await?;
        let range = format!("{}!A:E", quote_title(&worksheet.title));
        trace!("get {range}");
        let spreadsheet_id = self.spreadsheet_id.clone();
        let client = self.refresh_client().await?;
        let response = client
            .spreadsheets()
            .values_get(
                &spreadsheet_id,
                &range,
                DateTimeRenderOption::FormattedString,
                Dimension::Rows,
                ValueRenderOption::FormattedValue,
            )
            .await
            .map_err(|e| map_client_error(e, false))
            .map_err(|e| e.context(format!("Failed to fetch {range}")))?;
        Ok(response.body.values)
    }

    async fn append_rows(&mut self, rows: &[Vec<String>]) -> Result<()> {
        let worksheet = self.worksheet().await?;
        let range = format!("{}!A1", quote_title(&worksheet.title));
        trace!("append to {range}");
        let append_segment = format!("{range}:append");
        let mut url = self.spreadsheet_url()?;
        url.path_segments_mut()
            .map_err(|_| Error::msg(ErrorType::Config, "The Sheets API URL cannot have a path"))?
            .extend(["values", append_segment.as_str()]);
        url.query_pairs_mut()
            .append_pair("valueInputOption", "USER_ENTERED")
            .append_pair("insertDataOption", "INSERT_ROWS");
        let token = self.token_provider.token_with_refresh().await?.to_string();
        let response = reqwest::Client::new()
            .post(url)
            .bearer_auth(token)
            .json(&serde_json::json!({
                "majorDimension": "ROWS",
                "values": rows,
            }))
            .send()
            .await
            .context("Failed to send the append request")
            .pub_result(ErrorType::StoreUnavailable)?;
        check_response(response, "append rows").await?;
        Ok(())
    }

    async fn write_row(&mut self, row: usize, values: &[String]) -> Result<()> {
        let worksheet = self.worksheet().await?;
        let range = format!(
            "{}!A{row}:{}{row}",
            quote_title(&worksheet.title),
            column_letter(values.len())
        );
        trace!("write {range}");
        let request = BatchUpdateValuesRequest {
            data: vec![ValueRange {
                major_dimension: Some(Dimension::Rows),
                range: range.clone(),
                values: vec![values.to_vec()],
            }],
            include_values_in_response: Some(false),
            response_date_time_render_option: None,
            response_value_render_option: None,
            value_input_option: Some(ValueInputOption::UserEntered),
        };
        let spreadsheet_id = self.spreadsheet_id.clone();
        let client = self.refresh_client().await?;
        client
            .spreadsheets()
            .values_batch_update(&spreadsheet_id, &request)
            .await
            .map_err(|e| map_client_error(e, true))
            .map_err(|e| e.context(format!("Failed to write {range}")))?;
        Ok(())
    }

    async fn delete_row(&mut self, row: usize) -> Result<()> {
        let worksheet = self.worksheet().await?;
        trace!("delete row {row} of '{}'", worksheet.title);
        let mut url = self.spreadsheet_url()?;
        // `:batchUpdate` is a suffix of the spreadsheet id segment, not a segment of its own
        let path = format!("{}:batchUpdate", url.path());
        url.set_path(&path);
        let token = self.token_provider.token_with_refresh().await?.to_string();
        let response = reqwest::Client::new()
            .post(url)
            .bearer_auth(token)
            .json(&serde_json::json!({
                "requests": [{
                    "deleteDimension": {
                        "range": {
                            "sheetId": worksheet.sheet_id,
                            "dimension": "ROWS",
                            "startIndex": row - 1,
                            "endIndex": row,
                        }
                    }
                }]
            }))
            .send()
            .await
            .context("Failed to send the delete request")
            .pub_result(ErrorType::StoreUnavailable)?;
        check_response(response, "delete a row").await?;
        Ok(())
    }
}

/// Converts a non-success response into an `Error`. A 400 means Google understood the request and
/// refused it, anything else means the sheet could not be used.
async fn check_response(response: reqwest::Response, action: &str) -> Result<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response
        .text()
        .await
        .unwrap_or_else(|_| "Unable to read response body".to_string());
    let error_type = match status {
        StatusCode::BAD_REQUEST => ErrorType::StoreRejected,
        _ => ErrorType::StoreUnavailable,
    };
    Err(Error::msg(
        error_type,
        format!("Unable to {action}, Google Sheets responded with {status}: {body}"),
    ))
}

fn map_client_error(e: ClientError, is_write: bool) -> Error {
    let (error_type, name) = match &e {
        ClientError::HttpError { .. } if is_write => (ErrorType::StoreRejected, "HttpError"),
        ClientError::HttpError { .. } => (ErrorType::StoreUnavailable, "HttpError"),
        ClientError::EmptyRefreshToken => (ErrorType::StoreUnavailable, "EmptyRefreshToken"),
        ClientError::ReqwestError(_) | ClientError::ReqwestMiddleWareError(_) => {
            (ErrorType::StoreUnavailable, "ReqwestError")
        }
        _ => (ErrorType::StoreUnavailable, "ClientError"),
    };
    Error::new(error_type, anyhow::Error::new(e).context(name))
}

/// Quotes a worksheet title for use in A1 notation.
fn quote_title(title: &str) -> String {
    format!("'{}'", title.replace('\'', "''"))
}

/// The A1 column letter for the 1-based column `n`. The ledger never has more than 26 columns.
fn column_letter(n: usize) -> char {
    let n = n.clamp(1, 26) as u8;
    (b'A' + n - 1) as char
}
