use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use url::Url;

#[derive(Error, Debug)]
pub enum GatewayError {
    #[error("request to sheets api failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("sheets api returned {status}: {body}")]
    Upstream { status: u16, body: String },
    #[error("invalid sheets api url: {0}")]
    Url(#[from] url::ParseError),
}

/// The three Sheets calls the skill needs. Every call is a single round
/// trip authorised with the user's linked access token.
#[async_trait]
pub trait SpreadsheetGateway: Send + Sync {
    async fn create_spreadsheet(
        &self,
        access_token: &str,
        title: &str,
    ) -> Result<String, GatewayError>;

    async fn append_row(
        &self,
        access_token: &str,
        spreadsheet_id: &str,
        row: Vec<Value>,
    ) -> Result<(), GatewayError>;

    async fn read_header_row(
        &self,
        access_token: &str,
        spreadsheet_id: &str,
    ) -> Result<Vec<Value>, GatewayError>;
}

#[derive(Debug, Serialize)]
struct SpreadsheetProperties<'a> {
    title: &'a str,
}

#[derive(Debug, Serialize)]
struct CreateSpreadsheetRequest<'a> {
    properties: SpreadsheetProperties<'a>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateSpreadsheetResponse {
    spreadsheet_id: String,
}

#[derive(Debug, Serialize)]
struct ValueRange {
    values: Vec<Vec<Value>>,
}

#[derive(Debug, Deserialize)]
struct ValueRangeResponse {
    #[serde(default)]
    values: Vec<Vec<Value>>,
}

pub struct SheetsClient {
    client: reqwest::Client,
    base_url: Url,
    data_range: String,
    header_range: String,
}

impl SheetsClient {
    /// `base_url` is the API root, e.g. `https://sheets.googleapis.com`.
    pub fn new(
        base_url: &str,
        data_range: impl Into<String>,
        header_range: impl Into<String>,
    ) -> Result<Self, GatewayError> {
        Ok(SheetsClient {
            client: reqwest::Client::new(),
            base_url: Url::parse(base_url)?,
            data_range: data_range.into(),
            header_range: header_range.into(),
        })
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url, GatewayError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| url::ParseError::RelativeUrlWithCannotBeABaseBase)?
            .pop_if_empty()
            .push("v4")
            .push("spreadsheets")
            .extend(segments);
        Ok(url)
    }

    async fn check_status(res: reqwest::Response) -> Result<reqwest::Response, GatewayError> {
        let status = res.status();
        if status.is_success() {
            return Ok(res);
        }

        let body = res.text().await.unwrap_or_default();
        tracing::error!("Sheets API returned status={} body={}", status, &body);
        Err(GatewayError::Upstream {
            status: status.as_u16(),
            body,
        })
    }
}

#[async_trait]
impl SpreadsheetGateway for SheetsClient {
    async fn create_spreadsheet(
        &self,
        access_token: &str,
        title: &str,
    ) -> Result<String, GatewayError> {
        tracing::info!("Creating spreadsheet title={}", title);

        let res = self
            .client
            .post(self.endpoint(&[])?)
            .bearer_auth(access_token)
            .query(&[("fields", "spreadsheetId")])
            .json(&CreateSpreadsheetRequest {
                properties: SpreadsheetProperties { title },
            })
            .send()
            .await
            .inspect_err(|err| {
                tracing::error!("Error occurred in request to Sheets create API: {:#?}", err)
            })?;

        let created = Self::check_status(res)
            .await?
            .json::<CreateSpreadsheetResponse>()
            .await
            .inspect_err(|err| {
                tracing::error!(
                    "Error occurred while deserialising create spreadsheet response: {:#?}",
                    err
                )
            })?;

        tracing::info!("Created spreadsheet_id={}", &created.spreadsheet_id);

        Ok(created.spreadsheet_id)
    }

    async fn append_row(
        &self,
        access_token: &str,
        spreadsheet_id: &str,
        row: Vec<Value>,
    ) -> Result<(), GatewayError> {
        tracing::info!(
            "Appending row to spreadsheet_id={} row={}",
            spreadsheet_id,
            serde_json::Value::Array(row.clone())
        );

        let append_target = format!("{}:append", self.data_range);
        let res = self
            .client
            .post(self.endpoint(&[spreadsheet_id, "values", &append_target])?)
            .bearer_auth(access_token)
            .query(&[
                ("valueInputOption", "RAW"),
                ("insertDataOption", "INSERT_ROWS"),
            ])
            .json(&ValueRange { values: vec![row] })
            .send()
            .await
            .inspect_err(|err| {
                tracing::error!("Error occurred in request to Sheets append API: {:#?}", err)
            })?;

        Self::check_status(res).await?;

        Ok(())
    }

    async fn read_header_row(
        &self,
        access_token: &str,
        spreadsheet_id: &str,
    ) -> Result<Vec<Value>, GatewayError> {
        tracing::info!("Reading header row of spreadsheet_id={}", spreadsheet_id);

        let res = self
            .client
            .get(self.endpoint(&[spreadsheet_id, "values", &self.header_range])?)
            .bearer_auth(access_token)
            .query(&[
                ("valueRenderOption", "UNFORMATTED_VALUE"),
                ("dateTimeRenderOption", "FORMATTED_STRING"),
            ])
            .send()
            .await
            .inspect_err(|err| {
                tracing::error!("Error occurred in request to Sheets values API: {:#?}", err)
            })?;

        let range = Self::check_status(res)
            .await?
            .json::<ValueRangeResponse>()
            .await
            .inspect_err(|err| {
                tracing::error!(
                    "Error occurred while deserialising values response: {:#?}",
                    err
                )
            })?;

        Ok(range.values.into_iter().next().unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use wiremock::{
        Mock, MockServer, ResponseTemplate,
        matchers::{body_json, header, method, path, query_param},
    };

    use super::*;

    async fn client_for(server: &MockServer) -> SheetsClient {
        SheetsClient::new(&server.uri(), "A1:D", "A1:D1").unwrap()
    }

    #[tokio::test]
    async fn create_spreadsheet_returns_new_id() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v4/spreadsheets"))
            .and(query_param("fields", "spreadsheetId"))
            .and(header("authorization", "Bearer token-1"))
            .and(body_json(json!({ "properties": { "title": "Receipts List 2024-05-04" } })))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({ "spreadsheetId": "sheet-42" })),
            )
            .expect(1)
            .mount(&server)
            .await;

        let id = client_for(&server)
            .await
            .create_spreadsheet("token-1", "Receipts List 2024-05-04")
            .await
            .unwrap();

        assert_eq!(id, "sheet-42");
    }

    #[tokio::test]
    async fn append_row_posts_single_row() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v4/spreadsheets/sheet-42/values/A1:D:append"))
            .and(query_param("valueInputOption", "RAW"))
            .and(query_param("insertDataOption", "INSERT_ROWS"))
            .and(body_json(json!({
                "values": [["2024-05-04", "Apotheke", 4, "Medikamente"]]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "spreadsheetId": "sheet-42",
                "updates": { "updatedRows": 1 }
            })))
            .expect(1)
            .mount(&server)
            .await;

        client_for(&server)
            .await
            .append_row(
                "token-1",
                "sheet-42",
                vec![json!("2024-05-04"), json!("Apotheke"), json!(4), json!("Medikamente")],
            )
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn read_header_row_returns_first_row() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v4/spreadsheets/sheet-42/values/A1:D1"))
            .and(query_param("valueRenderOption", "UNFORMATTED_VALUE"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "range": "Sheet1!A1:D1",
                "majorDimension": "ROWS",
                "values": [["Date", "Shop", "Amount", "Category"]]
            })))
            .mount(&server)
            .await;

        let header_row = client_for(&server)
            .await
            .read_header_row("token-1", "sheet-42")
            .await
            .unwrap();

        assert_eq!(
            header_row,
            vec![json!("Date"), json!("Shop"), json!("Amount"), json!("Category")]
        );
    }

    #[tokio::test]
    async fn empty_range_reads_as_empty_row() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v4/spreadsheets/sheet-42/values/A1:D1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "range": "Sheet1!A1:D1",
                "majorDimension": "ROWS"
            })))
            .mount(&server)
            .await;

        let header_row = client_for(&server)
            .await
            .read_header_row("token-1", "sheet-42")
            .await
            .unwrap();

        assert!(header_row.is_empty());
    }

    #[tokio::test]
    async fn upstream_error_carries_status_and_payload() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v4/spreadsheets/gone/values/A1:D1"))
            .respond_with(ResponseTemplate::new(404).set_body_json(json!({
                "error": { "code": 404, "message": "Requested entity was not found.", "status": "NOT_FOUND" }
            })))
            .mount(&server)
            .await;

        let err = client_for(&server)
            .await
            .read_header_row("token-1", "gone")
            .await
            .unwrap_err();

        match err {
            GatewayError::Upstream { status, body } => {
                assert_eq!(status, 404);
                assert!(body.contains("NOT_FOUND"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
