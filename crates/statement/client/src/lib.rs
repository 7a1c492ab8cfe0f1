use http::header;
use reqwest::Client;
use serde::Serialize;

use url::Url;

pub use statement_core::{
    ErrorBody,
    Report,
    ReportSubmission,
    ReportSubmissionResponse,
    StatementRequest,
    VerificationCode,
    VerifyRequest,
    VerifyResponse,
};

/// A client for the statement verification service.
///
/// ``` no_run
/// use statement_client::StatementClient;
///
/// #[tokio::main]
/// async fn main() {
///     let client = StatementClient::new("http://localhost:5001").unwrap();
///     let statement = client.fetch_statement("r-123").await.unwrap();
///     let verdict = client
///         .verify("r-123", statement.verification_code.as_deref().unwrap())
///         .await
///         .unwrap();
///     assert!(verdict.verified);
/// }
/// ```
#[derive(Debug)]
pub struct StatementClient {
    client: Client,
    base_url: Url,
}

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("HTTP client error: {0}")]
    ReqwestError(#[from] reqwest::Error),
    #[error("URL parse error: {0}")]
    UrlParseError(#[from] url::ParseError),
    #[error("JSON serialization error: {0}")]
    JsonError(#[from] serde_json::Error),
    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

/// A downloaded statement document.
#[derive(Debug, Clone)]
pub struct StatementPdf {
    /// Filename suggested by the `Content-Disposition` header.
    pub filename: Option<String>,
    /// Code echoed in the `X-Verification-Code` header.
    pub verification_code: Option<String>,
    /// The PDF document itself.
    pub bytes: Vec<u8>,
}

impl StatementClient {
    /// Create a new client
    pub fn new(base_url: &str) -> Result<Self, ClientError> {
        let base_url = Url::parse(base_url)?;
        let client = Client::builder().use_rustls_tls().build()?;

        Ok(Self { client, base_url })
    }

    /// Create a new client with authentication
    pub fn new_with_auth(base_url: &str, auth: &str) -> Result<Self, ClientError> {
        let base_url = Url::parse(base_url)?;
        let mut headers = header::HeaderMap::new();
        headers.insert(
            header::AUTHORIZATION,
            auth.parse().map_err(|_| {
                ClientError::InvalidResponse("Invalid authorization header".to_string())
            })?,
        );

        let client = Client::builder()
            .use_rustls_tls()
            .default_headers(headers)
            .build()?;

        Ok(Self { client, base_url })
    }

    /// POST a JSON payload and surface the service's `{ "error" }` envelope
    /// for non-success statuses.
    async fn post<P: Serialize>(
        &self,
        path: &str,
        payload: &P,
    ) -> Result<reqwest::Response, ClientError> {
        let url = self.base_url.join(path)?;
        let response = self.client.post(url).json(payload).send().await?;

        if response.status().is_success() {
            return Ok(response);
        }

        let status = response.status().as_u16();
        match response.json::<ErrorBody>().await {
            Ok(body) => Err(ClientError::Api {
                status,
                message: body.error,
            }),
            Err(_) => Err(ClientError::InvalidResponse(format!(
                "HTTP error: {status}"
            ))),
        }
    }

    /// Download the verification statement PDF for a report.
    pub async fn fetch_statement(&self, report_id: &str) -> Result<StatementPdf, ClientError> {
        let response = self
            .post(
                "/statement",
                &StatementRequest {
                    report_id: report_id.to_string(),
                },
            )
            .await?;

        let content_type = response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default();
        if content_type != "application/pdf" {
            return Err(ClientError::InvalidResponse(format!(
                "Expected application/pdf, got '{content_type}'"
            )));
        }

        let filename = response
            .headers()
            .get(header::CONTENT_DISPOSITION)
            .and_then(|v| v.to_str().ok())
            .and_then(parse_attachment_filename);
        let verification_code = response
            .headers()
            .get("x-verification-code")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        let bytes = response.bytes().await?.to_vec();

        Ok(StatementPdf {
            filename,
            verification_code,
            bytes,
        })
    }

    /// Submit an identifier and code pair and get the verdict.
    pub async fn verify(
        &self,
        report_id: &str,
        verification_code: &str,
    ) -> Result<VerifyResponse, ClientError> {
        let response = self
            .post(
                "/verify",
                &VerifyRequest {
                    report_id: report_id.to_string(),
                    verification_code: verification_code.to_string(),
                },
            )
            .await?;

        Ok(response.json().await?)
    }

    /// Store a report record, returning its identifier.
    pub async fn submit_report(
        &self,
        submission: &ReportSubmission,
    ) -> Result<String, ClientError> {
        let response = self.post("/reports", submission).await?;
        let body: ReportSubmissionResponse = response.json().await?;
        Ok(body.id)
    }
}

/// Pull the quoted filename out of an `attachment; filename="..."` header.
fn parse_attachment_filename(header_value: &str) -> Option<String> {
    let (_, tail) = header_value.split_once("filename=\"")?;
    let (filename, _) = tail.split_once('"')?;
    Some(filename.to_string())
}
