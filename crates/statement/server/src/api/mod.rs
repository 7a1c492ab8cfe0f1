//! # `api`
//!
//! The `api` mod serves the verification endpoints over plain HTTP with
//! JSON bodies. Every response carries permissive CORS headers and
//! `OPTIONS` preflights are answered on any path.
//!
//! ## Endpoints
//!
//! ### `POST /statement`
//!
//! Generates the verification statement PDF for a report.
//!
//! #### Request
//!
//! ```json
//! { "reportId": "r-123" }
//! ```
//!
//! #### Success Response
//!
//! Status 200 with a binary `application/pdf` body,
//! `Content-Disposition: attachment; filename="report-r-123.pdf"` and the
//! derived code echoed in the `X-Verification-Code` header.
//!
//! #### Error Response
//!
//! ```json
//! { "error": "Report not found: r-123" }
//! ```
//!
//! Status 400 for every failure kind (missing field, unknown report,
//! rendering failure).
//!
//! ### `POST /verify`
//!
//! Checks a claimed identifier and code pair.
//!
//! #### Request
//!
//! ```json
//! { "reportId": "r-123", "verificationCode": "A1B2-C3D4-E5F6-G7H8" }
//! ```
//!
//! #### Response
//!
//! Always status 200 once both fields are present and the report exists; a
//! rejected code is a verdict, not an error:
//!
//! ```json
//! {
//!     "success": true,
//!     "verified": false,
//!     "report": null,
//!     "message": "Invalid verification code. Expected format XXXX-XXXX-XXXX-XXXX."
//! }
//! ```
//!
//! Missing fields or an unknown report produce the status-400 `{ "error" }`
//! envelope.
//!
//! ### `POST /reports`
//!
//! Stores a report record so statements can be generated for it. Returns
//! `{ "id": "r-..." }`; the identifier is generated when the submission
//! carries none.
//!
//! ### `GET /health`, `GET /ready`
//!
//! Liveness and store-readiness probes.

pub mod accept;
pub mod db;
pub mod process_request;
pub mod types;

use std::{
    net::SocketAddr,
    sync::Arc,
};
use tokio_util::sync::CancellationToken;
use url::Url;

pub use crate::config::Config;

use crate::api::types::DbRequest;

use hyper_util::rt::TokioIo;
use tokio::{
    net::{
        TcpListener,
        TcpStream,
    },
    sync::mpsc,
};

use anyhow::Result;

/// Start the API server
pub async fn serve(
    listener: TcpListener,
    db_tx: mpsc::UnboundedSender<DbRequest>,
    verify_base_url: Arc<Url>,
    cancel_token: CancellationToken,
) -> Result<()> {
    // We start a loop to continuously accept incoming connections
    loop {
        tokio::select! {
                () = cancel_token.cancelled() => {
                    tracing::info!("Api received cancellation signal, shutting down...");
                    break;
                }
                res = listener.accept() => {
                    match res {
                        Ok((stream, socketaddr)) => {
                            serve_connection(
                                socketaddr,
                                &db_tx,
                                verify_base_url.clone(),
                                stream,
                            );
                        }
                        Err(err) => {
                            tracing::error!(?err, "Error accepting connection");
                        }
                    }
                }
        }
    }

    Ok(())
}

fn serve_connection(
    socketaddr: SocketAddr,
    db_tx: &mpsc::UnboundedSender<DbRequest>,
    verify_base_url: Arc<Url>,
    stream: TcpStream,
) {
    tracing::debug!("Connection from: {}", socketaddr);

    // Use an adapter to access something implementing `tokio::io` traits as if they implement
    // `hyper::rt` IO traits.
    let io = TokioIo::new(stream);

    let db_clone = db_tx.clone();

    // Spawn a tokio task to serve multiple connections concurrently
    tokio::task::spawn(async move {
        crate::accept!(io, db_clone, verify_base_url, socketaddr);
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::TcpListener;
    use tokio_util::sync::CancellationToken;

    #[tokio::test]
    async fn test_serve() {
        // Setup a test listener
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        // Channel with no store task behind it
        let (db_tx, _db_rx) = mpsc::unbounded_channel();
        let verify_base_url = Arc::new(Url::parse("https://verify.deepcheck.example").unwrap());

        let cancel_token = CancellationToken::new();
        let cancel_token_clone = cancel_token.clone();
        // Start server in background
        let server_handle = tokio::spawn(async move {
            serve(listener, db_tx, verify_base_url, cancel_token_clone).await
        });

        let client = reqwest::Client::new();

        // Missing body fields surface as the 400 envelope
        let response = client
            .post(format!("http://{addr}/verify"))
            .json(&serde_json::json!({}))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), 400);

        let health_response = client
            .get(format!("http://{addr}/health"))
            .send()
            .await
            .unwrap();
        assert_eq!(health_response.status(), 200);

        // No store task is consuming requests, so readiness fails
        let ready_response = client
            .get(format!("http://{addr}/ready"))
            .send()
            .await
            .unwrap();
        assert_eq!(ready_response.status(), 503);

        // Cleanup
        cancel_token.cancel();
        server_handle.await.unwrap().unwrap();
    }
}
