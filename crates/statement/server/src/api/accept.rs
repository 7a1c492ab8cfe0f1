use crate::api::{
    process_request::{
        ApiResponse,
        Endpoint,
        handle,
    },
    types::{
        DbOperation,
        DbRequest,
        DbRequestSender,
    },
};

use core::convert::Infallible;
use std::{
    sync::Arc,
    time::Duration,
};

use http_body_util::Full;
use hyper::{
    Error,
    Method,
    Request,
    Response,
    StatusCode,
    body::Bytes,
    header,
};
use serde_json::json;
use tokio::sync::oneshot;
use url::Url;

/// Response builder pre-loaded with the permissive CORS headers every
/// response carries.
fn base_response(status: StatusCode) -> hyper::http::response::Builder {
    Response::builder()
        .status(status)
        .header(header::ACCESS_CONTROL_ALLOW_ORIGIN, "*")
        .header(header::ACCESS_CONTROL_ALLOW_METHODS, "POST, OPTIONS")
        .header(
            header::ACCESS_CONTROL_ALLOW_HEADERS,
            "authorization, content-type",
        )
}

fn json_response(status: StatusCode, body: String) -> Response<Full<Bytes>> {
    base_response(status)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Full::new(Bytes::from(body)))
        .unwrap()
}

fn error_response(status: StatusCode, message: &str) -> Response<Full<Bytes>> {
    json_response(status, json!({ "error": message }).to_string())
}

/// Accepts an incoming HTTP request, which it responds with
/// the appropriate api call.
#[tracing::instrument(level = "info", skip_all, target = "api::accept_request")]
pub async fn accept_request<B>(
    tx: Request<B>,
    db: DbRequestSender,
    verify_base_url: Arc<Url>,
    client_addr: std::net::SocketAddr,
) -> Result<Response<Full<Bytes>>, Infallible>
where
    B: hyper::body::Body<Error = Error>,
{
    let path = tx.uri().path().to_owned();
    let method = tx.method().clone();

    if method == Method::OPTIONS {
        return Ok(base_response(StatusCode::NO_CONTENT)
            .body(Full::new(Bytes::new()))
            .unwrap());
    }

    if path == "/health" && method == Method::GET {
        return Ok(base_response(StatusCode::OK)
            .body(Full::new(Bytes::from("ok")))
            .unwrap());
    }

    if path == "/ready" && method == Method::GET {
        let (status, body) = if check_database_readiness(&db).await {
            (StatusCode::OK, "ready")
        } else {
            (StatusCode::SERVICE_UNAVAILABLE, "not ready")
        };

        return Ok(base_response(status)
            .body(Full::new(Bytes::from(body)))
            .unwrap());
    }

    let Some(endpoint) = Endpoint::from_path(&path) else {
        return Ok(error_response(StatusCode::NOT_FOUND, "Not found"));
    };

    if method != Method::POST {
        return Ok(error_response(
            StatusCode::METHOD_NOT_ALLOWED,
            "Method not allowed",
        ));
    }

    tracing::debug!(target = "api::accept_request", "Incoming request");
    // Respond accordingly
    match handle(endpoint, tx, &db, &verify_base_url, client_addr).await {
        Ok(ApiResponse::Json { status, body }) => Ok(json_response(status, body)),
        Ok(ApiResponse::Pdf {
            filename,
            code,
            bytes,
        }) => Ok(base_response(StatusCode::OK)
            .header(header::CONTENT_TYPE, "application/pdf")
            .header(
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{filename}\""),
            )
            .header("X-Verification-Code", code.as_str())
            .body(Full::new(Bytes::from(bytes)))
            .unwrap()),
        // Every failure kind shares the blanket 400 envelope of the
        // original contract.
        Err(e) => Ok(error_response(StatusCode::BAD_REQUEST, &e.to_string())),
    }
}

async fn check_database_readiness(db: &DbRequestSender) -> bool {
    let (response_tx, response_rx) = oneshot::channel();
    let request = DbRequest {
        request: DbOperation::Get(Vec::new()),
        response: response_tx,
    };

    if db.send(request).is_err() {
        return false;
    }

    match tokio::time::timeout(Duration::from_secs(1), response_rx).await {
        Ok(Ok(_)) => true,
        Ok(Err(_)) | Err(_) => false,
    }
}


/// Macros for accepting requests
#[macro_export]
macro_rules! accept {
    (
        $io:expr,
        $db:expr,
        $verify_base_url:expr,
        $client_addr:expr
    ) => {
        let db_c = $db.clone();
        let verify_base_url = $verify_base_url.clone();
        let client_addr = $client_addr;
        // Bind the incoming connection to our service
        if let Err(err) = hyper::server::conn::http1::Builder::new()
            // `service_fn` converts our function in a `Service`
            .serve_connection(
                $io,
                hyper::service::service_fn(move |req| {
                    let db_c = db_c.clone();
                    let verify_base_url = verify_base_url.clone();
                    async move {
                        $crate::api::accept::accept_request(
                            req,
                            db_c,
                            verify_base_url,
                            client_addr,
                        )
                        .await
                    }
                }),
            )
            .await
        {
            tracing::error!(?err, "Error serving connection");
        }
    };
}
