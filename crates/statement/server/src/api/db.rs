use crate::api::types::{
    DbOperation,
    DbRequest,
    DbResponse,
};

use sled::Db;

use anyhow::Result;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Minimal key-value surface the store task needs.
pub trait Database {
    fn query(&self, key: &[u8]) -> Result<Option<DbResponse>>;
    fn put(&self, key: &[u8], value: &[u8]) -> Result<Option<DbResponse>>;
}

impl<const FANOUT: usize> Database for Db<FANOUT> {
    fn query(&self, key: &[u8]) -> Result<Option<DbResponse>> {
        match self.get(key)? {
            Some(value) => Ok(Some(DbResponse::Value(value.to_vec()))),
            None => Ok(None),
        }
    }

    fn put(&self, key: &[u8], value: &[u8]) -> Result<Option<DbResponse>> {
        match self.insert(key, value.to_vec())? {
            Some(old_value) => Ok(Some(DbResponse::Value(old_value.to_vec()))),
            None => {
                metrics::gauge!("report_store_records_sum").increment(1);
                Ok(None)
            }
        }
    }
}

/// Listens to a mpsc channel for report store events and responds
/// accordingly.
///
/// A failed storage operation does not stop the listener: the error is
/// logged and the responder dropped, which surfaces a store-unavailable
/// error to the waiting request handler.
pub async fn listen_for_db<DB: Database>(
    mut rx: mpsc::UnboundedReceiver<DbRequest>,
    db: DB,
    cancel_token: CancellationToken,
) -> Result<()> {
    loop {
        tokio::select! {
            () = cancel_token.cancelled() => {
                tracing::info!("Report store listener received cancellation signal, shutting down...");
                break;
            }
            Some(req) = rx.recv() => {
                let res = match req.request {
                    DbOperation::Get(key) => db.query(&key),
                    DbOperation::Insert(key, value) => db.put(&key, &value).map(|_| None),
                };

                match res {
                    Ok(res) => {
                        let _ = req.response.send(res);
                    }
                    Err(err) => {
                        metrics::counter!("report_store_errors_count").increment(1);
                        tracing::error!(?err, "Report store operation failed");
                    }
                }
            }
        }
    }
    Ok(())
}
