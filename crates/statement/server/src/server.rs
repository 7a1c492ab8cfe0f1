use anyhow::Result;
use sled::Db;
use std::{
    future::Future,
    pin::Pin,
    sync::Arc,
};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use url::Url;

pub struct StatementServer {
    pub listener: TcpListener,
    pub db: Db<{ crate::LEAF_FANOUT }>,
    pub verify_base_url: Url,
}

// Type alias for boxed future
pub type BoxedFuture = Pin<Box<dyn Future<Output = anyhow::Result<()>> + Send + 'static>>;

impl StatementServer {
    /// Start the server
    /// Will run until either the report store or the API server stops running.
    pub fn start(self, cancel_token: CancellationToken) -> (BoxedFuture, BoxedFuture) {
        // Set up the channel for communicating with the report store
        let (db_tx, db_rx) = tokio::sync::mpsc::unbounded_channel::<crate::api::types::DbRequest>();

        // Start the store management task
        let db_handle = crate::api::db::listen_for_db(db_rx, self.db.clone(), cancel_token.clone());
        tracing::debug!("Started report store task");

        // Start the API server
        let api_handle = crate::api::serve(
            self.listener,
            db_tx,
            Arc::new(self.verify_base_url),
            cancel_token,
        );

        tracing::info!("Started API server");

        (Box::pin(api_handle), Box::pin(db_handle))
    }

    /// Run the server until the cancellation token is cancelled.
    ///
    /// The first task to stop takes the other one down with it: storage
    /// errors are absorbed per request inside the store task, so a task
    /// completing here means shutdown, not a transient fault.
    pub async fn run(self, cancel_token: CancellationToken) -> Result<()> {
        let (mut api_handle, mut db_handle) = self.start(cancel_token.clone());
        tokio::select! {
            res = &mut api_handle => {
                if let Err(e) = &res {
                    metrics::counter!("api_server_errors_count").increment(1);
                    tracing::error!("API server stopped with an error: {:?}", e);
                } else {
                    tracing::info!("Api stopped.");
                }
                cancel_token.cancel();
                db_handle.await?;
                tracing::info!("Report store stopped.");
                res
            }
            res = &mut db_handle => {
                if let Err(e) = &res {
                    metrics::counter!("report_store_errors_count").increment(1);
                    tracing::error!("Report store stopped with an error: {:?}", e);
                } else {
                    tracing::info!("Report store stopped.");
                }
                cancel_token.cancel();
                api_handle.await?;
                tracing::info!("Api stopped.");
                res
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;
    use tokio::net::TcpListener;

    #[tokio::test]
    async fn test_server_cancellation() {
        // Set up test components
        let temp_dir = TempDir::new().unwrap();
        let db = sled::Config::new().path(&temp_dir).open().unwrap();
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();

        // Create server instance
        let server = StatementServer {
            db,
            listener,
            verify_base_url: Url::parse("https://verify.deepcheck.example").unwrap(),
        };

        // Create cancellation token and clone for later cancellation
        let cancel_token = CancellationToken::new();
        let cancel_token_clone = cancel_token.clone();

        // Run server in background task
        let server_handle = tokio::spawn(async move {
            server.run(cancel_token).await.unwrap();
        });

        // Wait briefly to ensure server is running
        tokio::time::sleep(std::time::Duration::from_millis(100)).await;

        // Cancel the server
        cancel_token_clone.cancel();

        // Server should shutdown gracefully
        server_handle.await.unwrap();
    }
}
