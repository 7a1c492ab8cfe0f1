use sled::{
    Config as DbConfig,
    Db,
};
use std::{
    net::SocketAddr,
    path::PathBuf,
};

use clap::Parser;
use tokio::net::TcpListener;
use tracing::level_filters::LevelFilter;
use url::Url;

use crate::server::StatementServer;

#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Config {
    /// Path of the report database, defaults to the platform data dir
    #[arg(long, env = "STMT_DB_PATH")]
    pub db_path: Option<PathBuf>,
    /// Cache size in bytes
    #[arg(long, env = "STMT_CACHE_SIZE", default_value = "1000000")]
    pub cache_size: usize,
    /// Api server address
    #[arg(long, env = "STMT_LISTEN_ADDR", default_value = "0.0.0.0:5001")]
    pub listen_addr: SocketAddr,
    /// Public base URL the statement QR codes point at
    #[arg(
        long,
        env = "STMT_VERIFY_BASE_URL",
        default_value = "https://verify.deepcheck.example"
    )]
    pub verify_base_url: Url,
    /// Log level
    #[arg(long, env = "STMT_LOG_LEVEL", default_value = "info")]
    pub log_level: LevelFilter,
}

impl Config {
    /// Build the statement server
    pub async fn build(self) -> anyhow::Result<StatementServer> {
        // Bind to an address
        let listener = TcpListener::bind(&self.listen_addr).await?;
        tracing::info!(listen_addr = ?self.listen_addr, "Listening on address");

        // Get the database path
        let root_dir = directories::ProjectDirs::from("io", "deepcheck", "statementd")
            .ok_or_else(|| anyhow::anyhow!("no home directory for the default db path"))?;
        let db_path = match &self.db_path {
            Some(db_path) => db_path.clone(),
            None => root_dir.data_dir().join("db"),
        };

        // Try to open the sled db
        let db: Db<{ crate::LEAF_FANOUT }> = DbConfig::new()
            .path(&db_path)
            .cache_capacity_bytes(self.cache_size)
            .open()?;

        let db_size = db.size_on_disk()?;
        tracing::info!(
            database_size_bytes = db_size,
            database_path = %db_path.display(),
            "Opened database"
        );
        metrics::gauge!("db_size_bytes").set(db_size as f64);

        Ok(StatementServer {
            listener,
            db,
            verify_base_url: self.verify_base_url,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    use tokio_util::sync::CancellationToken;

    #[tokio::test]
    async fn test_server_random_port() -> anyhow::Result<()> {
        let temp_dir = tempfile::TempDir::new()?;
        let addr = SocketAddr::from_str("127.0.0.1:0").unwrap();

        let config = Config {
            listen_addr: addr,
            db_path: Some(temp_dir.path().to_path_buf()),
            cache_size: 1024 * 1024,
            verify_base_url: Url::parse("https://verify.deepcheck.example").unwrap(),
            log_level: LevelFilter::current(),
        };

        let server = config.build().await?;

        let listen_addr = server.listener.local_addr()?;
        // Check that we got a random port
        assert_ne!(listen_addr.port(), 0);

        let cancel_token = CancellationToken::new();
        let cancel_token_clone = cancel_token.clone();

        let task_handle = tokio::task::spawn(async move {
            server.run(cancel_token_clone).await.unwrap();
        });

        tokio::time::sleep(std::time::Duration::from_millis(200)).await;

        let client = reqwest::Client::new();
        let response = client
            .get(format!("http://{listen_addr}/health"))
            .send()
            .await?;
        assert_eq!(response.status(), 200);

        cancel_token.cancel();
        task_handle.await.unwrap();
        Ok(())
    }

    #[test]
    fn test_config_defaults() {
        let config = Config::try_parse_from(vec!["program"]).unwrap();

        // Check default values
        assert_eq!(config.cache_size, 1000000);
        assert_eq!(config.listen_addr, "0.0.0.0:5001".parse().unwrap());
        assert_eq!(config.log_level, LevelFilter::INFO);
        assert_eq!(
            config.verify_base_url.as_str(),
            "https://verify.deepcheck.example/"
        );
        assert!(config.db_path.is_none());
    }

    #[test]
    fn test_config_args() {
        let config = Config::try_parse_from(vec![
            "program",
            "--cache-size",
            "2000000",
            "--listen-addr",
            "127.0.0.1:8080",
            "--log-level",
            "debug",
            "--db-path",
            "/tmp/test-db",
            "--verify-base-url",
            "https://verify.example.org",
        ])
        .unwrap();

        assert_eq!(config.cache_size, 2000000);
        assert_eq!(config.listen_addr, "127.0.0.1:8080".parse().unwrap());
        assert_eq!(config.log_level, LevelFilter::DEBUG);
        assert_eq!(config.db_path, Some(PathBuf::from("/tmp/test-db")));
        assert_eq!(config.verify_base_url.host_str(), Some("verify.example.org"));
    }
}
