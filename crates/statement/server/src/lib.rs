#![allow(clippy::missing_errors_doc)]
#![allow(clippy::must_use_candidate)]

pub mod api;
mod config;
pub mod pdf;
pub mod qr;
mod server;

pub use config::Config;
pub use server::StatementServer;

/// Leaf fanout for sled.
pub const LEAF_FANOUT: usize = 1024;
