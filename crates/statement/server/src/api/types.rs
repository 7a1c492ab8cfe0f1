use tokio::sync::{
    mpsc,
    oneshot,
};

/// `tokio` `mpsc` channel used to send requests to the report store.
pub type DbRequestSender = mpsc::UnboundedSender<DbRequest>;

/// Operations the report store task performs. Keys are UTF-8 report
/// identifiers; values are bincode-serialized reports.
#[derive(Debug, Clone)]
pub enum DbOperation {
    /// Return value by key
    Get(Vec<u8>),
    /// Inserts into the store
    Insert(Vec<u8>, Vec<u8>),
}

#[derive(Debug, Clone)]
pub enum DbResponse {
    /// Regular value response
    Value(Vec<u8>),
}

/// Contains a request for the report store and a oneshot channel for a
/// response.
#[derive(Debug)]
pub struct DbRequest {
    pub request: DbOperation,
    pub response: oneshot::Sender<Option<DbResponse>>,
}
