//! Shared types for the statement verification service.
//!
//! Everything in here is pure and IO-free: the verification code scheme,
//! the report snapshot consumed by the server and client, and the wire
//! request/response payloads they exchange.

mod code;
mod report;
mod wire;

pub use code::{
    CODE_ALPHABET,
    PREFIX_ALPHABET,
    VerificationCode,
    verification_url,
};
pub use report::{
    ConfidenceTier,
    ContentType,
    Report,
    ReportStatus,
};
pub use wire::{
    ErrorBody,
    ReportSubmission,
    ReportSubmissionResponse,
    StatementRequest,
    VerifyRequest,
    VerifyResponse,
};
