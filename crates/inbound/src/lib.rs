//! Inbound mail ingestion: relay webhook verification, payload
//! normalization, content sanitization and per-recipient delivery.

pub mod payload;
pub mod pipeline;
pub mod sanitizer;
pub mod signature;

pub use pipeline::{IngestError, IngestionReport, InboundProcessor, RecipientOutcome, RecipientStatus};
pub use signature::{DeployMode, SignatureVerifier};
