//! Remote collaborators of a scan session
//!
//! Both services are injected by the caller. A failure is always an error,
//! never a partial result.

use crate::errors::Result;
use crate::types::CardImage;
use std::collections::BTreeMap;
use std::future::Future;

/// Open key/value record returned by extraction (name, national ID, expiry
/// date, nationality, ...).
pub type FieldMap = BTreeMap<String, serde_json::Value>;

/// Both submission originals plus the identifying value.
#[derive(Debug, Clone)]
pub struct ExtractionRequest {
    pub front: CardImage,
    pub back: CardImage,
    pub identifier: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExtractionResponse {
    pub record_id: String,
    pub fields: FieldMap,
}

pub trait ExtractionService: Send + Sync {
    fn extract(
        &self,
        request: ExtractionRequest,
    ) -> impl Future<Output = Result<ExtractionResponse>> + Send;
}

/// Overwrites a stored record. Calls are idempotent.
pub trait RecordUpdateService: Send + Sync {
    fn update_record(
        &self,
        record_id: &str,
        fields: &FieldMap,
    ) -> impl Future<Output = Result<()>> + Send;
}
