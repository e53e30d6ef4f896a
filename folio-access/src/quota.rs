//! Quota and limit lookups layered on the rule catalog

use crate::catalog::Catalog;
use crate::error::{AccessError, Result};
use crate::search::RecordLookup;
use tracing::trace;

/// Quota value meaning "no restriction"
pub const UNLIMITED_PDF_QUOTA: u32 = 100;

/// Percentage (0..=100) of a record's pages that may be downloaded as PDF.
///
/// The per-record value only applies when one of the record's license types
/// enables the PDF quota. Open-access records and records without a
/// configured value get [`UNLIMITED_PDF_QUOTA`].
pub async fn pdf_download_quota_for_record(
    catalog: &Catalog,
    pi: &str,
    lookup: &dyn RecordLookup,
) -> Result<u32> {
    let info = lookup
        .find_record(pi)
        .await?
        .ok_or_else(|| AccessError::record_not_found(pi))?;

    if info.is_open_access() {
        return Ok(UNLIMITED_PDF_QUOTA);
    }

    let quota_enabled = info
        .access_conditions
        .iter()
        .filter_map(|name| catalog.license_type(name))
        .any(|lt| lt.pdf_download_quota);
    if !quota_enabled {
        return Ok(UNLIMITED_PDF_QUOTA);
    }

    let quota = info
        .pdf_quota
        .map_or(UNLIMITED_PDF_QUOTA, |q| q.min(UNLIMITED_PDF_QUOTA));
    trace!(pi, quota, "PDF download quota");
    Ok(quota)
}

/// True if any license type named in `access_conditions` caps concurrent
/// views. Empty input is not an error.
pub fn is_concurrent_views_limit_enabled_for_any_access_condition<S: AsRef<str>>(
    catalog: &Catalog,
    access_conditions: &[S],
) -> bool {
    access_conditions
        .iter()
        .filter_map(|name| catalog.license_type(name.as_ref()))
        .any(|lt| lt.concurrent_views_limit)
}
