//! Access-control decisions for the Folio digital library
//!
//! This crate decides whether a requester may exercise a privilege (view
//! images, download PDF, ...) on a record or one of its files, given a
//! catalog of license types and explicit licenses:
//!
//! - **Relevance**: only license types named in the record's access
//!   conditions, and whose condition query matches the record, restrict it
//! - **Moving walls**: a moving-wall type whose condition no longer matches
//!   has expired and restricts nothing
//! - **Client gate**: a client application without `Granted` status is
//!   refused before any license is consulted
//! - **AND across types**: every binding license type must permit the
//!   privilege, by default privileges or by an explicit license
//! - **UGC**: user-generated-content types only ever grant `VIEW_UGC`
//!
//! # Core Types
//!
//! - [`Catalog`]: Immutable, cheaply cloned snapshot of the rule catalog
//! - [`CatalogStore`]: Process-wide holder swapping snapshots atomically
//! - [`AccessContext`]: Per-request evaluator with a shared condition cache
//! - [`AccessPermission`]: The decision value
//!
//! # Usage
//!
//! Load a [`Catalog`] (see [`load_catalog_file`]) or assemble one with
//! [`Catalog::builder`], then create an [`AccessContext`] per external
//! request and call `check_record_access()` / `check_file_access()` with an
//! [`IndexQueryService`] and a [`RecordLookup`] backed by the search index.
//! [`generate_access_check_query`] builds the filter expression locating a
//! file's index document.

mod catalog;
mod config;
mod error;
mod evaluate;
mod query;
mod quota;
mod relevance;
mod search;
mod subnet;
mod types;

pub use catalog::{AccessSettings, Catalog, CatalogBuilder, CatalogStore};
pub use config::{
    load_catalog_file, AccessFileConfig, CatalogFile, IpRangeFileConfig, LicenseFileConfig,
    LicenseTypeFileConfig,
};
pub use error::{AccessError, ConfigError, Result};
pub use evaluate::AccessContext;
pub use query::{
    escape_value, generate_access_check_query, generate_record_query, FileCategory,
    FIELD_FILENAME, FIELD_FILENAME_ALTO, FIELD_FILENAME_FULLTEXT, FIELD_FILENAME_PLAIN,
    FIELD_FILENAME_XML, FIELD_PI, FIELD_PI_TOPSTRUCT,
};
pub use quota::{
    is_concurrent_views_limit_enabled_for_any_access_condition, pdf_download_quota_for_record,
    UNLIMITED_PDF_QUOTA,
};
pub use relevance::{
    filter_relevant, filter_relevant_by_group, RelevantLicenseType, RelevantLicenseTypes,
};
pub use search::{
    combine_condition_query, is_open_access, ConditionCache, IndexFut, IndexQueryService,
    RecordAccessInfo, RecordLookup,
};
pub use subnet::{is_loopback, parse_requester_ip, Subnet};
pub use types::{
    AccessPermission, AccessStatus, ClientApplication, IpRange, License, LicenseTarget,
    LicenseType, PermissionStatus, Privilege, Requester, User, OPEN_ACCESS,
};
