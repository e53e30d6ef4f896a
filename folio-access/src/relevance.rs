//! Relevance filtering
//!
//! Narrows the catalog's license types to the ones that actually bind one
//! record:
//!
//! 1. **Open access**: no conditions, or only `OPENACCESS` → nothing is relevant
//! 2. **Name match**: keep license types named in the record's conditions
//! 3. **Condition query**: evaluate `+(record) +(conditions)` against the index
//!    - match → the type binds
//!    - no match, moving wall → kept, marked expired (does not bind)
//!    - no match otherwise → dropped
//! 4. **Order**: configuration order is preserved

use crate::catalog::Catalog;
use crate::error::Result;
use crate::search::{combine_condition_query, is_open_access, ConditionCache, IndexQueryService};
use crate::types::LicenseType;
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, warn};

/// A license type that survived relevance filtering
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RelevantLicenseType<'a> {
    pub license_type: &'a LicenseType,
    /// Moving wall whose condition query no longer matches the record
    pub expired: bool,
}

/// License types relevant to one record, in catalog order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RelevantLicenseTypes<'a> {
    entries: Vec<RelevantLicenseType<'a>>,
}

impl<'a> RelevantLicenseTypes<'a> {
    pub fn entries(&self) -> &[RelevantLicenseType<'a>] {
        &self.entries
    }

    /// License types whose restriction currently binds
    pub fn binding(&self) -> impl Iterator<Item = &'a LicenseType> + '_ {
        self.entries
            .iter()
            .filter(|e| !e.expired)
            .map(|e| e.license_type)
    }

    /// Moving-wall license types that have lapsed for this record
    pub fn expired(&self) -> impl Iterator<Item = &'a LicenseType> + '_ {
        self.entries
            .iter()
            .filter(|e| e.expired)
            .map(|e| e.license_type)
    }

    /// True if nothing restricts the record
    pub fn is_unrestricted(&self) -> bool {
        self.entries.iter().all(|e| e.expired)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }
}

/// Reduce the catalog to the license types relevant to one record.
///
/// `existence_query` identifies the record (or file) in the index; it is
/// combined with each license type's condition query. Index failures are
/// propagated.
pub async fn filter_relevant<'a>(
    catalog: &'a Catalog,
    access_conditions: &BTreeSet<String>,
    existence_query: &str,
    index: &dyn IndexQueryService,
    cache: &ConditionCache,
) -> Result<RelevantLicenseTypes<'a>> {
    if is_open_access(access_conditions) {
        return Ok(RelevantLicenseTypes::default());
    }

    for name in access_conditions {
        if name != crate::types::OPEN_ACCESS && catalog.license_type(name).is_none() {
            warn!(condition = %name, "Record access condition names no configured license type");
        }
    }

    let mut entries = Vec::new();
    for license_type in catalog.license_types() {
        if !access_conditions.contains(&license_type.name) {
            continue;
        }

        let Some(conditions) = license_type.conditions_query() else {
            entries.push(RelevantLicenseType {
                license_type,
                expired: false,
            });
            continue;
        };

        let query = combine_condition_query(existence_query, conditions);
        if cache.matches(index, &query).await? {
            entries.push(RelevantLicenseType {
                license_type,
                expired: false,
            });
        } else if license_type.moving_wall {
            debug!(license_type = %license_type.name, "Moving wall expired for record");
            entries.push(RelevantLicenseType {
                license_type,
                expired: true,
            });
        } else {
            debug!(
                license_type = %license_type.name,
                "Condition query excludes record; license type not relevant"
            );
        }
    }

    Ok(RelevantLicenseTypes { entries })
}

/// Grouped form of [`filter_relevant`], e.g. one entry per page or file
/// group of a record. All groups share `cache`.
pub async fn filter_relevant_by_group<'a>(
    catalog: &'a Catalog,
    groups: &BTreeMap<String, BTreeSet<String>>,
    existence_query: &str,
    index: &dyn IndexQueryService,
    cache: &ConditionCache,
) -> Result<BTreeMap<String, RelevantLicenseTypes<'a>>> {
    let mut out = BTreeMap::new();
    for (key, conditions) in groups {
        let relevant = filter_relevant(catalog, conditions, existence_query, index, cache).await?;
        out.insert(key.clone(), relevant);
    }
    Ok(out)
}
