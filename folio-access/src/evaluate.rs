//! Access decision logic
//!
//! This module implements the privilege decision for one requester and one
//! record (or file):
//!
//! 1. **No conditions**: a record without access conditions is granted
//! 2. **Relevance**: narrow the catalog to the license types binding the record
//! 3. **Unrestricted**: nothing binds (open access, expired moving walls) → grant
//! 4. **Client gate**: a client application not in `Granted` status → deny
//! 5. **Localhost**: loopback requesters are granted when
//!    `full_access_for_localhost` is set
//! 6. **Superuser**: superusers are granted
//! 7. **All types must permit**: every binding license type must permit the
//!    privilege, by UGC rule, by default privileges, or by an explicit license
//!    whose target matches the requester
//!
//! Denials are returned as values; only index and lookup failures are errors.

use crate::catalog::Catalog;
use crate::query::{generate_access_check_query, generate_record_query};
use crate::relevance::filter_relevant;
use crate::search::{combine_condition_query, ConditionCache, IndexQueryService, RecordLookup};
use crate::subnet::{is_loopback, parse_requester_ip};
use crate::types::{
    AccessPermission, License, LicenseTarget, LicenseType, Privilege, Requester,
};
use crate::{AccessError, Result};
use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, BTreeSet};
use std::net::IpAddr;
use tracing::{debug, trace, warn};

/// Per-request evaluation context
///
/// Holds one catalog snapshot, the clock used for license validity windows,
/// and the condition cache shared by every check made for the same external
/// request.
#[derive(Debug, Clone)]
pub struct AccessContext {
    catalog: Catalog,
    cache: ConditionCache,
    now: DateTime<Utc>,
}

impl AccessContext {
    /// Create a context over `catalog` with a fresh cache and the current time
    pub fn new(catalog: Catalog) -> Self {
        Self {
            catalog,
            cache: ConditionCache::new(),
            now: Utc::now(),
        }
    }

    /// Evaluate license validity windows at `now` instead of the current time
    pub fn at(mut self, now: DateTime<Utc>) -> Self {
        self.now = now;
        self
    }

    /// Share an existing condition cache
    pub fn with_cache(mut self, cache: ConditionCache) -> Self {
        self.cache = cache;
        self
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn cache(&self) -> &ConditionCache {
        &self.cache
    }

    /// Decide whether `requester` may exercise `privilege` on a record.
    ///
    /// # Arguments
    ///
    /// * `access_conditions` - License-type names attached to the record
    /// * `privilege` - The privilege being exercised
    /// * `requester` - User, address and client application of the caller
    /// * `existence_query` - Filter expression identifying the record or file
    /// * `index` - Search index answering condition queries
    ///
    /// # Returns
    ///
    /// The decision, or `IndexUnreachable` if a condition query could not
    /// be answered.
    pub async fn check_access_permission(
        &self,
        access_conditions: &BTreeSet<String>,
        privilege: &Privilege,
        requester: &Requester<'_>,
        existence_query: &str,
        index: &dyn IndexQueryService,
    ) -> Result<AccessPermission> {
        if access_conditions.is_empty() {
            trace!(%privilege, "No access conditions recorded; granted");
            return Ok(AccessPermission::granted());
        }

        let relevant = filter_relevant(
            &self.catalog,
            access_conditions,
            existence_query,
            index,
            &self.cache,
        )
        .await?;

        if relevant.is_unrestricted() {
            trace!(
                %privilege,
                expired = relevant.expired().count(),
                "No binding license types; granted"
            );
            return Ok(AccessPermission::granted());
        }

        if let Some(client) = requester.client {
            if !client.is_granted() {
                debug!(
                    client = %client.identifier,
                    status = ?client.access_status,
                    "Client application not admitted; denied"
                );
                return Ok(AccessPermission::client_not_granted());
            }
        }

        let ip = requester_ip(requester);

        if self.catalog.settings().full_access_for_localhost && ip.as_ref().is_some_and(is_loopback) {
            debug!(%privilege, "Loopback requester granted by full_access_for_localhost");
            return Ok(AccessPermission::granted());
        }

        if let Some(user) = requester.user.filter(|u| u.superuser) {
            debug!(user = %user.id, %privilege, "Superuser granted");
            return Ok(AccessPermission::granted());
        }

        for license_type in relevant.binding() {
            let permitted = self
                .permits(license_type, privilege, requester, ip.as_ref(), existence_query, index)
                .await?;
            if !permitted {
                debug!(
                    license_type = %license_type.name,
                    %privilege,
                    "License type does not permit privilege; denied"
                );
                return Ok(AccessPermission::denied(vec![license_type.name.clone()]));
            }
        }

        trace!(%privilege, "All binding license types permit privilege; granted");
        Ok(AccessPermission::granted())
    }

    /// Decide one privilege for several file groups of the same record
    /// (e.g. one entry per page). The condition cache is shared by all groups.
    pub async fn check_access_permission_by_group(
        &self,
        groups: &BTreeMap<String, BTreeSet<String>>,
        privilege: &Privilege,
        requester: &Requester<'_>,
        existence_query: &str,
        index: &dyn IndexQueryService,
    ) -> Result<BTreeMap<String, AccessPermission>> {
        let mut out = BTreeMap::new();
        for (key, conditions) in groups {
            let permission = self
                .check_access_permission(conditions, privilege, requester, existence_query, index)
                .await?;
            out.insert(key.clone(), permission);
        }
        Ok(out)
    }

    /// Resolve a record by identifier and decide `privilege` on it.
    ///
    /// Fails with `RecordNotFound` if the record does not exist.
    pub async fn check_record_access(
        &self,
        pi: &str,
        privilege: &Privilege,
        requester: &Requester<'_>,
        lookup: &dyn RecordLookup,
        index: &dyn IndexQueryService,
    ) -> Result<AccessPermission> {
        let existence_query = generate_record_query(pi)?;
        let info = lookup
            .find_record(pi)
            .await?
            .ok_or_else(|| AccessError::record_not_found(pi))?;
        self.check_access_permission(
            &info.access_conditions,
            privilege,
            requester,
            &existence_query,
            index,
        )
        .await
    }

    /// Resolve the index document of one file of record `pi` and decide
    /// `privilege` on it.
    ///
    /// Fails with `RecordNotFound` if no document matches the file.
    pub async fn check_file_access(
        &self,
        pi: &str,
        file_reference: &str,
        privilege: &Privilege,
        requester: &Requester<'_>,
        lookup: &dyn RecordLookup,
        index: &dyn IndexQueryService,
    ) -> Result<AccessPermission> {
        let existence_query = generate_access_check_query(pi, file_reference)?;
        let info = lookup
            .find_file(&existence_query)
            .await?
            .ok_or_else(|| AccessError::record_not_found(pi))?;
        self.check_access_permission(
            &info.access_conditions,
            privilege,
            requester,
            &existence_query,
            index,
        )
        .await
    }

    /// Check whether a single binding license type permits `privilege`
    async fn permits(
        &self,
        license_type: &LicenseType,
        privilege: &Privilege,
        requester: &Requester<'_>,
        ip: Option<&IpAddr>,
        existence_query: &str,
        index: &dyn IndexQueryService,
    ) -> Result<bool> {
        // UGC types decide on the privilege alone
        if license_type.ugc {
            return Ok(*privilege == Privilege::VIEW_UGC);
        }

        if license_type.grants_by_default(privilege) {
            trace!(license_type = %license_type.name, %privilege, "Granted by default privileges");
            return Ok(true);
        }

        for license in self.catalog.licenses_for(&license_type.name) {
            if !license.grants(privilege) || !license.is_valid_at(self.now) {
                continue;
            }
            if !target_matches(license, requester, ip) {
                continue;
            }
            if let Some(conditions) = license.conditions_query() {
                let query = combine_condition_query(existence_query, conditions);
                if !self.cache.matches(index, &query).await? {
                    trace!(
                        license_type = %license_type.name,
                        target = license.target().kind(),
                        "License condition excludes record"
                    );
                    continue;
                }
            }
            trace!(
                license_type = %license_type.name,
                target = license.target().kind(),
                %privilege,
                "Granted by license"
            );
            return Ok(true);
        }

        Ok(false)
    }
}

/// Parse the requester address; an unparsable address matches no range
fn requester_ip(requester: &Requester<'_>) -> Option<IpAddr> {
    let raw = requester.ip_address?;
    let ip = parse_requester_ip(raw);
    if ip.is_none() && !raw.trim().is_empty() {
        warn!(ip_address = raw, "Unparsable requester address; IP-based grants skipped");
    }
    ip
}

/// Check whether `license` is addressed to `requester`.
///
/// Network-scoped targets (IP range, client, all clients) additionally
/// require the address to lie inside the license subnet when one is set.
fn target_matches(license: &License, requester: &Requester<'_>, ip: Option<&IpAddr>) -> bool {
    let addressed = match license.target() {
        LicenseTarget::User(id) => requester.user.is_some_and(|u| u.id == *id),
        LicenseTarget::UserGroup(group) => requester.user.is_some_and(|u| u.is_member_of(group)),
        LicenseTarget::IpRange(range) => ip.is_some_and(|ip| range.subnet.contains(ip)),
        LicenseTarget::Client(id) => requester
            .client
            .is_some_and(|c| c.is_granted() && c.identifier == *id),
        LicenseTarget::AllClients => requester.client.is_some_and(|c| c.is_granted()),
    };
    if !addressed {
        return false;
    }
    if !license.target().is_network_scoped() {
        return true;
    }
    match license.subnet() {
        Some(subnet) => ip.is_some_and(|ip| subnet.contains(ip)),
        None => true,
    }
}
