//! Rule catalog snapshots
//!
//! A [`Catalog`] is an immutable, indexed snapshot of every configured
//! license type, IP range and license. Cloning is cheap (Arc-wrapped), so
//! each decision holds exactly one consistent snapshot.
//!
//! [`CatalogStore`] owns the process-wide current snapshot and swaps it
//! atomically on reload. Readers never observe a partially applied reload.
//!
//! # Key Design Decisions
//!
//! - Licenses are indexed by license-type name at build time
//! - Configuration order of license types is preserved
//! - Every invariant is checked in [`CatalogBuilder::build`], never during
//!   evaluation

use crate::config::CatalogFile;
use crate::error::{AccessError, ConfigError, Result};
use crate::types::{IpRange, License, LicenseTarget, LicenseType};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use tracing::info;

/// Engine-wide policy switches
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AccessSettings {
    /// Grant everything to loopback requesters.
    ///
    /// Kept for deployments that run derivative generation on the same
    /// host; it widens access for anything that can reach the service
    /// through a local proxy.
    pub full_access_for_localhost: bool,
}

#[derive(Debug, Default)]
struct CatalogInner {
    /// License types in configuration order
    license_types: Vec<LicenseType>,
    /// Index: license-type name -> position in `license_types`
    by_name: HashMap<String, usize>,
    ip_ranges: Vec<IpRange>,
    licenses: Vec<License>,
    /// Index: license-type name -> license indices
    licenses_by_type: HashMap<String, Vec<usize>>,
    settings: AccessSettings,
}

/// Immutable rule catalog snapshot
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    inner: Arc<CatalogInner>,
}

impl Catalog {
    pub fn builder() -> CatalogBuilder {
        CatalogBuilder::default()
    }

    /// An empty catalog (every record without conditions is open, every
    /// named condition is unknown)
    pub fn empty() -> Self {
        Self::default()
    }

    /// Load and validate a catalog file
    pub fn load(path: &Path) -> std::result::Result<Self, ConfigError> {
        let file = crate::config::load_catalog_file(path)?;
        Ok(file.into_catalog()?)
    }

    /// All license types in configuration order
    pub fn license_types(&self) -> &[LicenseType] {
        &self.inner.license_types
    }

    pub fn license_type(&self, name: &str) -> Option<&LicenseType> {
        self.inner
            .by_name
            .get(name)
            .map(|&idx| &self.inner.license_types[idx])
    }

    pub fn ip_ranges(&self) -> &[IpRange] {
        &self.inner.ip_ranges
    }

    pub fn ip_range(&self, name: &str) -> Option<&IpRange> {
        self.inner.ip_ranges.iter().find(|r| r.name == name)
    }

    pub fn licenses(&self) -> &[License] {
        &self.inner.licenses
    }

    /// Licenses granted for one license type, in configuration order
    pub fn licenses_for(&self, license_type: &str) -> impl Iterator<Item = &License> + '_ {
        self.inner
            .licenses_by_type
            .get(license_type)
            .into_iter()
            .flatten()
            .map(move |&idx| &self.inner.licenses[idx])
    }

    /// Licenses held by the "all clients" sentinel application
    pub fn all_clients_licenses(&self) -> impl Iterator<Item = &License> + '_ {
        self.inner
            .licenses
            .iter()
            .filter(|l| matches!(l.target(), LicenseTarget::AllClients))
    }

    pub fn settings(&self) -> &AccessSettings {
        &self.inner.settings
    }
}

/// Collects catalog entries and validates them into a [`Catalog`]
#[derive(Debug, Default)]
pub struct CatalogBuilder {
    license_types: Vec<LicenseType>,
    ip_ranges: Vec<IpRange>,
    licenses: Vec<License>,
    settings: AccessSettings,
}

impl CatalogBuilder {
    pub fn license_type(mut self, license_type: LicenseType) -> Self {
        self.license_types.push(license_type);
        self
    }

    pub fn ip_range(mut self, ip_range: IpRange) -> Self {
        self.ip_ranges.push(ip_range);
        self
    }

    pub fn license(mut self, license: License) -> Self {
        self.licenses.push(license);
        self
    }

    pub fn settings(mut self, settings: AccessSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Validate and index the collected entries.
    ///
    /// Fails with `MisconfiguredRule` for blank or duplicate license-type
    /// names, duplicate IP-range names, and licenses that reference an
    /// unknown license type or carry a blank target id.
    pub fn build(self) -> Result<Catalog> {
        let mut by_name = HashMap::with_capacity(self.license_types.len());
        for (idx, lt) in self.license_types.iter().enumerate() {
            if lt.name.trim().is_empty() {
                return Err(AccessError::misconfigured("license type with blank name"));
            }
            if by_name.insert(lt.name.clone(), idx).is_some() {
                return Err(AccessError::misconfigured(format!(
                    "duplicate license type '{}'",
                    lt.name
                )));
            }
        }

        let mut range_names = HashMap::with_capacity(self.ip_ranges.len());
        for range in &self.ip_ranges {
            if range.name.trim().is_empty() {
                return Err(AccessError::misconfigured("IP range with blank name"));
            }
            if range_names.insert(range.name.as_str(), ()).is_some() {
                return Err(AccessError::misconfigured(format!(
                    "duplicate IP range '{}'",
                    range.name
                )));
            }
        }

        let mut licenses_by_type: HashMap<String, Vec<usize>> = HashMap::new();
        for (idx, license) in self.licenses.iter().enumerate() {
            if !by_name.contains_key(license.license_type()) {
                return Err(AccessError::misconfigured(format!(
                    "license references unknown license type '{}'",
                    license.license_type()
                )));
            }
            let blank_id = match license.target() {
                LicenseTarget::User(id)
                | LicenseTarget::UserGroup(id)
                | LicenseTarget::Client(id) => id.trim().is_empty(),
                LicenseTarget::IpRange(range) => range.name.trim().is_empty(),
                LicenseTarget::AllClients => false,
            };
            if blank_id {
                return Err(AccessError::misconfigured(format!(
                    "license for '{}' has a blank {} target",
                    license.license_type(),
                    license.target().kind()
                )));
            }
            licenses_by_type
                .entry(license.license_type().to_string())
                .or_default()
                .push(idx);
        }

        Ok(Catalog {
            inner: Arc::new(CatalogInner {
                license_types: self.license_types,
                by_name,
                ip_ranges: self.ip_ranges,
                licenses: self.licenses,
                licenses_by_type,
                settings: self.settings,
            }),
        })
    }
}

/// Process-wide holder of the current catalog snapshot
#[derive(Debug, Default)]
pub struct CatalogStore {
    current: RwLock<Catalog>,
}

impl CatalogStore {
    pub fn new(catalog: Catalog) -> Self {
        Self {
            current: RwLock::new(catalog),
        }
    }

    /// The current snapshot; stays valid across later reloads
    pub fn snapshot(&self) -> Catalog {
        self.current.read().clone()
    }

    /// Swap in a new snapshot, returning the previous one
    pub fn replace(&self, catalog: Catalog) -> Catalog {
        std::mem::replace(&mut *self.current.write(), catalog)
    }

    /// Load `path` and swap it in. On error the current snapshot is kept.
    pub fn reload_from(&self, path: &Path) -> std::result::Result<(), ConfigError> {
        let catalog = Catalog::load(path)?;
        info!(
            path = %path.display(),
            license_types = catalog.license_types().len(),
            licenses = catalog.licenses().len(),
            "Reloaded access catalog"
        );
        self.replace(catalog);
        Ok(())
    }

    /// Validate an already parsed file and swap it in
    pub fn reload_with(&self, file: CatalogFile) -> Result<()> {
        let catalog = file.into_catalog()?;
        self.replace(catalog);
        Ok(())
    }
}
