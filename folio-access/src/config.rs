//! Catalog file support.
//!
//! Loads the rule catalog and engine settings from a TOML file (or JSON when
//! the extension is `.json`). File types mirror the catalog but keep license
//! targets as independent optional fields, so a file can express states the
//! catalog forbids; [`CatalogFile::into_catalog`] rejects them with
//! `MisconfiguredRule`.

use crate::catalog::{AccessSettings, Catalog};
use crate::error::{AccessError, ConfigError, Result};
use crate::subnet::Subnet;
use crate::types::{IpRange, License, LicenseTarget, LicenseType, Privilege};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use tracing::debug;

// ---------------------------------------------------------------------------
// File config serde types
// ---------------------------------------------------------------------------

/// Top-level catalog file structure
#[derive(Debug, Default, Clone, Deserialize, Serialize)]
pub struct CatalogFile {
    /// Engine settings `[access]`
    #[serde(default)]
    pub access: Option<AccessFileConfig>,

    #[serde(default)]
    pub license_types: Vec<LicenseTypeFileConfig>,

    #[serde(default)]
    pub ip_ranges: Vec<IpRangeFileConfig>,

    #[serde(default)]
    pub licenses: Vec<LicenseFileConfig>,
}

#[derive(Debug, Default, Clone, Deserialize, Serialize)]
pub struct AccessFileConfig {
    pub full_access_for_localhost: Option<bool>,
}

#[derive(Debug, Default, Clone, Deserialize, Serialize)]
pub struct LicenseTypeFileConfig {
    pub name: String,
    pub description: Option<String>,
    #[serde(default)]
    pub default_privileges: Vec<Privilege>,
    pub conditions: Option<String>,
    #[serde(default)]
    pub moving_wall: bool,
    #[serde(default)]
    pub ugc: bool,
    #[serde(default)]
    pub pdf_download_quota: bool,
    #[serde(default)]
    pub concurrent_views_limit: bool,
}

#[derive(Debug, Default, Clone, Deserialize, Serialize)]
pub struct IpRangeFileConfig {
    pub name: String,
    pub subnet: String,
}

/// One `[[licenses]]` entry. Exactly one of `user`, `user_group`,
/// `ip_range`, `client` and `all_clients = true` must be set.
#[derive(Debug, Default, Clone, Deserialize, Serialize)]
pub struct LicenseFileConfig {
    pub license_type: String,
    #[serde(default)]
    pub privileges: Vec<Privilege>,
    pub user: Option<String>,
    pub user_group: Option<String>,
    /// Name of an `[[ip_ranges]]` entry
    pub ip_range: Option<String>,
    pub client: Option<String>,
    #[serde(default)]
    pub all_clients: bool,
    pub subnet: Option<String>,
    pub conditions: Option<String>,
    pub valid_from: Option<DateTime<Utc>>,
    pub valid_until: Option<DateTime<Utc>>,
}

// ---------------------------------------------------------------------------
// Loading
// ---------------------------------------------------------------------------

/// Load a catalog file. Detects format by extension:
/// `.json` → JSON, everything else → TOML.
pub fn load_catalog_file(path: &Path) -> std::result::Result<CatalogFile, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
        path: path.to_path_buf(),
        source: e,
    })?;

    if content.trim().is_empty() {
        return Ok(CatalogFile::default());
    }

    let is_json = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));

    debug!(path = %path.display(), json = is_json, "Parsing access catalog file");

    if is_json {
        serde_json::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            detail: e.to_string(),
        })
    } else {
        toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            detail: e.to_string(),
        })
    }
}

impl CatalogFile {
    /// Validate the file and build a catalog snapshot
    pub fn into_catalog(self) -> Result<Catalog> {
        let settings = AccessSettings {
            full_access_for_localhost: self
                .access
                .as_ref()
                .and_then(|a| a.full_access_for_localhost)
                .unwrap_or(false),
        };

        let mut ranges: HashMap<String, IpRange> = HashMap::new();
        let mut builder = Catalog::builder().settings(settings);

        for range in self.ip_ranges {
            let subnet = Subnet::parse(&range.subnet).map_err(|_| {
                AccessError::misconfigured(format!(
                    "IP range '{}' has invalid subnet '{}'",
                    range.name, range.subnet
                ))
            })?;
            let range = IpRange::new(range.name, subnet);
            ranges.insert(range.name.clone(), range.clone());
            builder = builder.ip_range(range);
        }

        for lt in self.license_types {
            builder = builder.license_type(lt.into_license_type());
        }

        for (position, license) in self.licenses.into_iter().enumerate() {
            builder = builder.license(license.into_license(position, &ranges)?);
        }

        builder.build()
    }
}

impl LicenseTypeFileConfig {
    fn into_license_type(self) -> LicenseType {
        let mut lt = LicenseType::new(self.name)
            .with_default_privileges(self.default_privileges)
            .with_moving_wall(self.moving_wall)
            .with_ugc(self.ugc)
            .with_pdf_download_quota(self.pdf_download_quota)
            .with_concurrent_views_limit(self.concurrent_views_limit);
        lt.description = self.description;
        lt.conditions = self.conditions;
        lt
    }
}

impl LicenseFileConfig {
    fn into_license(self, position: usize, ranges: &HashMap<String, IpRange>) -> Result<License> {
        let target = self.target(position, ranges)?;
        let mut license = License::new(self.license_type, target).with_privileges(self.privileges);
        if let Some(raw) = self.subnet {
            let subnet = Subnet::parse(&raw).map_err(|_| {
                AccessError::misconfigured(format!(
                    "license #{position} has invalid subnet '{raw}'"
                ))
            })?;
            license = license.with_subnet(subnet);
        }
        if let Some(conditions) = self.conditions {
            license = license.with_conditions(conditions);
        }
        license.valid_between(self.valid_from, self.valid_until)
    }

    /// Resolve the single target of this entry
    fn target(&self, position: usize, ranges: &HashMap<String, IpRange>) -> Result<LicenseTarget> {
        let mut targets = Vec::with_capacity(1);
        if let Some(user) = &self.user {
            targets.push(LicenseTarget::User(user.clone()));
        }
        if let Some(group) = &self.user_group {
            targets.push(LicenseTarget::UserGroup(group.clone()));
        }
        if let Some(name) = &self.ip_range {
            let range = ranges.get(name).ok_or_else(|| {
                AccessError::misconfigured(format!(
                    "license #{position} references unknown IP range '{name}'"
                ))
            })?;
            targets.push(LicenseTarget::IpRange(range.clone()));
        }
        if let Some(client) = &self.client {
            targets.push(LicenseTarget::Client(client.clone()));
        }
        if self.all_clients {
            targets.push(LicenseTarget::AllClients);
        }

        match targets.len() {
            1 => Ok(targets.remove(0)),
            0 => Err(AccessError::misconfigured(format!(
                "license #{position} for '{}' has no target",
                self.license_type
            ))),
            _ => Err(AccessError::misconfigured(format!(
                "license #{position} for '{}' has {} targets ({}); exactly one is allowed",
                self.license_type,
                targets.len(),
                targets
                    .iter()
                    .map(LicenseTarget::kind)
                    .collect::<Vec<_>>()
                    .join(", ")
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const SAMPLE: &str = r#"
[access]
full_access_for_localhost = true

[[license_types]]
name = "restricted"
default_privileges = ["LIST"]
conditions = "+YEAR:[* TO 1950]"
moving_wall = true
pdf_download_quota = true

[[license_types]]
name = "ugc"
ugc = true

[[ip_ranges]]
name = "reading-room"
subnet = "192.168.1.0/24"

[[licenses]]
license_type = "restricted"
privileges = ["VIEW_IMAGES", "VIEW_FULLTEXT"]
ip_range = "reading-room"

[[licenses]]
license_type = "restricted"
privileges = ["DOWNLOAD_PDF"]
all_clients = true
subnet = "10.0.0.0/8"
valid_from = "2024-01-01T00:00:00Z"
"#;

    #[test]
    fn test_parse_toml_catalog() {
        let file: CatalogFile = toml::from_str(SAMPLE).unwrap();
        let catalog = file.into_catalog().unwrap();

        assert!(catalog.settings().full_access_for_localhost);
        assert_eq!(catalog.license_types().len(), 2);
        let restricted = catalog.license_type("restricted").unwrap();
        assert!(restricted.moving_wall);
        assert!(restricted.pdf_download_quota);
        assert!(restricted.grants_by_default(&Privilege::LIST));
        assert_eq!(restricted.conditions_query(), Some("+YEAR:[* TO 1950]"));

        let licenses: Vec<_> = catalog.licenses_for("restricted").collect();
        assert_eq!(licenses.len(), 2);
        assert!(matches!(licenses[0].target(), LicenseTarget::IpRange(r) if r.name == "reading-room"));
        assert!(matches!(licenses[1].target(), LicenseTarget::AllClients));
        assert_eq!(licenses[1].subnet().map(|s| s.to_string()).as_deref(), Some("10.0.0.0/8"));
    }

    #[test]
    fn test_empty_file_is_empty_catalog() {
        let file: CatalogFile = toml::from_str("").unwrap();
        let catalog = file.into_catalog().unwrap();
        assert!(catalog.license_types().is_empty());
        assert!(!catalog.settings().full_access_for_localhost);
    }

    #[test]
    fn test_license_with_two_targets_is_misconfigured() {
        let toml = r#"
[[license_types]]
name = "a"

[[licenses]]
license_type = "a"
user = "alice"
client = "kiosk"
"#;
        let file: CatalogFile = toml::from_str(toml).unwrap();
        let err = file.into_catalog().unwrap_err();
        assert!(matches!(err, AccessError::MisconfiguredRule { .. }));
        assert!(err.to_string().contains("user, client"));
    }

    #[test]
    fn test_license_without_target_is_misconfigured() {
        let toml = r#"
[[license_types]]
name = "a"

[[licenses]]
license_type = "a"
privileges = ["LIST"]
"#;
        let file: CatalogFile = toml::from_str(toml).unwrap();
        let err = file.into_catalog().unwrap_err();
        assert!(err.to_string().contains("no target"));
    }

    #[test]
    fn test_unknown_ip_range_is_misconfigured() {
        let toml = r#"
[[license_types]]
name = "a"

[[licenses]]
license_type = "a"
ip_range = "nowhere"
"#;
        let file: CatalogFile = toml::from_str(toml).unwrap();
        let err = file.into_catalog().unwrap_err();
        assert!(err.to_string().contains("nowhere"));
    }

    #[test]
    fn test_invalid_subnet_is_misconfigured() {
        let toml = r#"
[[ip_ranges]]
name = "bad"
subnet = "10.0.0.0/40"
"#;
        let file: CatalogFile = toml::from_str(toml).unwrap();
        assert!(matches!(
            file.into_catalog().unwrap_err(),
            AccessError::MisconfiguredRule { .. }
        ));
    }

    #[test]
    fn test_load_json_by_extension() {
        let mut tmp = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
        write!(
            tmp,
            r#"{{"license_types": [{{"name": "open-ish", "default_privileges": ["LIST"]}}]}}"#
        )
        .unwrap();

        let file = load_catalog_file(tmp.path()).unwrap();
        assert_eq!(file.license_types.len(), 1);
        assert_eq!(file.license_types[0].name, "open-ish");
    }

    #[test]
    fn test_load_toml_file_into_catalog() {
        let mut tmp = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        tmp.write_all(SAMPLE.as_bytes()).unwrap();

        let catalog = Catalog::load(tmp.path()).unwrap();
        assert_eq!(catalog.ip_ranges().len(), 1);
        assert_eq!(catalog.licenses().len(), 2);
    }

    #[test]
    fn test_parse_error_names_the_file() {
        let mut tmp = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        tmp.write_all(b"[[license_types]]\nname = 12\n").unwrap();

        let err = load_catalog_file(tmp.path()).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let err = load_catalog_file(Path::new("/nonexistent/folio/catalog.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
