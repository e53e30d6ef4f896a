//! Core access types
//!
//! This module defines the rule language the engine evaluates:
//! - `Privilege`: An atomic permission identifier
//! - `LicenseType`: A named restriction category with default privileges
//! - `License`: An explicit grant to exactly one `LicenseTarget`
//! - `User` / `ClientApplication`: Requester identities
//! - `AccessPermission`: The immutable decision result

use crate::error::{AccessError, Result};
use crate::subnet::Subnet;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::collections::BTreeSet;
use std::fmt;

/// Access-condition value marking a record as unrestricted
pub const OPEN_ACCESS: &str = "OPENACCESS";

/// Privilege identifier.
///
/// Privileges are opaque strings so a catalog can introduce new ones
/// without a code change; the well-known identifiers are associated
/// constants.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Privilege(Cow<'static, str>);

impl Privilege {
    pub const LIST: Privilege = Privilege::from_static("LIST");
    pub const VIEW_IMAGES: Privilege = Privilege::from_static("VIEW_IMAGES");
    pub const VIEW_THUMBNAILS: Privilege = Privilege::from_static("VIEW_THUMBNAILS");
    pub const ZOOM_IMAGES: Privilege = Privilege::from_static("ZOOM_IMAGES");
    pub const VIEW_FULLTEXT: Privilege = Privilege::from_static("VIEW_FULLTEXT");
    pub const VIEW_VIDEO: Privilege = Privilege::from_static("VIEW_VIDEO");
    pub const VIEW_AUDIO: Privilege = Privilege::from_static("VIEW_AUDIO");
    pub const VIEW_OBJECTS: Privilege = Privilege::from_static("VIEW_OBJECTS");
    pub const VIEW_METADATA: Privilege = Privilege::from_static("VIEW_METADATA");
    pub const VIEW_UGC: Privilege = Privilege::from_static("VIEW_UGC");
    pub const DOWNLOAD_PDF: Privilege = Privilege::from_static("DOWNLOAD_PDF");
    pub const DOWNLOAD_PAGE_PDF: Privilege = Privilege::from_static("DOWNLOAD_PAGE_PDF");
    pub const DOWNLOAD_ORIGINAL_CONTENT: Privilege =
        Privilege::from_static("DOWNLOAD_ORIGINAL_CONTENT");
    pub const DOWNLOAD_METADATA: Privilege = Privilege::from_static("DOWNLOAD_METADATA");
    pub const DOWNLOAD_IMAGES: Privilege = Privilege::from_static("DOWNLOAD_IMAGES");
    pub const DOWNLOAD_BORN_DIGITAL_FILES: Privilege =
        Privilege::from_static("DOWNLOAD_BORN_DIGITAL_FILES");

    /// Construct from a static identifier (usable in `const` context)
    pub const fn from_static(name: &'static str) -> Self {
        Privilege(Cow::Borrowed(name))
    }

    /// Construct from any identifier
    pub fn new(name: impl Into<String>) -> Self {
        Privilege(Cow::Owned(name.into()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Privilege {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Privilege {
    fn from(name: &str) -> Self {
        Privilege::new(name)
    }
}

/// A named category of access restriction.
///
/// Records carry license-type names in their access-condition set; a
/// license type only restricts records whose set names it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LicenseType {
    /// Unique, non-blank name
    pub name: String,
    pub description: Option<String>,
    /// Privileges granted to everyone for records carrying this type
    pub default_privileges: BTreeSet<Privilege>,
    /// Optional index query a record must match for this type to apply
    pub conditions: Option<String>,
    /// If the condition query no longer matches, the restriction has expired
    pub moving_wall: bool,
    /// User-generated content: can only ever grant `VIEW_UGC`
    pub ugc: bool,
    /// Records of this type are subject to the per-record PDF quota
    pub pdf_download_quota: bool,
    /// Records of this type are subject to a concurrent view cap
    pub concurrent_views_limit: bool,
}

impl LicenseType {
    /// Create a license type with no default privileges and no flags set
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            default_privileges: BTreeSet::new(),
            conditions: None,
            moving_wall: false,
            ugc: false,
            pdf_download_quota: false,
            concurrent_views_limit: false,
        }
    }

    pub fn with_default_privileges<I, P>(mut self, privileges: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<Privilege>,
    {
        self.default_privileges = privileges.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_conditions(mut self, query: impl Into<String>) -> Self {
        self.conditions = Some(query.into());
        self
    }

    pub fn with_moving_wall(mut self, moving_wall: bool) -> Self {
        self.moving_wall = moving_wall;
        self
    }

    pub fn with_ugc(mut self, ugc: bool) -> Self {
        self.ugc = ugc;
        self
    }

    pub fn with_pdf_download_quota(mut self, enabled: bool) -> Self {
        self.pdf_download_quota = enabled;
        self
    }

    pub fn with_concurrent_views_limit(mut self, enabled: bool) -> Self {
        self.concurrent_views_limit = enabled;
        self
    }

    /// The non-blank condition query, if any
    pub fn conditions_query(&self) -> Option<&str> {
        self.conditions
            .as_deref()
            .map(str::trim)
            .filter(|q| !q.is_empty())
    }

    /// Privileges this type grants without an explicit license.
    ///
    /// UGC types report only `VIEW_UGC`, whatever is configured.
    pub fn effective_default_privileges(&self) -> BTreeSet<Privilege> {
        if self.ugc {
            return [Privilege::VIEW_UGC].into_iter().collect();
        }
        self.default_privileges.clone()
    }

    /// Check whether `privilege` is open to everyone under this type
    pub fn grants_by_default(&self, privilege: &Privilege) -> bool {
        if self.ugc {
            return *privilege == Privilege::VIEW_UGC;
        }
        self.default_privileges.contains(privilege)
    }
}

/// A named IP range that licenses can target
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IpRange {
    pub name: String,
    pub subnet: Subnet,
}

impl IpRange {
    pub fn new(name: impl Into<String>, subnet: Subnet) -> Self {
        Self {
            name: name.into(),
            subnet,
        }
    }
}

/// The single recipient of a [`License`].
///
/// Exactly one target per license is enforced by construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LicenseTarget {
    /// A user, by id
    User(String),
    /// Members of a user group, by group id
    UserGroup(String),
    /// Requesters whose address lies in the range
    IpRange(IpRange),
    /// One registered client application, by identifier
    Client(String),
    /// Every client application with `Granted` status
    AllClients,
}

impl LicenseTarget {
    /// Short label for logs and CLI output
    pub fn kind(&self) -> &'static str {
        match self {
            LicenseTarget::User(_) => "user",
            LicenseTarget::UserGroup(_) => "user_group",
            LicenseTarget::IpRange(_) => "ip_range",
            LicenseTarget::Client(_) => "client",
            LicenseTarget::AllClients => "all_clients",
        }
    }

    /// True for the targets whose grant is additionally gated by the
    /// license subnet
    pub fn is_network_scoped(&self) -> bool {
        matches!(
            self,
            LicenseTarget::IpRange(_) | LicenseTarget::Client(_) | LicenseTarget::AllClients
        )
    }
}

/// An explicit grant of privileges for one license type to one target
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct License {
    license_type: String,
    target: LicenseTarget,
    privileges: BTreeSet<Privilege>,
    subnet: Option<Subnet>,
    conditions: Option<String>,
    valid_from: Option<DateTime<Utc>>,
    valid_until: Option<DateTime<Utc>>,
}

impl License {
    /// Create a grant for `license_type` to `target` with no privileges yet
    pub fn new(license_type: impl Into<String>, target: LicenseTarget) -> Self {
        Self {
            license_type: license_type.into(),
            target,
            privileges: BTreeSet::new(),
            subnet: None,
            conditions: None,
            valid_from: None,
            valid_until: None,
        }
    }

    pub fn with_privileges<I, P>(mut self, privileges: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<Privilege>,
    {
        self.privileges = privileges.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_subnet(mut self, subnet: Subnet) -> Self {
        self.subnet = Some(subnet);
        self
    }

    pub fn with_conditions(mut self, query: impl Into<String>) -> Self {
        self.conditions = Some(query.into());
        self
    }

    /// Restrict the grant to a validity window.
    ///
    /// Fails if the window ends before it starts.
    pub fn valid_between(
        mut self,
        from: Option<DateTime<Utc>>,
        until: Option<DateTime<Utc>>,
    ) -> Result<Self> {
        if let (Some(from), Some(until)) = (from, until) {
            if until < from {
                return Err(AccessError::misconfigured(format!(
                    "license for '{}' ends ({until}) before it starts ({from})",
                    self.license_type
                )));
            }
        }
        self.valid_from = from;
        self.valid_until = until;
        Ok(self)
    }

    pub fn license_type(&self) -> &str {
        &self.license_type
    }

    pub fn target(&self) -> &LicenseTarget {
        &self.target
    }

    pub fn privileges(&self) -> &BTreeSet<Privilege> {
        &self.privileges
    }

    pub fn subnet(&self) -> Option<&Subnet> {
        self.subnet.as_ref()
    }

    /// The non-blank per-grant condition query, if any
    pub fn conditions_query(&self) -> Option<&str> {
        self.conditions
            .as_deref()
            .map(str::trim)
            .filter(|q| !q.is_empty())
    }

    pub fn grants(&self, privilege: &Privilege) -> bool {
        self.privileges.contains(privilege)
    }

    /// Check whether the validity window contains `now`
    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        self.valid_from.map_or(true, |from| from <= now)
            && self.valid_until.map_or(true, |until| now <= until)
    }
}

/// An authenticated user as resolved by the session layer
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct User {
    pub id: String,
    /// Ids of the groups the user is a member of
    pub groups: BTreeSet<String>,
    /// Superusers pass every license check
    pub superuser: bool,
}

impl User {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Self::default()
        }
    }

    pub fn with_groups<I, S>(mut self, groups: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.groups = groups.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_superuser(mut self, superuser: bool) -> Self {
        self.superuser = superuser;
        self
    }

    pub fn is_member_of(&self, group: &str) -> bool {
        self.groups.contains(group)
    }
}

/// Admission status of a registered client application
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccessStatus {
    /// Registration requested, not yet reviewed
    Requested,
    Granted,
    Denied,
    NonApplicable,
}

/// A registered non-browser consumer (e.g. a reading-room kiosk)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientApplication {
    pub identifier: String,
    pub access_status: AccessStatus,
}

impl ClientApplication {
    pub fn new(identifier: impl Into<String>, access_status: AccessStatus) -> Self {
        Self {
            identifier: identifier.into(),
            access_status,
        }
    }

    pub fn is_granted(&self) -> bool {
        self.access_status == AccessStatus::Granted
    }
}

/// Everything known about the party asking for access
#[derive(Debug, Clone, Copy, Default)]
pub struct Requester<'a> {
    pub user: Option<&'a User>,
    /// Raw address string from the HTTP layer
    pub ip_address: Option<&'a str>,
    pub client: Option<&'a ClientApplication>,
}

impl<'a> Requester<'a> {
    /// An anonymous requester known only by address
    pub fn anonymous(ip_address: &'a str) -> Self {
        Self {
            ip_address: Some(ip_address),
            ..Self::default()
        }
    }

    pub fn with_user(mut self, user: &'a User) -> Self {
        self.user = Some(user);
        self
    }

    pub fn with_ip(mut self, ip_address: &'a str) -> Self {
        self.ip_address = Some(ip_address);
        self
    }

    pub fn with_client(mut self, client: &'a ClientApplication) -> Self {
        self.client = Some(client);
        self
    }
}

/// Why a decision came out the way it did
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PermissionStatus {
    Granted,
    /// At least one relevant license type refused the privilege
    Denied,
    /// The requesting client application is not admitted
    ClientNotGranted,
}

/// Result of one access decision
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AccessPermission {
    granted: bool,
    status: PermissionStatus,
    /// License types that refused the privilege (empty unless denied)
    denied_by: Vec<String>,
}

impl AccessPermission {
    pub fn granted() -> Self {
        Self {
            granted: true,
            status: PermissionStatus::Granted,
            denied_by: Vec::new(),
        }
    }

    pub fn denied(denied_by: Vec<String>) -> Self {
        Self {
            granted: false,
            status: PermissionStatus::Denied,
            denied_by,
        }
    }

    pub fn client_not_granted() -> Self {
        Self {
            granted: false,
            status: PermissionStatus::ClientNotGranted,
            denied_by: Vec::new(),
        }
    }

    pub fn is_granted(&self) -> bool {
        self.granted
    }

    pub fn status(&self) -> PermissionStatus {
        self.status
    }

    pub fn denied_by(&self) -> &[String] {
        &self.denied_by
    }

    /// HTTP status a caller should answer with
    pub fn http_status(&self) -> u16 {
        if self.granted {
            200
        } else {
            403
        }
    }
}
