use crate::error::CliResult;
use colored::Colorize;
use comfy_table::{ContentArrangement, Table};
use folio_access::{AccessPermission, Catalog, LicenseTarget, PermissionStatus};

/// Render the catalog's license types as a table.
pub fn license_type_table(catalog: &Catalog) -> String {
    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec![
        "License type",
        "Default privileges",
        "Conditions",
        "Flags",
        "Licenses",
    ]);

    for lt in catalog.license_types() {
        let defaults = lt
            .effective_default_privileges()
            .iter()
            .map(|p| p.as_str())
            .collect::<Vec<_>>()
            .join(", ");
        let mut flags = Vec::new();
        if lt.moving_wall {
            flags.push("moving-wall");
        }
        if lt.ugc {
            flags.push("ugc");
        }
        if lt.pdf_download_quota {
            flags.push("pdf-quota");
        }
        if lt.concurrent_views_limit {
            flags.push("concurrent-views");
        }
        table.add_row(vec![
            lt.name.clone(),
            defaults,
            lt.conditions_query().unwrap_or("").to_string(),
            flags.join(", "),
            catalog.licenses_for(&lt.name).count().to_string(),
        ]);
    }

    table.to_string()
}

/// Render the license grants of the catalog, one line per license.
pub fn license_lines(catalog: &Catalog) -> Vec<String> {
    catalog
        .licenses()
        .iter()
        .map(|l| {
            let target = match l.target() {
                LicenseTarget::User(id) => format!("user {id}"),
                LicenseTarget::UserGroup(id) => format!("group {id}"),
                LicenseTarget::IpRange(range) => format!("ip range {} ({})", range.name, range.subnet),
                LicenseTarget::Client(id) => format!("client {id}"),
                LicenseTarget::AllClients => "all clients".to_string(),
            };
            let privileges = l
                .privileges()
                .iter()
                .map(|p| p.as_str())
                .collect::<Vec<_>>()
                .join(", ");
            format!("{} -> {target}: {privileges}", l.license_type())
        })
        .collect()
}

/// Format a decision for display.
pub fn format_permission(permission: &AccessPermission, json: bool) -> CliResult<String> {
    if json {
        return Ok(serde_json::to_string_pretty(permission)?);
    }
    Ok(match permission.status() {
        PermissionStatus::Granted => format!("{}", "granted".green().bold()),
        PermissionStatus::ClientNotGranted => format!(
            "{} (client application not admitted)",
            "denied".red().bold()
        ),
        PermissionStatus::Denied => format!(
            "{} (refused by: {})",
            "denied".red().bold(),
            permission.denied_by().join(", ")
        ),
    })
}
