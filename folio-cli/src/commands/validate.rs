use crate::error::CliResult;
use crate::output;
use colored::Colorize;
use folio_access::Catalog;
use std::path::Path;

pub fn run(catalog_path: &Path, quiet: bool) -> CliResult<()> {
    let catalog = Catalog::load(catalog_path)?;

    println!(
        "{} {}: {} license types, {} IP ranges, {} licenses",
        "valid".green().bold(),
        catalog_path.display(),
        catalog.license_types().len(),
        catalog.ip_ranges().len(),
        catalog.licenses().len()
    );
    if catalog.settings().full_access_for_localhost {
        println!(
            "{} full_access_for_localhost is enabled",
            "warning:".yellow().bold()
        );
    }
    if quiet || catalog.license_types().is_empty() {
        return Ok(());
    }

    println!("{}", output::license_type_table(&catalog));
    for line in output::license_lines(&catalog) {
        println!("  {line}");
    }
    Ok(())
}
