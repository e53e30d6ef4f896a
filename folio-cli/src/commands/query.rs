use crate::error::CliResult;

pub fn run(pi: &str, file: &str) -> CliResult<()> {
    let query = folio_access::generate_access_check_query(pi, file)?;
    println!("{query}");
    Ok(())
}
