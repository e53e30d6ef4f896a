use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "folio", about = "Folio access-control CLI", version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose output
    #[arg(long, short = 'v', global = true, conflicts_with = "quiet")]
    pub verbose: bool,

    /// Suppress non-essential output
    #[arg(long, short = 'q', global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Disable colored output (also respects NO_COLOR env var)
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Path to the access catalog file (TOML, or JSON with a .json extension)
    #[arg(long, global = true, env = "FOLIO_CATALOG")]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Load and validate the access catalog
    Validate,

    /// Print the index query locating one file of a record
    Query {
        /// Record identifier (PI)
        pi: String,

        /// File name, relative path or URL
        file: String,
    },

    /// Evaluate one privilege against the catalog
    Check {
        /// Privilege to check (e.g. VIEW_IMAGES)
        #[arg(long)]
        privilege: String,

        /// Access condition (license-type name) on the record; repeatable
        #[arg(long = "condition")]
        conditions: Vec<String>,

        /// Record identifier used for condition queries
        #[arg(long, default_value = "PPN0")]
        pi: String,

        /// Requesting user id
        #[arg(long)]
        user: Option<String>,

        /// Group the user belongs to; repeatable
        #[arg(long = "group", requires = "user")]
        groups: Vec<String>,

        /// Treat the user as superuser
        #[arg(long, requires = "user")]
        superuser: bool,

        /// Requester IP address
        #[arg(long)]
        ip: Option<String>,

        /// Requesting client application identifier
        #[arg(long)]
        client: Option<String>,

        /// Admission status of the client application
        #[arg(long, value_enum, default_value_t = ClientStatus::Granted, requires = "client")]
        client_status: ClientStatus,

        /// Answer given to every condition query
        #[arg(long, default_value_t = true, action = clap::ArgAction::Set)]
        condition_match: bool,

        /// Print the decision as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum ClientStatus {
    Requested,
    Granted,
    Denied,
    NonApplicable,
}

impl From<ClientStatus> for folio_access::AccessStatus {
    fn from(status: ClientStatus) -> Self {
        match status {
            ClientStatus::Requested => folio_access::AccessStatus::Requested,
            ClientStatus::Granted => folio_access::AccessStatus::Granted,
            ClientStatus::Denied => folio_access::AccessStatus::Denied,
            ClientStatus::NonApplicable => folio_access::AccessStatus::NonApplicable,
        }
    }
}
