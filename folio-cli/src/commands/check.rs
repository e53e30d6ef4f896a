use crate::cli::ClientStatus;
use crate::error::CliResult;
use crate::output;
use folio_access::{
    AccessContext, Catalog, ClientApplication, IndexFut, IndexQueryService, Privilege, Requester,
    User,
};
use std::collections::BTreeSet;
use std::path::Path;
use tracing::debug;

/// Options of `folio check`
pub struct CheckOpts {
    pub privilege: String,
    pub conditions: Vec<String>,
    pub pi: String,
    pub user: Option<String>,
    pub groups: Vec<String>,
    pub superuser: bool,
    pub ip: Option<String>,
    pub client: Option<String>,
    pub client_status: ClientStatus,
    pub condition_match: bool,
    pub json: bool,
}

/// Index stand-in that answers every condition query the same way
struct FixedIndex {
    answer: bool,
}

impl IndexQueryService for FixedIndex {
    fn exists<'a>(&'a self, filter: &'a str) -> IndexFut<'a, bool> {
        Box::pin(async move {
            debug!(filter, answer = self.answer, "Condition query");
            Ok(self.answer)
        })
    }

    fn count_matches<'a>(&'a self, _filter: &'a str) -> IndexFut<'a, u64> {
        Box::pin(async move { Ok(u64::from(self.answer)) })
    }
}

pub async fn run(catalog_path: &Path, opts: CheckOpts) -> CliResult<()> {
    let catalog = Catalog::load(catalog_path)?;

    let user = opts.user.map(|id| {
        User::new(id)
            .with_groups(opts.groups)
            .with_superuser(opts.superuser)
    });
    let client = opts
        .client
        .map(|id| ClientApplication::new(id, opts.client_status.into()));

    let mut requester = Requester::default();
    if let Some(user) = &user {
        requester = requester.with_user(user);
    }
    if let Some(ip) = &opts.ip {
        requester = requester.with_ip(ip);
    }
    if let Some(client) = &client {
        requester = requester.with_client(client);
    }

    let conditions: BTreeSet<String> = opts.conditions.into_iter().collect();
    let existence_query = folio_access::generate_record_query(&opts.pi)?;
    let index = FixedIndex {
        answer: opts.condition_match,
    };

    let permission = AccessContext::new(catalog)
        .check_access_permission(
            &conditions,
            &Privilege::new(opts.privilege),
            &requester,
            &existence_query,
            &index,
        )
        .await?;

    println!("{}", output::format_permission(&permission, opts.json)?);
    Ok(())
}
