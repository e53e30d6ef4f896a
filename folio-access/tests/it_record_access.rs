//! Record- and file-level entry points
//!
//! Covers record resolution, condition queries against the index, moving
//! walls, grouped checks, the per-request condition cache and quota lookups.

mod support;

use folio_access::{
    generate_access_check_query, is_concurrent_views_limit_enabled_for_any_access_condition,
    pdf_download_quota_for_record, AccessContext, AccessError, Catalog, CatalogStore,
    LicenseType, Privilege, RecordAccessInfo, Requester, OPEN_ACCESS,
};
use std::collections::BTreeMap;
use support::{catalog_of, conditions, record_query, MemoryIndex, MemoryRecords};

const PI: &str = "PPN123456789";
const PRE_1950: &str = "+YEAR:[* TO 1950]";

fn moving_wall() -> LicenseType {
    LicenseType::new("embargo")
        .with_conditions(PRE_1950)
        .with_moving_wall(true)
}

fn scoped() -> LicenseType {
    LicenseType::new("letters").with_conditions("+DOCTYPE:letter")
}

#[tokio::test]
async fn missing_record_is_not_a_denial() {
    let ctx = AccessContext::new(catalog_of(vec![moving_wall()]));
    let err = ctx
        .check_record_access(
            "PPN0",
            &Privilege::VIEW_IMAGES,
            &Requester::default(),
            &MemoryRecords::new(),
            &MemoryIndex::empty(),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, AccessError::RecordNotFound { ref pi } if pi == "PPN0"));
}

#[tokio::test]
async fn moving_wall_binds_while_condition_matches() {
    let records = MemoryRecords::new().with_record(RecordAccessInfo::new(PI, ["embargo"]));
    let index = MemoryIndex::empty().with_match(&record_query(PI), PRE_1950);
    let ctx = AccessContext::new(catalog_of(vec![moving_wall()]));

    let permission = ctx
        .check_record_access(PI, &Privilege::VIEW_IMAGES, &Requester::default(), &records, &index)
        .await
        .unwrap();
    assert!(!permission.is_granted());
    assert_eq!(index.seen(), vec![format!("+(+PI:{PI}) +({PRE_1950})")]);
}

#[tokio::test]
async fn moving_wall_expires_when_condition_no_longer_matches() {
    let records = MemoryRecords::new().with_record(RecordAccessInfo::new(PI, ["embargo"]));
    let ctx = AccessContext::new(catalog_of(vec![moving_wall()]));

    let permission = ctx
        .check_record_access(
            PI,
            &Privilege::DOWNLOAD_PDF,
            &Requester::default(),
            &records,
            &MemoryIndex::empty(),
        )
        .await
        .unwrap();
    assert!(permission.is_granted());
}

#[tokio::test]
async fn non_matching_scoped_type_does_not_restrict() {
    let records = MemoryRecords::new().with_record(RecordAccessInfo::new(PI, ["letters"]));
    let ctx = AccessContext::new(catalog_of(vec![scoped()]));

    let permission = ctx
        .check_record_access(
            PI,
            &Privilege::VIEW_IMAGES,
            &Requester::default(),
            &records,
            &MemoryIndex::empty(),
        )
        .await
        .unwrap();
    assert!(permission.is_granted());
}

#[tokio::test]
async fn file_access_uses_file_probe() {
    let file_info = RecordAccessInfo::new(PI, ["letters"]);
    let records = MemoryRecords::new().with_file("00000001.tif", file_info);
    let probe = generate_access_check_query(PI, "00000001.tif").unwrap();
    let index = MemoryIndex::empty().with_match(&probe, "+DOCTYPE:letter");
    let ctx = AccessContext::new(catalog_of(vec![scoped()]));

    let permission = ctx
        .check_file_access(
            PI,
            "00000001.tif",
            &Privilege::VIEW_IMAGES,
            &Requester::default(),
            &records,
            &index,
        )
        .await
        .unwrap();
    assert!(!permission.is_granted());
    assert_eq!(
        index.seen(),
        vec![format!("+({probe}) +(+DOCTYPE:letter)")]
    );

    let err = ctx
        .check_file_access(
            PI,
            "00000002.tif",
            &Privilege::VIEW_IMAGES,
            &Requester::default(),
            &records,
            &index,
        )
        .await
        .unwrap_err();
    assert!(matches!(err, AccessError::RecordNotFound { .. }));
}

#[tokio::test]
async fn file_access_rejects_empty_reference() {
    let ctx = AccessContext::new(Catalog::empty());
    let err = ctx
        .check_file_access(
            PI,
            "",
            &Privilege::VIEW_IMAGES,
            &Requester::default(),
            &MemoryRecords::new(),
            &MemoryIndex::empty(),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, AccessError::InvalidArgument { .. }));
}

#[tokio::test]
async fn grouped_checks_share_condition_cache() {
    let index = MemoryIndex::empty().with_match(&record_query(PI), PRE_1950);
    let ctx = AccessContext::new(catalog_of(vec![moving_wall(), LicenseType::new("free")
        .with_default_privileges([Privilege::VIEW_IMAGES])]));

    let mut groups = BTreeMap::new();
    for page in 1..=5 {
        groups.insert(format!("page-{page}"), conditions(&["embargo"]));
    }
    groups.insert("cover".to_string(), conditions(&[OPEN_ACCESS]));
    groups.insert("preface".to_string(), conditions(&["free"]));

    let decisions = ctx
        .check_access_permission_by_group(
            &groups,
            &Privilege::VIEW_IMAGES,
            &Requester::default(),
            &record_query(PI),
            &index,
        )
        .await
        .unwrap();

    assert_eq!(index.calls(), 1);
    assert_eq!(ctx.cache().len(), 1);
    assert!(decisions["cover"].is_granted());
    assert!(decisions["preface"].is_granted());
    assert!((1..=5).all(|p| !decisions[&format!("page-{p}")].is_granted()));
}

#[tokio::test]
async fn pdf_quota_lookup() {
    let catalog = catalog_of(vec![LicenseType::new("quota").with_pdf_download_quota(true)]);
    let records = MemoryRecords::new()
        .with_record(RecordAccessInfo::new("open", [OPEN_ACCESS]))
        .with_record(RecordAccessInfo::new("limited", ["quota"]).with_pdf_quota(30));

    let err = pdf_download_quota_for_record(&catalog, "missing", &records)
        .await
        .unwrap_err();
    assert!(matches!(err, AccessError::RecordNotFound { .. }));
    assert_eq!(pdf_download_quota_for_record(&catalog, "open", &records).await.unwrap(), 100);
    assert_eq!(pdf_download_quota_for_record(&catalog, "limited", &records).await.unwrap(), 30);
}

#[test]
fn concurrent_views_limit_lookup() {
    let catalog = catalog_of(vec![
        LicenseType::new("capped").with_concurrent_views_limit(true),
        LicenseType::new("plain"),
    ]);
    assert!(is_concurrent_views_limit_enabled_for_any_access_condition(&catalog, &["capped"]));
    assert!(!is_concurrent_views_limit_enabled_for_any_access_condition(&catalog, &["plain"]));
    assert!(!is_concurrent_views_limit_enabled_for_any_access_condition::<String>(&catalog, &[]));
}

#[tokio::test]
async fn snapshot_survives_catalog_replacement() {
    let store = CatalogStore::new(catalog_of(vec![LicenseType::new("restricted")]));
    let ctx = AccessContext::new(store.snapshot());

    store.replace(catalog_of(vec![
        LicenseType::new("restricted").with_default_privileges([Privilege::VIEW_IMAGES]),
    ]));

    let conds = conditions(&["restricted"]);
    let query = record_query(PI);
    let index = MemoryIndex::empty();

    let old = ctx
        .check_access_permission(&conds, &Privilege::VIEW_IMAGES, &Requester::default(), &query, &index)
        .await
        .unwrap();
    assert!(!old.is_granted());

    let fresh = AccessContext::new(store.snapshot())
        .check_access_permission(&conds, &Privilege::VIEW_IMAGES, &Requester::default(), &query, &index)
        .await
        .unwrap();
    assert!(fresh.is_granted());
}
