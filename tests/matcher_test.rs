//! Drawing reconciliation: ingestion idempotence and the confidence
//! ladder of the matcher.

mod common;

use chrono::{TimeZone, Utc};
use sea_orm::ActiveValue::{NotSet, Set};
use sea_orm::{ActiveModelTrait, DatabaseConnection, EntityTrait, PaginatorTrait};

use shopfloor_migrate::entities::{customer, drawing_file, folder_mapping, part};
use shopfloor_migrate::etl::drawings::{self, Confidence};

async fn seed_part(db: &DatabaseConnection, drawing: &str) -> part::Model {
    part::ActiveModel {
        id: NotSet,
        previous_id: Set(None),
        next_id: Set(None),
        drawing_number: Set(drawing.to_string()),
        revision: Set("-".to_string()),
        description: Set(None),
        is_assembly: Set(None),
        unit_price: Set(None),
    }
    .insert(db)
    .await
    .unwrap()
}

async fn seed_file(
    db: &DatabaseConnection,
    name: &str,
    path: &str,
    active: bool,
    modified_day: u32,
) -> drawing_file::Model {
    drawing_file::ActiveModel {
        id: NotSet,
        part_id: Set(None),
        file_name: Set(name.to_string()),
        file_path: Set(path.to_string()),
        is_active: Set(active),
        last_modified_at: Set(Utc.with_ymd_and_hms(2025, 1, modified_day, 12, 0, 0).unwrap()),
        revision: Set("-".to_string()),
    }
    .insert(db)
    .await
    .unwrap()
}

async fn seed_customer_with_folder(
    db: &DatabaseConnection,
    name: &str,
    folder: Option<&str>,
) -> customer::Model {
    let cust = customer::ActiveModel {
        id: NotSet,
        customer_name: Set(name.to_string()),
        usage_count: Set(0),
        last_used: Set(None),
    }
    .insert(db)
    .await
    .unwrap();
    if let Some(folder) = folder {
        folder_mapping::ActiveModel {
            id: NotSet,
            customer_id: Set(cust.id),
            folder_name: Set(folder.to_string()),
            is_verified: Set(true),
        }
        .insert(db)
        .await
        .unwrap();
    }
    cust
}

#[tokio::test]
async fn no_candidate_is_a_miss() {
    let db = common::schema_db().await;
    let part = seed_part(&db, "RT-001").await;
    seed_file(&db, "unrelated.pdf", "/drawings/unrelated.pdf", true, 1).await;

    let result = drawings::match_part(&db, &part, None).await.unwrap();
    assert!(!result.success);
    assert_eq!(result.confidence, Confidence::None);
    assert_eq!(result.file_id, None);
}

#[tokio::test]
async fn containment_is_case_sensitive() {
    let db = common::schema_db().await;
    let part = seed_part(&db, "RT-001").await;
    seed_file(&db, "rt-001 revA.pdf", "/drawings/rt-001.pdf", true, 1).await;

    let result = drawings::match_part(&db, &part, None).await.unwrap();
    assert_eq!(result.confidence, Confidence::None);
}

#[tokio::test]
async fn no_customer_returns_fuzzy() {
    let db = common::schema_db().await;
    let part = seed_part(&db, "RT-001").await;
    let f = seed_file(&db, "RT-001.pdf", "/drawings/acme/RT-001.pdf", true, 1).await;

    let result = drawings::match_part(&db, &part, None).await.unwrap();
    assert!(result.success);
    assert_eq!(result.confidence, Confidence::Fuzzy);
    assert_eq!(result.file_id, Some(f.id));
}

#[tokio::test]
async fn customer_without_mapping_returns_fuzzy_no_folder() {
    let db = common::schema_db().await;
    let part = seed_part(&db, "RT-001").await;
    seed_file(&db, "RT-001.pdf", "/drawings/somewhere/RT-001.pdf", true, 1).await;
    let cust = seed_customer_with_folder(&db, "Acme Co", None).await;

    let result = drawings::match_part(&db, &part, Some(cust.id)).await.unwrap();
    assert!(result.success);
    assert_eq!(result.confidence, Confidence::FuzzyNoFolder);
    // A part whose customer has no folder mapping can never verify.
    assert_ne!(result.confidence, Confidence::Verified);
}

#[tokio::test]
async fn folder_mismatch_falls_back_to_best_fuzzy() {
    let db = common::schema_db().await;
    let part = seed_part(&db, "RT-001").await;
    let f = seed_file(&db, "RT-001.pdf", "/drawings/borealis/RT-001.pdf", true, 1).await;
    let cust = seed_customer_with_folder(&db, "Acme Co", Some("Acme_Drawings")).await;

    let result = drawings::match_part(&db, &part, Some(cust.id)).await.unwrap();
    assert!(result.success);
    assert_eq!(result.confidence, Confidence::FuzzyFolderMismatch);
    assert_eq!(result.file_id, Some(f.id));
}

#[tokio::test]
async fn path_verified_match_wins_as_verified() {
    let db = common::schema_db().await;
    let part = seed_part(&db, "RT-001").await;
    // Decoy outside the folder is newer and active.
    seed_file(&db, "RT-001 copy.pdf", "/scratch/RT-001.pdf", true, 20).await;
    let older = seed_file(
        &db,
        "RT-001 revB.pdf",
        "/drawings/ACME_DRAWINGS/RT-001 revB.pdf",
        true,
        5,
    )
    .await;
    let newer = seed_file(
        &db,
        "RT-001 revC.pdf",
        "/drawings/ACME_DRAWINGS/RT-001 revC.pdf",
        true,
        10,
    )
    .await;
    // Folder comparison is case-insensitive.
    let cust = seed_customer_with_folder(&db, "Acme Co", Some("acme_drawings")).await;

    let result = drawings::match_part(&db, &part, Some(cust.id)).await.unwrap();
    assert_eq!(result.confidence, Confidence::Verified);
    // Most recently modified verified candidate, not the decoy.
    assert_eq!(result.file_id, Some(newer.id));
    assert_ne!(result.file_id, Some(older.id));
}

#[tokio::test]
async fn active_files_outrank_inactive_for_fuzzy() {
    let db = common::schema_db().await;
    let part = seed_part(&db, "RT-001").await;
    seed_file(&db, "RT-001 old.pdf", "/archive/RT-001.pdf", false, 25).await;
    let active = seed_file(&db, "RT-001.pdf", "/drawings/RT-001.pdf", true, 2).await;

    let result = drawings::match_part(&db, &part, None).await.unwrap();
    assert_eq!(result.file_id, Some(active.id));
}

#[tokio::test]
async fn ingestion_is_idempotent_on_path() {
    let db = common::schema_db().await;
    let feed = common::scan_feed(vec![
        ("RT-001.pdf", "/drawings/RT-001.pdf", "2025-01-05 10:00:00"),
        ("RT-002.pdf", "/drawings/RT-002.pdf", "2025-01-06 10:00:00"),
    ]);

    let first = drawings::ingest_scan_feed(&db, &feed).await.unwrap();
    assert_eq!(first.inserted, 2);

    let second = drawings::ingest_scan_feed(&db, &feed).await.unwrap();
    assert_eq!(second.inserted, 0);
    assert_eq!(second.refreshed, 0);
    assert_eq!(drawing_file::Entity::find().count(&db).await.unwrap(), 2);

    // A re-scan with a newer timestamp refreshes in place.
    let rescan = common::scan_feed(vec![(
        "RT-001.pdf",
        "/drawings/RT-001.pdf",
        "2025-01-07 08:00:00",
    )]);
    let third = drawings::ingest_scan_feed(&db, &rescan).await.unwrap();
    assert_eq!(third.refreshed, 1);
    assert_eq!(drawing_file::Entity::find().count(&db).await.unwrap(), 2);
}

#[tokio::test]
async fn link_pass_writes_part_ids() {
    let db = common::schema_db().await;
    let part = seed_part(&db, "RT-001").await;
    let f = seed_file(&db, "RT-001.pdf", "/drawings/RT-001.pdf", true, 1).await;
    seed_part(&db, "ZZ-999").await;

    let summary = drawings::link_all_parts(&db).await.unwrap();
    assert_eq!(summary.total_parts, 2);
    assert_eq!(summary.fuzzy, 1);
    assert_eq!(summary.unmatched, 1);

    let linked = drawing_file::Entity::find_by_id(f.id)
        .one(&db)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(linked.part_id, Some(part.id));
}
