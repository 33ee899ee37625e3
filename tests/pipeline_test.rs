//! Full-sequence run through the real step registry: end-to-end data
//! flow, re-run safety and the undo boundary between reversible and
//! irreversible steps.

mod common;

use assert_matches::assert_matches;
use sea_orm::{ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter};

use shopfloor_migrate::entities::{drawing_file, job, order_item, part, purchase_order};
use shopfloor_migrate::errors::MigrateError;
use shopfloor_migrate::etl::source::SourceData;
use shopfloor_migrate::migrate::runner::Runner;
use shopfloor_migrate::migrate::{steps, StepContext};

fn fixture_source() -> SourceData {
    SourceData {
        orders: vec![
            common::order_row("J100", Some(""), "Acme Co", 1, "RT-001", 5),
            common::order_row("J100", Some(""), "Acme Co", 2, "ASM-GA-7", 1),
            common::order_row("J200", Some("PO-500"), "Borealis", 1, "BX-100", 10),
        ],
        assemblies: vec![
            common::assembly_row("ASM-GA-7", "RT-001", Some(2)),
            common::assembly_row("ASM-GA-7", "ASM-GA-7", Some(1)),
        ],
        scan: Some(common::scan_feed(vec![
            ("RT-001.pdf", "/drawings/RT-001.pdf", "2025-01-05 10:00:00"),
            ("BX-100.pdf", "/drawings/BX-100.pdf", "2025-01-06 10:00:00"),
        ])),
    }
}

#[tokio::test]
async fn full_sequence_applies_and_reruns_safely() {
    let db = common::memory_db().await;
    let ctx = StepContext::new(db.clone(), fixture_source()).with_run_date(common::run_date());
    let runner = Runner::new(ctx.clone(), steps::default_steps());

    let ran = runner.apply_pending().await.unwrap();
    assert_eq!(ran.len(), 6);

    let status = runner.status().await.unwrap();
    assert_eq!(status.applied.len(), 6);
    assert!(status.pending.is_empty());

    // Spot-check the normalized data.
    let po = purchase_order::Entity::find()
        .filter(purchase_order::Column::PoNumber.eq("NPO-20250109-ACMECO-01"))
        .one(&db)
        .await
        .unwrap()
        .expect("synthetic PO for Acme");
    let j100 = job::Entity::find()
        .filter(job::Column::JobNumber.eq("J100"))
        .one(&db)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(j100.po_id, po.id);
    assert_eq!(order_item::Entity::find().count(&db).await.unwrap(), 3);

    // The self-referencing association inserted no edge; the valid one
    // did, with both endpoints real parts.
    let edges = shopfloor_migrate::entities::part_tree::Entity::find()
        .all(&db)
        .await
        .unwrap();
    assert_eq!(edges.len(), 1);
    assert_eq!(edges[0].quantity, 2);

    // Drawing linked to its part by the backfill.
    let rt = part::Entity::find()
        .filter(part::Column::DrawingNumber.eq("RT-001"))
        .one(&db)
        .await
        .unwrap()
        .unwrap();
    let file = drawing_file::Entity::find()
        .filter(drawing_file::Column::FileName.eq("RT-001.pdf"))
        .one(&db)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(file.part_id, Some(rt.id));

    // A second runner against the same database applies nothing and
    // duplicates nothing.
    let counts_before = (
        part::Entity::find().count(&db).await.unwrap(),
        order_item::Entity::find().count(&db).await.unwrap(),
        drawing_file::Entity::find().count(&db).await.unwrap(),
    );
    let rerun = Runner::new(ctx, steps::default_steps());
    assert!(rerun.apply_pending().await.unwrap().is_empty());
    let counts_after = (
        part::Entity::find().count(&db).await.unwrap(),
        order_item::Entity::find().count(&db).await.unwrap(),
        drawing_file::Entity::find().count(&db).await.unwrap(),
    );
    assert_eq!(counts_before, counts_after);
}

#[tokio::test]
async fn undo_walks_back_until_the_irreversible_boundary() {
    let db = common::memory_db().await;
    let ctx = StepContext::new(db.clone(), fixture_source()).with_run_date(common::run_date());
    let runner = Runner::new(ctx, steps::default_steps());
    runner.apply_pending().await.unwrap();

    // Indexes, then the drawing links, both reversible.
    assert_eq!(runner.undo_last().await.unwrap(), "m0006_create_indexes");
    assert_eq!(runner.undo_last().await.unwrap(), "m0005_link_drawings");

    // Links are gone but the file records remain.
    let linked = drawing_file::Entity::find()
        .filter(drawing_file::Column::PartId.is_not_null())
        .count(&db)
        .await
        .unwrap();
    assert_eq!(linked, 0);
    assert!(drawing_file::Entity::find().count(&db).await.unwrap() > 0);

    // Scan ingestion is irreversible: refused, ledger untouched.
    let err = runner.undo_last().await.unwrap_err();
    assert_matches!(err, MigrateError::Irreversible { ref name, .. }
        if name == "m0004_ingest_drawing_files");

    let status = runner.status().await.unwrap();
    assert_eq!(status.applied.len(), 4);
    assert_eq!(
        status.pending,
        vec!["m0005_link_drawings", "m0006_create_indexes"]
    );
}
