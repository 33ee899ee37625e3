//! Entity resolution: the worked example from the design discussion,
//! idempotence, synthetic-PO determinism and warning behavior.

mod common;

use sea_orm::{ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter};

use shopfloor_migrate::entities::{
    customer, customer_contact, job, order_item, part, purchase_order, shipment, shipment_item,
};
use shopfloor_migrate::etl::resolve::{self, RunContext};
use shopfloor_migrate::etl::source::LegacyOrderRow;

#[tokio::test]
async fn worked_example_produces_linked_entities() {
    let db = common::schema_db().await;
    let rows = vec![common::order_row(
        "J100",
        Some(""),
        "Acme Co",
        1,
        "RT-001",
        5,
    )];

    let mut ctx = RunContext::new(common::run_date());
    let summary = resolve::run(&db, &rows, &mut ctx).await.unwrap();

    assert_eq!(summary.customer, 1);
    assert_eq!(summary.temp_po_generated, 1);
    assert_eq!(summary.job, 1);
    assert_eq!(summary.part, 1);
    assert_eq!(summary.order_item, 1);

    let po = purchase_order::Entity::find()
        .filter(purchase_order::Column::PoNumber.eq("NPO-20250109-ACMECO-01"))
        .one(&db)
        .await
        .unwrap()
        .expect("synthetic PO");

    let job = job::Entity::find()
        .filter(job::Column::JobNumber.eq("J100"))
        .one(&db)
        .await
        .unwrap()
        .expect("job J100");
    assert_eq!(job.po_id, po.id);

    let part = part::Entity::find()
        .filter(part::Column::DrawingNumber.eq("RT-001"))
        .one(&db)
        .await
        .unwrap()
        .expect("part RT-001");
    assert_eq!(part.revision, "-");
    assert_eq!(part.is_assembly, None);

    let item = order_item::Entity::find()
        .filter(order_item::Column::JobId.eq(job.id))
        .one(&db)
        .await
        .unwrap()
        .expect("order item");
    assert_eq!(item.part_id, part.id);
    assert_eq!(item.line_number, 1);
    assert_eq!(item.quantity, 5);
}

#[tokio::test]
async fn second_run_is_a_no_op() {
    let db = common::schema_db().await;
    let rows = vec![
        {
            let mut r = common::order_row("J100", Some("PO-77"), "Acme Co", 1, "RT-001", 5);
            r.customer_contact = Some("Dana".to_string());
            r.packing_slip = Some("PS-1".to_string());
            r
        },
        common::order_row("J100", Some("PO-77"), "Acme Co", 2, "RT-002", 3),
        common::order_row("J101", None, "Borealis", 1, "BX-GA-100", 1),
    ];

    let mut ctx = RunContext::new(common::run_date());
    let first = resolve::run(&db, &rows, &mut ctx).await.unwrap();
    assert_eq!(first.customer, 2);
    assert_eq!(first.assembly_detected, 1);
    assert!(first.warnings.is_empty());

    let counts = table_counts(&db).await;

    // Fresh context, same source, same run date: every insert becomes
    // a lookup.
    let mut ctx = RunContext::new(common::run_date());
    let second = resolve::run(&db, &rows, &mut ctx).await.unwrap();
    assert_eq!(second.customer, 0);
    assert_eq!(second.contact, 0);
    assert_eq!(second.purchase_order, 0);
    assert_eq!(second.job, 0);
    assert_eq!(second.part, 0);
    assert_eq!(second.order_item, 0);
    assert_eq!(second.shipment, 0);
    assert_eq!(second.shipment_item, 0);

    assert_eq!(table_counts(&db).await, counts);
}

async fn table_counts(db: &sea_orm::DatabaseConnection) -> Vec<u64> {
    vec![
        customer::Entity::find().count(db).await.unwrap(),
        customer_contact::Entity::find().count(db).await.unwrap(),
        purchase_order::Entity::find().count(db).await.unwrap(),
        job::Entity::find().count(db).await.unwrap(),
        part::Entity::find().count(db).await.unwrap(),
        order_item::Entity::find().count(db).await.unwrap(),
        shipment::Entity::find().count(db).await.unwrap(),
        shipment_item::Entity::find().count(db).await.unwrap(),
    ]
}

#[tokio::test]
async fn rows_missing_po_collapse_per_customer() {
    let db = common::schema_db().await;
    let rows = vec![
        common::order_row("J1", None, "Acme Co", 1, "P-1", 1),
        common::order_row("J2", Some("NPO"), "Acme Co", 1, "P-2", 1),
        common::order_row("J3", Some("verbal"), "Borealis", 1, "P-3", 1),
    ];

    let mut ctx = RunContext::new(common::run_date());
    let summary = resolve::run(&db, &rows, &mut ctx).await.unwrap();

    // Two synthetic POs: one per customer, not one per row.
    assert_eq!(summary.temp_po_generated, 2);
    let pos = purchase_order::Entity::find().all(&db).await.unwrap();
    let mut numbers: Vec<_> = pos.iter().map(|p| p.po_number.as_str()).collect();
    numbers.sort_unstable();
    assert_eq!(
        numbers,
        vec!["NPO-20250109-ACMECO-01", "NPO-20250109-BOREALIS-02"]
    );

    // Both Acme jobs landed on the same synthetic PO.
    let acme_po = &pos
        .iter()
        .find(|p| p.po_number.contains("ACMECO"))
        .unwrap();
    for job_number in ["J1", "J2"] {
        let job = job::Entity::find()
            .filter(job::Column::JobNumber.eq(job_number))
            .one(&db)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(job.po_id, acme_po.id);
    }
}

#[tokio::test]
async fn contacts_seed_usage_counts() {
    let db = common::schema_db().await;
    let mut rows = Vec::new();
    for line in 1..=3 {
        let mut r = common::order_row("J1", Some("PO-1"), "Acme Co", line, "P-1", 1);
        r.customer_contact = Some("Dana".to_string());
        rows.push(r);
    }

    let mut ctx = RunContext::new(common::run_date());
    let summary = resolve::run(&db, &rows, &mut ctx).await.unwrap();
    assert_eq!(summary.contact, 1);

    let contact = customer_contact::Entity::find()
        .one(&db)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(contact.contact_name, "Dana");
    assert_eq!(contact.usage_count, 3);
}

#[tokio::test]
async fn blank_job_number_is_warned_not_fatal() {
    let db = common::schema_db().await;
    let rows = vec![
        common::order_row("", Some("PO-1"), "Acme Co", 1, "P-1", 1),
        common::order_row("J2", Some("PO-1"), "Acme Co", 1, "P-2", 2),
    ];

    let mut ctx = RunContext::new(common::run_date());
    let summary = resolve::run(&db, &rows, &mut ctx).await.unwrap();

    // The bad row is skipped with context; the good row still lands.
    assert!(summary.warnings.iter().any(|w| w.contains("blank job number")));
    assert_eq!(summary.order_item, 1);
}

#[tokio::test]
async fn unparseable_dates_store_null_and_warn() {
    let db = common::schema_db().await;
    let mut row = common::order_row("J1", Some("PO-1"), "Acme Co", 1, "P-1", 1);
    row.drawing_release = Some("sometime in march".to_string());
    row.delivery_required_date = Some("2025-02-01".to_string());

    let mut ctx = RunContext::new(common::run_date());
    let summary = resolve::run(&db, &[row], &mut ctx).await.unwrap();

    assert!(summary
        .warnings
        .iter()
        .any(|w| w.contains("J1") && w.contains("drawing release date")));

    let item = order_item::Entity::find().one(&db).await.unwrap().unwrap();
    assert_eq!(item.drawing_release_date, None);
    assert_eq!(
        item.delivery_required_date,
        Some(chrono::NaiveDate::from_ymd_opt(2025, 2, 1).unwrap())
    );
}

#[tokio::test]
async fn shipments_link_shipped_lines() {
    let db = common::schema_db().await;
    let mut row: LegacyOrderRow = common::order_row("J1", Some("PO-1"), "Acme Co", 1, "P-1", 4);
    row.packing_slip = Some("PS-100".to_string());
    row.invoice_number = Some("INV-9".to_string());
    row.delivery_shipped_date = Some("2025-01-05".to_string());

    let mut ctx = RunContext::new(common::run_date());
    let summary = resolve::run(&db, &[row], &mut ctx).await.unwrap();
    assert_eq!(summary.shipment, 1);
    assert_eq!(summary.shipment_item, 1);

    let shipment = shipment::Entity::find().one(&db).await.unwrap().unwrap();
    assert_eq!(shipment.packing_slip_number, "PS-100");
    assert_eq!(shipment.invoice_number.as_deref(), Some("INV-9"));

    let item = shipment_item::Entity::find().one(&db).await.unwrap().unwrap();
    assert_eq!(item.shipment_id, shipment.id);
    assert_eq!(item.quantity, 4);
}
