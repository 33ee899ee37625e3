//! Shared fixtures: in-memory SQLite databases with the normalized
//! schema applied, plus terse builders for legacy source rows.
#![allow(dead_code)]

use chrono::NaiveDate;
use sea_orm::{ConnectOptions, Database, DatabaseConnection};
use serde_json::json;

use shopfloor_migrate::etl::source::{AssemblyRow, LegacyOrderRow, ScanFeed, ScanMetadata, ScannedFile};
use shopfloor_migrate::migrate::steps::CreateSchema;
use shopfloor_migrate::migrate::{MigrationStep, StepContext};

/// One connection only: each `sqlite::memory:` connection is its own
/// database, so a pool would split state across databases.
pub async fn memory_db() -> DatabaseConnection {
    let mut opt = ConnectOptions::new("sqlite::memory:".to_string());
    opt.max_connections(1).sqlx_logging(false);
    Database::connect(opt).await.expect("in-memory sqlite")
}

/// Fresh database with the full normalized schema.
pub async fn schema_db() -> DatabaseConnection {
    let db = memory_db().await;
    let ctx = StepContext::new(db.clone(), Default::default());
    CreateSchema.up(&ctx).await.expect("create schema");
    db
}

pub fn run_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 1, 9).unwrap()
}

pub fn order_row(
    job: &str,
    po: Option<&str>,
    customer: &str,
    line: i32,
    part: &str,
    qty: i32,
) -> LegacyOrderRow {
    LegacyOrderRow {
        job_number: job.to_string(),
        po_number: po.map(str::to_string),
        oe_number: None,
        customer_name: customer.to_string(),
        customer_contact: None,
        line_number: line,
        part_number: part.to_string(),
        revision: None,
        part_description: None,
        job_quantity: qty,
        unit_price: None,
        drawing_release: None,
        delivery_required_date: None,
        packing_slip: None,
        invoice_number: None,
        delivery_shipped_date: None,
    }
}

pub fn assembly_row(parent: &str, child: &str, qty: Option<i64>) -> AssemblyRow {
    AssemblyRow {
        part_number: parent.to_string(),
        drawing_number: child.to_string(),
        quantity: qty.map(|q| json!(q)),
        description: None,
    }
}

pub fn scan_feed(files: Vec<(&str, &str, &str)>) -> ScanFeed {
    ScanFeed {
        scan_metadata: ScanMetadata {
            scan_date: Some("2025-01-09".to_string()),
            total_files: Some(files.len() as u64),
        },
        files: files
            .into_iter()
            .map(|(name, path, modified)| ScannedFile {
                file_name: name.to_string(),
                file_path: path.to_string(),
                last_modified_local: Some(modified.to_string()),
                file_size_bytes: Some(1024),
            })
            .collect(),
    }
}
