//! Entity resolution: converts denormalized legacy order rows into
//! deduplicated normalized rows, in dependency order (customer →
//! contact → purchase order → job → part → order item → shipment).
//!
//! Every insert treats a unique-constraint violation as a re-run
//! signal and falls back to a lookup of the existing row, so the whole
//! pass is safe to run twice. Per-record anomalies (unresolvable
//! foreign keys, unparseable dates) become warnings, never errors.

use chrono::NaiveDate;
use sea_orm::ActiveValue::{NotSet, Set};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, SqlErr,
};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use tracing::{debug, instrument, warn};

use crate::entities::{
    customer, customer_contact, job, order_item, part, purchase_order, shipment, shipment_item,
};
use crate::errors::MigrateError;
use crate::etl::source::{parse_date_lenient, trimmed, LegacyOrderRow};

/// Drawing numbers containing this marker are classified as
/// assemblies. Naming convention, not a guaranteed business rule.
pub const ASSEMBLY_MARKER: &str = "-GA-";

/// PO markers that mean "no usable purchase order number".
const NO_PO_MARKERS: [&str; 2] = ["NPO", "VERBAL"];

/// Default revision when the source row leaves it blank.
pub const DEFAULT_REVISION: &str = "-";

/// Per-run state threaded through the resolution pass: the resolution
/// maps (legacy key → new id) used to wire foreign keys in later
/// passes, plus the synthetic-PO sequence counter. Deliberately an
/// explicit object, not module state, so concurrent test runs cannot
/// interfere.
#[derive(Debug)]
pub struct RunContext {
    pub run_date: NaiveDate,
    po_seq: u32,
    synthetic_pos: HashMap<String, String>,
    pub customers: HashMap<String, i64>,
    pub contacts: HashMap<(String, String), i64>,
    pub purchase_orders: HashMap<String, i64>,
    pub jobs: HashMap<String, i64>,
    pub parts: HashMap<(String, String), i64>,
    pub shipments: HashMap<String, i64>,
}

impl RunContext {
    pub fn new(run_date: NaiveDate) -> Self {
        Self {
            run_date,
            po_seq: 0,
            synthetic_pos: HashMap::new(),
            customers: HashMap::new(),
            contacts: HashMap::new(),
            purchase_orders: HashMap::new(),
            jobs: HashMap::new(),
            parts: HashMap::new(),
            shipments: HashMap::new(),
        }
    }

    /// Synthetic PO number for a row lacking a usable one:
    /// `NPO-<YYYYMMDD>-<NORMALIZED_CUSTOMER>-<seq>`.
    ///
    /// Memoized per customer within a run, so every row missing a PO
    /// for the same customer collapses onto one synthetic purchase
    /// order. The sequence counter is process-global and wraps modulo
    /// 100; the full string stays unique through the date+customer
    /// prefix.
    pub fn synthetic_po_number(&mut self, customer_name: &str) -> (String, bool) {
        let normalized = normalize_customer(customer_name);
        if let Some(existing) = self.synthetic_pos.get(&normalized) {
            return (existing.clone(), false);
        }
        self.po_seq = self.po_seq.wrapping_add(1);
        let seq = self.po_seq % 100;
        let number = format!(
            "NPO-{}-{}-{:02}",
            self.run_date.format("%Y%m%d"),
            normalized,
            seq
        );
        self.synthetic_pos.insert(normalized, number.clone());
        (number, true)
    }
}

/// Uppercased alphanumerics of a customer name, for use inside
/// synthetic PO numbers ("Acme Co" → "ACMECO").
pub fn normalize_customer(name: &str) -> String {
    name.chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .map(|c| c.to_ascii_uppercase())
        .collect()
}

fn is_missing_po(po: Option<&str>) -> bool {
    match trimmed(po) {
        None => true,
        Some(v) => NO_PO_MARKERS
            .iter()
            .any(|marker| v.eq_ignore_ascii_case(marker)),
    }
}

/// Structured result of one resolution run, for operator review.
/// Counts are rows created in this run; on a re-run every insert
/// becomes a lookup and the counts drop to zero.
#[derive(Clone, Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolutionSummary {
    pub customer: u64,
    pub contact: u64,
    pub purchase_order: u64,
    pub temp_po_generated: u64,
    pub job: u64,
    pub part: u64,
    pub assembly_detected: u64,
    pub order_item: u64,
    pub shipment: u64,
    pub shipment_item: u64,
    pub warnings: Vec<String>,
}

impl ResolutionSummary {
    fn warn(&mut self, message: String) {
        warn!("{}", message);
        self.warnings.push(message);
    }
}

fn is_unique_violation(err: &sea_orm::DbErr) -> bool {
    matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_)))
}

/// Runs the full resolution pass over the legacy rows.
///
/// The caller supplies the connection (normally a transaction owned by
/// the migration unit) and a fresh or reused [`RunContext`].
#[instrument(skip_all, fields(rows = rows.len()))]
pub async fn run<C: ConnectionTrait>(
    db: &C,
    rows: &[LegacyOrderRow],
    ctx: &mut RunContext,
) -> Result<ResolutionSummary, MigrateError> {
    let mut summary = ResolutionSummary::default();

    resolve_customers(db, rows, ctx, &mut summary).await?;
    resolve_contacts(db, rows, ctx, &mut summary).await?;
    resolve_purchase_orders(db, rows, ctx, &mut summary).await?;
    resolve_jobs(db, rows, ctx, &mut summary).await?;
    resolve_parts(db, rows, ctx, &mut summary).await?;
    resolve_order_items(db, rows, ctx, &mut summary).await?;
    resolve_shipments(db, rows, ctx, &mut summary).await?;

    debug!(
        customers = summary.customer,
        jobs = summary.job,
        order_items = summary.order_item,
        warnings = summary.warnings.len(),
        "resolution pass complete"
    );
    Ok(summary)
}

async fn resolve_customers<C: ConnectionTrait>(
    db: &C,
    rows: &[LegacyOrderRow],
    ctx: &mut RunContext,
    summary: &mut ResolutionSummary,
) -> Result<(), MigrateError> {
    // BTreeMap for deterministic insert order across runs.
    let names: BTreeMap<String, ()> = rows
        .iter()
        .filter_map(|r| trimmed(Some(&r.customer_name)))
        .map(|n| (n, ()))
        .collect();

    for name in names.into_keys() {
        if ctx.customers.contains_key(&name) {
            continue;
        }
        let model = customer::ActiveModel {
            id: NotSet,
            customer_name: Set(name.clone()),
            usage_count: Set(0),
            last_used: Set(None),
        };
        match model.insert(db).await {
            Ok(created) => {
                ctx.customers.insert(name, created.id);
                summary.customer += 1;
            }
            Err(e) if is_unique_violation(&e) => {
                let existing = customer::Entity::find()
                    .filter(customer::Column::CustomerName.eq(&name))
                    .one(db)
                    .await?;
                match existing {
                    Some(m) => {
                        ctx.customers.insert(name, m.id);
                    }
                    None => summary.warn(format!(
                        "customer '{name}': unique clash but existing row not found"
                    )),
                }
            }
            Err(e) => return Err(e.into()),
        }
    }
    Ok(())
}

async fn resolve_contacts<C: ConnectionTrait>(
    db: &C,
    rows: &[LegacyOrderRow],
    ctx: &mut RunContext,
    summary: &mut ResolutionSummary,
) -> Result<(), MigrateError> {
    // Distinct (customer, contact) pairs with how often the source
    // referenced each; the count seeds usage_count.
    let mut pairs: BTreeMap<(String, String), i32> = BTreeMap::new();
    for row in rows {
        let (Some(cust), Some(contact)) = (
            trimmed(Some(&row.customer_name)),
            trimmed(row.customer_contact.as_deref()),
        ) else {
            continue;
        };
        *pairs.entry((cust, contact)).or_insert(0) += 1;
    }

    for ((cust, contact), uses) in pairs {
        let key = (cust.clone(), contact.clone());
        if ctx.contacts.contains_key(&key) {
            continue;
        }
        let Some(&customer_id) = ctx.customers.get(&cust) else {
            summary.warn(format!(
                "contact '{contact}': customer '{cust}' unresolved, skipped"
            ));
            continue;
        };
        let model = customer_contact::ActiveModel {
            id: NotSet,
            customer_id: Set(customer_id),
            contact_name: Set(contact.clone()),
            usage_count: Set(uses),
        };
        match model.insert(db).await {
            Ok(created) => {
                ctx.contacts.insert(key, created.id);
                summary.contact += 1;
            }
            Err(e) if is_unique_violation(&e) => {
                let existing = customer_contact::Entity::find()
                    .filter(customer_contact::Column::CustomerId.eq(customer_id))
                    .filter(customer_contact::Column::ContactName.eq(&contact))
                    .one(db)
                    .await?;
                match existing {
                    Some(m) => {
                        ctx.contacts.insert(key, m.id);
                    }
                    None => summary.warn(format!(
                        "contact '{cust}/{contact}': unique clash but existing row not found"
                    )),
                }
            }
            Err(e) => return Err(e.into()),
        }
    }
    Ok(())
}

/// Decides the effective PO number for a row: the trimmed source
/// number, or a synthetic one when missing/NPO/VERBAL.
fn effective_po_number(
    row: &LegacyOrderRow,
    ctx: &mut RunContext,
    summary: &mut ResolutionSummary,
) -> String {
    if is_missing_po(row.po_number.as_deref()) {
        let (number, fresh) = ctx.synthetic_po_number(&row.customer_name);
        if fresh {
            summary.temp_po_generated += 1;
        }
        number
    } else {
        trimmed(row.po_number.as_deref()).unwrap_or_default()
    }
}

async fn resolve_purchase_orders<C: ConnectionTrait>(
    db: &C,
    rows: &[LegacyOrderRow],
    ctx: &mut RunContext,
    summary: &mut ResolutionSummary,
) -> Result<(), MigrateError> {
    // First row encountered per PO number supplies oe_number/contact.
    let mut distinct: BTreeMap<String, (Option<String>, Option<i64>)> = BTreeMap::new();
    for row in rows {
        let number = effective_po_number(row, ctx, summary);
        distinct.entry(number).or_insert_with(|| {
            let contact_id = match (
                trimmed(Some(&row.customer_name)),
                trimmed(row.customer_contact.as_deref()),
            ) {
                (Some(cust), Some(contact)) => ctx.contacts.get(&(cust, contact)).copied(),
                _ => None,
            };
            (trimmed(row.oe_number.as_deref()), contact_id)
        });
    }

    for (number, (oe_number, contact_id)) in distinct {
        if ctx.purchase_orders.contains_key(&number) {
            continue;
        }
        let model = purchase_order::ActiveModel {
            id: NotSet,
            po_number: Set(number.clone()),
            oe_number: Set(oe_number),
            contact_id: Set(contact_id),
            is_active: Set(true),
        };
        match model.insert(db).await {
            Ok(created) => {
                ctx.purchase_orders.insert(number, created.id);
                summary.purchase_order += 1;
            }
            Err(e) if is_unique_violation(&e) => {
                let existing = purchase_order::Entity::find()
                    .filter(purchase_order::Column::PoNumber.eq(&number))
                    .one(db)
                    .await?;
                match existing {
                    Some(m) => {
                        ctx.purchase_orders.insert(number, m.id);
                    }
                    None => summary.warn(format!(
                        "purchase order '{number}': unique clash but existing row not found"
                    )),
                }
            }
            Err(e) => return Err(e.into()),
        }
    }
    Ok(())
}

async fn resolve_jobs<C: ConnectionTrait>(
    db: &C,
    rows: &[LegacyOrderRow],
    ctx: &mut RunContext,
    summary: &mut ResolutionSummary,
) -> Result<(), MigrateError> {
    let mut distinct: BTreeMap<String, String> = BTreeMap::new();
    for row in rows {
        let Some(job_number) = trimmed(Some(&row.job_number)) else {
            continue;
        };
        let number = effective_po_number(row, ctx, summary);
        distinct.entry(job_number).or_insert(number);
    }

    for (job_number, po_number) in distinct {
        if ctx.jobs.contains_key(&job_number) {
            continue;
        }
        // Every job must land on exactly one purchase order; without
        // one the job is skipped with a warning, never a fatal error.
        let Some(&po_id) = ctx.purchase_orders.get(&po_number) else {
            summary.warn(format!(
                "job '{job_number}': purchase order '{po_number}' unresolved, job skipped"
            ));
            continue;
        };
        let model = job::ActiveModel {
            id: NotSet,
            job_number: Set(job_number.clone()),
            po_id: Set(po_id),
            priority: Set(0),
        };
        match model.insert(db).await {
            Ok(created) => {
                ctx.jobs.insert(job_number, created.id);
                summary.job += 1;
            }
            Err(e) if is_unique_violation(&e) => {
                let existing = job::Entity::find()
                    .filter(job::Column::JobNumber.eq(&job_number))
                    .one(db)
                    .await?;
                match existing {
                    Some(m) => {
                        ctx.jobs.insert(job_number, m.id);
                    }
                    None => summary.warn(format!(
                        "job '{job_number}': unique clash but existing row not found"
                    )),
                }
            }
            Err(e) => return Err(e.into()),
        }
    }
    Ok(())
}

/// Inserts a part by natural key, or resolves the existing row.
/// Shared with the BOM builder's missing-part backfill.
pub async fn insert_or_lookup_part<C: ConnectionTrait>(
    db: &C,
    drawing_number: &str,
    revision: &str,
    description: Option<String>,
    is_assembly: Option<i32>,
    unit_price: Option<rust_decimal::Decimal>,
    ctx: &mut RunContext,
) -> Result<Option<(i64, bool)>, MigrateError> {
    let key = (drawing_number.to_string(), revision.to_string());
    if let Some(&id) = ctx.parts.get(&key) {
        return Ok(Some((id, false)));
    }
    let model = part::ActiveModel {
        id: NotSet,
        previous_id: Set(None),
        next_id: Set(None),
        drawing_number: Set(drawing_number.to_string()),
        revision: Set(revision.to_string()),
        description: Set(description),
        is_assembly: Set(is_assembly),
        unit_price: Set(unit_price),
    };
    match model.insert(db).await {
        Ok(created) => {
            ctx.parts.insert(key, created.id);
            Ok(Some((created.id, true)))
        }
        Err(e) if is_unique_violation(&e) => {
            let existing = part::Entity::find()
                .filter(part::Column::DrawingNumber.eq(drawing_number))
                .filter(part::Column::Revision.eq(revision))
                .one(db)
                .await?;
            match existing {
                Some(m) => {
                    ctx.parts.insert(key, m.id);
                    Ok(Some((m.id, false)))
                }
                None => Ok(None),
            }
        }
        Err(e) => Err(e.into()),
    }
}

async fn resolve_parts<C: ConnectionTrait>(
    db: &C,
    rows: &[LegacyOrderRow],
    ctx: &mut RunContext,
    summary: &mut ResolutionSummary,
) -> Result<(), MigrateError> {
    let mut distinct: BTreeMap<(String, String), &LegacyOrderRow> = BTreeMap::new();
    for row in rows {
        let Some(drawing) = trimmed(Some(&row.part_number)) else {
            continue;
        };
        let revision =
            trimmed(row.revision.as_deref()).unwrap_or_else(|| DEFAULT_REVISION.to_string());
        distinct.entry((drawing, revision)).or_insert(row);
    }

    for ((drawing, revision), row) in distinct {
        let is_assembly = if drawing.contains(ASSEMBLY_MARKER) {
            summary.assembly_detected += 1;
            Some(1)
        } else {
            None
        };
        let inserted = insert_or_lookup_part(
            db,
            &drawing,
            &revision,
            trimmed(row.part_description.as_deref()),
            is_assembly,
            row.unit_price,
            ctx,
        )
        .await?;
        match inserted {
            Some((_, true)) => summary.part += 1,
            Some((_, false)) => {}
            None => summary.warn(format!(
                "part '{drawing}' rev '{revision}': unique clash but existing row not found"
            )),
        }
    }
    Ok(())
}

fn parse_date_field(
    raw: Option<&str>,
    field: &str,
    job_number: &str,
    summary: &mut ResolutionSummary,
) -> Option<NaiveDate> {
    let raw = trimmed(raw)?;
    match parse_date_lenient(&raw) {
        Some(d) => Some(d),
        None => {
            summary.warn(format!(
                "job '{job_number}': unparseable {field} '{raw}', stored as null"
            ));
            None
        }
    }
}

async fn resolve_order_items<C: ConnectionTrait>(
    db: &C,
    rows: &[LegacyOrderRow],
    ctx: &mut RunContext,
    summary: &mut ResolutionSummary,
) -> Result<(), MigrateError> {
    for row in rows {
        let Some(job_number) = trimmed(Some(&row.job_number)) else {
            summary.warn(format!(
                "order line {} skipped: blank job number",
                row.line_number
            ));
            continue;
        };
        let Some(&job_id) = ctx.jobs.get(&job_number) else {
            summary.warn(format!(
                "order line {} skipped: job '{}' unresolved",
                row.line_number, job_number
            ));
            continue;
        };
        let part_key = (
            match trimmed(Some(&row.part_number)) {
                Some(p) => p,
                None => {
                    summary.warn(format!(
                        "job '{job_number}' line {}: blank part number, skipped",
                        row.line_number
                    ));
                    continue;
                }
            },
            trimmed(row.revision.as_deref()).unwrap_or_else(|| DEFAULT_REVISION.to_string()),
        );
        let Some(&part_id) = ctx.parts.get(&part_key) else {
            summary.warn(format!(
                "job '{job_number}' line {}: part '{}' rev '{}' unresolved, skipped",
                row.line_number, part_key.0, part_key.1
            ));
            continue;
        };

        let drawing_release = parse_date_field(
            row.drawing_release.as_deref(),
            "drawing release date",
            &job_number,
            summary,
        );
        let delivery_required = parse_date_field(
            row.delivery_required_date.as_deref(),
            "delivery required date",
            &job_number,
            summary,
        );

        let model = order_item::ActiveModel {
            id: NotSet,
            job_id: Set(job_id),
            part_id: Set(part_id),
            line_number: Set(row.line_number),
            quantity: Set(row.job_quantity),
            actual_price: Set(row.unit_price),
            drawing_release_date: Set(drawing_release),
            delivery_required_date: Set(delivery_required),
            status: Set("open".to_string()),
        };
        match model.insert(db).await {
            Ok(_) => summary.order_item += 1,
            Err(e) if is_unique_violation(&e) => {
                // Same (job, line) already migrated; re-run no-op.
            }
            Err(e) => return Err(e.into()),
        }
    }
    Ok(())
}

async fn resolve_shipments<C: ConnectionTrait>(
    db: &C,
    rows: &[LegacyOrderRow],
    ctx: &mut RunContext,
    summary: &mut ResolutionSummary,
) -> Result<(), MigrateError> {
    for row in rows {
        let Some(packing_slip) = trimmed(row.packing_slip.as_deref()) else {
            continue;
        };
        let shipment_id = match ctx.shipments.get(&packing_slip) {
            Some(&id) => id,
            None => {
                let job_number = trimmed(Some(&row.job_number)).unwrap_or_default();
                let shipped = parse_date_field(
                    row.delivery_shipped_date.as_deref(),
                    "delivery shipped date",
                    &job_number,
                    summary,
                );
                let model = shipment::ActiveModel {
                    id: NotSet,
                    packing_slip_number: Set(packing_slip.clone()),
                    invoice_number: Set(trimmed(row.invoice_number.as_deref())),
                    delivery_shipped_date: Set(shipped),
                };
                match model.insert(db).await {
                    Ok(created) => {
                        ctx.shipments.insert(packing_slip.clone(), created.id);
                        summary.shipment += 1;
                        created.id
                    }
                    Err(e) if is_unique_violation(&e) => {
                        let existing = shipment::Entity::find()
                            .filter(shipment::Column::PackingSlipNumber.eq(&packing_slip))
                            .one(db)
                            .await?;
                        match existing {
                            Some(m) => {
                                ctx.shipments.insert(packing_slip.clone(), m.id);
                                m.id
                            }
                            None => {
                                summary.warn(format!(
                                    "shipment '{packing_slip}': unique clash but existing row not found"
                                ));
                                continue;
                            }
                        }
                    }
                    Err(e) => return Err(e.into()),
                }
            }
        };

        // Wire the shipped order line onto the shipment.
        let Some(job_number) = trimmed(Some(&row.job_number)) else {
            continue;
        };
        let Some(&job_id) = ctx.jobs.get(&job_number) else {
            summary.warn(format!(
                "shipment '{packing_slip}': job '{job_number}' unresolved, item skipped"
            ));
            continue;
        };
        let order_item = order_item::Entity::find()
            .filter(order_item::Column::JobId.eq(job_id))
            .filter(order_item::Column::LineNumber.eq(row.line_number))
            .one(db)
            .await?;
        let Some(order_item) = order_item else {
            summary.warn(format!(
                "shipment '{packing_slip}': order line {} of job '{job_number}' unresolved, item skipped",
                row.line_number
            ));
            continue;
        };

        let model = shipment_item::ActiveModel {
            id: NotSet,
            order_item_id: Set(order_item.id),
            shipment_id: Set(shipment_id),
            quantity: Set(row.job_quantity),
        };
        match model.insert(db).await {
            Ok(_) => summary.shipment_item += 1,
            Err(e) if is_unique_violation(&e) => {}
            Err(e) => return Err(e.into()),
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_customer_names() {
        assert_eq!(normalize_customer("Acme Co"), "ACMECO");
        assert_eq!(normalize_customer("a-b_c 1"), "ABC1");
    }

    #[test]
    fn synthetic_po_memoized_per_customer() {
        let mut ctx = RunContext::new(NaiveDate::from_ymd_opt(2025, 1, 9).unwrap());
        let (first, fresh) = ctx.synthetic_po_number("Acme Co");
        assert!(fresh);
        assert_eq!(first, "NPO-20250109-ACMECO-01");

        let (again, fresh) = ctx.synthetic_po_number("ACME co.");
        assert!(!fresh);
        assert_eq!(again, first);

        let (other, fresh) = ctx.synthetic_po_number("Borealis");
        assert!(fresh);
        assert_eq!(other, "NPO-20250109-BOREALIS-02");
    }

    #[test]
    fn missing_po_markers() {
        assert!(is_missing_po(None));
        assert!(is_missing_po(Some("")));
        assert!(is_missing_po(Some("  npo ")));
        assert!(is_missing_po(Some("VERBAL")));
        assert!(!is_missing_po(Some("PO-1234")));
    }
}
