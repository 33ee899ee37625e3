//! Scan-feed ingestion and the drawing reconciliation matcher.
//!
//! Ingestion is idempotent on `file_path`. The matcher is a pure read
//! over `drawing_file` and `folder_mapping`: tiered fuzzy matching
//! with customer-folder verification, designed so the batch backfill
//! always makes forward progress even on incomplete metadata.

use chrono::{DateTime, NaiveDateTime, Utc};
use sea_orm::ActiveValue::{NotSet, Set};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, IntoActiveModel, QueryFilter,
    QueryOrder,
};
use serde::Serialize;
use tracing::{debug, instrument, warn};

use crate::entities::{
    customer_contact, drawing_file, folder_mapping, job, order_item, part, purchase_order,
};
use crate::errors::MigrateError;
use crate::etl::source::{parse_date_lenient, ScanFeed};

/// How much independent verification supports an automatic link.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Confidence {
    None,
    Fuzzy,
    FuzzyNoFolder,
    FuzzyFolderMismatch,
    Verified,
}

impl Confidence {
    pub fn as_str(&self) -> &'static str {
        match self {
            Confidence::None => "none",
            Confidence::Fuzzy => "fuzzy",
            Confidence::FuzzyNoFolder => "fuzzy_no_folder",
            Confidence::FuzzyFolderMismatch => "fuzzy_folder_mismatch",
            Confidence::Verified => "verified",
        }
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct MatchResult {
    pub success: bool,
    pub file_id: Option<i64>,
    pub confidence: Confidence,
    pub reason: String,
}

impl MatchResult {
    fn miss(reason: impl Into<String>) -> Self {
        Self {
            success: false,
            file_id: None,
            confidence: Confidence::None,
            reason: reason.into(),
        }
    }

    fn hit(file_id: i64, confidence: Confidence, reason: impl Into<String>) -> Self {
        Self {
            success: true,
            file_id: Some(file_id),
            confidence,
            reason: reason.into(),
        }
    }
}

#[derive(Clone, Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IngestSummary {
    pub total_files: u64,
    pub inserted: u64,
    pub refreshed: u64,
    pub warnings: Vec<String>,
}

#[derive(Clone, Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkSummary {
    pub total_parts: u64,
    pub verified: u64,
    pub fuzzy: u64,
    pub fuzzy_no_folder: u64,
    pub fuzzy_folder_mismatch: u64,
    pub unmatched: u64,
}

fn parse_scan_timestamp(raw: Option<&str>) -> Option<DateTime<Utc>> {
    let raw = raw?.trim();
    if raw.is_empty() {
        return None;
    }
    const FORMATS: [&str; 3] = ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%m/%d/%Y %H:%M"];
    FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .map(|dt| dt.and_utc())
        .or_else(|| {
            parse_date_lenient(raw)
                .and_then(|d| d.and_hms_opt(0, 0, 0))
                .map(|dt| dt.and_utc())
        })
}

/// Loads the merged scan feed into `drawing_file`. Existing paths are
/// refreshed (modification time, active flag) instead of duplicated;
/// `part_id` is left for the reconciliation backfill.
#[instrument(skip_all, fields(files = feed.files.len()))]
pub async fn ingest_scan_feed<C: ConnectionTrait>(
    db: &C,
    feed: &ScanFeed,
) -> Result<IngestSummary, MigrateError> {
    let mut summary = IngestSummary::default();

    for file in &feed.files {
        summary.total_files += 1;
        let modified = match parse_scan_timestamp(file.last_modified_local.as_deref()) {
            Some(ts) => ts,
            None => {
                let msg = format!(
                    "scan file '{}': unparseable timestamp {:?}, defaulting to now",
                    file.file_path, file.last_modified_local
                );
                warn!("{}", msg);
                summary.warnings.push(msg);
                Utc::now()
            }
        };

        let existing = drawing_file::Entity::find()
            .filter(drawing_file::Column::FilePath.eq(&file.file_path))
            .one(db)
            .await?;

        match existing {
            Some(model) => {
                if model.last_modified_at != modified || !model.is_active {
                    let mut active = model.into_active_model();
                    active.last_modified_at = Set(modified);
                    active.is_active = Set(true);
                    active.update(db).await?;
                    summary.refreshed += 1;
                }
            }
            None => {
                let model = drawing_file::ActiveModel {
                    id: NotSet,
                    part_id: Set(None),
                    file_name: Set(file.file_name.clone()),
                    file_path: Set(file.file_path.clone()),
                    is_active: Set(true),
                    last_modified_at: Set(modified),
                    revision: Set(crate::etl::resolve::DEFAULT_REVISION.to_string()),
                };
                model.insert(db).await?;
                summary.inserted += 1;
            }
        }
    }

    debug!(
        inserted = summary.inserted,
        refreshed = summary.refreshed,
        "scan feed ingested"
    );
    Ok(summary)
}

/// Links one part against the scanned files.
///
/// Tier ladder: no candidate → `none`; candidate but no customer
/// supplied → `fuzzy`; customer without a folder mapping →
/// `fuzzy_no_folder`; mapping present but no candidate path contains
/// the folder → `fuzzy_folder_mismatch`; otherwise the most recently
/// modified path-verified candidate wins as `verified`.
#[instrument(skip(db, part), fields(drawing = %part.drawing_number))]
pub async fn match_part<C: ConnectionTrait>(
    db: &C,
    part: &part::Model,
    customer_id: Option<i64>,
) -> Result<MatchResult, MigrateError> {
    // LIKE is case-insensitive on SQLite; re-check containment
    // case-sensitively in memory.
    let candidates: Vec<drawing_file::Model> = drawing_file::Entity::find()
        .filter(drawing_file::Column::FileName.contains(&part.drawing_number))
        .order_by_desc(drawing_file::Column::IsActive)
        .order_by_desc(drawing_file::Column::LastModifiedAt)
        .all(db)
        .await?
        .into_iter()
        .filter(|f| f.file_name.contains(&part.drawing_number))
        .collect();

    let Some(best) = candidates.first() else {
        return Ok(MatchResult::miss(format!(
            "no file name contains '{}'",
            part.drawing_number
        )));
    };

    let Some(customer_id) = customer_id else {
        return Ok(MatchResult::hit(
            best.id,
            Confidence::Fuzzy,
            "no customer supplied, best fuzzy match returned",
        ));
    };

    let mapping = folder_mapping::Entity::find()
        .filter(folder_mapping::Column::CustomerId.eq(customer_id))
        .one(db)
        .await?;
    let Some(mapping) = mapping else {
        return Ok(MatchResult::hit(
            best.id,
            Confidence::FuzzyNoFolder,
            "customer has no folder mapping, best fuzzy match returned",
        ));
    };

    let folder = mapping.folder_name.to_lowercase();
    let verified = candidates
        .iter()
        .filter(|f| f.file_path.to_lowercase().contains(&folder))
        .max_by_key(|f| f.last_modified_at);

    match verified {
        Some(file) => Ok(MatchResult::hit(
            file.id,
            Confidence::Verified,
            format!("path verified against folder '{}'", mapping.folder_name),
        )),
        None => Ok(MatchResult::hit(
            best.id,
            Confidence::FuzzyFolderMismatch,
            format!(
                "no candidate path contains folder '{}', best fuzzy match returned",
                mapping.folder_name
            ),
        )),
    }
}

/// Walks order item → job → purchase order → contact to find the
/// customer a part was most recently made for. Best effort; `None`
/// when the chain is incomplete.
async fn customer_for_part<C: ConnectionTrait>(
    db: &C,
    part_id: i64,
) -> Result<Option<i64>, MigrateError> {
    let item = order_item::Entity::find()
        .filter(order_item::Column::PartId.eq(part_id))
        .order_by_desc(order_item::Column::Id)
        .one(db)
        .await?;
    let Some(item) = item else { return Ok(None) };

    let Some(job) = job::Entity::find_by_id(item.job_id).one(db).await? else {
        return Ok(None);
    };
    let Some(po) = purchase_order::Entity::find_by_id(job.po_id).one(db).await? else {
        return Ok(None);
    };
    let Some(contact_id) = po.contact_id else {
        return Ok(None);
    };
    let contact = customer_contact::Entity::find_by_id(contact_id)
        .one(db)
        .await?;
    Ok(contact.map(|c| c.customer_id))
}

/// Backfill pass: runs the matcher for every part and writes
/// `drawing_file.part_id` for each hit. Never blocked by partial
/// metadata; lower tiers still link.
#[instrument(skip_all)]
pub async fn link_all_parts<C: ConnectionTrait>(db: &C) -> Result<LinkSummary, MigrateError> {
    let mut summary = LinkSummary::default();

    let parts = part::Entity::find()
        .order_by_asc(part::Column::Id)
        .all(db)
        .await?;

    for part in parts {
        summary.total_parts += 1;
        let customer_id = customer_for_part(db, part.id).await?;
        let result = match_part(db, &part, customer_id).await?;

        match result.confidence {
            Confidence::None => {
                summary.unmatched += 1;
                continue;
            }
            Confidence::Fuzzy => summary.fuzzy += 1,
            Confidence::FuzzyNoFolder => summary.fuzzy_no_folder += 1,
            Confidence::FuzzyFolderMismatch => summary.fuzzy_folder_mismatch += 1,
            Confidence::Verified => summary.verified += 1,
        }

        if let Some(file_id) = result.file_id {
            let file = drawing_file::Entity::find_by_id(file_id).one(db).await?;
            if let Some(file) = file {
                if file.part_id != Some(part.id) {
                    let mut active = file.into_active_model();
                    active.part_id = Set(Some(part.id));
                    active.update(db).await?;
                }
            }
        }
    }

    debug!(
        verified = summary.verified,
        unmatched = summary.unmatched,
        "drawing link pass complete"
    );
    Ok(summary)
}
