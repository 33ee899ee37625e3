//! Typed parsing boundary for the legacy exports and the scan feed.
//!
//! The legacy store is loosely typed; every optional field is declared
//! here once, with whitespace trimmed, instead of ad hoc field access
//! scattered through the resolution passes. Dates stay as raw strings
//! at this boundary: unparseable dates are per-record warnings, not
//! parse failures for the whole feed.

use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::Value;
use std::fs;
use std::path::Path;

use crate::errors::MigrateError;

/// One wide row of the legacy single-table store (one per order line).
#[derive(Clone, Debug, Deserialize)]
pub struct LegacyOrderRow {
    pub job_number: String,
    #[serde(default)]
    pub po_number: Option<String>,
    #[serde(default)]
    pub oe_number: Option<String>,
    pub customer_name: String,
    #[serde(default)]
    pub customer_contact: Option<String>,
    pub line_number: i32,
    pub part_number: String,
    #[serde(default)]
    pub revision: Option<String>,
    #[serde(default)]
    pub part_description: Option<String>,
    pub job_quantity: i32,
    #[serde(default)]
    pub unit_price: Option<rust_decimal::Decimal>,
    #[serde(default)]
    pub drawing_release: Option<String>,
    #[serde(default)]
    pub delivery_required_date: Option<String>,
    #[serde(default)]
    pub packing_slip: Option<String>,
    #[serde(default)]
    pub invoice_number: Option<String>,
    #[serde(default)]
    pub delivery_shipped_date: Option<String>,
}

/// One legacy assembly association row: `drawing_number` is used
/// inside `part_number`'s assembly.
#[derive(Clone, Debug, Deserialize)]
pub struct AssemblyRow {
    pub part_number: String,
    pub drawing_number: String,
    /// Number or numeric string in the source; anything else falls
    /// back to a quantity of 1.
    #[serde(default)]
    pub quantity: Option<Value>,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct ScanMetadata {
    #[serde(default)]
    pub scan_date: Option<String>,
    #[serde(default)]
    pub total_files: Option<u64>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct ScannedFile {
    pub file_name: String,
    pub file_path: String,
    #[serde(default)]
    pub last_modified_local: Option<String>,
    #[serde(default)]
    pub file_size_bytes: Option<u64>,
}

/// The merged, already path-deduplicated output of the filesystem
/// scan workers.
#[derive(Clone, Debug, Deserialize)]
pub struct ScanFeed {
    pub scan_metadata: ScanMetadata,
    pub files: Vec<ScannedFile>,
}

/// All source feeds a run may need. Feeds are optional at load time;
/// a step that needs a missing feed raises a structural failure.
#[derive(Clone, Debug, Default)]
pub struct SourceData {
    pub orders: Vec<LegacyOrderRow>,
    pub assemblies: Vec<AssemblyRow>,
    pub scan: Option<ScanFeed>,
}

impl SourceData {
    pub fn load(
        orders_path: Option<&str>,
        assemblies_path: Option<&str>,
        scan_path: Option<&str>,
    ) -> Result<Self, MigrateError> {
        let orders = match orders_path {
            Some(p) => load_json(p)?,
            None => Vec::new(),
        };
        let assemblies = match assemblies_path {
            Some(p) => load_json(p)?,
            None => Vec::new(),
        };
        let scan = match scan_path {
            Some(p) => Some(load_json(p)?),
            None => None,
        };
        Ok(Self {
            orders,
            assemblies,
            scan,
        })
    }
}

fn load_json<T: serde::de::DeserializeOwned>(path: &str) -> Result<T, MigrateError> {
    let raw = fs::read_to_string(Path::new(path)).map_err(|source| MigrateError::SourceIo {
        path: path.to_string(),
        source,
    })?;
    serde_json::from_str(&raw).map_err(|source| MigrateError::SourceFormat {
        path: path.to_string(),
        source,
    })
}

/// Trims a loosely-typed optional string, collapsing empty to `None`.
pub fn trimmed(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// Parses an assembly quantity. Absent, non-numeric and non-positive
/// values all collapse to 1.
pub fn parse_quantity(value: Option<&Value>) -> i32 {
    let parsed = match value {
        Some(Value::Number(n)) => n.as_f64().map(|f| f.round() as i64),
        Some(Value::String(s)) => s.trim().parse::<f64>().ok().map(|f| f.round() as i64),
        _ => None,
    };
    match parsed {
        Some(q) if q > 0 => q.min(i32::MAX as i64) as i32,
        _ => 1,
    }
}

/// Lenient date parsing for the handful of formats the legacy store
/// mixes. Returns `None` for anything unrecognized.
pub fn parse_date_lenient(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    const FORMATS: [&str; 4] = ["%Y-%m-%d", "%m/%d/%Y", "%m/%d/%y", "%Y/%m/%d"];
    FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(raw, fmt).ok())
        .or_else(|| {
            // Timestamps like "2024-03-01 00:00:00" keep the date part.
            raw.get(..10)
                .and_then(|d| NaiveDate::parse_from_str(d, "%Y-%m-%d").ok())
        })
}
