//! Version chain & BOM builder: derives the part-revision linked list
//! and the bill-of-materials graph from the flat legacy assembly
//! association table.
//!
//! Guarantees on inserted edges: no self-loops, no duplicate
//! `(parent, child)` pairs, both endpoints exist at insert time. The
//! graph is not forced into acyclicity; a DFS pass reports
//! transitive cycles as warnings and tolerates them.

use sea_orm::ActiveValue::{NotSet, Set};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QueryOrder, SqlErr,
};
use serde::Serialize;
use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use tracing::{debug, instrument, warn};

use crate::entities::{part, part_tree};
use crate::errors::MigrateError;
use crate::etl::resolve::{RunContext, ASSEMBLY_MARKER, DEFAULT_REVISION};
use crate::etl::source::{parse_quantity, trimmed, AssemblyRow};

/// Structured result of one BOM construction run.
#[derive(Clone, Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BomSummary {
    pub total_records: u64,
    pub success_inserted: u64,
    pub self_ref_skipped: u64,
    pub parent_not_found: u64,
    pub child_not_found: u64,
    pub duplicate_skipped: u64,
    pub parts_backfilled: u64,
    pub chains_linked: u64,
    pub cycles_detected: u64,
    pub warnings: Vec<String>,
}

impl BomSummary {
    fn warn(&mut self, message: String) {
        warn!("{}", message);
        self.warnings.push(message);
    }
}

/// Revision ordering for version chains: the default revision `"-"`
/// sorts first, then case-insensitive lexicographic.
fn revision_order(a: &str, b: &str) -> Ordering {
    match (a == DEFAULT_REVISION, b == DEFAULT_REVISION) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Less,
        (false, true) => Ordering::Greater,
        (false, false) => a.to_ascii_lowercase().cmp(&b.to_ascii_lowercase()),
    }
}

/// Resolves a BOM endpoint by drawing number alone (revision
/// defaulted): prefers the default-revision row, otherwise the
/// earliest revision in chain order.
async fn resolve_part_by_drawing<C: ConnectionTrait>(
    db: &C,
    drawing_number: &str,
) -> Result<Option<i64>, MigrateError> {
    let mut candidates = part::Entity::find()
        .filter(part::Column::DrawingNumber.eq(drawing_number))
        .all(db)
        .await?;
    candidates.sort_by(|a, b| revision_order(&a.revision, &b.revision));
    Ok(candidates.first().map(|m| m.id))
}

/// Ensures every distinct `part_number` and `drawing_number` in the
/// association table exists as a Part row.
///
/// Anything appearing as a `part_number` has children and is therefore
/// an assembly by construction; bare `drawing_number` values fall back
/// to the `-GA-` naming heuristic. A value playing both roles is
/// inserted exactly once, as an assembly.
#[instrument(skip_all, fields(rows = rows.len()))]
pub async fn backfill_missing_parts<C: ConnectionTrait>(
    db: &C,
    rows: &[AssemblyRow],
    ctx: &mut RunContext,
    summary: &mut BomSummary,
) -> Result<(), MigrateError> {
    let mut parents: BTreeSet<String> = BTreeSet::new();
    let mut children: BTreeMap<String, Option<String>> = BTreeMap::new();
    for row in rows {
        if let Some(p) = trimmed(Some(&row.part_number)) {
            parents.insert(p);
        }
        if let Some(c) = trimmed(Some(&row.drawing_number)) {
            children
                .entry(c)
                .or_insert_with(|| trimmed(row.description.as_deref()));
        }
    }

    // Parents first so dual-role values land as assemblies.
    for drawing in &parents {
        if resolve_part_by_drawing(db, drawing).await?.is_none() {
            if let Some((_, true)) = crate::etl::resolve::insert_or_lookup_part(
                db,
                drawing,
                DEFAULT_REVISION,
                None,
                Some(1),
                None,
                ctx,
            )
            .await?
            {
                summary.parts_backfilled += 1;
            }
        }
    }

    for (drawing, description) in &children {
        if parents.contains(drawing) {
            continue;
        }
        if resolve_part_by_drawing(db, drawing).await?.is_none() {
            let is_assembly = if drawing.contains(ASSEMBLY_MARKER) {
                Some(1)
            } else {
                None
            };
            if let Some((_, true)) = crate::etl::resolve::insert_or_lookup_part(
                db,
                drawing,
                DEFAULT_REVISION,
                description.clone(),
                is_assembly,
                None,
                ctx,
            )
            .await?
            {
                summary.parts_backfilled += 1;
            }
        }
    }
    Ok(())
}

/// Inserts the BOM edges. Self-references, unresolved endpoints and
/// duplicate pairs are skipped and counted, never fatal.
#[instrument(skip_all, fields(rows = rows.len()))]
pub async fn build_edges<C: ConnectionTrait>(
    db: &C,
    rows: &[AssemblyRow],
    summary: &mut BomSummary,
) -> Result<(), MigrateError> {
    for row in rows {
        summary.total_records += 1;

        let (Some(parent_drawing), Some(child_drawing)) = (
            trimmed(Some(&row.part_number)),
            trimmed(Some(&row.drawing_number)),
        ) else {
            summary.warn(format!(
                "assembly row '{}'/'{}': blank endpoint, skipped",
                row.part_number, row.drawing_number
            ));
            continue;
        };

        let Some(parent_id) = resolve_part_by_drawing(db, &parent_drawing).await? else {
            summary.parent_not_found += 1;
            summary.warn(format!("assembly '{parent_drawing}': parent not found"));
            continue;
        };
        let Some(child_id) = resolve_part_by_drawing(db, &child_drawing).await? else {
            summary.child_not_found += 1;
            summary.warn(format!(
                "assembly '{parent_drawing}': child '{child_drawing}' not found"
            ));
            continue;
        };

        if parent_id == child_id {
            summary.self_ref_skipped += 1;
            continue;
        }

        let exists = part_tree::Entity::find()
            .filter(part_tree::Column::ParentId.eq(parent_id))
            .filter(part_tree::Column::ChildId.eq(child_id))
            .one(db)
            .await?;
        if exists.is_some() {
            summary.duplicate_skipped += 1;
            continue;
        }

        let model = part_tree::ActiveModel {
            id: NotSet,
            parent_id: Set(parent_id),
            child_id: Set(child_id),
            quantity: Set(parse_quantity(row.quantity.as_ref())),
        };
        match model.insert(db).await {
            Ok(_) => summary.success_inserted += 1,
            Err(e) if matches!(e.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) => {
                summary.duplicate_skipped += 1;
            }
            Err(e) => return Err(e.into()),
        }
    }
    Ok(())
}

/// Rebuilds the doubly-linked revision chains: parts sharing a
/// drawing number are ordered by revision and linked through
/// `previous_id`/`next_id`. Links are rewritten wholesale, so a
/// re-run converges on the same chains.
#[instrument(skip_all)]
pub async fn build_version_chains<C: ConnectionTrait>(
    db: &C,
    summary: &mut BomSummary,
) -> Result<(), MigrateError> {
    let parts = part::Entity::find()
        .order_by_asc(part::Column::DrawingNumber)
        .all(db)
        .await?;

    let mut groups: BTreeMap<String, Vec<part::Model>> = BTreeMap::new();
    for p in parts {
        groups.entry(p.drawing_number.clone()).or_default().push(p);
    }

    for (_, mut revisions) in groups {
        revisions.sort_by(|a, b| revision_order(&a.revision, &b.revision));
        for idx in 0..revisions.len() {
            let previous = if idx > 0 {
                Some(revisions[idx - 1].id)
            } else {
                None
            };
            let next = revisions.get(idx + 1).map(|m| m.id);
            let current = &revisions[idx];
            if current.previous_id == previous && current.next_id == next {
                continue;
            }
            let update = part::ActiveModel {
                id: Set(current.id),
                previous_id: Set(previous),
                next_id: Set(next),
                ..Default::default()
            };
            update.update(db).await?;
            summary.chains_linked += 1;
        }
    }
    Ok(())
}

/// Validation query for the chain pairing invariant: if
/// `a.next_id == b` then `b.previous_id == a`. Returns the violating
/// part ids (checked, not enforced).
pub async fn verify_version_chains<C: ConnectionTrait>(db: &C) -> Result<Vec<i64>, MigrateError> {
    let parts = part::Entity::find().all(db).await?;
    let by_id: HashMap<i64, &part::Model> = parts.iter().map(|p| (p.id, p)).collect();

    let mut violations = Vec::new();
    for p in &parts {
        if let Some(next) = p.next_id {
            match by_id.get(&next) {
                Some(n) if n.previous_id == Some(p.id) => {}
                _ => violations.push(p.id),
            }
        }
    }
    Ok(violations)
}

/// DFS over the inserted edges with a recursion-stack set; transitive
/// cycles are reported, not rejected.
#[instrument(skip_all)]
pub async fn detect_cycles<C: ConnectionTrait>(
    db: &C,
    summary: &mut BomSummary,
) -> Result<(), MigrateError> {
    let edges = part_tree::Entity::find().all(db).await?;
    let mut adjacency: HashMap<i64, Vec<i64>> = HashMap::new();
    for edge in &edges {
        adjacency.entry(edge.parent_id).or_default().push(edge.child_id);
    }

    let mut visited: HashSet<i64> = HashSet::new();
    let mut on_stack: HashSet<i64> = HashSet::new();

    fn dfs(
        node: i64,
        adjacency: &HashMap<i64, Vec<i64>>,
        visited: &mut HashSet<i64>,
        on_stack: &mut HashSet<i64>,
        cycle_nodes: &mut Vec<i64>,
    ) {
        visited.insert(node);
        on_stack.insert(node);
        if let Some(children) = adjacency.get(&node) {
            for &child in children {
                if on_stack.contains(&child) {
                    cycle_nodes.push(child);
                } else if !visited.contains(&child) {
                    dfs(child, adjacency, visited, on_stack, cycle_nodes);
                }
            }
        }
        on_stack.remove(&node);
    }

    let mut cycle_nodes = Vec::new();
    let roots: Vec<i64> = adjacency.keys().copied().collect();
    for root in roots {
        if !visited.contains(&root) {
            dfs(root, &adjacency, &mut visited, &mut on_stack, &mut cycle_nodes);
        }
    }

    summary.cycles_detected = cycle_nodes.len() as u64;
    for node in cycle_nodes {
        summary.warn(format!(
            "BOM cycle through part id {node}; edge kept, review source data"
        ));
    }

    debug!(edges = edges.len(), cycles = summary.cycles_detected, "cycle scan complete");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_revision_sorts_first() {
        assert_eq!(revision_order("-", "A"), Ordering::Less);
        assert_eq!(revision_order("B", "-"), Ordering::Greater);
        assert_eq!(revision_order("a", "B"), Ordering::Less);
        assert_eq!(revision_order("-", "-"), Ordering::Equal);
    }
}
