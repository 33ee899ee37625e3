//! Ordered migration step registry.

mod m0001_create_schema;
mod m0002_resolve_legacy_orders;
mod m0003_build_bom_graph;
mod m0004_ingest_drawing_files;
mod m0005_link_drawings;
mod m0006_create_indexes;

pub use m0001_create_schema::CreateSchema;
pub use m0002_resolve_legacy_orders::ResolveLegacyOrders;
pub use m0003_build_bom_graph::BuildBomGraph;
pub use m0004_ingest_drawing_files::IngestDrawingFiles;
pub use m0005_link_drawings::LinkDrawings;
pub use m0006_create_indexes::CreateIndexes;

use crate::migrate::MigrationStep;

/// The full ordered step list. Index creation is deliberately last so
/// the bulk-loading steps are not slowed by index maintenance.
pub fn default_steps() -> Vec<Box<dyn MigrationStep>> {
    vec![
        Box::new(CreateSchema),
        Box::new(ResolveLegacyOrders),
        Box::new(BuildBomGraph),
        Box::new(IngestDrawingFiles),
        Box::new(LinkDrawings),
        Box::new(CreateIndexes),
    ]
}
