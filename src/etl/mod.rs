//! ETL passes: typed source parsing, entity resolution, BOM/version
//! chain construction and drawing reconciliation.

pub mod bom;
pub mod drawings;
pub mod resolve;
pub mod source;
