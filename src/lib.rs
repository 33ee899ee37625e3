//! shopfloor-migrate
//!
//! Migration engine that normalizes a denormalized legacy job-shop
//! order store (one wide row per order line) into a relational schema:
//! customers, contacts, purchase orders, jobs, parts, order items,
//! shipments, bills of material and drawing files.
#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![warn(clippy::all, clippy::perf, clippy::dbg_macro)]

pub mod config;
pub mod db;
pub mod entities;
pub mod errors;
pub mod etl;
pub mod logging;
pub mod migrate;
