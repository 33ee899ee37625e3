//! sea-orm models for the normalized schema and the migration ledger.

pub mod customer;
pub mod customer_contact;
pub mod drawing_file;
pub mod folder_mapping;
pub mod job;
pub mod migration_ledger;
pub mod order_item;
pub mod part;
pub mod part_tree;
pub mod purchase_order;
pub mod shipment;
pub mod shipment_item;
