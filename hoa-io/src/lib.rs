//! hoa-io: Dataset metadata and array access for hoa.
//!
//! This crate loads dataset metadata from directories of JSON files,
//! populates registrations from the hints they carry, reads and writes the
//! dataset inventory table, and provides in-memory voxel arrays.
//!

pub mod catalog;
mod error;
pub mod hints;
pub mod inventory;
pub mod location;
pub mod provider;

pub use catalog::{CatalogConfig, DatasetCatalog};
pub use error::{Error, Result};
pub use hints::{populate_registrations, SkippedHint};
pub use inventory::{filter_by_organ, load_inventory, read_inventory, write_inventory, InventoryRecord};
pub use location::{StorageFormat, StorageLocation};
pub use provider::{InMemoryArrayProvider, TransposedSource};
