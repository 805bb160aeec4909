//! Dataset inventory table.
//!
//! The inventory is a CSV table with one row per dataset and the columns
//! `name, donor, organ, organ_context, voi, voxel_size_um`. Missing organ
//! contexts are empty strings.

use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;

use hoa_core::Dataset;
use serde::{Deserialize, Serialize};

use crate::catalog::DatasetCatalog;
use crate::error::Result;

/// One row of the inventory table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InventoryRecord {
    pub name: String,
    pub donor: String,
    pub organ: String,
    #[serde(default)]
    pub organ_context: String,
    pub voi: String,
    pub voxel_size_um: f64,
}

impl From<&Dataset> for InventoryRecord {
    fn from(dataset: &Dataset) -> Self {
        Self {
            name: dataset.name.clone(),
            donor: dataset.donor.id.clone(),
            organ: dataset.sample.organ.clone(),
            organ_context: dataset.sample.organ_context.clone().unwrap_or_default(),
            voi: dataset.voi.clone(),
            voxel_size_um: dataset.voxel_size_um(),
        }
    }
}

/// Reads inventory records from CSV.
///
/// # Errors
/// Returns [`crate::Error::Csv`] for malformed rows.
pub fn read_inventory<R: Read>(reader: R) -> Result<Vec<InventoryRecord>> {
    let mut reader = csv::Reader::from_reader(reader);
    let records = reader
        .deserialize()
        .collect::<std::result::Result<Vec<InventoryRecord>, _>>()?;
    Ok(records)
}

/// Loads an inventory file.
///
/// # Errors
/// Returns [`crate::Error::Io`] if the file cannot be opened, or
/// [`crate::Error::Csv`] for malformed rows.
pub fn load_inventory(path: impl AsRef<Path>) -> Result<Vec<InventoryRecord>> {
    read_inventory(File::open(path)?)
}

/// Writes one row per catalog dataset, sorted by name.
///
/// # Errors
/// Returns an error if writing fails.
pub fn write_inventory<W: Write>(catalog: &DatasetCatalog, writer: W) -> Result<()> {
    let mut writer = csv::Writer::from_writer(writer);
    for dataset in catalog.iter() {
        writer.serialize(InventoryRecord::from(dataset.as_ref()))?;
    }
    writer.flush()?;
    Ok(())
}

/// Records of a single organ.
#[must_use]
pub fn filter_by_organ<'a>(records: &'a [InventoryRecord], organ: &str) -> Vec<&'a InventoryRecord> {
    records.iter().filter(|r| r.organ == organ).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const TABLE: &str = "\
name,donor,organ,organ_context,voi,voxel_size_um
A-1_brain_complete-organ_25.0um_bm05,A-1,brain,,complete-organ,25.0
A-1_brain_VOI-01_6.5um_bm05,A-1,brain,,VOI-01,6.5
B-2_lung_VOI-01_2.0um_bm18,B-2,lung,upper-lobe,VOI-01,2.0
";

    #[test]
    fn test_read_inventory() {
        let records = read_inventory(TABLE.as_bytes()).unwrap();
        assert_eq!(records.len(), 3);
        assert_eq!(records[0].organ_context, "");
        assert_eq!(records[2].organ_context, "upper-lobe");
        assert_eq!(records[1].voxel_size_um, 6.5);
    }

    #[test]
    fn test_filter_by_organ() {
        let records = read_inventory(TABLE.as_bytes()).unwrap();
        let brains = filter_by_organ(&records, "brain");
        assert_eq!(brains.len(), 2);
        assert!(filter_by_organ(&records, "heart").is_empty());
    }

    #[test]
    fn test_malformed_row() {
        let bad = "name,donor,organ,organ_context,voi,voxel_size_um\nx,d,o,,v,not-a-number\n";
        assert!(matches!(
            read_inventory(bad.as_bytes()),
            Err(crate::Error::Csv(_))
        ));
    }

    #[test]
    fn test_record_from_dataset() {
        let d = Dataset::new("n", 1.5)
            .with_donor("d")
            .with_organ("lung", Some("left"))
            .with_voi("VOI-01");
        let r = InventoryRecord::from(&d);
        assert_eq!(r.organ_context, "left");
        assert_eq!(r.voxel_size_um, 1.5);
    }
}
