//! Dataset catalog.
//!
//! Loads one JSON metadata file per dataset from a directory and keeps the
//! registration inventory built from their registration hints.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use hoa_core::{Dataset, RegistrationInventory};
use log::{debug, info};

use crate::error::{Error, Result};
use crate::hints::{populate_registrations, SkippedHint};

/// Catalog loading configuration.
#[derive(Clone, Debug, Default)]
pub struct CatalogConfig {
    /// Fail instead of skipping registration hints that cannot be resolved.
    pub strict_registrations: bool,
}

impl CatalogConfig {
    /// Set whether unresolved registration hints are errors.
    #[must_use]
    pub fn with_strict_registrations(mut self, strict: bool) -> Self {
        self.strict_registrations = strict;
        self
    }
}

/// Datasets keyed by name, with their registrations.
#[derive(Debug, Default)]
pub struct DatasetCatalog {
    config: CatalogConfig,
    datasets: BTreeMap<String, Arc<Dataset>>,
    registrations: RegistrationInventory,
    skipped: Vec<SkippedHint>,
}

fn metadata_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_file() && path.extension().is_some_and(|ext| ext == "json") {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

fn read_dataset(path: &Path) -> Result<Dataset> {
    let text = fs::read_to_string(path)?;
    serde_json::from_str(&text).map_err(|source| Error::Json {
        path: path.to_path_buf(),
        source,
    })
}

impl DatasetCatalog {
    /// Loads every `*.json` metadata file in `dir`.
    ///
    /// # Errors
    /// Returns [`Error::EmptyMetadataDir`] if there are no metadata files,
    /// [`Error::Json`] for malformed files, [`Error::DuplicateDataset`] if
    /// two files define the same name, or a registration error in strict
    /// mode.
    pub fn load_dir(dir: impl AsRef<Path>, config: &CatalogConfig) -> Result<Self> {
        let dir = dir.as_ref();
        let files = metadata_files(dir)?;
        if files.is_empty() {
            return Err(Error::EmptyMetadataDir(dir.to_path_buf()));
        }

        let datasets = files
            .iter()
            .map(|path| read_dataset(path))
            .collect::<Result<Vec<_>>>()?;
        let catalog = Self::from_datasets(datasets, config)?;
        info!(
            "loaded {} datasets from {}",
            catalog.len(),
            dir.display()
        );
        Ok(catalog)
    }

    /// Builds a catalog from dataset records.
    ///
    /// # Errors
    /// Returns [`Error::DuplicateDataset`] if two records share a name, or a
    /// registration error in strict mode.
    pub fn from_datasets(
        datasets: impl IntoIterator<Item = Dataset>,
        config: &CatalogConfig,
    ) -> Result<Self> {
        let mut map = BTreeMap::new();
        for dataset in datasets {
            if map.contains_key(dataset.name()) {
                return Err(Error::DuplicateDataset(dataset.name));
            }
            map.insert(dataset.name.clone(), Arc::new(dataset));
        }

        let mut registrations = RegistrationInventory::new();
        let skipped = populate_registrations(&map, &mut registrations, config.strict_registrations)?;
        Ok(Self {
            config: config.clone(),
            datasets: map,
            registrations,
            skipped,
        })
    }

    /// Replaces all datasets with the metadata files in `dir`.
    ///
    /// The registration inventory is rebuilt from the new hints; registrations
    /// added by hand are dropped. On error the catalog is left unchanged.
    ///
    /// # Errors
    /// Same as [`load_dir`](Self::load_dir).
    pub fn reload(&mut self, dir: impl AsRef<Path>) -> Result<()> {
        let fresh = Self::load_dir(dir, &self.config)?;
        *self = fresh;
        debug!("catalog reloaded, {} registrations", self.registrations.len());
        Ok(())
    }

    /// Looks up a dataset by name.
    ///
    /// # Errors
    /// Returns [`Error::UnknownDataset`] if no dataset has this name.
    pub fn get(&self, name: &str) -> Result<Arc<Dataset>> {
        self.datasets
            .get(name)
            .cloned()
            .ok_or_else(|| Error::UnknownDataset(name.to_owned()))
    }

    /// Dataset names in sorted order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.datasets.keys().map(String::as_str)
    }

    /// Datasets in name order.
    pub fn iter(&self) -> impl Iterator<Item = &Arc<Dataset>> {
        self.datasets.values()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.datasets.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.datasets.is_empty()
    }

    fn related(&self, dataset: &Dataset, full_organ: bool) -> Vec<Arc<Dataset>> {
        self.datasets
            .values()
            .filter(|d| d.is_full_organ() == full_organ && d.same_organ_scan(dataset))
            .cloned()
            .collect()
    }

    /// Zoom datasets taken within a full-organ dataset, sorted by name.
    ///
    /// Zoom datasets have no children.
    #[must_use]
    pub fn children(&self, dataset: &Dataset) -> Vec<Arc<Dataset>> {
        if dataset.is_zoom() {
            return Vec::new();
        }
        self.related(dataset, false)
    }

    /// Full-organ datasets a zoom dataset was taken within, sorted by name.
    ///
    /// Full-organ datasets have no parents.
    #[must_use]
    pub fn parents(&self, dataset: &Dataset) -> Vec<Arc<Dataset>> {
        if dataset.is_full_organ() {
            return Vec::new();
        }
        self.related(dataset, true)
    }

    /// Loaded datasets reachable from `dataset` through registrations,
    /// excluding itself, sorted by name.
    #[must_use]
    pub fn registered(&self, dataset: &Dataset) -> Vec<Arc<Dataset>> {
        self.registrations
            .connected_component(dataset.name())
            .iter()
            .filter(|name| name.as_str() != dataset.name())
            .filter_map(|name| self.datasets.get(name).cloned())
            .collect()
    }

    /// Registration inventory.
    #[must_use]
    pub fn registrations(&self) -> &RegistrationInventory {
        &self.registrations
    }

    /// Mutable registration inventory, for adding registrations by hand.
    pub fn registrations_mut(&mut self) -> &mut RegistrationInventory {
        &mut self.registrations
    }

    /// Registration hints skipped while loading.
    #[must_use]
    pub fn skipped_hints(&self) -> &[SkippedHint] {
        &self.skipped
    }

    /// Configuration the catalog was loaded with.
    #[must_use]
    pub fn config(&self) -> &CatalogConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn heart(name: &str, voi: &str) -> Dataset {
        Dataset::new(name, 2.5)
            .with_donor("S-20-29")
            .with_organ("heart", None)
            .with_voi(voi)
            .with_beamline("bm05")
    }

    fn catalog() -> DatasetCatalog {
        DatasetCatalog::from_datasets(
            vec![
                heart("heart-complete", "complete-organ"),
                heart("heart-voi-02", "VOI-02"),
                heart("heart-voi-01", "VOI-01"),
                heart("heart-other-beamline", "VOI-03").with_beamline("bm18"),
                Dataset::new("kidney", 2.5).with_donor("S-20-29").with_organ("kidney", None),
            ],
            &CatalogConfig::default(),
        )
        .unwrap()
    }

    #[test]
    fn test_children_and_parents() {
        let c = catalog();
        let complete = c.get("heart-complete").unwrap();
        let names: Vec<_> = c.children(&complete).iter().map(|d| d.name.clone()).collect();
        assert_eq!(names, vec!["heart-voi-01", "heart-voi-02"]);
        assert!(c.parents(&complete).is_empty());

        let zoom = c.get("heart-voi-02").unwrap();
        let parents: Vec<_> = c.parents(&zoom).iter().map(|d| d.name.clone()).collect();
        assert_eq!(parents, vec!["heart-complete"]);
        assert!(c.children(&zoom).is_empty());
    }

    #[test]
    fn test_duplicate_name() {
        let err = DatasetCatalog::from_datasets(
            vec![Dataset::new("a", 1.0), Dataset::new("a", 2.0)],
            &CatalogConfig::default(),
        )
        .unwrap_err();
        assert!(matches!(err, Error::DuplicateDataset(name) if name == "a"));
    }

    #[test]
    fn test_unknown_dataset() {
        let err = catalog().get("lung").unwrap_err();
        assert_eq!(err.to_string(), "unknown dataset: lung");
    }

    #[test]
    fn test_registered_excludes_self() {
        let mut c = catalog();
        let t = hoa_core::SimilarityTransform::identity();
        c.registrations_mut()
            .add_registration_by_name("heart-voi-01", "heart-complete", t);
        c.registrations_mut()
            .add_registration_by_name("heart-voi-02", "heart-complete", t);

        let zoom = c.get("heart-voi-01").unwrap();
        let names: Vec<_> = c.registered(&zoom).iter().map(|d| d.name.clone()).collect();
        assert_eq!(names, vec!["heart-complete", "heart-voi-02"]);

        let kidney = c.get("kidney").unwrap();
        assert!(c.registered(&kidney).is_empty());
    }

    #[test]
    fn test_config_builder() {
        let config = CatalogConfig::default().with_strict_registrations(true);
        assert!(config.strict_registrations);
    }
}
