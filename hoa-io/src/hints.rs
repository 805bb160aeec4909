//! Registrations from metadata hints.
//!
//! Zoom datasets ship a rough registration on to their full-organ dataset,
//! expressed in voxels of the full-organ dataset. Hints are converted to
//! physical-space transforms and added to a registration inventory.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use hoa_core::{Dataset, RegistrationHint, RegistrationInventory};
use log::{debug, warn};

use crate::error::{Error, Result};

/// A hint that could not be added to the inventory.
#[derive(Debug, Clone, PartialEq)]
pub struct SkippedHint {
    pub source_dataset: String,
    pub target_dataset: String,
    pub reason: String,
}

impl fmt::Display for SkippedHint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} -> {}: {}",
            self.source_dataset, self.target_dataset, self.reason
        )
    }
}

fn resolve<'a>(
    datasets: &'a BTreeMap<String, Arc<Dataset>>,
    hint: &RegistrationHint,
) -> Result<(&'a Dataset, &'a Dataset)> {
    match (
        datasets.get(&hint.source_dataset),
        datasets.get(&hint.target_dataset),
    ) {
        (Some(source), Some(target)) => Ok((source.as_ref(), target.as_ref())),
        _ => Err(Error::UnresolvedReference {
            source_dataset: hint.source_dataset.clone(),
            target_dataset: hint.target_dataset.clone(),
        }),
    }
}

/// Adds the registration hint of every dataset to `inventory`.
///
/// Hints naming datasets that are not in `datasets`, or with unusable
/// parameters, are logged and skipped. With `strict` set the first such hint
/// is returned as an error instead.
///
/// # Errors
/// Only fails when `strict` is set, with [`Error::UnresolvedReference`] or
/// [`Error::Core`].
pub fn populate_registrations(
    datasets: &BTreeMap<String, Arc<Dataset>>,
    inventory: &mut RegistrationInventory,
    strict: bool,
) -> Result<Vec<SkippedHint>> {
    let mut skipped = Vec::new();
    for hint in datasets.values().filter_map(|d| d.registration.as_ref()) {
        let added = resolve(datasets, hint).and_then(|(source, target)| {
            let transform = hint.to_transform(source, target)?;
            inventory.add_registration(source, target, transform);
            Ok(())
        });

        match added {
            Ok(()) => {}
            Err(e) if strict => return Err(e),
            Err(e) => {
                warn!("skipping registration: {e}");
                skipped.push(SkippedHint {
                    source_dataset: hint.source_dataset.clone(),
                    target_dataset: hint.target_dataset.clone(),
                    reason: e.to_string(),
                });
            }
        }
    }
    debug!(
        "populated {} registrations, skipped {}",
        inventory.len() / 2,
        skipped.len()
    );
    Ok(skipped)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use hoa_core::{transform_point, PhysicalCoordinate};

    fn hint(source: &str, target: &str, scale: f64) -> RegistrationHint {
        RegistrationHint {
            source_dataset: source.into(),
            target_dataset: target.into(),
            translation: [10.0, 20.0, 30.0],
            rotation: 0.0,
            scale,
        }
    }

    fn datasets(items: Vec<Dataset>) -> BTreeMap<String, Arc<Dataset>> {
        items
            .into_iter()
            .map(|d| (d.name.clone(), Arc::new(d)))
            .collect()
    }

    #[test]
    fn test_hint_added_in_physical_units() {
        let map = datasets(vec![
            Dataset::new("zoom", 2.0).with_registration(hint("zoom", "overview", 0.25)),
            Dataset::new("overview", 8.0),
        ]);
        let mut inventory = RegistrationInventory::new();
        let skipped = populate_registrations(&map, &mut inventory, false).unwrap();

        assert!(skipped.is_empty());
        let t = inventory.get_registration_by_name("zoom", "overview").unwrap();
        assert_relative_eq!(t.scale(), 1.0);
        let p = transform_point(&PhysicalCoordinate::origin(), &t);
        assert_eq!(p, PhysicalCoordinate::new(80.0, 160.0, 240.0));
    }

    #[test]
    fn test_unresolved_hint_skipped() {
        let map = datasets(vec![
            Dataset::new("zoom", 2.0).with_registration(hint("zoom", "missing", 1.0)),
        ]);
        let mut inventory = RegistrationInventory::new();
        let skipped = populate_registrations(&map, &mut inventory, false).unwrap();

        assert!(inventory.is_empty());
        assert_eq!(skipped.len(), 1);
        assert_eq!(skipped[0].target_dataset, "missing");
        assert!(skipped[0].to_string().starts_with("zoom -> missing"));
    }

    #[test]
    fn test_unresolved_hint_strict() {
        let map = datasets(vec![
            Dataset::new("zoom", 2.0).with_registration(hint("zoom", "missing", 1.0)),
        ]);
        let mut inventory = RegistrationInventory::new();
        let err = populate_registrations(&map, &mut inventory, true).unwrap_err();
        assert!(matches!(err, Error::UnresolvedReference { .. }));
    }

    #[test]
    fn test_invalid_scale_skipped() {
        let map = datasets(vec![
            Dataset::new("zoom", 2.0).with_registration(hint("zoom", "overview", 0.0)),
            Dataset::new("overview", 8.0),
        ]);
        let mut inventory = RegistrationInventory::new();
        let skipped = populate_registrations(&map, &mut inventory, false).unwrap();
        assert_eq!(skipped.len(), 1);
        assert!(inventory.is_empty());

        let err = populate_registrations(&map, &mut inventory, true).unwrap_err();
        assert!(matches!(
            err,
            Error::Core(hoa_core::Error::InvalidParameter { .. })
        ));
    }
}
