//! Dataset metadata records.

use std::fmt;
use std::hash::{Hash, Hasher};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::coordinate::PhysicalCoordinate;
use crate::error::{Error, Result};
use crate::transform::{build_transform, SimilarityTransform};

/// Donor the sample was taken from.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Donor {
    /// Unique donor ID.
    pub id: String,
}

/// Scanned sample.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Sample {
    /// Organ name.
    pub organ: String,
    /// Location of the dataset within the organ. Only present for some zooms.
    #[cfg_attr(feature = "serde", serde(default))]
    pub organ_context: Option<String>,
}

/// Array data description.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct DataInfo {
    /// Full-resolution array shape.
    #[cfg_attr(feature = "serde", serde(default))]
    pub shape: [u64; 3],
    /// Isotropic size of a single voxel, in micrometers.
    pub voxel_size_um: f64,
    /// Storage URL, `n5://gs://...` or `zarr://gs://...`.
    #[cfg_attr(feature = "serde", serde(default))]
    pub gcs_url: String,
}

/// Scan parameters.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Scan {
    /// Beamline the scan was taken on.
    #[cfg_attr(feature = "serde", serde(default))]
    pub beamline: String,
}

/// Rough registration of a dataset on to another, as shipped in metadata.
///
/// Translation and scale are expressed in voxels of the target dataset.
/// The translation is ordered `[x, y, z]` and the rotation is in degrees
/// about the z axis.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct RegistrationHint {
    /// Name of the registered dataset.
    pub source_dataset: String,
    /// Name of the dataset registered on to.
    pub target_dataset: String,
    pub translation: [f64; 3],
    pub rotation: f64,
    pub scale: f64,
}

impl RegistrationHint {
    /// Physical-space transform mapping `source` on to `target`.
    ///
    /// # Errors
    /// Returns [`Error::InvalidParameter`] if either voxel size or the
    /// resulting transform parameters are invalid.
    pub fn to_transform(&self, source: &Dataset, target: &Dataset) -> Result<SimilarityTransform> {
        source.validate()?;
        target.validate()?;
        let target_voxel = target.voxel_size_um();
        let [x, y, z] = self.translation;
        let translation = PhysicalCoordinate::new(x, y, z) * target_voxel;
        let scale = self.scale * target_voxel / source.voxel_size_um();
        build_transform(translation, self.rotation, scale)
    }
}

/// A single Human Organ Atlas dataset.
///
/// Datasets are identified by name: equality and hashing only look at
/// [`Dataset::name`].
#[derive(Debug, Clone, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Dataset {
    /// Unique dataset name.
    pub name: String,
    pub donor: Donor,
    pub sample: Sample,
    /// Volume of interest label, e.g. `complete-organ` or `VOI-04`.
    pub voi: String,
    pub data: DataInfo,
    #[cfg_attr(feature = "serde", serde(default))]
    pub scan: Scan,
    #[cfg_attr(feature = "serde", serde(default))]
    pub registration: Option<RegistrationHint>,
}

impl Dataset {
    /// Creates a dataset with only a name and voxel size set.
    #[must_use]
    pub fn new(name: impl Into<String>, voxel_size_um: f64) -> Self {
        Self {
            name: name.into(),
            data: DataInfo {
                voxel_size_um,
                ..DataInfo::default()
            },
            ..Self::default()
        }
    }

    /// Sets the donor ID.
    #[must_use]
    pub fn with_donor(mut self, id: impl Into<String>) -> Self {
        self.donor.id = id.into();
        self
    }

    /// Sets the organ and optional organ context.
    #[must_use]
    pub fn with_organ(mut self, organ: impl Into<String>, context: Option<&str>) -> Self {
        self.sample.organ = organ.into();
        self.sample.organ_context = context.map(str::to_owned);
        self
    }

    /// Sets the volume of interest label.
    #[must_use]
    pub fn with_voi(mut self, voi: impl Into<String>) -> Self {
        self.voi = voi.into();
        self
    }

    /// Sets the beamline.
    #[must_use]
    pub fn with_beamline(mut self, beamline: impl Into<String>) -> Self {
        self.scan.beamline = beamline.into();
        self
    }

    /// Sets the full-resolution shape, ordered `[x, y, z]`.
    #[must_use]
    pub fn with_shape(mut self, shape: [u64; 3]) -> Self {
        self.data.shape = shape;
        self
    }

    /// Sets the storage URL.
    #[must_use]
    pub fn with_gcs_url(mut self, url: impl Into<String>) -> Self {
        self.data.gcs_url = url.into();
        self
    }

    /// Attaches a registration hint.
    #[must_use]
    pub fn with_registration(mut self, hint: RegistrationHint) -> Self {
        self.registration = Some(hint);
        self
    }

    /// Dataset name.
    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Voxel size at downsample level 0, in micrometers.
    #[inline]
    #[must_use]
    pub fn voxel_size_um(&self) -> f64 {
        self.data.voxel_size_um
    }

    /// Whether this dataset covers the whole organ.
    #[must_use]
    pub fn is_full_organ(&self) -> bool {
        self.voi.starts_with("complete")
    }

    /// Whether this dataset is a high-resolution zoom.
    #[must_use]
    pub fn is_zoom(&self) -> bool {
        !self.is_full_organ()
    }

    /// Organ name with the organ context appended, if present.
    #[must_use]
    pub fn organ_label(&self) -> String {
        match &self.sample.organ_context {
            Some(context) if !context.is_empty() => format!("{}_{context}", self.sample.organ),
            _ => self.sample.organ.clone(),
        }
    }

    /// Whether `other` is a scan of the same physical organ.
    #[must_use]
    pub fn same_organ_scan(&self, other: &Dataset) -> bool {
        self.donor.id == other.donor.id
            && self.sample.organ == other.sample.organ
            && self.scan.beamline == other.scan.beamline
    }

    /// Checks that the voxel size is usable.
    ///
    /// # Errors
    /// Returns [`Error::InvalidParameter`] if the voxel size is not a finite
    /// positive number.
    pub fn validate(&self) -> Result<()> {
        let v = self.voxel_size_um();
        if v.is_finite() && v > 0.0 {
            Ok(())
        } else {
            Err(Error::invalid(
                "voxel_size_um",
                format!("{} has voxel size {v}, expected a positive number", self.name),
            ))
        }
    }
}

impl PartialEq for Dataset {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl Eq for Dataset {}

impl Hash for Dataset {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.name.hash(state);
    }
}

impl fmt::Display for Dataset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Dataset(name={})", self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::collections::HashSet;

    #[test]
    fn test_dataset_properties() {
        let name = "LADAF-2020-27_spleen_complete-organ_25.08um_bm05";
        let d = Dataset::new(name, 25.08)
            .with_donor("LADAF-2020-27")
            .with_organ("spleen", None)
            .with_voi("complete-organ")
            .with_beamline("bm05");

        assert_eq!(d.name(), name);
        assert!(d.is_full_organ());
        assert!(!d.is_zoom());
        assert_eq!(
            d.to_string(),
            "Dataset(name=LADAF-2020-27_spleen_complete-organ_25.08um_bm05)"
        );
        assert_eq!(d.organ_label(), "spleen");
    }

    #[test]
    fn test_identity_by_name() {
        let a = Dataset::new("a", 1.0);
        let b = Dataset::new("a", 2.0).with_voi("VOI-01");
        assert_eq!(a, b);

        let set: HashSet<Dataset> = [a, b, Dataset::new("c", 1.0)].into_iter().collect();
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn test_organ_label_with_context() {
        let d = Dataset::new("x", 1.0).with_organ("lung", Some("upper_lobe"));
        assert_eq!(d.organ_label(), "lung_upper_lobe");
    }

    #[test]
    fn test_validate_voxel_size() {
        assert!(Dataset::new("ok", 2.5).validate().is_ok());
        assert!(Dataset::new("zero", 0.0).validate().is_err());
        assert!(Dataset::new("nan", f64::NAN).validate().is_err());
    }

    #[test]
    fn test_hint_to_transform_scales_by_voxel_size() {
        let source = Dataset::new("zoom", 6.5);
        let target = Dataset::new("overview", 26.0);
        let hint = RegistrationHint {
            source_dataset: "zoom".into(),
            target_dataset: "overview".into(),
            translation: [1.0, 2.0, 3.0],
            rotation: 0.0,
            scale: 0.25,
        };
        let t = hint.to_transform(&source, &target).unwrap();
        assert_relative_eq!(t.scale(), 1.0);
        assert_eq!(t.translation(), PhysicalCoordinate::new(26.0, 52.0, 78.0));
    }
}
