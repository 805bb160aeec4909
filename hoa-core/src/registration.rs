//! Registration inventory.
//!
//! A registration maps physical points in one dataset on to the
//! corresponding physical points in another. The inventory stores
//! registrations as a directed graph keyed by dataset name; adding a
//! registration always adds the inverse edge too, so the graph is symmetric.
//!
//! Queries between datasets without a direct registration follow the
//! shortest chain of registrations (fewest hops). Neighbours are visited in
//! lexicographic name order, so when several shortest chains exist the
//! lexicographically smallest one is used.

use std::collections::{BTreeMap, BTreeSet, VecDeque};

use log::debug;

use crate::dataset::Dataset;
use crate::error::{Error, Result};
use crate::transform::SimilarityTransform;

type Edges = BTreeMap<String, SimilarityTransform>;

/// Inventory of transforms between datasets.
#[derive(Debug, Clone, Default)]
pub struct RegistrationInventory {
    graph: BTreeMap<String, Edges>,
}

impl RegistrationInventory {
    /// Creates an empty inventory.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a registration from `source` to `target`.
    ///
    /// The reverse registration is set to the inverse of `transform`. Any
    /// registration already defined between the two datasets is replaced.
    pub fn add_registration(
        &mut self,
        source: &Dataset,
        target: &Dataset,
        transform: SimilarityTransform,
    ) {
        self.add_registration_by_name(source.name(), target.name(), transform);
    }

    /// Same as [`add_registration`](Self::add_registration), keyed by name.
    pub fn add_registration_by_name(
        &mut self,
        source: &str,
        target: &str,
        transform: SimilarityTransform,
    ) {
        debug!("adding registration {source} -> {target}");
        let inverse = transform.inverse();
        self.graph
            .entry(source.to_owned())
            .or_default()
            .insert(target.to_owned(), transform);
        self.graph
            .entry(target.to_owned())
            .or_default()
            .insert(source.to_owned(), inverse);
    }

    /// Gets the transform mapping `source` on to `target`.
    ///
    /// If there is no direct registration, the transforms along the shortest
    /// chain of registrations are composed in chain order.
    ///
    /// # Errors
    /// Returns [`Error::NoRegistrationPath`] if the datasets are not connected.
    pub fn get_registration(
        &self,
        source: &Dataset,
        target: &Dataset,
    ) -> Result<SimilarityTransform> {
        self.get_registration_by_name(source.name(), target.name())
    }

    /// Same as [`get_registration`](Self::get_registration), keyed by name.
    ///
    /// # Errors
    /// Returns [`Error::NoRegistrationPath`] if the datasets are not connected.
    pub fn get_registration_by_name(&self, source: &str, target: &str) -> Result<SimilarityTransform> {
        if let Some(direct) = self.graph.get(source).and_then(|edges| edges.get(target)) {
            return Ok(*direct);
        }

        let path = self.path(source, target).ok_or_else(|| Error::NoRegistrationPath {
            source_dataset: source.to_owned(),
            target_dataset: target.to_owned(),
        })?;
        debug!("registration {source} -> {target} via {}", path.join(" -> "));

        let transforms: Vec<&SimilarityTransform> = path
            .windows(2)
            .filter_map(|pair| self.graph.get(&pair[0]).and_then(|edges| edges.get(&pair[1])))
            .collect();

        if transforms.len() == 1 {
            return Ok(*transforms[0]);
        }
        Ok(SimilarityTransform::compose(transforms))
    }

    /// Returns true if `source` can be mapped on to `target`.
    #[must_use]
    pub fn contains(&self, source: &Dataset, target: &Dataset) -> bool {
        self.contains_by_name(source.name(), target.name())
    }

    /// Same as [`contains`](Self::contains), keyed by name.
    #[must_use]
    pub fn contains_by_name(&self, source: &str, target: &str) -> bool {
        self.path(source, target).is_some()
    }

    /// Shortest chain of dataset names from `source` to `target`, inclusive.
    ///
    /// A dataset is always connected to itself, with a single-element path.
    #[must_use]
    pub fn path(&self, source: &str, target: &str) -> Option<Vec<String>> {
        if source == target {
            return Some(vec![source.to_owned()]);
        }
        self.graph.get(source)?;

        let mut previous: BTreeMap<&str, &str> = BTreeMap::new();
        let mut queue: VecDeque<&str> = VecDeque::from([source]);
        previous.insert(source, source);

        while let Some(node) = queue.pop_front() {
            let Some(edges) = self.graph.get(node) else {
                continue;
            };
            for neighbour in edges.keys() {
                let neighbour = neighbour.as_str();
                if previous.contains_key(neighbour) {
                    continue;
                }
                previous.insert(neighbour, node);
                if neighbour == target {
                    return Some(Self::unwind(&previous, source, target));
                }
                queue.push_back(neighbour);
            }
        }
        None
    }

    fn unwind<'a>(previous: &BTreeMap<&'a str, &'a str>, source: &str, target: &'a str) -> Vec<String> {
        let mut path = vec![target.to_owned()];
        let mut node = target;
        while node != source {
            node = previous[node];
            path.push(node.to_owned());
        }
        path.reverse();
        path
    }

    /// All datasets connected to `name` through registrations, including
    /// `name` itself.
    #[must_use]
    pub fn connected_component(&self, name: &str) -> BTreeSet<String> {
        let mut seen = BTreeSet::from([name.to_owned()]);
        let mut queue = VecDeque::from([name]);
        while let Some(node) = queue.pop_front() {
            let Some(edges) = self.graph.get(node) else {
                continue;
            };
            for neighbour in edges.keys() {
                if seen.insert(neighbour.clone()) {
                    queue.push_back(neighbour);
                }
            }
        }
        seen
    }

    /// Names of all datasets with at least one registration.
    pub fn datasets(&self) -> impl Iterator<Item = &str> {
        self.graph.keys().map(String::as_str)
    }

    /// Number of directed registrations, counting inverses.
    #[must_use]
    pub fn len(&self) -> usize {
        self.graph.values().map(BTreeMap::len).sum()
    }

    /// Returns true if there are no registrations.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.graph.is_empty()
    }

    /// Removes all registrations.
    pub fn clear(&mut self) {
        debug!("clearing {} registrations", self.len());
        self.graph.clear();
    }
}
