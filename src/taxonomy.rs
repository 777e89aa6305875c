//! Class catalog: the ordered label space shared by detection and fusion.
//!
//! The logit layout used everywhere in the predictor is
//! `[animal classes..., human, vehicle, empty]`: animal columns first, then
//! the two non-animal detector categories, then a trailing empty column that
//! holds either zero or the sentinel logit.

use crate::error::{Error, Result};

/// Label for the human class.
pub const HUMAN_LABEL: &str = "human";
/// Label for the vehicle class.
pub const VEHICLE_LABEL: &str = "vehicle";
/// Label for media with nothing detected.
pub const EMPTY_LABEL: &str = "empty";
/// Label reported when the fused score falls below the confidence threshold.
pub const UNDEFINED_LABEL: &str = "undefined";

/// Animal classes of the default classifier, in model output order.
const DEFAULT_SPECIES: &[&str] = &[
    "bison",
    "badger",
    "ibex",
    "beaver",
    "red deer",
    "chamois",
    "cat",
    "goat",
    "roe deer",
    "dog",
    "fallow deer",
    "squirrel",
    "moose",
    "equid",
    "genet",
    "wolverine",
    "hedgehog",
    "lagomorph",
    "wolf",
    "otter",
    "lynx",
    "marmot",
    "micromammal",
    "mouflon",
    "sheep",
    "mustelid",
    "bird",
    "bear",
    "nutria",
    "raccoon",
    "fox",
    "reindeer",
    "wild boar",
    "cow",
];

/// The ordered label space of a classification run.
///
/// Column indices are fixed for the lifetime of the catalog: animal classes
/// occupy `0..num_animal_classes()`, followed by human and vehicle, and the
/// logit rows carry one extra trailing empty column.
#[derive(Debug, Clone)]
pub struct ClassCatalog {
    animals: Vec<String>,
}

impl ClassCatalog {
    /// Create a catalog from an ordered animal class list.
    pub fn new(animals: Vec<String>) -> Self {
        Self { animals }
    }

    /// Catalog matching the default European species classifier.
    pub fn default_species() -> Self {
        Self::new(DEFAULT_SPECIES.iter().map(ToString::to_string).collect())
    }

    /// Single-class catalog for detector-only runs: every classified animal
    /// is labelled "animal".
    pub fn generic() -> Self {
        Self::new(vec!["animal".to_string()])
    }

    /// Number of animal classes.
    pub fn num_animal_classes(&self) -> usize {
        self.animals.len()
    }

    /// Total number of classes (animals + human + vehicle).
    pub fn num_classes(&self) -> usize {
        self.animals.len() + 2
    }

    /// Length of a logit row (classes plus the trailing empty column).
    pub fn row_len(&self) -> usize {
        self.num_classes() + 1
    }

    /// Column index of the human class.
    pub fn human_index(&self) -> usize {
        self.animals.len()
    }

    /// Column index of the vehicle class.
    pub fn vehicle_index(&self) -> usize {
        self.animals.len() + 1
    }

    /// Column index of the trailing empty column in a logit row.
    pub fn empty_index(&self) -> usize {
        self.row_len() - 1
    }

    /// Animal class names in model output order.
    pub fn animal_classes(&self) -> &[String] {
        &self.animals
    }

    /// Label for a class column (animal, human or vehicle).
    ///
    /// Returns the undefined label for out-of-range indices so a corrupt
    /// index never panics in display paths.
    pub fn label(&self, index: usize) -> &str {
        if index < self.animals.len() {
            &self.animals[index]
        } else if index == self.human_index() {
            HUMAN_LABEL
        } else if index == self.vehicle_index() {
            VEHICLE_LABEL
        } else {
            UNDEFINED_LABEL
        }
    }

    /// Resolve species names to animal column indices.
    ///
    /// Used to mark classes known absent from the study area as forbidden.
    /// Names must be animal classes; anything else is an error.
    pub fn resolve_species(&self, names: &[String]) -> Result<Vec<usize>> {
        names
            .iter()
            .map(|name| {
                self.animals
                    .iter()
                    .position(|a| a == name)
                    .ok_or_else(|| Error::UnknownSpecies { name: name.clone() })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_species_layout() {
        let catalog = ClassCatalog::default_species();
        assert_eq!(catalog.num_animal_classes(), 34);
        assert_eq!(catalog.num_classes(), 36);
        assert_eq!(catalog.row_len(), 37);
        assert_eq!(catalog.human_index(), 34);
        assert_eq!(catalog.vehicle_index(), 35);
        assert_eq!(catalog.empty_index(), 36);
    }

    #[test]
    fn test_label_lookup() {
        let catalog = ClassCatalog::default_species();
        assert_eq!(catalog.label(0), "bison");
        assert_eq!(catalog.label(30), "fox");
        assert_eq!(catalog.label(catalog.human_index()), HUMAN_LABEL);
        assert_eq!(catalog.label(catalog.vehicle_index()), VEHICLE_LABEL);
        assert_eq!(catalog.label(999), UNDEFINED_LABEL);
    }

    #[test]
    fn test_resolve_species() {
        let catalog = ClassCatalog::default_species();
        let indices = catalog
            .resolve_species(&["fox".to_string(), "badger".to_string()])
            .expect("known species");
        assert_eq!(indices, vec![30, 1]);
    }

    #[test]
    fn test_resolve_species_unknown() {
        let catalog = ClassCatalog::default_species();
        let err = catalog.resolve_species(&["unicorn".to_string()]);
        assert!(matches!(err, Err(Error::UnknownSpecies { .. })));
    }

    #[test]
    fn test_generic_catalog() {
        let catalog = ClassCatalog::generic();
        assert_eq!(catalog.num_animal_classes(), 1);
        assert_eq!(catalog.label(0), "animal");
        assert_eq!(catalog.human_index(), 1);
    }
}
