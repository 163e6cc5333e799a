use std::collections::btree_map::Entry;
use std::collections::BTreeMap;
use std::fmt::Display;

use serde::{de, Deserialize, Deserializer, Serialize, Serializer};

use crate::term::TermGroup;
use crate::TermId;
use crate::{LiricalError, LiricalResult};

/// Smallest accepted annotation frequency
///
/// Source data occasionally carries `0.0` or negative frequencies;
/// those are lifted to this value so every annotation stays in `(0, 1]`.
const MIN_FREQUENCY: f64 = 1e-9;

/// The database a disease record originates from
#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub enum DiseaseDb {
    Omim,
    Decipher,
    Orpha,
}

impl DiseaseDb {
    fn prefix(self) -> &'static str {
        match self {
            DiseaseDb::Omim => "OMIM",
            DiseaseDb::Decipher => "DECIPHER",
            DiseaseDb::Orpha => "ORPHA",
        }
    }
}

impl Display for DiseaseDb {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.prefix())
    }
}

/// A unique identifier of a disease, e.g. `OMIM:103100`
///
/// The id combines the source database with the numerical id within
/// that database. `DiseaseId`s order by database first, then by number,
/// which gives every iteration over diseases in this crate a stable,
/// platform-independent order.
#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub struct DiseaseId {
    db: DiseaseDb,
    id: u32,
}

impl DiseaseId {
    /// Creates a new `DiseaseId` from a database and a numerical id
    pub const fn new(db: DiseaseDb, id: u32) -> Self {
        DiseaseId { db, id }
    }

    /// Returns the source database of the disease
    pub fn db(&self) -> DiseaseDb {
        self.db
    }

    /// Returns the numerical part of the id
    pub fn id(&self) -> u32 {
        self.id
    }
}

impl TryFrom<&str> for DiseaseId {
    type Error = LiricalError;

    fn try_from(value: &str) -> LiricalResult<Self> {
        let err = || LiricalError::InvalidDiseaseId(value.to_string());
        let (prefix, id) = value.split_once(':').ok_or_else(err)?;
        let db = match prefix {
            "OMIM" => DiseaseDb::Omim,
            "DECIPHER" => DiseaseDb::Decipher,
            "ORPHA" => DiseaseDb::Orpha,
            _ => return Err(err()),
        };
        let id = id.parse::<u32>().map_err(|_| err())?;
        Ok(DiseaseId { db, id })
    }
}

impl Display for DiseaseId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.db, self.id)
    }
}

impl Serialize for DiseaseId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for DiseaseId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        DiseaseId::try_from(s.as_str()).map_err(de::Error::custom)
    }
}

/// A single phenotype annotation of a disease
///
/// Combines the annotated term with the frequency of the abnormality
/// among patients with the disease.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct HpoAnnotation {
    term_id: TermId,
    frequency: f64,
}

impl HpoAnnotation {
    /// Creates a new annotation
    ///
    /// Annotations without a frequency in the source data describe
    /// obligate features, so a missing frequency defaults to `1.0`.
    pub fn new<I: Into<TermId>>(term_id: I, frequency: Option<f64>) -> Self {
        HpoAnnotation {
            term_id: term_id.into(),
            frequency: frequency.unwrap_or(1.0).clamp(MIN_FREQUENCY, 1.0),
        }
    }

    /// Returns the annotated [`TermId`]
    pub fn term_id(&self) -> TermId {
        self.term_id
    }

    /// Returns the frequency of the abnormality in the disease, in `(0, 1]`
    pub fn frequency(&self) -> f64 {
        self.frequency
    }
}

/// A disease record of the corpus
///
/// Carries the positive phenotype annotations (with frequencies), the
/// explicitly negated ("NOT") annotations and the terms describing the
/// modes of inheritance. Built once by the [`DiseaseStoreBuilder`] and
/// never mutated afterwards.
#[derive(Clone, Debug)]
pub struct HpoDisease {
    id: DiseaseId,
    name: String,
    annotations: Vec<HpoAnnotation>,
    negative: TermGroup,
    inheritance_modes: TermGroup,
}

impl HpoDisease {
    pub(crate) fn new(
        id: DiseaseId,
        name: &str,
        annotations: Vec<HpoAnnotation>,
        negative: TermGroup,
        inheritance_modes: TermGroup,
    ) -> Self {
        HpoDisease {
            id,
            name: name.to_string(),
            annotations,
            negative,
            inheritance_modes,
        }
    }

    /// Returns the unique [`DiseaseId`] of the disease
    pub fn id(&self) -> &DiseaseId {
        &self.id
    }

    /// Returns the disease name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the positive phenotype annotations
    pub fn annotations(&self) -> &[HpoAnnotation] {
        &self.annotations
    }

    /// Returns the explicitly negated terms
    pub fn negative_annotations(&self) -> &TermGroup {
        &self.negative
    }

    /// Returns the mode-of-inheritance terms
    pub fn inheritance_modes(&self) -> &TermGroup {
        &self.inheritance_modes
    }

    /// Returns the annotation of the given term, if the disease is
    /// directly annotated to it
    pub fn annotation(&self, term_id: TermId) -> Option<&HpoAnnotation> {
        self.annotations
            .iter()
            .find(|annotation| annotation.term_id() == term_id)
    }

    /// Returns `true` if the term appears in the positive annotations
    pub fn is_directly_annotated_to(&self, term_id: TermId) -> bool {
        self.annotation(term_id).is_some()
    }

    /// Returns the frequency of the term in the disease, if directly annotated
    pub fn frequency_of(&self, term_id: TermId) -> Option<f64> {
        self.annotation(term_id).map(HpoAnnotation::frequency)
    }
}

impl PartialEq for HpoDisease {
    fn eq(&self, other: &HpoDisease) -> bool {
        self.id == other.id
    }
}

impl Eq for HpoDisease {}

/// The immutable disease corpus
///
/// Diseases are kept in a `BTreeMap`, so iteration always runs in
/// [`DiseaseId`] order.
#[derive(Debug)]
pub struct DiseaseStore {
    diseases: BTreeMap<DiseaseId, HpoDisease>,
}

impl DiseaseStore {
    /// Returns a builder to assemble a `DiseaseStore`
    pub fn builder() -> DiseaseStoreBuilder {
        DiseaseStoreBuilder::default()
    }

    /// Returns the disease with the given id
    pub fn get(&self, id: &DiseaseId) -> Option<&HpoDisease> {
        self.diseases.get(id)
    }

    /// Returns the number of diseases in the store
    pub fn len(&self) -> usize {
        self.diseases.len()
    }

    /// Returns `true` if the store does not contain any disease
    pub fn is_empty(&self) -> bool {
        self.diseases.is_empty()
    }

    /// Iterates all diseases in [`DiseaseId`] order
    pub fn iter(&self) -> impl Iterator<Item = &HpoDisease> {
        self.diseases.values()
    }

    /// Iterates all disease ids in order
    pub fn ids(&self) -> impl Iterator<Item = &DiseaseId> {
        self.diseases.keys()
    }
}

/// Collects disease records and freezes them into a [`DiseaseStore`]
///
/// Only diseases from the retained databases are kept. OMIM and DECIPHER
/// are retained by default, Orphanet is opt-in through
/// [`DiseaseStoreBuilder::with_orpha`].
pub struct DiseaseStoreBuilder {
    retained: Vec<DiseaseDb>,
    diseases: BTreeMap<DiseaseId, HpoDisease>,
}

impl Default for DiseaseStoreBuilder {
    fn default() -> Self {
        DiseaseStoreBuilder {
            retained: vec![DiseaseDb::Omim, DiseaseDb::Decipher],
            diseases: BTreeMap::new(),
        }
    }
}

impl DiseaseStoreBuilder {
    /// Also retain Orphanet diseases
    #[must_use]
    pub fn with_orpha(mut self) -> Self {
        if !self.retained.contains(&DiseaseDb::Orpha) {
            self.retained.push(DiseaseDb::Orpha);
        }
        self
    }

    /// Adds a disease record
    ///
    /// Records from non-retained databases are dropped. Duplicate
    /// annotations of one term are collapsed, keeping the maximum
    /// frequency. Calling this twice with the same id merges the
    /// records.
    pub fn add_disease(
        &mut self,
        id: DiseaseId,
        name: &str,
        annotations: Vec<HpoAnnotation>,
        negative: TermGroup,
        inheritance_modes: TermGroup,
    ) {
        if !self.retained.contains(&id.db()) {
            return;
        }
        match self.diseases.entry(id) {
            Entry::Vacant(entry) => {
                entry.insert(HpoDisease::new(
                    id,
                    name,
                    collapse(annotations),
                    negative,
                    inheritance_modes,
                ));
            }
            Entry::Occupied(mut entry) => {
                let disease = entry.get_mut();
                let mut merged = disease.annotations.clone();
                merged.extend(annotations);
                disease.annotations = collapse(merged);
                let negative = &disease.negative | &negative;
                disease.negative = negative;
                let inheritance_modes = &disease.inheritance_modes | &inheritance_modes;
                disease.inheritance_modes = inheritance_modes;
            }
        }
    }

    /// Freezes the collected records into a [`DiseaseStore`]
    ///
    /// # Errors
    ///
    /// [`LiricalError::EmptyDiseaseStore`] if no disease was retained
    pub fn build(self) -> LiricalResult<DiseaseStore> {
        if self.diseases.is_empty() {
            return Err(LiricalError::EmptyDiseaseStore);
        }
        Ok(DiseaseStore {
            diseases: self.diseases,
        })
    }
}

/// Collapses duplicate term annotations, keeping the maximum frequency
///
/// The result is sorted by term id.
pub(crate) fn collapse(annotations: Vec<HpoAnnotation>) -> Vec<HpoAnnotation> {
    let mut by_term: BTreeMap<TermId, f64> = BTreeMap::new();
    for annotation in annotations {
        by_term
            .entry(annotation.term_id())
            .and_modify(|freq| *freq = freq.max(annotation.frequency()))
            .or_insert_with(|| annotation.frequency());
    }
    by_term
        .into_iter()
        .map(|(term_id, frequency)| HpoAnnotation::new(term_id, Some(frequency)))
        .collect()
}
