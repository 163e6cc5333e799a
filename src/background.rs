//! Corpus-wide background frequency of every phenotype term
//!
//! The background frequency of a term estimates the probability of the
//! feature being reported for a patient with *some* disease of the
//! corpus. It is the denominator of every phenotype likelihood ratio.

use std::collections::BTreeMap;

use tracing::{debug, warn};

use crate::annotations::DiseaseStore;
use crate::term::TermGroup;
use crate::LiricalResult;
use crate::Ontology;
use crate::TermId;

/// Background probability assumed for terms without any annotation data
///
/// Also the lower floor of every background frequency read.
pub const DEFAULT_BACKGROUND_PROB: f64 = 1e-4;

/// Mapping of every non-obsolete term to its background frequency
///
/// Built once by upward annotation propagation over the whole disease
/// corpus: within one disease every term of the annotation ancestor
/// closure receives the maximum annotation frequency (so sibling
/// annotations are not double counted), the per-disease values are
/// summed and finally divided by the number of diseases.
#[derive(Debug, PartialEq)]
pub struct BackgroundFrequency {
    frequencies: BTreeMap<TermId, f64>,
    n_diseases: usize,
}

impl BackgroundFrequency {
    /// Builds the background frequency table for a disease corpus
    ///
    /// Annotation term ids are resolved to primary ids first; terms
    /// unknown to the ontology are skipped.
    pub fn new(ontology: &Ontology, diseases: &DiseaseStore) -> LiricalResult<Self> {
        let mut raw: BTreeMap<TermId, f64> = ontology
            .hpos()
            .filter(|term| !term.is_obsolete())
            .map(|term| (term.id(), 0.0))
            .collect();

        for disease in diseases.iter() {
            // maximum frequency per ancestor within this single disease
            let mut update: BTreeMap<TermId, f64> = BTreeMap::new();
            for annotation in disease.annotations() {
                let Some(primary) = ontology.primary_id(annotation.term_id()) else {
                    warn!(
                        "skipping annotation of {} to unknown term {}",
                        disease.id(),
                        annotation.term_id()
                    );
                    continue;
                };
                let ancestors: TermGroup = ontology
                    .ancestors(primary, true)
                    .expect("primary ids resolve to ontology terms");
                for ancestor in &ancestors {
                    update
                        .entry(ancestor)
                        .and_modify(|freq| *freq = freq.max(annotation.frequency()))
                        .or_insert_with(|| annotation.frequency());
                }
            }
            for (term_id, freq) in update {
                *raw.entry(term_id).or_insert(0.0) += freq;
            }
        }

        let n_diseases = diseases.len();
        for freq in raw.values_mut() {
            *freq /= n_diseases as f64;
        }
        debug!(
            "calculated background frequencies for {} terms over {} diseases",
            raw.len(),
            n_diseases
        );

        Ok(BackgroundFrequency {
            frequencies: raw,
            n_diseases,
        })
    }

    /// Returns the background frequency of the term
    ///
    /// The result is floored at [`DEFAULT_BACKGROUND_PROB`]; terms
    /// without an entry return the floor itself.
    pub fn frequency(&self, term_id: TermId) -> f64 {
        DEFAULT_BACKGROUND_PROB.max(
            self.frequencies
                .get(&term_id)
                .copied()
                .unwrap_or(DEFAULT_BACKGROUND_PROB),
        )
    }

    /// Returns the unfloored background frequency of the term
    pub fn raw_frequency(&self, term_id: TermId) -> Option<f64> {
        self.frequencies.get(&term_id).copied()
    }

    /// Returns the number of diseases the table was built from
    pub fn n_diseases(&self) -> usize {
        self.n_diseases
    }

    /// Returns the number of terms with a background frequency
    pub fn len(&self) -> usize {
        self.frequencies.len()
    }

    /// Returns `true` if the table is empty
    pub fn is_empty(&self) -> bool {
        self.frequencies.is_empty()
    }
}
