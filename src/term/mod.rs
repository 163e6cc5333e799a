//! Terms are the building blocks of the [`Ontology`](`crate::Ontology`)
//!
//! Each term describes one phenotypic abnormality and is a descendant
//! (child) of at least one other term (except for the root term
//! `HP:0000001 | All`). The relationship is modeled bi-directionally, so
//! every term also knows its children.
//!
//! Terms are identified by a unique [`TermId`]. Sets of term ids are
//! handled as [`TermGroup`]s, which guarantee uniqueness and a
//! deterministic iteration order.

use crate::Ontology;

mod group;
mod hpoterm;
pub(crate) mod internal;
mod termid;

pub use group::{TermGroup, TermIds};
pub use hpoterm::HpoTerm;
pub use termid::TermId;

/// A set of parent [`TermId`]s
pub type TermParents = TermGroup;

/// A set of child [`TermId`]s
pub type TermChildren = TermGroup;

/// Iterate [`HpoTerm`]s
///
/// This struct creates [`HpoTerm`]s from a reference to a [`TermGroup`]
pub struct HpoTerms<'a> {
    ontology: &'a Ontology,
    group: TermIds<'a>,
}

impl<'a> HpoTerms<'a> {
    /// Returns a new `HpoTerms` iterator
    #[must_use]
    pub fn new(group: &'a TermGroup, ontology: &'a Ontology) -> Self {
        HpoTerms {
            group: group.iter(),
            ontology,
        }
    }
}

impl<'a> Iterator for HpoTerms<'a> {
    type Item = HpoTerm<'a>;
    fn next(&mut self) -> Option<Self::Item> {
        match self.group.next() {
            Some(term) => {
                let term = self
                    .ontology
                    .get(term)
                    .unwrap_or_else(|| panic!("invalid term in group: {term}"));
                Some(HpoTerm::new(self.ontology, term))
            }
            None => None,
        }
    }
}
