use crate::term::internal::HpoTermInternal;
use crate::term::{HpoTerms, TermGroup};
use crate::Ontology;
use crate::TermId;
use crate::{LiricalError, LiricalResult};

/// A single term of the ontology
///
/// The term is a lightweight view into the [`Ontology`], holding
/// references to the name and the cached relationship data.
#[derive(Debug, Clone, Copy)]
pub struct HpoTerm<'a> {
    id: &'a TermId,
    name: &'a str,
    parents: &'a TermGroup,
    all_parents: &'a TermGroup,
    children: &'a TermGroup,
    obsolete: bool,
    replaced_by: Option<TermId>,
    ontology: &'a Ontology,
}

impl<'a> HpoTerm<'a> {
    /// Constructs an `HpoTerm` for the given [`TermId`]
    ///
    /// Prefer [`Ontology::hpo`] which returns an `Option` instead.
    ///
    /// # Errors
    ///
    /// If the id does not match an existing term
    pub fn try_new<I: Into<TermId>>(ontology: &'a Ontology, term: I) -> LiricalResult<HpoTerm<'a>> {
        let id = term.into();
        let term = ontology.get(id).ok_or(LiricalError::UnknownTerm(id))?;
        Ok(HpoTerm::new(ontology, term))
    }

    pub(crate) fn new(ontology: &'a Ontology, term: &'a HpoTermInternal) -> HpoTerm<'a> {
        HpoTerm {
            id: term.id(),
            name: term.name(),
            parents: term.parents(),
            all_parents: term.all_parents(),
            children: term.children(),
            obsolete: term.obsolete(),
            replaced_by: term.replacement(),
            ontology,
        }
    }

    /// Returns the [`TermId`] of the term, e.g. `HP:0001265`
    pub fn id(&self) -> TermId {
        *self.id
    }

    /// Returns the name of the term, e.g. `Hyporeflexia`
    pub fn name(&self) -> &str {
        self.name
    }

    /// Returns the [`TermId`]s of the direct parents
    pub fn parent_ids(&self) -> &TermGroup {
        self.parents
    }

    /// Returns an iterator of the direct parents of the term
    pub fn parents(&self) -> HpoTerms<'a> {
        HpoTerms::new(self.parents, self.ontology)
    }

    /// Returns the [`TermId`]s of all direct and indirect parents
    ///
    /// The term itself is not part of the group.
    pub fn all_parent_ids(&self) -> &TermGroup {
        self.all_parents
    }

    /// Returns an iterator of all direct and indirect parents of the term
    pub fn all_parents(&self) -> HpoTerms<'a> {
        HpoTerms::new(self.all_parents, self.ontology)
    }

    /// Returns the [`TermId`]s of the direct children
    pub fn children_ids(&self) -> &TermGroup {
        self.children
    }

    /// Returns an iterator of the direct children of the term
    pub fn children(&self) -> HpoTerms<'a> {
        HpoTerms::new(self.children, self.ontology)
    }

    /// Returns `true` if the term is flagged as obsolete
    pub fn is_obsolete(&self) -> bool {
        self.obsolete
    }

    /// Returns the replacement term id of an obsolete term, if any
    pub fn replaced_by(&self) -> Option<TermId> {
        self.replaced_by
    }

    /// Returns `true` if `self` is a direct or indirect parent of `other`
    pub fn parent_of(&self, other: &HpoTerm) -> bool {
        other.all_parent_ids().contains(&self.id())
    }

    /// Returns `true` if `self` is a direct or indirect child of `other`
    pub fn child_of(&self, other: &HpoTerm) -> bool {
        self.all_parent_ids().contains(&other.id())
    }
}

impl PartialEq for HpoTerm<'_> {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for HpoTerm<'_> {}
