//! The [`Ontology`] holds all terms and their `is-a` relationships
//!
//! It is built once from collaborator-parsed data (terms, edges and the
//! obsolescence table) through the [`OntologyBuilder`] and is never
//! mutated afterwards, so concurrent readers need no synchronization.

use std::collections::hash_map::Values;
use std::collections::HashMap;

use crate::term::internal::HpoTermInternal;
use crate::term::{HpoTerm, TermGroup};
use crate::TermId;
use crate::{LiricalError, LiricalResult};

/// Upper bound when following `replaced_by` chains of obsolete terms
const MAX_REPLACEMENT_CHAIN: usize = 10;

/// The ontology index
///
/// Owns all terms and answers ancestor, descendant and subclass queries.
///
/// # Examples
///
/// ```
/// use lirical::{Ontology, TermId};
///
/// let mut builder = Ontology::builder();
/// builder.insert_term("All", 1u32);
/// builder.insert_term("Phenotypic abnormality", 118u32);
/// builder.insert_term("Arachnodactyly", 1166u32);
/// builder.add_parent(1u32, 118u32);
/// builder.add_parent(118u32, 1166u32);
///
/// let ontology = builder.build().unwrap();
///
/// assert_eq!(ontology.len(), 3);
/// assert_eq!(ontology.root(), TermId::from_u32(1));
/// assert!(ontology.is_subclass(1166u32.into(), 118u32.into()));
/// assert!(!ontology.is_subclass(118u32.into(), 1166u32.into()));
/// ```
pub struct Ontology {
    terms: HashMap<TermId, HpoTermInternal>,
    alt_ids: HashMap<TermId, TermId>,
    root: TermId,
}

impl std::fmt::Debug for Ontology {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Ontology with {} terms", self.terms.len())
    }
}

impl Ontology {
    /// Returns a builder to construct an `Ontology` from collaborator data
    pub fn builder() -> OntologyBuilder {
        OntologyBuilder::default()
    }

    /// Returns the number of terms in the ontology
    pub fn len(&self) -> usize {
        self.terms.len()
    }

    /// Returns `true` if the ontology does not contain any terms
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the root term id of the ontology
    pub fn root(&self) -> TermId {
        self.root
    }

    /// Returns the [`HpoTerm`] of the provided [`TermId`]
    ///
    /// If no such term is present, `None` is returned
    pub fn hpo<I: Into<TermId>>(&self, term_id: I) -> Option<HpoTerm<'_>> {
        HpoTerm::try_new(self, term_id).ok()
    }

    /// Returns an iterator of all [`HpoTerm`]s of the ontology
    pub fn hpos(&self) -> OntologyIterator<'_> {
        OntologyIterator {
            inner: self.terms.values(),
            ontology: self,
        }
    }

    /// Resolves a term id to its primary (canonical) id
    ///
    /// Alternative ids are mapped onto their primary term and
    /// `replaced_by` chains of obsolete terms are followed until a
    /// non-obsolete term is reached. Ids that cannot be resolved to a
    /// non-obsolete term return `None`.
    pub fn primary_id(&self, term_id: TermId) -> Option<TermId> {
        let mut id = *self.alt_ids.get(&term_id).unwrap_or(&term_id);
        for _ in 0..MAX_REPLACEMENT_CHAIN {
            let term = self.terms.get(&id)?;
            if !term.obsolete() {
                return Some(id);
            }
            id = term.replacement()?;
        }
        None
    }

    /// Returns all ancestors of the term (transitive closure of `is-a`)
    ///
    /// With `include_self` the term itself is part of the returned group,
    /// satisfying `ancestors(t, true) ⊇ {t}`.
    pub fn ancestors(&self, term_id: TermId, include_self: bool) -> Option<TermGroup> {
        let term = self.terms.get(&term_id)?;
        let mut group = term.all_parents().clone();
        if include_self {
            group.insert(term_id);
        }
        Some(group)
    }

    /// Returns all descendants of the term
    pub fn descendants(&self, term_id: TermId, include_self: bool) -> Option<TermGroup> {
        let term = self.terms.get(&term_id)?;
        let mut group = TermGroup::new();
        if include_self {
            group.insert(term_id);
        }
        let mut stack: Vec<TermId> = term.children().iter().collect();
        while let Some(id) = stack.pop() {
            if group.insert(id) {
                let child = self
                    .terms
                    .get(&id)
                    .expect("child ids reference ontology terms");
                stack.extend(child.children().iter());
            }
        }
        Some(group)
    }

    /// Returns the direct parents of the term
    pub fn parents(&self, term_id: TermId) -> Option<&TermGroup> {
        self.terms.get(&term_id).map(HpoTermInternal::parents)
    }

    /// Returns the direct children of the term
    pub fn children(&self, term_id: TermId) -> Option<&TermGroup> {
        self.terms.get(&term_id).map(HpoTermInternal::children)
    }

    /// Returns `true` if `sub` is a subclass of `ancestor`
    ///
    /// Defined as `ancestor ∈ ancestors(sub, true)`, so every term is a
    /// subclass of itself. Unknown terms are not a subclass of anything.
    pub fn is_subclass(&self, sub: TermId, ancestor: TermId) -> bool {
        self.terms
            .get(&sub)
            .is_some_and(|term| sub == ancestor || term.all_parents().contains(&ancestor))
    }

    /// Returns the union of the ancestors of all terms in the iterator
    ///
    /// Terms unknown to the ontology are skipped.
    pub fn all_ancestors_of_set<I>(&self, terms: I, include_self: bool) -> TermGroup
    where
        I: IntoIterator<Item = TermId>,
    {
        let mut res = TermGroup::new();
        for id in terms {
            if let Some(ancestors) = self.ancestors(id, include_self) {
                res = &res | &ancestors;
            }
        }
        res
    }

    pub(crate) fn get<I: Into<TermId>>(&self, term_id: I) -> Option<&HpoTermInternal> {
        self.terms.get(&term_id.into())
    }
}

/// Iterates all [`HpoTerm`]s of an [`Ontology`]
pub struct OntologyIterator<'a> {
    inner: Values<'a, TermId, HpoTermInternal>,
    ontology: &'a Ontology,
}

impl<'a> Iterator for OntologyIterator<'a> {
    type Item = HpoTerm<'a>;
    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|term| HpoTerm::new(self.ontology, term))
    }
}

impl<'a> IntoIterator for &'a Ontology {
    type Item = HpoTerm<'a>;
    type IntoIter = OntologyIterator<'a>;
    fn into_iter(self) -> Self::IntoIter {
        self.hpos()
    }
}

/// Collects terms, edges and obsolescence data and freezes them into an
/// [`Ontology`]
///
/// The builder does not interpret any file format. Collaborators parse
/// `hp.obo` (or similar sources) and forward plain term and edge lists.
#[derive(Default)]
pub struct OntologyBuilder {
    terms: HashMap<TermId, HpoTermInternal>,
    alt_ids: HashMap<TermId, TermId>,
    edges: Vec<(TermId, TermId)>,
}

impl OntologyBuilder {
    /// Adds a term to the ontology
    ///
    /// Inserting the same id twice replaces the earlier term.
    pub fn insert_term<I: Into<TermId>>(&mut self, name: &str, id: I) {
        let id = id.into();
        self.terms
            .insert(id, HpoTermInternal::new(name.to_string(), id));
    }

    /// Adds an obsolete term with an optional `replaced_by` pointer
    pub fn insert_obsolete<I: Into<TermId>>(
        &mut self,
        name: &str,
        id: I,
        replaced_by: Option<TermId>,
    ) {
        let id = id.into();
        let mut term = HpoTermInternal::new(name.to_string(), id);
        *term.obsolete_mut() = true;
        *term.replacement_mut() = replaced_by;
        self.terms.insert(id, term);
    }

    /// Registers an alternative id for a primary term
    pub fn add_alt_id<I: Into<TermId>, J: Into<TermId>>(&mut self, alt: I, primary: J) {
        self.alt_ids.insert(alt.into(), primary.into());
    }

    /// Records an `is-a` edge between a parent and a child term
    ///
    /// Both terms must have been inserted before [`OntologyBuilder::build`]
    /// is called; the edge order itself does not matter.
    pub fn add_parent<I: Into<TermId>, J: Into<TermId>>(&mut self, parent_id: I, child_id: J) {
        self.edges.push((parent_id.into(), child_id.into()));
    }

    /// Validates the collected data and freezes it into an [`Ontology`]
    ///
    /// This connects all terms, fills the transitive `all_parents` cache
    /// and determines the root term.
    ///
    /// # Errors
    ///
    /// - [`LiricalError::UnknownTerm`] if an edge or alt-id references a
    ///   term that was never inserted
    /// - [`LiricalError::CyclicOntology`] if the edges do not form a DAG
    /// - [`LiricalError::NoRoot`] unless exactly one non-obsolete term
    ///   has no parents
    pub fn build(mut self) -> LiricalResult<Ontology> {
        for &(parent_id, child_id) in &self.edges {
            if !self.terms.contains_key(&parent_id) {
                return Err(LiricalError::UnknownTerm(parent_id));
            }
            if !self.terms.contains_key(&child_id) {
                return Err(LiricalError::UnknownTerm(child_id));
            }
        }
        for &(parent_id, child_id) in &self.edges {
            self.terms
                .get_mut(&parent_id)
                .expect("edge endpoints are validated")
                .add_child(child_id);
            self.terms
                .get_mut(&child_id)
                .expect("edge endpoints are validated")
                .add_parent(parent_id);
        }
        for (&alt, &primary) in &self.alt_ids {
            if self.terms.contains_key(&alt) {
                return Err(LiricalError::InvalidTermId(format!(
                    "alt id clashes with an existing term: {alt}"
                )));
            }
            if !self.terms.contains_key(&primary) {
                return Err(LiricalError::UnknownTerm(primary));
            }
        }

        self.create_cache()?;

        let mut roots: Vec<TermId> = self
            .terms
            .values()
            .filter(|term| !term.obsolete() && term.parents().is_empty())
            .map(|term| *term.id())
            .collect();
        if roots.len() != 1 {
            return Err(LiricalError::NoRoot);
        }
        let root = roots.pop().expect("exactly one root is present");

        Ok(Ontology {
            terms: self.terms,
            alt_ids: self.alt_ids,
            root,
        })
    }

    /// Fills the `all_parents` cache of every term
    ///
    /// Terms are processed in topological order (parents before their
    /// children), so each term only merges the already-complete closures
    /// of its direct parents. Terms left unprocessed afterwards sit on a
    /// cycle.
    fn create_cache(&mut self) -> LiricalResult<()> {
        let mut pending: HashMap<TermId, usize> = HashMap::new();
        let mut queue: Vec<TermId> = Vec::new();
        for term in self.terms.values() {
            let n_parents = term.parents().len();
            if n_parents == 0 {
                queue.push(*term.id());
            } else {
                pending.insert(*term.id(), n_parents);
            }
        }

        let mut processed = 0usize;
        while let Some(id) = queue.pop() {
            processed += 1;

            let term = self
                .terms
                .get(&id)
                .expect("queued ids originate from the term map");
            let parents = term.parents().clone();
            let children = term.children().clone();

            let mut all_parents = TermGroup::with_capacity(parents.len() * 4);
            for parent in &parents {
                all_parents.insert(parent);
                let parent_term = self
                    .terms
                    .get(&parent)
                    .expect("parent ids reference ontology terms");
                all_parents.extend(parent_term.all_parents().iter());
            }
            *self
                .terms
                .get_mut(&id)
                .expect("queued ids originate from the term map")
                .all_parents_mut() = all_parents;

            for child in &children {
                let missing = pending
                    .get_mut(&child)
                    .expect("every child has a pending parent count");
                *missing -= 1;
                if *missing == 0 {
                    pending.remove(&child);
                    queue.push(child);
                }
            }
        }

        if processed < self.terms.len() {
            let cyclic = pending
                .keys()
                .min()
                .copied()
                .expect("unprocessed terms remain on a cycle");
            return Err(LiricalError::CyclicOntology(cyclic));
        }
        Ok(())
    }
}
