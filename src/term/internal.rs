use crate::term::{TermChildren, TermParents};
use crate::TermId;

/// The internal representation of an HPO term, owned by the ontology
///
/// Clients never interact with this type directly, they use the
/// [`HpoTerm`](`crate::HpoTerm`) view instead.
#[derive(Debug, Default, Clone)]
pub(crate) struct HpoTermInternal {
    id: TermId,
    name: String,
    parents: TermParents,
    all_parents: TermParents,
    children: TermChildren,
    obsolete: bool,
    replacement: Option<TermId>,
}

impl HpoTermInternal {
    pub fn new(name: String, id: TermId) -> HpoTermInternal {
        HpoTermInternal {
            id,
            name,
            parents: TermParents::default(),
            all_parents: TermParents::default(),
            children: TermChildren::default(),
            obsolete: false,
            replacement: None,
        }
    }

    pub fn id(&self) -> &TermId {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn parents(&self) -> &TermParents {
        &self.parents
    }

    pub fn all_parents(&self) -> &TermParents {
        &self.all_parents
    }

    pub fn all_parents_mut(&mut self) -> &mut TermParents {
        &mut self.all_parents
    }

    pub fn children(&self) -> &TermChildren {
        &self.children
    }

    pub fn obsolete(&self) -> bool {
        self.obsolete
    }

    pub fn obsolete_mut(&mut self) -> &mut bool {
        &mut self.obsolete
    }

    pub fn replacement(&self) -> Option<TermId> {
        self.replacement
    }

    pub fn replacement_mut(&mut self) -> &mut Option<TermId> {
        &mut self.replacement
    }

    /// Returns `true` if the `all_parents` cache of the term is filled
    ///
    /// Terms without parents (the root and obsolete terms) are
    /// considered cached from the start.
    pub fn parents_cached(&self) -> bool {
        if self.parents.is_empty() {
            true
        } else {
            !self.all_parents.is_empty()
        }
    }

    pub fn add_parent<I: Into<TermId>>(&mut self, parent_id: I) {
        self.parents.insert(parent_id.into());
    }

    pub fn add_child<I: Into<TermId>>(&mut self, child_id: I) {
        self.children.insert(child_id.into());
    }
}

impl PartialEq for HpoTermInternal {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for HpoTermInternal {}
