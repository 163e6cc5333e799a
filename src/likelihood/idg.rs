use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use tracing::warn;

use crate::annotations::{collapse, DiseaseId, HpoAnnotation, HpoDisease};
use crate::likelihood::PHENOTYPIC_ABNORMALITY;
use crate::term::TermGroup;
use crate::Ontology;
use crate::TermId;

/// The highest-frequency annotated descendant recorded for an ancestor
/// term in the [`InducedDiseaseGraph`]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnnotatedAncestor {
    annotated: TermId,
    frequency: f64,
}

impl AnnotatedAncestor {
    /// Returns the annotated term the frequency belongs to
    pub fn annotated(&self) -> TermId {
        self.annotated
    }

    /// Returns the frequency of the annotated term in the disease
    pub fn frequency(&self) -> f64 {
        self.frequency
    }
}

/// Per-disease precomputation for the phenotype likelihood ratio
///
/// The graph carries a normalized copy of the disease (annotation and
/// negation ids resolved to primary ids), the ancestor closure of all
/// positive annotations, and a lookup from every non-root ancestor to
/// the closest annotated term below it. The value is a pure function of
/// disease and ontology, so concurrently built duplicates are
/// interchangeable.
#[derive(Debug)]
pub struct InducedDiseaseGraph {
    disease: HpoDisease,
    positive_closure: TermGroup,
    annotated_ancestors: HashMap<TermId, AnnotatedAncestor>,
}

impl InducedDiseaseGraph {
    /// Builds the induced graph for a disease
    ///
    /// Annotation terms unknown to the ontology are dropped with a
    /// warning; the likelihood ratio then works on the remaining
    /// annotations.
    pub fn new(disease: &HpoDisease, ontology: &Ontology) -> Self {
        let mut annotations: Vec<HpoAnnotation> = Vec::with_capacity(disease.annotations().len());
        for annotation in disease.annotations() {
            match ontology.primary_id(annotation.term_id()) {
                Some(primary) => {
                    annotations.push(HpoAnnotation::new(primary, Some(annotation.frequency())));
                }
                None => warn!(
                    "skipping annotation of {} to unknown term {}",
                    disease.id(),
                    annotation.term_id()
                ),
            }
        }
        let annotations = collapse(annotations);

        let mut negative = TermGroup::new();
        for term_id in disease.negative_annotations() {
            match ontology.primary_id(term_id) {
                Some(primary) => {
                    negative.insert(primary);
                }
                None => warn!(
                    "skipping negated annotation of {} to unknown term {}",
                    disease.id(),
                    term_id
                ),
            }
        }

        let root_terms = root_exclusion_set(ontology);
        let mut positive_closure = TermGroup::new();
        let mut annotated_ancestors: HashMap<TermId, AnnotatedAncestor> = HashMap::new();
        for annotation in &annotations {
            let ancestors = ontology
                .ancestors(annotation.term_id(), true)
                .expect("primary ids resolve to ontology terms");
            positive_closure = &positive_closure | &ancestors;
            for ancestor in &ancestors {
                if root_terms.contains(&ancestor) {
                    continue;
                }
                annotated_ancestors
                    .entry(ancestor)
                    .and_modify(|entry| {
                        if annotation.frequency() > entry.frequency {
                            *entry = AnnotatedAncestor {
                                annotated: annotation.term_id(),
                                frequency: annotation.frequency(),
                            };
                        }
                    })
                    .or_insert(AnnotatedAncestor {
                        annotated: annotation.term_id(),
                        frequency: annotation.frequency(),
                    });
            }
        }

        let disease = HpoDisease::new(
            *disease.id(),
            disease.name(),
            annotations,
            negative,
            disease.inheritance_modes().clone(),
        );

        InducedDiseaseGraph {
            disease,
            positive_closure,
            annotated_ancestors,
        }
    }

    /// Returns the normalized disease the graph was built for
    pub fn disease(&self) -> &HpoDisease {
        &self.disease
    }

    /// Returns the ancestor closure of all positive annotations
    pub fn positive_closure(&self) -> &TermGroup {
        &self.positive_closure
    }

    /// Returns `true` if the disease is annotated to the term directly
    /// or through a descendant
    pub fn is_in_positive_closure(&self, term_id: TermId) -> bool {
        self.positive_closure.contains(&term_id)
    }

    /// Returns `true` if the term is explicitly negated in the disease
    pub fn is_exact_excluded_match(&self, term_id: TermId) -> bool {
        self.disease.negative_annotations().contains(&term_id)
    }

    /// Finds the most specific non-root ancestor of `query` that is also
    /// an ancestor of an annotated term
    ///
    /// The search walks upwards level by level; the first level with a
    /// hit wins. Within one level the entry with the highest frequency
    /// wins, with the smaller term id breaking ties.
    pub fn closest_ancestor(
        &self,
        query: TermId,
        ontology: &Ontology,
    ) -> Option<(TermId, AnnotatedAncestor)> {
        let mut level: Vec<TermId> = ontology.parents(query)?.iter().collect();
        let mut visited: TermGroup = level.iter().copied().collect();

        while !level.is_empty() {
            let mut best: Option<(TermId, AnnotatedAncestor)> = None;
            for &term_id in &level {
                if let Some(&entry) = self.annotated_ancestors.get(&term_id) {
                    let better = match best {
                        None => true,
                        Some((best_id, best_entry)) => {
                            entry.frequency > best_entry.frequency
                                || (entry.frequency == best_entry.frequency && term_id < best_id)
                        }
                    };
                    if better {
                        best = Some((term_id, entry));
                    }
                }
            }
            if best.is_some() {
                return best;
            }

            let mut next = Vec::new();
            for &term_id in &level {
                for parent in ontology
                    .parents(term_id)
                    .expect("visited terms are part of the ontology")
                {
                    if visited.insert(parent) {
                        next.push(parent);
                    }
                }
            }
            level = next;
        }
        None
    }
}

/// Terms that do not count as informative common ancestors
///
/// `Phenotypic abnormality` and everything above it (the ontology root)
/// relate every pair of phenotype terms and would make any two terms
/// "similar".
fn root_exclusion_set(ontology: &Ontology) -> TermGroup {
    match ontology.ancestors(PHENOTYPIC_ABNORMALITY, true) {
        Some(roots) => roots,
        None => {
            let mut roots = TermGroup::new();
            roots.insert(ontology.root());
            roots
        }
    }
}

/// Memoized [`InducedDiseaseGraph`]s, keyed by disease id
///
/// Graphs are built lazily on first use and shared between threads.
/// Concurrent builds of the same disease are idempotent.
#[derive(Default)]
pub struct IdgCache {
    inner: RwLock<HashMap<DiseaseId, Arc<InducedDiseaseGraph>>>,
}

impl IdgCache {
    /// Constructs a new, empty cache
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the graph of the disease, building it on first use
    pub fn get_or_build(&self, disease: &HpoDisease, ontology: &Ontology) -> Arc<InducedDiseaseGraph> {
        if let Some(idg) = self
            .inner
            .read()
            .expect("a panicking builder poisoned the cache")
            .get(disease.id())
        {
            return Arc::clone(idg);
        }

        let idg = Arc::new(InducedDiseaseGraph::new(disease, ontology));
        let mut cache = self
            .inner
            .write()
            .expect("a panicking builder poisoned the cache");
        Arc::clone(cache.entry(*disease.id()).or_insert(idg))
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::annotations::DiseaseDb;

    /// ```text
    ///     1 - 118 - 10 - 11 - {12, 13, 14, 15}
    ///            \             12 - 16
    ///             20 - 21
    /// ```
    fn ontology() -> Ontology {
        let mut builder = Ontology::builder();
        builder.insert_term("All", 1u32);
        builder.insert_term("Phenotypic abnormality", 118u32);
        builder.insert_term("Organ A", 10u32);
        builder.insert_term("Parent", 11u32);
        for id in [12u32, 13, 14, 15] {
            builder.insert_term("Child", id);
            builder.add_parent(11u32, id);
        }
        builder.insert_term("Grandchild", 16u32);
        builder.insert_term("Organ B", 20u32);
        builder.insert_term("Unrelated", 21u32);
        builder.add_parent(1u32, 118u32);
        builder.add_parent(118u32, 10u32);
        builder.add_parent(10u32, 11u32);
        builder.add_parent(12u32, 16u32);
        builder.add_parent(118u32, 20u32);
        builder.add_parent(20u32, 21u32);
        builder.build().unwrap()
    }

    fn disease(annotations: Vec<HpoAnnotation>, negative: TermGroup) -> HpoDisease {
        HpoDisease::new(
            DiseaseId::new(DiseaseDb::Omim, 1),
            "test disease",
            annotations,
            negative,
            TermGroup::new(),
        )
    }

    #[test]
    fn closure_contains_annotations_and_ancestors() {
        let ontology = ontology();
        let disease = disease(
            vec![HpoAnnotation::new(12u32, Some(0.8))],
            TermGroup::new(),
        );
        let idg = InducedDiseaseGraph::new(&disease, &ontology);

        for id in [12u32, 11, 10, 118, 1] {
            assert!(idg.is_in_positive_closure(id.into()), "missing {id}");
        }
        assert!(!idg.is_in_positive_closure(13u32.into()));
        assert!(!idg.is_in_positive_closure(16u32.into()));
    }

    #[test]
    fn closest_ancestor_is_level_wise() {
        let ontology = ontology();
        let disease = disease(
            vec![HpoAnnotation::new(12u32, Some(0.8))],
            TermGroup::new(),
        );
        let idg = InducedDiseaseGraph::new(&disease, &ontology);

        // sibling of the annotated term: the shared parent is the hit
        let (ancestor, entry) = idg.closest_ancestor(13u32.into(), &ontology).unwrap();
        assert_eq!(ancestor, TermId::from(11u32));
        assert_eq!(entry.annotated(), TermId::from(12u32));
        assert!((entry.frequency() - 0.8).abs() < f64::EPSILON);

        // a term whose only shared ancestors are root terms has no hit
        assert!(idg.closest_ancestor(21u32.into(), &ontology).is_none());

        // unknown query terms have no hit either
        assert!(idg.closest_ancestor(12345u32.into(), &ontology).is_none());
    }

    #[test]
    fn closest_ancestor_prefers_higher_frequency() {
        let ontology = ontology();
        let disease = disease(
            vec![
                HpoAnnotation::new(12u32, Some(0.2)),
                HpoAnnotation::new(14u32, Some(0.9)),
            ],
            TermGroup::new(),
        );
        let idg = InducedDiseaseGraph::new(&disease, &ontology);

        let (ancestor, entry) = idg.closest_ancestor(13u32.into(), &ontology).unwrap();
        assert_eq!(ancestor, TermId::from(11u32));
        assert_eq!(entry.annotated(), TermId::from(14u32));
        assert!((entry.frequency() - 0.9).abs() < f64::EPSILON);
    }

    #[test]
    fn negations_are_exact_matches_only() {
        let ontology = ontology();
        let disease = disease(
            vec![HpoAnnotation::new(21u32, None)],
            vec![12u32.into()].into(),
        );
        let idg = InducedDiseaseGraph::new(&disease, &ontology);

        assert!(idg.is_exact_excluded_match(12u32.into()));
        assert!(!idg.is_exact_excluded_match(16u32.into()));
        assert!(!idg.is_exact_excluded_match(11u32.into()));
    }

    #[test]
    fn graphs_are_pure_functions_of_their_inputs() {
        let ontology = ontology();
        let disease = disease(
            vec![
                HpoAnnotation::new(12u32, Some(0.8)),
                HpoAnnotation::new(21u32, Some(0.3)),
            ],
            vec![14u32.into()].into(),
        );
        let first = InducedDiseaseGraph::new(&disease, &ontology);
        let second = InducedDiseaseGraph::new(&disease, &ontology);

        assert_eq!(first.positive_closure(), second.positive_closure());
        for query in [11u32, 13, 16, 21, 118] {
            assert_eq!(
                first.closest_ancestor(query.into(), &ontology),
                second.closest_ancestor(query.into(), &ontology)
            );
        }
    }

    #[test]
    fn cache_returns_shared_graphs() {
        let ontology = ontology();
        let disease = disease(
            vec![HpoAnnotation::new(12u32, Some(0.8))],
            TermGroup::new(),
        );
        let cache = IdgCache::new();

        let first = cache.get_or_build(&disease, &ontology);
        let second = cache.get_or_build(&disease, &ontology);
        assert!(Arc::ptr_eq(&first, &second));
    }
}
