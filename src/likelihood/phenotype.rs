use tracing::warn;

use crate::background::BackgroundFrequency;
use crate::likelihood::{InducedDiseaseGraph, LrWithExplanation};
use crate::Ontology;
use crate::TermId;

/// Probability of a finding if the disease is not annotated to it and
/// there is no common ancestor except the phenotype root
///
/// There are many possible causes of such "false positive" findings:
/// incomplete disease annotations, a query term describing a downstream
/// manifestation of an annotated abnormality, or a secondary etiology.
const DEFAULT_FALSE_POSITIVE_NO_COMMON_ORGAN_PROBABILITY: f64 = 0.01;

/// Likelihood ratio for a query term that is explicitly excluded in the
/// disease
const EXCLUDED_IN_DISEASE_BUT_PRESENT_IN_QUERY_PROBABILITY: f64 = 1.0 / 1000.0;

/// Likelihood ratio for an excluded query term that is explicitly
/// excluded in the disease
const EXCLUDED_IN_DISEASE_AND_EXCLUDED_IN_QUERY_PROBABILITY: f64 = 1000.0;

/// Probability that a feature is present but was not recorded or not
/// noticed
const FALSE_NEGATIVE_OBSERVATION_PROB: f64 = 0.01;

/// Lowest no-common-organ penalty, 1:500
const MIN_PROB: f64 = 0.002;

/// Highest no-common-organ penalty, 1:10
const MAX_PROB: f64 = 0.10;

/// The phenotype likelihood ratio model
///
/// For a query term and a disease (represented by its
/// [`InducedDiseaseGraph`]) the model calculates
/// `P(term | disease) / P(term | not disease)`, where the denominator is
/// the corpus-wide [`BackgroundFrequency`]. The result carries an
/// explanation of the matching case it was derived from.
///
/// The model is a pure function of its read-only inputs, so one
/// instance can be shared freely between threads.
pub struct PhenotypeLikelihoodRatio<'a> {
    ontology: &'a Ontology,
    background: &'a BackgroundFrequency,
}

impl<'a> PhenotypeLikelihoodRatio<'a> {
    /// Creates a new model from the shared ontology and background table
    pub fn new(ontology: &'a Ontology, background: &'a BackgroundFrequency) -> Self {
        PhenotypeLikelihoodRatio {
            ontology,
            background,
        }
    }

    /// Calculates the likelihood ratio of observing `query` in an
    /// individual with the disease of `idg`
    ///
    /// The matching cases are tested in order:
    ///
    /// 1. the query is explicitly excluded in the disease
    /// 2. the query directly annotates the disease
    /// 3. the query is an ancestor of one or more annotated terms
    /// 4. the query is a descendant of one or more annotated terms
    /// 5. query and disease share a common ancestor below the phenotype
    ///    root
    /// 6. no match
    ///
    /// The returned ratio is always positive and finite.
    pub fn likelihood_ratio(&self, query: TermId, idg: &InducedDiseaseGraph) -> LrWithExplanation {
        let disease = idg.disease();

        for negated in disease.negative_annotations() {
            if self.ontology.is_subclass(query, negated) {
                return LrWithExplanation::query_excluded_in_disease(
                    query,
                    EXCLUDED_IN_DISEASE_BUT_PRESENT_IN_QUERY_PROBABILITY,
                );
            }
        }

        if let Some(annotation) = disease.annotation(query) {
            let lr = annotation.frequency() / self.background.frequency(query);
            return LrWithExplanation::exact_match(query, lr);
        }

        // The query term is a superclass of at least one disease term.
        // The query is satisfied by the more specific annotation, so the
        // annotation frequency carries over; with several candidates the
        // maximum frequency wins.
        let mut ancestor_match: Option<(TermId, f64)> = None;
        for annotation in disease.annotations() {
            if self.ontology.is_subclass(annotation.term_id(), query) {
                let better = match ancestor_match {
                    None => true,
                    Some((matched, frequency)) => {
                        annotation.frequency() > frequency
                            || (annotation.frequency() == frequency
                                && annotation.term_id() < matched)
                    }
                };
                if better {
                    ancestor_match = Some((annotation.term_id(), annotation.frequency()));
                }
            }
        }
        if let Some((matched, frequency)) = ancestor_match {
            let lr = frequency / self.background.frequency(query);
            return LrWithExplanation::query_ancestor_of_disease_term(query, matched, lr);
        }

        // The query term is a subclass of one or more disease terms.
        // Not everybody with the disease will have this specific
        // subterm, so the annotation frequency is weighted by the
        // proportion of sibling terms.
        let mut descendant_match: Option<(TermId, f64, f64)> = None;
        for annotation in disease.annotations() {
            if self.ontology.is_subclass(query, annotation.term_id()) {
                let score =
                    self.proportion_in_children(query, annotation.term_id()) * annotation.frequency();
                let better = match descendant_match {
                    None => true,
                    Some((matched, best_score, frequency)) => {
                        score > best_score
                            || (score == best_score && annotation.frequency() > frequency)
                            || (score == best_score
                                && annotation.frequency() == frequency
                                && annotation.term_id() < matched)
                    }
                };
                if better {
                    descendant_match =
                        Some((annotation.term_id(), score, annotation.frequency()));
                }
            }
        }
        if let Some((matched, score, _)) = descendant_match {
            let lr = score.max(self.no_common_organ_probability(query))
                / self.background.frequency(query);
            return LrWithExplanation::query_descendant_of_disease_term(query, matched, lr);
        }

        if let Some((ancestor, entry)) = idg.closest_ancestor(query, self.ontology) {
            let lr = DEFAULT_FALSE_POSITIVE_NO_COMMON_ORGAN_PROBABILITY
                .max(entry.frequency() / self.background.frequency(ancestor));
            return LrWithExplanation::non_root_common_ancestor(query, ancestor, lr);
        }

        LrWithExplanation::no_match(query, DEFAULT_FALSE_POSITIVE_NO_COMMON_ORGAN_PROBABILITY)
    }

    /// Calculates the likelihood ratio of an *excluded* query term for
    /// the disease of `idg`
    pub fn likelihood_ratio_excluded(
        &self,
        query: TermId,
        idg: &InducedDiseaseGraph,
    ) -> LrWithExplanation {
        if idg.is_exact_excluded_match(query) {
            return LrWithExplanation::excluded_query_excluded_in_disease(
                query,
                EXCLUDED_IN_DISEASE_AND_EXCLUDED_IN_QUERY_PROBABILITY,
            );
        }

        let background = self.background.frequency(query);
        if background > 0.99 {
            warn!(
                "unusually high background frequency {} for {} (should never happen)",
                background, query
            );
            return LrWithExplanation::unusual_background(query, 1.0);
        }

        // The phenotype was excluded in the proband and the disease is
        // not annotated to it, which slightly supports the disease.
        if !idg.is_in_positive_closure(query) {
            let lr = 1.0 / (1.0 - background);
            return LrWithExplanation::excluded_query_not_in_disease(query, lr);
        }

        // The disease does have the abnormality (directly or through a
        // descendant annotation) but it was ruled out in the proband.
        let mut frequency: f64 = 0.0;
        for annotation in idg.disease().annotations() {
            if self.ontology.is_subclass(annotation.term_id(), query) {
                frequency = frequency.max(annotation.frequency());
            }
        }
        let excluded_frequency = FALSE_NEGATIVE_OBSERVATION_PROB.max(1.0 - frequency);
        let lr = excluded_frequency / (1.0 - background);
        LrWithExplanation::excluded_query_in_disease(query, lr)
    }

    /// The proportion of the annotation frequency attributable to the
    /// query, given that the query is a descendant of the disease term
    ///
    /// Direct children of the disease term share its frequency evenly;
    /// deeper descendants receive no share.
    fn proportion_in_children(&self, query: TermId, disease_term: TermId) -> f64 {
        if query == disease_term {
            return 1.0;
        }
        let Some(children) = self.ontology.children(disease_term) else {
            return 0.0;
        };
        if children.is_empty() {
            return 0.0;
        }
        if children.contains(&query) {
            1.0 / children.len() as f64
        } else {
            0.0
        }
    }

    /// Estimated probability of a false-positive finding without any
    /// organ-level relation to the disease
    ///
    /// The more common the feature is across the whole corpus, the less
    /// surprising it is to observe it by chance, so the penalty scales
    /// with the corpus-wide frequency: maximally rare features approach
    /// 1:500, common features (at least 10%) approach 1:10.
    fn no_common_organ_probability(&self, term_id: TermId) -> f64 {
        let f = self
            .background
            .raw_frequency(term_id)
            .unwrap_or(DEFAULT_FALSE_POSITIVE_NO_COMMON_ORGAN_PROBABILITY);
        let factor =
            (MAX_PROB - MIN_PROB) / (MAX_PROB - DEFAULT_FALSE_POSITIVE_NO_COMMON_ORGAN_PROBABILITY);
        let penalty =
            MIN_PROB + (f - DEFAULT_FALSE_POSITIVE_NO_COMMON_ORGAN_PROBABILITY) * factor;
        (penalty * f).clamp(
            MIN_PROB * DEFAULT_FALSE_POSITIVE_NO_COMMON_ORGAN_PROBABILITY,
            MAX_PROB,
        )
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::annotations::{DiseaseDb, DiseaseId, DiseaseStore, HpoAnnotation};
    use crate::likelihood::LrMatchKind;
    use crate::term::TermGroup;

    const EPSILON: f64 = 1e-9;

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

    /// Builds a store from `(OMIM id, annotations, negated terms)`
    /// tuples, padded with diseases annotated to the unrelated term 21
    /// until `total` diseases are reached
    fn store(diseases: Vec<(u32, Vec<HpoAnnotation>, TermGroup)>, total: u32) -> DiseaseStore {
        let mut builder = DiseaseStore::builder();
        let next_filler = diseases.iter().map(|d| d.0).max().unwrap_or(0) + 1;
        for (id, annotations, negative) in diseases {
            builder.add_disease(
                DiseaseId::new(DiseaseDb::Omim, id),
                "test disease",
                annotations,
                negative,
                TermGroup::new(),
            );
        }
        for id in next_filler..=total {
            builder.add_disease(
                DiseaseId::new(DiseaseDb::Omim, id),
                "filler disease",
                vec![HpoAnnotation::new(21u32, None)],
                TermGroup::new(),
                TermGroup::new(),
            );
        }
        builder.build().unwrap()
    }

    fn idg_of(store: &DiseaseStore, ontology: &Ontology, omim_id: u32) -> InducedDiseaseGraph {
        let disease = store
            .get(&DiseaseId::new(DiseaseDb::Omim, omim_id))
            .unwrap();
        InducedDiseaseGraph::new(disease, ontology)
    }

    #[test]
    fn exact_match_divides_by_background() {
        let ontology = ontology();
        // B(12) = (0.9 + 0.1) / 100 = 0.01
        let store = store(
            vec![
                (1, vec![HpoAnnotation::new(12u32, Some(0.9))], TermGroup::new()),
                (2, vec![HpoAnnotation::new(12u32, Some(0.1))], TermGroup::new()),
            ],
            100,
        );
        let background = BackgroundFrequency::new(&ontology, &store).unwrap();
        let phenotype_lr = PhenotypeLikelihoodRatio::new(&ontology, &background);
        let idg = idg_of(&store, &ontology, 1);

        let result = phenotype_lr.likelihood_ratio(12u32.into(), &idg);
        assert_eq!(result.kind(), LrMatchKind::ExactMatch);
        assert_eq!(result.matched_term(), Some(12u32.into()));
        assert!((result.ratio() - 90.0).abs() < EPSILON);
    }

    #[test]
    fn query_as_direct_child_of_annotation() {
        let ontology = ontology();
        // B(13) = 2 / 100 = 0.02; term 11 has 4 children
        let store = store(
            vec![
                (1, vec![HpoAnnotation::new(11u32, Some(0.8))], TermGroup::new()),
                (2, vec![HpoAnnotation::new(13u32, None)], TermGroup::new()),
                (3, vec![HpoAnnotation::new(13u32, None)], TermGroup::new()),
            ],
            100,
        );
        let background = BackgroundFrequency::new(&ontology, &store).unwrap();
        let phenotype_lr = PhenotypeLikelihoodRatio::new(&ontology, &background);
        let idg = idg_of(&store, &ontology, 1);

        // proportional frequency 0.8 / 4 = 0.2, divided by B = 0.02
        let result = phenotype_lr.likelihood_ratio(13u32.into(), &idg);
        assert_eq!(result.kind(), LrMatchKind::QueryIsDescendantOfDiseaseTerm);
        assert_eq!(result.matched_term(), Some(11u32.into()));
        assert!((result.ratio() - 10.0).abs() < EPSILON);
    }

    #[test]
    fn query_deeper_than_direct_children_keeps_the_floor() {
        let ontology = ontology();
        let store = store(
            vec![(1, vec![HpoAnnotation::new(11u32, Some(0.8))], TermGroup::new())],
            10,
        );
        let background = BackgroundFrequency::new(&ontology, &store).unwrap();
        let phenotype_lr = PhenotypeLikelihoodRatio::new(&ontology, &background);
        let idg = idg_of(&store, &ontology, 1);

        // term 16 is a grandchild of the annotated term 11: the
        // proportional score is zero and the clamped no-common-organ
        // penalty (0.002 * 0.01) over the floored background (1e-4)
        // carries the ratio
        let result = phenotype_lr.likelihood_ratio(16u32.into(), &idg);
        assert_eq!(result.kind(), LrMatchKind::QueryIsDescendantOfDiseaseTerm);
        assert_eq!(result.matched_term(), Some(11u32.into()));
        assert!((result.ratio() - 0.2).abs() < EPSILON);
        assert!(result.ratio() > 0.0);
    }

    #[test]
    fn query_as_ancestor_of_annotation() {
        let ontology = ontology();
        // contributions to B(11): 0.6 + 1.0 + 1.0 + 0.4 = 3.0 over 100
        let store = store(
            vec![
                (1, vec![HpoAnnotation::new(16u32, Some(0.6))], TermGroup::new()),
                (2, vec![HpoAnnotation::new(12u32, None)], TermGroup::new()),
                (3, vec![HpoAnnotation::new(13u32, None)], TermGroup::new()),
                (4, vec![HpoAnnotation::new(13u32, Some(0.4))], TermGroup::new()),
            ],
            100,
        );
        let background = BackgroundFrequency::new(&ontology, &store).unwrap();
        let phenotype_lr = PhenotypeLikelihoodRatio::new(&ontology, &background);
        let idg = idg_of(&store, &ontology, 1);

        let result = phenotype_lr.likelihood_ratio(11u32.into(), &idg);
        assert_eq!(result.kind(), LrMatchKind::QueryIsAncestorOfDiseaseTerm);
        assert_eq!(result.matched_term(), Some(16u32.into()));
        assert!((result.ratio() - 20.0).abs() < EPSILON);
    }

    #[test]
    fn unrelated_query_is_no_match() {
        let ontology = ontology();
        let store = store(
            vec![(1, vec![HpoAnnotation::new(12u32, None)], TermGroup::new())],
            10,
        );
        let background = BackgroundFrequency::new(&ontology, &store).unwrap();
        let phenotype_lr = PhenotypeLikelihoodRatio::new(&ontology, &background);
        let idg = idg_of(&store, &ontology, 1);

        // term 21 only shares the phenotype root with the annotation
        let result = phenotype_lr.likelihood_ratio(21u32.into(), &idg);
        assert_eq!(result.kind(), LrMatchKind::NoMatch);
        assert_eq!(result.matched_term(), None);
        assert!((result.ratio() - 0.01).abs() < EPSILON);
    }

    #[test]
    fn sibling_matches_through_common_ancestor() {
        let ontology = ontology();
        // B(11) = 0.8 / 10 = 0.08
        let store = store(
            vec![(1, vec![HpoAnnotation::new(12u32, Some(0.8))], TermGroup::new())],
            10,
        );
        let background = BackgroundFrequency::new(&ontology, &store).unwrap();
        let phenotype_lr = PhenotypeLikelihoodRatio::new(&ontology, &background);
        let idg = idg_of(&store, &ontology, 1);

        // query 13 is a sibling of the annotated 12; the common
        // ancestor 11 carries frequency 0.8 over B(11) = 0.08
        let result = phenotype_lr.likelihood_ratio(13u32.into(), &idg);
        assert_eq!(result.kind(), LrMatchKind::NonRootCommonAncestor);
        assert_eq!(result.matched_term(), Some(11u32.into()));
        assert!((result.ratio() - 10.0).abs() < EPSILON);
    }

    #[test]
    fn negated_term_penalizes_observed_query() {
        let ontology = ontology();
        let store = store(
            vec![(
                1,
                vec![HpoAnnotation::new(21u32, None)],
                vec![11u32.into()].into(),
            )],
            10,
        );
        let background = BackgroundFrequency::new(&ontology, &store).unwrap();
        let phenotype_lr = PhenotypeLikelihoodRatio::new(&ontology, &background);
        let idg = idg_of(&store, &ontology, 1);

        // both the negated term itself and its descendants hit the penalty
        for query in [11u32, 13, 16] {
            let result = phenotype_lr.likelihood_ratio(query.into(), &idg);
            assert_eq!(
                result.kind(),
                LrMatchKind::QueryExplicitlyExcludedInDisease,
                "query {query}"
            );
            assert!((result.ratio() - 0.001).abs() < EPSILON);
        }
    }

    #[test]
    fn excluded_query_matching_negated_term_rewards() {
        let ontology = ontology();
        let store = store(
            vec![(
                1,
                vec![HpoAnnotation::new(21u32, None)],
                vec![13u32.into()].into(),
            )],
            10,
        );
        let background = BackgroundFrequency::new(&ontology, &store).unwrap();
        let phenotype_lr = PhenotypeLikelihoodRatio::new(&ontology, &background);
        let idg = idg_of(&store, &ontology, 1);

        let result = phenotype_lr.likelihood_ratio_excluded(13u32.into(), &idg);
        assert_eq!(
            result.kind(),
            LrMatchKind::ExcludedQueryMatchesExcludedInDisease
        );
        assert!((result.ratio() - 1000.0).abs() < EPSILON);

        // the match is exact only, a child of the negated term does not count
        let result = phenotype_lr.likelihood_ratio_excluded(16u32.into(), &idg);
        assert_ne!(
            result.kind(),
            LrMatchKind::ExcludedQueryMatchesExcludedInDisease
        );
    }

    #[test]
    fn excluded_query_not_in_disease_slightly_rewards() {
        let ontology = ontology();
        let store = store(
            vec![(1, vec![HpoAnnotation::new(21u32, None)], TermGroup::new())],
            2,
        );
        let background = BackgroundFrequency::new(&ontology, &store).unwrap();
        let phenotype_lr = PhenotypeLikelihoodRatio::new(&ontology, &background);
        let idg = idg_of(&store, &ontology, 1);

        // B(13) reads the floor 1e-4
        let result = phenotype_lr.likelihood_ratio_excluded(13u32.into(), &idg);
        assert_eq!(result.kind(), LrMatchKind::ExcludedQueryNotInDisease);
        assert!((result.ratio() - 1.0 / (1.0 - 1e-4)).abs() < EPSILON);
        assert!(result.ratio() > 1.0);
    }

    #[test]
    fn excluded_query_in_disease_uses_propagated_frequency() {
        let ontology = ontology();
        // B(13) = B(11) = 0.7 / 2 = 0.35
        let store = store(
            vec![(1, vec![HpoAnnotation::new(13u32, Some(0.7))], TermGroup::new())],
            2,
        );
        let background = BackgroundFrequency::new(&ontology, &store).unwrap();
        let phenotype_lr = PhenotypeLikelihoodRatio::new(&ontology, &background);
        let idg = idg_of(&store, &ontology, 1);

        // direct annotation: excluded frequency = 1 - 0.7
        let result = phenotype_lr.likelihood_ratio_excluded(13u32.into(), &idg);
        assert_eq!(result.kind(), LrMatchKind::ExcludedQueryInDisease);
        assert!((result.ratio() - 0.3 / 0.65).abs() < EPSILON);

        // ancestors of the annotation propagate the same frequency
        let result = phenotype_lr.likelihood_ratio_excluded(11u32.into(), &idg);
        assert_eq!(result.kind(), LrMatchKind::ExcludedQueryInDisease);
        assert!((result.ratio() - 0.3 / 0.65).abs() < EPSILON);
    }

    #[test]
    fn excluded_query_with_obligate_annotation_keeps_false_negative_floor() {
        let ontology = ontology();
        // only half the corpus is annotated to 13, so B(13) = 0.5
        let store = store(
            vec![(1, vec![HpoAnnotation::new(13u32, None)], TermGroup::new())],
            2,
        );
        let background = BackgroundFrequency::new(&ontology, &store).unwrap();
        let phenotype_lr = PhenotypeLikelihoodRatio::new(&ontology, &background);
        let idg = idg_of(&store, &ontology, 1);

        // 1 - f = 0 is lifted to the false-negative probability 0.01
        let result = phenotype_lr.likelihood_ratio_excluded(13u32.into(), &idg);
        assert_eq!(result.kind(), LrMatchKind::ExcludedQueryInDisease);
        assert!((result.ratio() - 0.01 / 0.5).abs() < EPSILON);
    }

    #[test]
    fn implausible_background_falls_back_to_neutral() {
        let ontology = ontology();
        let mut builder = DiseaseStore::builder();
        for id in [1u32, 2] {
            builder.add_disease(
                DiseaseId::new(DiseaseDb::Omim, id),
                "test disease",
                vec![HpoAnnotation::new(13u32, None)],
                TermGroup::new(),
                TermGroup::new(),
            );
        }
        let store = builder.build().unwrap();
        let background = BackgroundFrequency::new(&ontology, &store).unwrap();
        let phenotype_lr = PhenotypeLikelihoodRatio::new(&ontology, &background);
        let idg = idg_of(&store, &ontology, 1);

        // every disease carries the term, so B(13) = 1.0 > 0.99
        let result = phenotype_lr.likelihood_ratio_excluded(13u32.into(), &idg);
        assert_eq!(result.kind(), LrMatchKind::UnusualBackground);
        assert!((result.ratio() - 1.0).abs() < EPSILON);
    }

    #[test]
    fn all_ratios_are_positive_and_finite() {
        let ontology = ontology();
        let store = store(
            vec![(
                1,
                vec![
                    HpoAnnotation::new(11u32, Some(0.8)),
                    HpoAnnotation::new(16u32, Some(0.1)),
                ],
                vec![21u32.into()].into(),
            )],
            10,
        );
        let background = BackgroundFrequency::new(&ontology, &store).unwrap();
        let phenotype_lr = PhenotypeLikelihoodRatio::new(&ontology, &background);
        let idg = idg_of(&store, &ontology, 1);

        for query in [1u32, 118, 10, 11, 12, 13, 14, 15, 16, 20, 21] {
            let observed = phenotype_lr.likelihood_ratio(query.into(), &idg);
            assert!(observed.ratio() > 0.0, "query {query}");
            assert!(observed.ratio().is_finite(), "query {query}");

            let excluded = phenotype_lr.likelihood_ratio_excluded(query.into(), &idg);
            assert!(excluded.ratio() > 0.0, "query {query}");
            assert!(excluded.ratio().is_finite(), "query {query}");
        }
    }
}
