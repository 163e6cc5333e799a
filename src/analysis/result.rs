use std::cmp::Ordering;
use std::collections::HashMap;

use serde::Serialize;

use crate::annotations::DiseaseId;
use crate::likelihood::LrWithExplanation;
use crate::LiricalError;

/// The outcome of testing one disease against the patient's case
///
/// Holds the per-term likelihood ratios (in the input order of the
/// case), the optional genotype ratio, their product and the resulting
/// posttest probability.
#[derive(Clone, Debug, Serialize)]
pub struct TestResult {
    disease_id: DiseaseId,
    pretest_probability: f64,
    observed_results: Vec<LrWithExplanation>,
    excluded_results: Vec<LrWithExplanation>,
    genotype_lr: Option<f64>,
    composite_lr: f64,
    posttest_probability: f64,
}

impl TestResult {
    pub(crate) fn new(
        disease_id: DiseaseId,
        pretest_probability: f64,
        observed_results: Vec<LrWithExplanation>,
        excluded_results: Vec<LrWithExplanation>,
        genotype_lr: Option<f64>,
    ) -> Self {
        // left-to-right product, observed terms first
        let mut composite_lr = 1.0;
        for result in &observed_results {
            composite_lr *= result.ratio();
        }
        for result in &excluded_results {
            composite_lr *= result.ratio();
        }
        if let Some(lr) = genotype_lr {
            composite_lr *= lr;
        }

        let pretest_odds = pretest_probability / (1.0 - pretest_probability);
        let posttest_odds = pretest_odds * composite_lr;
        let posttest_probability = posttest_odds / (1.0 + posttest_odds);

        TestResult {
            disease_id,
            pretest_probability,
            observed_results,
            excluded_results,
            genotype_lr,
            composite_lr,
            posttest_probability,
        }
    }

    /// Returns the id of the tested disease
    pub fn disease_id(&self) -> &DiseaseId {
        &self.disease_id
    }

    /// Returns the pretest probability of the disease
    pub fn pretest_probability(&self) -> f64 {
        self.pretest_probability
    }

    /// Returns the pretest odds of the disease
    pub fn pretest_odds(&self) -> f64 {
        self.pretest_probability / (1.0 - self.pretest_probability)
    }

    /// Returns the per-term results of the observed abnormalities, in
    /// the input order of the case
    pub fn observed_results(&self) -> &[LrWithExplanation] {
        &self.observed_results
    }

    /// Returns the per-term results of the excluded abnormalities, in
    /// the input order of the case
    pub fn excluded_results(&self) -> &[LrWithExplanation] {
        &self.excluded_results
    }

    /// Returns the genotype likelihood ratio, if genotype evidence was
    /// available for the disease
    pub fn genotype_lr(&self) -> Option<f64> {
        self.genotype_lr
    }

    /// Returns the composite likelihood ratio of all evidence
    pub fn composite_lr(&self) -> f64 {
        self.composite_lr
    }

    /// Returns the posttest odds of the disease
    pub fn posttest_odds(&self) -> f64 {
        self.pretest_odds() * self.composite_lr
    }

    /// Returns the posttest probability of the disease
    pub fn posttest_probability(&self) -> f64 {
        self.posttest_probability
    }
}

/// All [`TestResult`]s of one evaluation, in ranked order
///
/// The ranking is immutable. Results are sorted by composite likelihood
/// ratio (descending) with the disease id as tiebreak, so the order is
/// identical across runs and platforms.
#[derive(Debug)]
pub struct ResultRanking {
    results: Vec<TestResult>,
    index: HashMap<DiseaseId, usize>,
    errors: Vec<LiricalError>,
}

impl ResultRanking {
    pub(crate) fn new(mut results: Vec<TestResult>, errors: Vec<LiricalError>) -> Self {
        results.sort_by(|a, b| {
            b.composite_lr
                .partial_cmp(&a.composite_lr)
                .unwrap_or(Ordering::Equal)
                .then_with(|| a.disease_id.cmp(&b.disease_id))
        });
        let index = results
            .iter()
            .enumerate()
            .map(|(idx, result)| (result.disease_id, idx))
            .collect();
        ResultRanking {
            results,
            index,
            errors,
        }
    }

    /// Returns the result of the given disease
    pub fn get(&self, disease_id: &DiseaseId) -> Option<&TestResult> {
        self.index.get(disease_id).map(|&idx| &self.results[idx])
    }

    /// Returns the 1-based rank of the given disease
    ///
    /// Diseases with equal composite likelihood ratios share the worst
    /// rank of their group.
    pub fn rank(&self, disease_id: &DiseaseId) -> Option<usize> {
        let &idx = self.index.get(disease_id)?;
        let composite = self.results[idx].composite_lr;
        let mut last = idx;
        while last + 1 < self.results.len() && self.results[last + 1].composite_lr == composite {
            last += 1;
        }
        Some(last + 1)
    }

    /// Returns the best `k` results in ranked order
    pub fn top_k(&self, k: usize) -> &[TestResult] {
        &self.results[..k.min(self.results.len())]
    }

    /// Returns all results in ranked order
    pub fn results(&self) -> &[TestResult] {
        &self.results
    }

    /// Iterates all results in ranked order
    pub fn iter(&self) -> std::slice::Iter<'_, TestResult> {
        self.results.iter()
    }

    /// Returns the non-fatal errors collected during the evaluation,
    /// e.g. query terms unknown to the ontology
    pub fn errors(&self) -> &[LiricalError] {
        &self.errors
    }

    /// Returns the number of tested diseases
    pub fn len(&self) -> usize {
        self.results.len()
    }

    /// Returns `true` if no disease was tested
    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }
}

impl<'a> IntoIterator for &'a ResultRanking {
    type Item = &'a TestResult;
    type IntoIter = std::slice::Iter<'a, TestResult>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::annotations::DiseaseDb;

    const EPSILON: f64 = 1e-9;

    fn omim(id: u32) -> DiseaseId {
        DiseaseId::new(DiseaseDb::Omim, id)
    }

    fn result_with_ratios(id: u32, pretest: f64, ratios: &[f64]) -> TestResult {
        let observed = ratios
            .iter()
            .map(|&lr| LrWithExplanation::exact_match(1u32.into(), lr))
            .collect();
        TestResult::new(omim(id), pretest, observed, Vec::new(), None)
    }

    #[test]
    fn composite_is_the_product() {
        let result = result_with_ratios(1, 0.5, &[98.0, 196.0]);
        assert!((result.composite_lr() - 19208.0).abs() < EPSILON);
    }

    #[test]
    fn posttest_follows_the_odds_form() {
        let result = result_with_ratios(1, 0.25, &[3.0]);
        // odds 1:3 times LR 3 gives odds 1:1
        assert!((result.pretest_odds() - 1.0 / 3.0).abs() < EPSILON);
        assert!((result.posttest_odds() - 1.0).abs() < EPSILON);
        assert!((result.posttest_probability() - 0.5).abs() < EPSILON);
    }

    #[test]
    fn no_evidence_keeps_the_pretest_probability() {
        let result = TestResult::new(omim(1), 0.125, Vec::new(), Vec::new(), None);
        assert!((result.composite_lr() - 1.0).abs() < EPSILON);
        assert!((result.posttest_probability() - 0.125).abs() < EPSILON);
    }

    #[test]
    fn ranking_sorts_by_composite_then_id() {
        let ranking = ResultRanking::new(
            vec![
                result_with_ratios(3, 0.1, &[5.0]),
                result_with_ratios(1, 0.1, &[2.0]),
                result_with_ratios(2, 0.1, &[5.0]),
            ],
            Vec::new(),
        );
        let ids: Vec<u32> = ranking.iter().map(|r| r.disease_id().id()).collect();
        assert_eq!(ids, vec![2, 3, 1]);

        // tied diseases share the worst rank of their group
        assert_eq!(ranking.rank(&omim(2)), Some(2));
        assert_eq!(ranking.rank(&omim(3)), Some(2));
        assert_eq!(ranking.rank(&omim(1)), Some(3));
        assert_eq!(ranking.rank(&omim(9)), None);

        assert_eq!(ranking.top_k(2).len(), 2);
        assert_eq!(ranking.top_k(10).len(), 3);
    }

    #[test]
    fn ranks_are_invariant_under_positive_scaling() {
        let ratios: Vec<(u32, f64)> = vec![(1, 4.0), (2, 0.25), (3, 19.0), (4, 1.0)];
        let build = |scale: f64| {
            ResultRanking::new(
                ratios
                    .iter()
                    .map(|&(id, lr)| result_with_ratios(id, 0.1, &[lr * scale]))
                    .collect(),
                Vec::new(),
            )
        };

        let unscaled = build(1.0);
        let scaled = build(1000.0);
        for id in 1u32..=4 {
            assert_eq!(unscaled.rank(&omim(id)), scaled.rank(&omim(id)));
        }
    }

    #[test]
    fn serializes_for_reporting() {
        let result = result_with_ratios(103_100, 0.5, &[98.0]);
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["disease_id"], "OMIM:103100");
        assert_eq!(json["composite_lr"], 98.0);
        assert_eq!(json["genotype_lr"], serde_json::Value::Null);
        assert_eq!(json["observed_results"][0]["kind"], "EXACT_MATCH");
    }
}
