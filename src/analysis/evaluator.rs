use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use rayon::prelude::*;
use tracing::debug;

use crate::analysis::{HpoCase, ResultRanking, TestResult};
use crate::annotations::{DiseaseId, DiseaseStore, Gene2Genotype, GeneId, HpoDisease};
use crate::background::BackgroundFrequency;
use crate::likelihood::{GenotypeLikelihoodRatio, IdgCache, LrWithExplanation, PhenotypeLikelihoodRatio};
use crate::Ontology;
use crate::TermId;
use crate::{LiricalError, LiricalResult};

/// Cooperative cancellation handle for a running evaluation
///
/// Cloning the token shares the underlying flag. The evaluator checks
/// the flag between diseases; once cancelled, the evaluation discards
/// all partial results and returns [`LiricalError::Cancelled`].
#[derive(Clone, Debug, Default)]
pub struct CancelToken {
    inner: Arc<AtomicBool>,
}

impl CancelToken {
    /// Creates a new, un-cancelled token
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests cancellation of the evaluation holding this token
    pub fn cancel(&self) {
        self.inner.store(true, Ordering::Relaxed);
    }

    /// Returns `true` if cancellation was requested
    pub fn is_cancelled(&self) -> bool {
        self.inner.load(Ordering::Relaxed)
    }
}

/// The genotype evidence of an evaluation
///
/// Bundles the genotype model with the disease-to-gene associations and
/// the observed genotypes of the proband.
struct GenotypeEvidence<'a> {
    engine: &'a GenotypeLikelihoodRatio,
    disease_to_genes: &'a HashMap<DiseaseId, Vec<GeneId>>,
    gene_to_genotype: &'a HashMap<GeneId, Gene2Genotype>,
}

impl GenotypeEvidence<'_> {
    /// Returns the best genotype ratio over all genes associated with
    /// the disease, or `None` if the disease has no associated gene
    ///
    /// Genes the variant pipeline did not report are evaluated with an
    /// empty genotype, so missing variant evidence penalizes the
    /// disease like the model prescribes.
    fn max_ratio(&self, disease: &HpoDisease) -> Option<f64> {
        let genes = self.disease_to_genes.get(disease.id())?;
        let mut best: Option<f64> = None;
        for &gene_id in genes {
            let lr = match self.gene_to_genotype.get(&gene_id) {
                Some(genotype) => self.engine.evaluate_genotype(
                    genotype,
                    disease.inheritance_modes(),
                    gene_id,
                ),
                None => self.engine.evaluate_genotype(
                    &Gene2Genotype::empty(gene_id),
                    disease.inheritance_modes(),
                    gene_id,
                ),
            };
            best = Some(best.map_or(lr, |current: f64| current.max(lr)));
        }
        best
    }
}

/// Performs the likelihood ratio test of one case against every disease
///
/// A `CaseEvaluator` is created through [`CaseEvaluator::builder`],
/// which validates all collaborator inputs. [`CaseEvaluator::evaluate`]
/// consumes the evaluator and produces the final [`ResultRanking`];
/// evaluating another case requires building a new instance.
///
/// Diseases are independent of each other, so the evaluation fans out
/// over a rayon thread pool. The final ranking is sorted with the
/// disease id as secondary key and therefore deterministic regardless
/// of scheduling.
pub struct CaseEvaluator<'a> {
    ontology: &'a Ontology,
    diseases: &'a DiseaseStore,
    phenotype_lr: PhenotypeLikelihoodRatio<'a>,
    observed: Vec<TermId>,
    excluded: Vec<TermId>,
    genotype: Option<GenotypeEvidence<'a>>,
    pretest: Option<&'a HashMap<DiseaseId, f64>>,
    cancel: CancelToken,
    idg_cache: IdgCache,
    errors: Vec<LiricalError>,
}

impl<'a> CaseEvaluator<'a> {
    /// Returns a builder to configure a `CaseEvaluator`
    pub fn builder() -> CaseEvaluatorBuilder<'a> {
        CaseEvaluatorBuilder::default()
    }

    /// Evaluates the case against every disease of the store
    ///
    /// # Errors
    ///
    /// [`LiricalError::Cancelled`] if the [`CancelToken`] was triggered;
    /// partial results are discarded.
    pub fn evaluate(self) -> LiricalResult<ResultRanking> {
        let uniform_pretest = 1.0 / self.diseases.len() as f64;
        let diseases: Vec<&HpoDisease> = self.diseases.iter().collect();

        let results: Vec<Option<TestResult>> = diseases
            .par_iter()
            .map(|disease| {
                if self.cancel.is_cancelled() {
                    return None;
                }
                Some(self.evaluate_disease(disease, uniform_pretest))
            })
            .collect();

        if self.cancel.is_cancelled() {
            return Err(LiricalError::Cancelled);
        }
        debug!("evaluated {} diseases", results.len());

        Ok(ResultRanking::new(
            results.into_iter().flatten().collect(),
            self.errors,
        ))
    }

    fn evaluate_disease(&self, disease: &HpoDisease, uniform_pretest: f64) -> TestResult {
        let idg = self.idg_cache.get_or_build(disease, self.ontology);

        let observed_results: Vec<LrWithExplanation> = self
            .observed
            .iter()
            .map(|&query| self.phenotype_lr.likelihood_ratio(query, &idg))
            .collect();
        let excluded_results: Vec<LrWithExplanation> = self
            .excluded
            .iter()
            .map(|&query| self.phenotype_lr.likelihood_ratio_excluded(query, &idg))
            .collect();

        let genotype_lr = self
            .genotype
            .as_ref()
            .and_then(|evidence| evidence.max_ratio(disease));

        let pretest = self
            .pretest
            .and_then(|probabilities| probabilities.get(disease.id()).copied())
            .unwrap_or(uniform_pretest);

        TestResult::new(
            *disease.id(),
            pretest,
            observed_results,
            excluded_results,
            genotype_lr,
        )
    }
}

/// Collects and validates the inputs of a [`CaseEvaluator`]
///
/// `ontology`, `diseases`, `background` and `case` are required;
/// genotype evidence, pretest probabilities and the cancellation token
/// are optional.
#[derive(Default)]
pub struct CaseEvaluatorBuilder<'a> {
    ontology: Option<&'a Ontology>,
    diseases: Option<&'a DiseaseStore>,
    background: Option<&'a BackgroundFrequency>,
    case: Option<HpoCase>,
    genotype: Option<GenotypeEvidence<'a>>,
    pretest: Option<&'a HashMap<DiseaseId, f64>>,
    cancel: Option<CancelToken>,
}

impl<'a> CaseEvaluatorBuilder<'a> {
    /// Sets the ontology index
    #[must_use]
    pub fn ontology(mut self, ontology: &'a Ontology) -> Self {
        self.ontology = Some(ontology);
        self
    }

    /// Sets the disease store
    #[must_use]
    pub fn diseases(mut self, diseases: &'a DiseaseStore) -> Self {
        self.diseases = Some(diseases);
        self
    }

    /// Sets the background frequency table
    #[must_use]
    pub fn background(mut self, background: &'a BackgroundFrequency) -> Self {
        self.background = Some(background);
        self
    }

    /// Sets the patient's case
    #[must_use]
    pub fn case(mut self, case: HpoCase) -> Self {
        self.case = Some(case);
        self
    }

    /// Adds genotype evidence
    #[must_use]
    pub fn genotype(
        mut self,
        engine: &'a GenotypeLikelihoodRatio,
        disease_to_genes: &'a HashMap<DiseaseId, Vec<GeneId>>,
        gene_to_genotype: &'a HashMap<GeneId, Gene2Genotype>,
    ) -> Self {
        self.genotype = Some(GenotypeEvidence {
            engine,
            disease_to_genes,
            gene_to_genotype,
        });
        self
    }

    /// Overrides the uniform pretest probabilities
    ///
    /// Diseases missing from the map keep the uniform default.
    #[must_use]
    pub fn pretest_probabilities(mut self, pretest: &'a HashMap<DiseaseId, f64>) -> Self {
        self.pretest = Some(pretest);
        self
    }

    /// Attaches a cancellation token
    #[must_use]
    pub fn cancel_token(mut self, token: CancelToken) -> Self {
        self.cancel = Some(token);
        self
    }

    /// Validates the configuration and returns the ready evaluator
    ///
    /// Query terms of the case are resolved to primary ids. Terms
    /// unknown to the ontology are dropped from the computation and
    /// recorded as [`LiricalError::UnknownTerm`] in the final
    /// [`ResultRanking::errors`].
    ///
    /// # Errors
    ///
    /// [`LiricalError::MissingCollaborator`] if a required input was
    /// not provided
    pub fn build(self) -> LiricalResult<CaseEvaluator<'a>> {
        let ontology = self
            .ontology
            .ok_or(LiricalError::MissingCollaborator("ontology"))?;
        let diseases = self
            .diseases
            .ok_or(LiricalError::MissingCollaborator("diseases"))?;
        let background = self
            .background
            .ok_or(LiricalError::MissingCollaborator("background"))?;
        let case = self.case.ok_or(LiricalError::MissingCollaborator("case"))?;

        let mut errors = Vec::new();
        let mut resolve = |terms: &[TermId]| -> Vec<TermId> {
            let mut resolved = Vec::with_capacity(terms.len());
            for &term_id in terms {
                match ontology.primary_id(term_id) {
                    Some(primary) => resolved.push(primary),
                    None => errors.push(LiricalError::UnknownTerm(term_id)),
                }
            }
            resolved
        };
        let observed = resolve(case.observed());
        let excluded = resolve(case.excluded());

        Ok(CaseEvaluator {
            ontology,
            diseases,
            phenotype_lr: PhenotypeLikelihoodRatio::new(ontology, background),
            observed,
            excluded,
            genotype: self.genotype,
            pretest: self.pretest,
            cancel: self.cancel.unwrap_or_default(),
            idg_cache: IdgCache::new(),
            errors,
        })
    }
}
