use std::collections::HashMap;

use tracing::warn;

use crate::annotations::{Gene2Genotype, GeneId};
use crate::likelihood::poisson::Poisson;
use crate::term::TermGroup;
use crate::TermId;

/// HPO term for autosomal dominant inheritance (`HP:0000006`)
pub const AUTOSOMAL_DOMINANT: TermId = TermId::from_u32(6);

/// HPO term for autosomal recessive inheritance (`HP:0000007`)
pub const AUTOSOMAL_RECESSIVE: TermId = TermId::from_u32(7);

/// Likelihood ratio awarded per ClinVar-pathogenic variant
const CLINVAR_PATH_LR: f64 = 1000.0;

/// Heuristic likelihood ratio for a gene without pathogenic variants
/// whose background rate exceeds the disease rate
///
/// Applied once per expected pathogenic allele, i.e. squared for
/// recessive diseases.
const HEURISTIC_LOW_PATH_LR: f64 = 0.05;

/// Background rate assumed for genes missing from the rate table
const DEFAULT_LAMBDA_BACKGROUND: f64 = 0.1;

/// Path-score sums below this threshold count as "no pathogenic variants"
const PATH_SCORE_EPSILON: f64 = 1e-5;

/// Lower clamp of every genotype likelihood ratio
const LR_CLAMP_EPS: f64 = 1e-10;

/// The genotype likelihood ratio model
///
/// Compares the pathogenic-variant load observed in a gene against the
/// load expected under the disease (`λ_disease`, derived from the mode
/// of inheritance) and against the gene's population background rate
/// (`λ_background`, estimated from population variant databases). Both
/// are modeled as Poisson counts, evaluated continuously because the
/// observed load is a sum of real-valued pathogenicity-bin scores.
pub struct GenotypeLikelihoodRatio {
    background_rates: HashMap<GeneId, f64>,
}

impl GenotypeLikelihoodRatio {
    /// Creates a new model from the gene-to-background-rate table
    pub fn new(background_rates: HashMap<GeneId, f64>) -> Self {
        GenotypeLikelihoodRatio { background_rates }
    }

    /// Calculates the likelihood ratio of the observed genotype of
    /// `gene_id`, given the inheritance modes of the disease
    ///
    /// ClinVar-pathogenic variants short-circuit the model with a ratio
    /// of 1000 per variant. Otherwise the continuous Poisson ratio is
    /// returned, except that a gene with a high background rate and no
    /// pathogenic variants receives a fixed small penalty: absence of
    /// evidence in such genes (e.g. HLA-B) must not reward the disease.
    ///
    /// The result is always positive and finite.
    pub fn evaluate_genotype(
        &self,
        genotype: &Gene2Genotype,
        inheritance_modes: &TermGroup,
        gene_id: GeneId,
    ) -> f64 {
        if genotype.has_pathogenic_clinvar_variant() {
            let count = i32::try_from(genotype.pathogenic_clinvar_count()).unwrap_or(i32::MAX);
            return CLINVAR_PATH_LR.powi(count).min(f64::MAX);
        }

        let lambda_disease: f64 = if inheritance_modes.contains(&AUTOSOMAL_RECESSIVE) {
            2.0
        } else {
            1.0
        };
        let lambda_background = match self.background_rates.get(&gene_id) {
            Some(&lambda) if lambda > 0.0 => lambda,
            Some(&lambda) => {
                warn!(
                    "non-positive background rate {} for {}, using default",
                    lambda, gene_id
                );
                DEFAULT_LAMBDA_BACKGROUND
            }
            None => DEFAULT_LAMBDA_BACKGROUND,
        };

        let observed = genotype.sum_of_path_bin_scores().max(0.0);
        if observed < PATH_SCORE_EPSILON && lambda_background > lambda_disease {
            return HEURISTIC_LOW_PATH_LR.powi(lambda_disease as i32);
        }

        let disease_dist =
            Poisson::new(lambda_disease).expect("lambda_disease is 1.0 or 2.0");
        let background_dist =
            Poisson::new(lambda_background).expect("lambda_background is positive");
        let lr = (disease_dist.ln_pmf(observed) - background_dist.ln_pmf(observed)).exp();
        lr.clamp(LR_CLAMP_EPS, f64::MAX)
    }
}
