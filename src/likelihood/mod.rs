//! The likelihood ratio models for phenotype and genotype evidence
//!
//! A likelihood ratio compares the probability of an observation given
//! a disease with its probability given *no* disease. Every observed or
//! excluded query term of a patient yields one
//! [`LrWithExplanation`] per disease through the
//! [`PhenotypeLikelihoodRatio`]; variant data of candidate genes yields
//! one further ratio through the [`GenotypeLikelihoodRatio`]. The
//! [`analysis`](`crate::analysis`) module multiplies the ratios into a
//! composite per disease.

use crate::TermId;

mod explanation;
mod genotype;
mod idg;
mod phenotype;
mod poisson;

pub use explanation::{LrMatchKind, LrWithExplanation};
pub use genotype::{GenotypeLikelihoodRatio, AUTOSOMAL_DOMINANT, AUTOSOMAL_RECESSIVE};
pub use idg::{AnnotatedAncestor, IdgCache, InducedDiseaseGraph};
pub use phenotype::PhenotypeLikelihoodRatio;

/// The root of all phenotype terms, `HP:0000118 | Phenotypic abnormality`
///
/// Terms at or above this level relate any two phenotype terms and are
/// not counted as informative common ancestors.
pub const PHENOTYPIC_ABNORMALITY: TermId = TermId::from_u32(118);
