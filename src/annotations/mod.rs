//! Diseases, genes and their phenotype annotations
//!
//! The types in this module model the curated corpus the likelihood
//! ratios are computed against: [`HpoDisease`] records with positive,
//! negated and mode-of-inheritance annotations, collected in an
//! immutable [`DiseaseStore`], and the per-gene genotype summaries
//! ([`Gene2Genotype`]) delivered by an upstream variant annotation
//! pipeline.

mod disease;
mod gene;

pub(crate) use disease::collapse;
pub use disease::{
    DiseaseDb, DiseaseId, DiseaseStore, DiseaseStoreBuilder, HpoAnnotation, HpoDisease,
};
pub use gene::{Gene2Genotype, GeneId};
