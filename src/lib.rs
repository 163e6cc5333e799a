#![doc = include_str!("../README.md")]
use std::num::ParseIntError;

use thiserror::Error;

pub mod analysis;
pub mod annotations;
pub mod background;
pub mod likelihood;
mod ontology;
pub mod term;

pub use ontology::{Ontology, OntologyBuilder, OntologyIterator};
pub use term::{HpoTerm, TermGroup, TermId};

/// Error type of all fallible operations within the crate
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LiricalError {
    /// A term id that is not part of the ontology
    #[error("term does not exist: {0}")]
    UnknownTerm(TermId),
    /// A string that cannot be parsed into a [`TermId`]
    #[error("invalid term id: {0}")]
    InvalidTermId(String),
    /// A string that cannot be parsed into a [`annotations::DiseaseId`]
    #[error("invalid disease id: {0}")]
    InvalidDiseaseId(String),
    /// A string that cannot be parsed into a [`annotations::GeneId`]
    #[error("invalid gene id: {0}")]
    InvalidGeneId(String),
    /// The is-a edge set contains a cycle
    #[error("ontology contains a cycle involving {0}")]
    CyclicOntology(TermId),
    /// The ontology does not have exactly one non-obsolete root term
    #[error("ontology does not have a unique root term")]
    NoRoot,
    /// No disease was retained while building the disease store
    #[error("disease store does not contain any disease")]
    EmptyDiseaseStore,
    /// A required collaborator input was not provided to a builder
    #[error("missing collaborator input: {0}")]
    MissingCollaborator(&'static str),
    /// The evaluation was aborted through its [`analysis::CancelToken`]
    #[error("evaluation was cancelled")]
    Cancelled,
}

impl From<ParseIntError> for LiricalError {
    fn from(err: ParseIntError) -> Self {
        LiricalError::InvalidTermId(err.to_string())
    }
}

/// Result type of all fallible operations within the crate
pub type LiricalResult<T> = Result<T, LiricalError>;
