//! Evaluation of a patient case against the whole disease corpus
//!
//! The [`CaseEvaluator`] drives the analysis: for every disease it
//! collects one likelihood ratio per observed and excluded query term
//! (plus an optional genotype ratio), multiplies them into a composite,
//! converts the pretest odds into a posttest probability and finally
//! ranks all diseases into a [`ResultRanking`].

mod case;
mod evaluator;
mod result;

pub use case::HpoCase;
pub use evaluator::{CancelToken, CaseEvaluator, CaseEvaluatorBuilder};
pub use result::{ResultRanking, TestResult};
