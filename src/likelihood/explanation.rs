use serde::Serialize;

use crate::TermId;

/// The way a query term relates to the annotations of a disease
///
/// Every likelihood ratio is derived from exactly one of these cases.
/// The reporting layer uses the kind to phrase why a term counted for
/// or against a disease.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LrMatchKind {
    /// The query term directly annotates the disease
    ExactMatch,
    /// The query term is an ancestor of an annotated term
    QueryIsAncestorOfDiseaseTerm,
    /// The query term is a descendant of an annotated term
    QueryIsDescendantOfDiseaseTerm,
    /// Query and disease only share a common ancestor below the
    /// phenotype root
    NonRootCommonAncestor,
    /// No relation except the phenotype root
    NoMatch,
    /// The observed query term is explicitly excluded in the disease
    QueryExplicitlyExcludedInDisease,
    /// The excluded query term is explicitly excluded in the disease
    ExcludedQueryMatchesExcludedInDisease,
    /// The excluded query term is not annotated to the disease
    ExcludedQueryNotInDisease,
    /// The excluded query term is annotated to the disease
    ExcludedQueryInDisease,
    /// The background frequency of the query term is implausibly high
    UnusualBackground,
}

/// One likelihood ratio together with the matching case it came from
///
/// `matched_term` names the disease annotation (or common ancestor) the
/// query was matched against, where one exists.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct LrWithExplanation {
    query_term: TermId,
    matched_term: Option<TermId>,
    lr: f64,
    kind: LrMatchKind,
}

impl LrWithExplanation {
    fn new(query_term: TermId, matched_term: Option<TermId>, lr: f64, kind: LrMatchKind) -> Self {
        LrWithExplanation {
            query_term,
            matched_term,
            lr,
            kind,
        }
    }

    pub(crate) fn exact_match(query_term: TermId, lr: f64) -> Self {
        Self::new(query_term, Some(query_term), lr, LrMatchKind::ExactMatch)
    }

    pub(crate) fn query_ancestor_of_disease_term(
        query_term: TermId,
        disease_term: TermId,
        lr: f64,
    ) -> Self {
        Self::new(
            query_term,
            Some(disease_term),
            lr,
            LrMatchKind::QueryIsAncestorOfDiseaseTerm,
        )
    }

    pub(crate) fn query_descendant_of_disease_term(
        query_term: TermId,
        disease_term: TermId,
        lr: f64,
    ) -> Self {
        Self::new(
            query_term,
            Some(disease_term),
            lr,
            LrMatchKind::QueryIsDescendantOfDiseaseTerm,
        )
    }

    pub(crate) fn non_root_common_ancestor(query_term: TermId, ancestor: TermId, lr: f64) -> Self {
        Self::new(
            query_term,
            Some(ancestor),
            lr,
            LrMatchKind::NonRootCommonAncestor,
        )
    }

    pub(crate) fn no_match(query_term: TermId, lr: f64) -> Self {
        Self::new(query_term, None, lr, LrMatchKind::NoMatch)
    }

    pub(crate) fn query_excluded_in_disease(query_term: TermId, lr: f64) -> Self {
        Self::new(
            query_term,
            None,
            lr,
            LrMatchKind::QueryExplicitlyExcludedInDisease,
        )
    }

    pub(crate) fn excluded_query_excluded_in_disease(query_term: TermId, lr: f64) -> Self {
        Self::new(
            query_term,
            Some(query_term),
            lr,
            LrMatchKind::ExcludedQueryMatchesExcludedInDisease,
        )
    }

    pub(crate) fn excluded_query_not_in_disease(query_term: TermId, lr: f64) -> Self {
        Self::new(query_term, None, lr, LrMatchKind::ExcludedQueryNotInDisease)
    }

    pub(crate) fn excluded_query_in_disease(query_term: TermId, lr: f64) -> Self {
        Self::new(query_term, None, lr, LrMatchKind::ExcludedQueryInDisease)
    }

    pub(crate) fn unusual_background(query_term: TermId, lr: f64) -> Self {
        Self::new(query_term, None, lr, LrMatchKind::UnusualBackground)
    }

    /// Returns the query term the ratio was calculated for
    pub fn query_term(&self) -> TermId {
        self.query_term
    }

    /// Returns the disease term the query was matched against, if any
    pub fn matched_term(&self) -> Option<TermId> {
        self.matched_term
    }

    /// Returns the likelihood ratio
    pub fn ratio(&self) -> f64 {
        self.lr
    }

    /// Returns the matching case the ratio was derived from
    pub fn kind(&self) -> LrMatchKind {
        self.kind
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn no_match_has_no_matched_term() {
        let lr = LrWithExplanation::no_match(118u32.into(), 0.01);
        assert_eq!(lr.matched_term(), None);
        assert_eq!(lr.kind(), LrMatchKind::NoMatch);
    }

    #[test]
    fn serializes_for_reporting() {
        let lr = LrWithExplanation::exact_match(1265u32.into(), 90.0);
        let json = serde_json::to_value(&lr).unwrap();
        assert_eq!(json["query_term"], "HP:0001265");
        assert_eq!(json["matched_term"], "HP:0001265");
        assert_eq!(json["kind"], "EXACT_MATCH");
    }
}
