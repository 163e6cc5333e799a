use std::fmt::Display;

use serde::{de, Deserialize, Deserializer, Serialize, Serializer};

use crate::{LiricalError, LiricalResult};

/// A unique identifier of a gene, e.g. `NCBIGene:3106`
#[derive(Clone, Copy, Debug, Default, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub struct GeneId {
    inner: u32,
}

impl GeneId {
    /// Creates a new `GeneId` from the numerical NCBI gene id
    pub const fn from_u32(inner: u32) -> Self {
        GeneId { inner }
    }

    /// Returns the numerical part of the gene id
    pub const fn as_u32(self) -> u32 {
        self.inner
    }
}

impl From<u32> for GeneId {
    fn from(inner: u32) -> Self {
        GeneId { inner }
    }
}

impl TryFrom<&str> for GeneId {
    type Error = LiricalError;

    fn try_from(value: &str) -> LiricalResult<Self> {
        let err = || LiricalError::InvalidGeneId(value.to_string());
        let id = value.strip_prefix("NCBIGene:").ok_or_else(err)?;
        let inner = id.parse::<u32>().map_err(|_| err())?;
        Ok(GeneId { inner })
    }
}

impl Display for GeneId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "NCBIGene:{}", self.inner)
    }
}

impl Serialize for GeneId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for GeneId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        GeneId::try_from(s.as_str()).map_err(de::Error::custom)
    }
}

/// Summary of the variants observed in one gene of the proband
///
/// The upstream variant annotation pipeline counts the ClinVar-pathogenic
/// variants and sums the predicted pathogenicity-bin scores of all
/// variants in the gene. The individual variants are only carried along
/// as pre-rendered strings for reporting; the core never interprets
/// them.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct Gene2Genotype {
    gene_id: GeneId,
    symbol: String,
    pathogenic_clinvar_count: u32,
    sum_of_path_bin_scores: f64,
    variants: Vec<String>,
}

impl Gene2Genotype {
    /// Creates a new genotype summary for a gene
    pub fn new(
        gene_id: GeneId,
        symbol: &str,
        pathogenic_clinvar_count: u32,
        sum_of_path_bin_scores: f64,
        variants: Vec<String>,
    ) -> Self {
        Gene2Genotype {
            gene_id,
            symbol: symbol.to_string(),
            pathogenic_clinvar_count,
            sum_of_path_bin_scores,
            variants,
        }
    }

    /// Creates an empty summary for a gene without observed variants
    pub fn empty(gene_id: GeneId) -> Self {
        Gene2Genotype {
            gene_id,
            ..Gene2Genotype::default()
        }
    }

    /// Returns the [`GeneId`] of the gene
    pub fn gene_id(&self) -> GeneId {
        self.gene_id
    }

    /// Returns the gene symbol, e.g. `HLA-B`
    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    /// Returns the number of ClinVar-pathogenic variants observed in the gene
    pub fn pathogenic_clinvar_count(&self) -> u32 {
        self.pathogenic_clinvar_count
    }

    /// Returns `true` if at least one ClinVar-pathogenic variant was observed
    pub fn has_pathogenic_clinvar_variant(&self) -> bool {
        self.pathogenic_clinvar_count > 0
    }

    /// Returns the sum of the predicted pathogenicity-bin scores
    pub fn sum_of_path_bin_scores(&self) -> f64 {
        self.sum_of_path_bin_scores
    }

    /// Returns the observed variants as pre-rendered report strings
    pub fn variants(&self) -> &[String] {
        &self.variants
    }
}
