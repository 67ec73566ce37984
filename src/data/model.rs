use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;

/// Identifier columns shared by both proteomics spreadsheets.
pub const GENE_NAME_COLUMN: &str = "Gene name";
pub const GENE_LOCUS_COLUMN: &str = "Gene locus";
pub const PROTEIN_ID_COLUMN: &str = "Protein ID";
pub const IDENTIFIER_COLUMNS: [&str; 3] = [GENE_NAME_COLUMN, GENE_LOCUS_COLUMN, PROTEIN_ID_COLUMN];

// ---------------------------------------------------------------------------
// Subunit – ribosomal classification of a gene
// ---------------------------------------------------------------------------

/// Ribosomal subunit a gene product belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum Subunit {
    #[serde(rename = "30S")]
    ThirtyS,
    #[serde(rename = "50S")]
    FiftyS,
    #[serde(rename = "other")]
    Other,
}

impl Subunit {
    /// Classify a gene from the protein identifiers listed for it.
    ///
    /// Priority is fixed: if any identifier mentions `30S` the gene is
    /// [`Subunit::ThirtyS`], even when another identifier mentions `50S`.
    /// Only then is `50S` considered. Anything else is [`Subunit::Other`].
    pub fn classify<'a, I>(identifiers: I) -> Subunit
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut seen_fifty = false;
        for id in identifiers {
            if id.contains("30S") {
                return Subunit::ThirtyS;
            }
            seen_fifty |= id.contains("50S");
        }
        if seen_fifty {
            Subunit::FiftyS
        } else {
            Subunit::Other
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Subunit::ThirtyS => "30S",
            Subunit::FiftyS => "50S",
            Subunit::Other => "other",
        }
    }
}

impl fmt::Display for Subunit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

// ---------------------------------------------------------------------------
// Gene list – curated ribosomal genes with molecular weights
// ---------------------------------------------------------------------------

/// One row of the curated gene list.
#[derive(Debug, Clone, PartialEq)]
pub struct GeneRecord {
    /// Protein identifier, whitespace replaced by underscores.
    pub protein: String,
    /// Gene symbol.
    pub gene: String,
    /// Average molecular weight in Daltons; `None` when no sequence matched.
    pub molecular_weight: Option<f64>,
}

#[derive(Debug, Clone, Default)]
pub struct GeneList {
    pub records: Vec<GeneRecord>,
}

impl GeneList {
    pub fn new(records: Vec<GeneRecord>) -> Self {
        GeneList { records }
    }

    /// Group protein identifiers by gene symbol.
    pub fn identifiers_by_gene(&self) -> BTreeMap<&str, Vec<&str>> {
        let mut grouped: BTreeMap<&str, Vec<&str>> = BTreeMap::new();
        for rec in &self.records {
            grouped
                .entry(rec.gene.as_str())
                .or_default()
                .push(rec.protein.as_str());
        }
        grouped
    }

    /// Subunit of every listed gene, classified in one pass over the
    /// gene → identifiers relation.
    pub fn subunits(&self) -> BTreeMap<&str, Subunit> {
        self.identifiers_by_gene()
            .into_iter()
            .map(|(gene, ids)| (gene, Subunit::classify(ids)))
            .collect()
    }

    /// Molecular weight of each gene, taken from its first listed row.
    pub fn weights_by_gene(&self) -> BTreeMap<&str, Option<f64>> {
        let mut weights = BTreeMap::new();
        for rec in &self.records {
            weights
                .entry(rec.gene.as_str())
                .or_insert(rec.molecular_weight);
        }
        weights
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Proteomics table – mass fractions per growth condition
// ---------------------------------------------------------------------------

/// One gene row of a proteomics sheet.
#[derive(Debug, Clone, PartialEq)]
pub struct ProteomicsRow {
    pub gene: String,
    pub locus: String,
    pub protein_id: String,
    /// Mass fraction per condition, aligned with [`ProteomicsTable::conditions`].
    pub fractions: Vec<Option<f64>>,
}

/// Wide abundance table: one row per gene, one value column per condition.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProteomicsTable {
    pub conditions: Vec<String>,
    pub rows: Vec<ProteomicsRow>,
}

impl ProteomicsTable {
    /// Total column count, identifier columns included.
    pub fn column_count(&self) -> usize {
        IDENTIFIER_COLUMNS.len() + self.conditions.len()
    }

    pub fn gene_names(&self) -> impl Iterator<Item = &str> {
        self.rows.iter().map(|r| r.gene.as_str())
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

// ---------------------------------------------------------------------------
// RiboTable – annotated ribosomal genes as concentrations
// ---------------------------------------------------------------------------

/// A ribosomal gene with its concentrations (copies per µm³).
#[derive(Debug, Clone, PartialEq)]
pub struct RiboGene {
    pub gene: String,
    pub subunit: Subunit,
    /// Molecular weight in femtograms.
    pub mw_fg: Option<f64>,
    /// Concentration per condition; missing when the fraction or weight is.
    pub concentrations: Vec<Option<f64>>,
}

/// Gene-indexed concentration table restricted to 30S / 50S genes.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RiboTable {
    pub conditions: Vec<String>,
    pub genes: Vec<RiboGene>,
}

impl RiboTable {
    pub fn len(&self) -> usize {
        self.genes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.genes.is_empty()
    }

    pub fn gene(&self, name: &str) -> Option<&RiboGene> {
        self.genes.iter().find(|g| g.gene == name)
    }

    /// Present values of one condition column, optionally restricted to a subunit.
    pub fn column(&self, condition: usize, subunit: Option<Subunit>) -> Vec<f64> {
        self.genes
            .iter()
            .filter(|g| subunit.map_or(true, |s| g.subunit == s))
            .filter_map(|g| g.concentrations.get(condition).copied().flatten())
            .collect()
    }

    /// Every present value of a subunit, pooled over all conditions.
    pub fn pooled(&self, subunit: Subunit) -> Vec<f64> {
        self.genes
            .iter()
            .filter(|g| g.subunit == subunit)
            .flat_map(|g| g.concentrations.iter().filter_map(|c| *c))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(protein: &str, gene: &str, mw: Option<f64>) -> GeneRecord {
        GeneRecord {
            protein: protein.to_string(),
            gene: gene.to_string(),
            molecular_weight: mw,
        }
    }

    #[test]
    fn classify_prefers_30s() {
        assert_eq!(
            Subunit::classify(["b1234_30S_ribosomal_protein"]),
            Subunit::ThirtyS
        );
        assert_eq!(
            Subunit::classify(["50S_ribosomal_protein_L2", "30S_ribosomal_protein_S1"]),
            Subunit::ThirtyS
        );
        assert_eq!(Subunit::classify(["50S_ribosomal_protein_L2"]), Subunit::FiftyS);
        assert_eq!(Subunit::classify(["elongation_factor_Tu"]), Subunit::Other);
        assert_eq!(Subunit::classify(std::iter::empty()), Subunit::Other);
    }

    #[test]
    fn classify_is_case_sensitive() {
        assert_eq!(Subunit::classify(["30s_ribosomal_protein"]), Subunit::Other);
    }

    #[test]
    fn gene_list_groups_and_weights() {
        let list = GeneList::new(vec![
            record("50S_ribosomal_protein_L7", "rplL", Some(12_000.0)),
            record("50S_ribosomal_protein_L12", "rplL", Some(13_000.0)),
            record("30S_ribosomal_protein_S1", "rpsA", None),
        ]);
        let grouped = list.identifiers_by_gene();
        assert_eq!(grouped["rplL"].len(), 2);
        assert_eq!(list.subunits()["rpsA"], Subunit::ThirtyS);
        assert_eq!(list.weights_by_gene()["rplL"], Some(12_000.0));
        assert_eq!(list.weights_by_gene()["rpsA"], None);
    }

    #[test]
    fn column_count_includes_identifiers() {
        let table = ProteomicsTable {
            conditions: vec!["glucose".into(), "acetate".into()],
            rows: Vec::new(),
        };
        assert_eq!(table.column_count(), 5);
    }

    #[test]
    fn ribo_table_columns_skip_missing() {
        let table = RiboTable {
            conditions: vec!["c1".into()],
            genes: vec![
                RiboGene {
                    gene: "rpsA".into(),
                    subunit: Subunit::ThirtyS,
                    mw_fg: Some(1.0),
                    concentrations: vec![Some(2.0)],
                },
                RiboGene {
                    gene: "rplB".into(),
                    subunit: Subunit::FiftyS,
                    mw_fg: None,
                    concentrations: vec![None],
                },
            ],
        };
        assert_eq!(table.column(0, None), vec![2.0]);
        assert!(table.column(0, Some(Subunit::FiftyS)).is_empty());
        assert_eq!(table.pooled(Subunit::ThirtyS), vec![2.0]);
    }
}
