use std::collections::BTreeSet;

use thiserror::Error;

use super::model::{GeneList, ProteomicsTable, RiboGene, RiboTable, Subunit};
use super::weight::DALTON_TO_FG;

#[derive(Debug, Error, PartialEq)]
pub enum MergeError {
    #[error(
        "proteomics tables do not share gene order ({first_len} vs {second_len} rows, first difference at row {position}); refusing to concatenate"
    )]
    GeneOrderMismatch {
        first_len: usize,
        second_len: usize,
        position: usize,
    },
    #[error("gene '{0}' appears more than once after filtering")]
    DuplicateGene(String),
}

// ---------------------------------------------------------------------------
// Concatenation of the two proteomics sheets
// ---------------------------------------------------------------------------

/// Place the condition columns of `second` to the right of `first`.
///
/// Rows are aligned by position, so both tables must list the same gene
/// names in the same order; otherwise nothing is merged.  The identifier
/// columns of `second` are dropped.
pub fn concat(first: ProteomicsTable, second: ProteomicsTable) -> Result<ProteomicsTable, MergeError> {
    if let Some(position) = first_gene_mismatch(&first, &second) {
        return Err(MergeError::GeneOrderMismatch {
            first_len: first.len(),
            second_len: second.len(),
            position,
        });
    }

    let ProteomicsTable {
        mut conditions,
        mut rows,
    } = first;
    conditions.extend(second.conditions);
    for (row, other) in rows.iter_mut().zip(second.rows) {
        row.fractions.extend(other.fractions);
    }

    log::info!(
        "Concatenated proteomics tables: {} genes x {} conditions",
        rows.len(),
        conditions.len()
    );
    Ok(ProteomicsTable { conditions, rows })
}

fn first_gene_mismatch(first: &ProteomicsTable, second: &ProteomicsTable) -> Option<usize> {
    let differing = first
        .gene_names()
        .zip(second.gene_names())
        .position(|(a, b)| a != b);
    match differing {
        Some(pos) => Some(pos),
        None if first.len() != second.len() => Some(first.len().min(second.len())),
        None => None,
    }
}

// ---------------------------------------------------------------------------
// Annotation: membership filter, subunit tagging, concentrations
// ---------------------------------------------------------------------------

/// Convert a mass fraction into copies per µm³.
///
/// `cell_dry_mass_fg` is the biomass per cell in femtograms and `mw_fg` the
/// protein mass in femtograms.  A missing input gives a missing result.
pub fn concentration(fraction: Option<f64>, mw_fg: Option<f64>, cell_dry_mass_fg: f64) -> Option<f64> {
    Some(fraction? * cell_dry_mass_fg / mw_fg?)
}

/// Build the ribosomal concentration table.
///
/// Proteomics rows whose gene is not in `genes` are dropped, the remaining
/// genes are tagged with their subunit and genes that are neither 30S nor
/// 50S are removed.  Each remaining gene must appear once.
pub fn annotate(
    genes: &GeneList,
    proteomics: &ProteomicsTable,
    cell_dry_mass_fg: f64,
) -> Result<RiboTable, MergeError> {
    let subunits = genes.subunits();
    let weights = genes.weights_by_gene();

    let mut seen = BTreeSet::new();
    let mut out = Vec::new();
    for row in &proteomics.rows {
        let Some(&subunit) = subunits.get(row.gene.as_str()) else {
            continue;
        };
        if subunit == Subunit::Other {
            log::debug!("Dropping non-ribosomal gene {}", row.gene);
            continue;
        }
        if !seen.insert(row.gene.as_str()) {
            return Err(MergeError::DuplicateGene(row.gene.clone()));
        }

        let mw_fg = weights
            .get(row.gene.as_str())
            .copied()
            .flatten()
            .map(|da| da * DALTON_TO_FG);
        if mw_fg.is_none() {
            log::warn!("Gene {} has no molecular weight; concentrations are missing", row.gene);
        }

        out.push(RiboGene {
            gene: row.gene.clone(),
            subunit,
            mw_fg,
            concentrations: row
                .fractions
                .iter()
                .map(|&f| concentration(f, mw_fg, cell_dry_mass_fg))
                .collect(),
        });
    }

    log::info!(
        "{} ribosomal genes matched in proteomics ({} listed)",
        out.len(),
        subunits.len()
    );
    Ok(RiboTable {
        conditions: proteomics.conditions.clone(),
        genes: out,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::model::{GeneRecord, ProteomicsRow};

    fn table(conditions: &[&str], rows: &[(&str, Vec<f64>)]) -> ProteomicsTable {
        ProteomicsTable {
            conditions: conditions.iter().map(|c| c.to_string()).collect(),
            rows: rows
                .iter()
                .map(|(gene, values)| ProteomicsRow {
                    gene: gene.to_string(),
                    locus: format!("{gene}_locus"),
                    protein_id: format!("{gene}_id"),
                    fractions: values.iter().map(|&v| Some(v)).collect(),
                })
                .collect(),
        }
    }

    fn gene_list(entries: &[(&str, &str, Option<f64>)]) -> GeneList {
        GeneList::new(
            entries
                .iter()
                .map(|(protein, gene, mw)| GeneRecord {
                    protein: protein.to_string(),
                    gene: gene.to_string(),
                    molecular_weight: *mw,
                })
                .collect(),
        )
    }

    #[test]
    fn concat_appends_conditions() {
        let a = table(&["c1", "c2"], &[("rpsA", vec![0.1, 0.2]), ("rplB", vec![0.3, 0.4])]);
        let b = table(&["c3"], &[("rpsA", vec![0.5]), ("rplB", vec![0.6])]);
        let (cols_a, cols_b) = (a.column_count(), b.column_count());

        let merged = concat(a, b).unwrap();
        assert_eq!(merged.column_count(), cols_a + cols_b - 3);
        assert_eq!(merged.conditions, vec!["c1", "c2", "c3"]);
        assert_eq!(merged.rows[1].fractions, vec![Some(0.3), Some(0.4), Some(0.6)]);
    }

    #[test]
    fn concat_refuses_different_order() {
        let a = table(&["c1"], &[("rpsA", vec![0.1]), ("rplB", vec![0.3])]);
        let b = table(&["c2"], &[("rplB", vec![0.5]), ("rpsA", vec![0.6])]);
        assert_eq!(
            concat(a, b),
            Err(MergeError::GeneOrderMismatch {
                first_len: 2,
                second_len: 2,
                position: 0
            })
        );
    }

    #[test]
    fn concat_refuses_different_length() {
        let a = table(&["c1"], &[("rpsA", vec![0.1]), ("rplB", vec![0.3])]);
        let b = table(&["c2"], &[("rpsA", vec![0.5])]);
        assert!(matches!(
            concat(a, b),
            Err(MergeError::GeneOrderMismatch { position: 1, .. })
        ));
    }

    #[test]
    fn concentration_formula_and_missing() {
        let c = concentration(Some(0.01), Some(2.0), 135.0).unwrap();
        assert!((c - 0.675).abs() < 1e-12);
        assert_eq!(concentration(None, Some(2.0), 135.0), None);
        assert_eq!(concentration(Some(0.01), None, 135.0), None);
    }

    #[test]
    fn concentration_is_monotonic_in_fraction() {
        let mw = Some(30_000.0 * DALTON_TO_FG);
        let mut last = f64::NEG_INFINITY;
        for i in 0..100 {
            let c = concentration(Some(i as f64 * 1e-4), mw, 135.0).unwrap();
            assert!(c >= last);
            last = c;
        }
    }

    #[test]
    fn annotate_classifies_and_drops_other() {
        let genes = gene_list(&[
            ("b1234_30S_ribosomal_protein", "rpsA", Some(61_000.0)),
            ("50S_ribosomal_protein_L2", "rplB", Some(29_000.0)),
            ("ribosome_modulation_factor", "rmf", Some(6_500.0)),
        ]);
        let proteomics = table(
            &["c1"],
            &[
                ("rpsA", vec![0.01]),
                ("rplB", vec![0.02]),
                ("rmf", vec![0.001]),
                ("lacZ", vec![0.5]),
            ],
        );

        let ribo = annotate(&genes, &proteomics, 135.0).unwrap();
        assert_eq!(ribo.len(), 2);
        assert_eq!(ribo.gene("rpsA").unwrap().subunit, Subunit::ThirtyS);
        assert_eq!(ribo.gene("rplB").unwrap().subunit, Subunit::FiftyS);
        assert!(ribo.gene("rmf").is_none());
        assert!(ribo
            .genes
            .iter()
            .all(|g| matches!(g.subunit, Subunit::ThirtyS | Subunit::FiftyS)));

        let rpsa = ribo.gene("rpsA").unwrap();
        let expected = 0.01 * 135.0 / (61_000.0 * DALTON_TO_FG);
        assert!((rpsa.concentrations[0].unwrap() - expected).abs() / expected < 1e-12);
    }

    #[test]
    fn annotate_drops_exactly_one_unclassified_gene() {
        let genes = gene_list(&[
            ("30S_ribosomal_protein_S1", "rpsA", Some(61_000.0)),
            ("50S_ribosomal_protein_L2", "rplB", Some(29_000.0)),
            ("RNA_chaperone_Hfq", "hfq", Some(11_000.0)),
        ]);
        let proteomics = table(
            &["c1"],
            &[("rpsA", vec![0.01]), ("rplB", vec![0.02]), ("hfq", vec![0.003])],
        );
        let ribo = annotate(&genes, &proteomics, 135.0).unwrap();
        assert_eq!(ribo.len(), proteomics.len() - 1);
        assert!(ribo.gene("hfq").is_none());
    }

    #[test]
    fn missing_weight_propagates() {
        let genes = gene_list(&[("30S_ribosomal_protein_S1", "rpsA", None)]);
        let proteomics = table(&["c1", "c2"], &[("rpsA", vec![0.01, 0.02])]);
        let ribo = annotate(&genes, &proteomics, 135.0).unwrap();
        assert_eq!(ribo.genes[0].concentrations, vec![None, None]);
    }

    #[test]
    fn duplicate_gene_is_refused() {
        let genes = gene_list(&[("30S_ribosomal_protein_S1", "rpsA", Some(61_000.0))]);
        let proteomics = table(&["c1"], &[("rpsA", vec![0.01]), ("rpsA", vec![0.02])]);
        assert_eq!(
            annotate(&genes, &proteomics, 135.0),
            Err(MergeError::DuplicateGene("rpsA".into()))
        );
    }

    #[test]
    fn duplicated_non_ribosomal_gene_is_tolerated() {
        let genes = gene_list(&[
            ("30S_ribosomal_protein_S1", "rpsA", Some(61_000.0)),
            ("ribosome_modulation_factor", "rmf", Some(6_500.0)),
        ]);
        let proteomics = table(
            &["c1"],
            &[("rpsA", vec![0.01]), ("rmf", vec![0.001]), ("rmf", vec![0.002])],
        );
        let ribo = annotate(&genes, &proteomics, 135.0).unwrap();
        assert_eq!(ribo.len(), 1);
        assert!(ribo.gene("rpsA").is_some());

        let proteomics = table(
            &["c1"],
            &[("rpsA", vec![0.01]), ("rmf", vec![0.001]), ("rpsA", vec![0.02])],
        );
        assert_eq!(
            annotate(&genes, &proteomics, 135.0),
            Err(MergeError::DuplicateGene("rpsA".into()))
        );
    }
}
