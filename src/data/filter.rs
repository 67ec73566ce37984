use std::collections::BTreeSet;

use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::index::sample;

use super::model::RiboTable;

// ---------------------------------------------------------------------------
// Row filters
// ---------------------------------------------------------------------------

/// Remove the named genes from the table.
pub fn exclude_genes(table: RiboTable, excluded: &[String]) -> RiboTable {
    let excluded: BTreeSet<&str> = excluded.iter().map(String::as_str).collect();
    let RiboTable { conditions, genes } = table;
    let before = genes.len();
    let genes: Vec<_> = genes
        .into_iter()
        .filter(|g| !excluded.contains(g.gene.as_str()))
        .collect();
    if genes.len() != before {
        log::info!("Excluded {} gene(s): {:?}", before - genes.len(), excluded);
    }
    RiboTable { conditions, genes }
}

/// Names of genes whose concentration is zero in every condition.
pub fn all_zero_genes(table: &RiboTable) -> Vec<&str> {
    table
        .genes
        .iter()
        .filter(|g| g.concentrations.iter().all(|c| *c == Some(0.0)))
        .map(|g| g.gene.as_str())
        .collect()
}

// ---------------------------------------------------------------------------
// Column selection
// ---------------------------------------------------------------------------

/// Keep only the given condition columns, in the given order.
pub fn select_conditions(table: &RiboTable, indices: &[usize]) -> RiboTable {
    RiboTable {
        conditions: indices.iter().map(|&i| table.conditions[i].clone()).collect(),
        genes: table
            .genes
            .iter()
            .map(|g| {
                let mut g = g.clone();
                g.concentrations = indices.iter().map(|&i| g.concentrations[i]).collect();
                g
            })
            .collect(),
    }
}

/// Keep only the given genes, in the given order.  Unknown names are skipped.
pub fn select_genes<S: AsRef<str>>(table: &RiboTable, names: &[S]) -> RiboTable {
    RiboTable {
        conditions: table.conditions.clone(),
        genes: names
            .iter()
            .filter_map(|n| table.gene(n.as_ref()).cloned())
            .collect(),
    }
}

/// Pick `n` distinct condition indices at random, returned in table order.
///
/// With a seed the choice is reproducible.  `n` is clamped to `total`.
pub fn sample_conditions(total: usize, n: usize, seed: Option<u64>) -> Vec<usize> {
    let mut rng = match seed {
        Some(s) => StdRng::seed_from_u64(s),
        None => StdRng::from_entropy(),
    };
    let mut picked = sample(&mut rng, total, n.min(total)).into_vec();
    picked.sort_unstable();
    picked
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::model::{RiboGene, Subunit};

    fn ribo(genes: &[(&str, Vec<f64>)]) -> RiboTable {
        let width = genes.first().map_or(0, |(_, v)| v.len());
        RiboTable {
            conditions: (0..width).map(|i| format!("c{i}")).collect(),
            genes: genes
                .iter()
                .map(|(name, values)| RiboGene {
                    gene: name.to_string(),
                    subunit: Subunit::ThirtyS,
                    mw_fg: Some(1.0),
                    concentrations: values.iter().map(|&v| Some(v)).collect(),
                })
                .collect(),
        }
    }

    #[test]
    fn excludes_named_genes() {
        let table = ribo(&[("rpsA", vec![1.0]), ("ykgO", vec![0.0])]);
        let out = exclude_genes(table, &["ykgO".to_string()]);
        assert_eq!(out.len(), 1);
        assert!(out.gene("ykgO").is_none());
    }

    #[test]
    fn finds_all_zero_genes() {
        let table = ribo(&[("rpsA", vec![1.0, 0.0]), ("ykgO", vec![0.0, 0.0])]);
        assert_eq!(all_zero_genes(&table), vec!["ykgO"]);
    }

    #[test]
    fn selects_columns_and_rows() {
        let table = ribo(&[("rpsA", vec![1.0, 2.0, 3.0]), ("rplB", vec![4.0, 5.0, 6.0])]);
        let cols = select_conditions(&table, &[2, 0]);
        assert_eq!(cols.conditions, vec!["c2", "c0"]);
        assert_eq!(cols.genes[1].concentrations, vec![Some(6.0), Some(4.0)]);

        let rows = select_genes(&table, &["rplB", "missing"]);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows.genes[0].gene, "rplB");
    }

    #[test]
    fn seeded_sampling_is_reproducible() {
        let a = sample_conditions(60, 15, Some(7));
        let b = sample_conditions(60, 15, Some(7));
        assert_eq!(a, b);
        assert_eq!(a.len(), 15);
        assert!(a.windows(2).all(|w| w[0] < w[1]));
        assert!(a.iter().all(|&i| i < 60));
    }

    #[test]
    fn sampling_clamps_to_available() {
        assert_eq!(sample_conditions(4, 15, Some(1)), vec![0, 1, 2, 3]);
        assert!(sample_conditions(0, 15, None).is_empty());
    }
}
