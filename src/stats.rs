use serde::Serialize;
use statrs::distribution::{ContinuousCDF, StudentsT};

use crate::data::model::{RiboTable, Subunit};

// ---------------------------------------------------------------------------
// Descriptive statistics (sample semantics, ddof = 1)
// ---------------------------------------------------------------------------

/// Arithmetic mean; `None` for an empty slice.
pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}

/// Sample variance (n - 1 denominator); NaN with fewer than two values.
pub fn variance(values: &[f64]) -> f64 {
    let n = values.len();
    if n < 2 {
        return f64::NAN;
    }
    let m = values.iter().sum::<f64>() / n as f64;
    values.iter().map(|x| (x - m).powi(2)).sum::<f64>() / (n - 1) as f64
}

/// Sample standard deviation; NaN with fewer than two values.
pub fn std_dev(values: &[f64]) -> f64 {
    variance(values).sqrt()
}

/// Quantile with linear interpolation between closest ranks.
pub fn quantile(values: &[f64], q: f64) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    let pos = q.clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    sorted[lo] + (sorted[hi] - sorted[lo]) * (pos - lo as f64)
}

// ---------------------------------------------------------------------------
// Welch's unequal-variance t-test
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Serialize)]
pub struct WelchResult {
    pub statistic: f64,
    pub df: f64,
    /// Two-sided p-value, not corrected for multiple comparisons.
    pub p_value: f64,
}

impl WelchResult {
    fn undefined() -> Self {
        WelchResult {
            statistic: f64::NAN,
            df: f64::NAN,
            p_value: f64::NAN,
        }
    }
}

/// Two-sided Welch's t-test of `a` against `b`.
///
/// Fewer than two observations in a sample, or two constant samples with the
/// same mean, give NaN everywhere.  Constant samples with different means
/// give an infinite statistic and p = 0.
pub fn welch_t_test(a: &[f64], b: &[f64]) -> WelchResult {
    if a.len() < 2 || b.len() < 2 {
        return WelchResult::undefined();
    }
    let (na, nb) = (a.len() as f64, b.len() as f64);
    let diff = a.iter().sum::<f64>() / na - b.iter().sum::<f64>() / nb;
    let (va, vb) = (variance(a) / na, variance(b) / nb);
    let se2 = va + vb;

    if se2 == 0.0 {
        if diff == 0.0 {
            return WelchResult::undefined();
        }
        return WelchResult {
            statistic: diff.signum() * f64::INFINITY,
            df: f64::NAN,
            p_value: 0.0,
        };
    }

    let statistic = diff / se2.sqrt();
    let df = se2.powi(2) / (va.powi(2) / (na - 1.0) + vb.powi(2) / (nb - 1.0));
    let p_value = match StudentsT::new(0.0, 1.0, df) {
        Ok(dist) => (2.0 * dist.sf(statistic.abs())).clamp(0.0, 1.0),
        Err(e) => {
            log::warn!("Student's t with df = {df} unavailable: {e}");
            f64::NAN
        }
    };

    WelchResult {
        statistic,
        df,
        p_value,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MeanComparison {
    MeansDiffer,
    MeansEqual,
}

impl MeanComparison {
    /// `p < alpha` rejects equal means; a NaN p-value never does.
    pub fn from_p_value(p: f64, alpha: f64) -> Self {
        if p < alpha {
            MeanComparison::MeansDiffer
        } else {
            MeanComparison::MeansEqual
        }
    }
}

// ---------------------------------------------------------------------------
// Per-condition subunit summary
// ---------------------------------------------------------------------------

/// Subunit means, 30S/50S ratio and Welch comparison of one condition.
#[derive(Debug, Clone, Serialize)]
pub struct ConditionSummary {
    pub condition: String,
    pub mean_30s: Option<f64>,
    pub mean_50s: Option<f64>,
    pub ratio: Option<f64>,
    pub welch: WelchResult,
    pub comparison: MeanComparison,
}

pub fn summarize_conditions(table: &RiboTable, alpha: f64) -> Vec<ConditionSummary> {
    table
        .conditions
        .iter()
        .enumerate()
        .map(|(i, condition)| {
            let small = table.column(i, Some(Subunit::ThirtyS));
            let large = table.column(i, Some(Subunit::FiftyS));
            let mean_30s = mean(&small);
            let mean_50s = mean(&large);
            let welch = welch_t_test(&small, &large);
            ConditionSummary {
                condition: condition.clone(),
                mean_30s,
                mean_50s,
                ratio: mean_30s.zip(mean_50s).map(|(s, l)| s / l),
                comparison: MeanComparison::from_p_value(welch.p_value, alpha),
                welch,
            }
        })
        .collect()
}

/// Spread of the 30S/50S ratio across conditions.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct RatioSummary {
    pub mean: f64,
    pub std: f64,
    pub variance: f64,
    pub cv: f64,
    pub q1: f64,
    pub median: f64,
    pub q3: f64,
}

impl RatioSummary {
    pub fn from_ratios(ratios: &[Option<f64>]) -> Option<Self> {
        let present: Vec<f64> = ratios.iter().filter_map(|r| *r).collect();
        let mean = mean(&present)?;
        let std = std_dev(&present);
        Some(RatioSummary {
            mean,
            std,
            variance: variance(&present),
            cv: std / mean,
            q1: quantile(&present, 0.25),
            median: quantile(&present, 0.5),
            q3: quantile(&present, 0.75),
        })
    }
}

// ---------------------------------------------------------------------------
// Outlier detection
// ---------------------------------------------------------------------------

/// Indices whose value lies more than `k` sample standard deviations from
/// the mean of the present values.  Missing values are never flagged.
pub fn deviating_indices(values: &[Option<f64>], k: f64) -> Vec<usize> {
    let present: Vec<f64> = values.iter().filter_map(|v| *v).collect();
    let Some(m) = mean(&present) else {
        return Vec::new();
    };
    let s = std_dev(&present);
    values
        .iter()
        .enumerate()
        .filter(|(_, v)| v.is_some_and(|x| x < m - k * s || x > m + k * s))
        .map(|(i, _)| i)
        .collect()
}

/// Conditions whose 30S/50S ratio deviates by more than `k` standard deviations.
pub fn outlier_conditions(summaries: &[ConditionSummary], k: f64) -> Vec<usize> {
    let ratios: Vec<Option<f64>> = summaries.iter().map(|s| s.ratio).collect();
    deviating_indices(&ratios, k)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GeneOutlier {
    pub gene: String,
    /// Number of flagged conditions in which the gene deviates.
    pub conditions: usize,
}

/// Genes that deviate in at least one flagged condition, in table order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct OutlierGenes(pub Vec<GeneOutlier>);

impl OutlierGenes {
    pub fn get(&self, gene: &str) -> Option<usize> {
        self.0.iter().find(|o| o.gene == gene).map(|o| o.conditions)
    }

    pub fn genes(&self) -> Vec<&str> {
        self.0.iter().map(|o| o.gene.as_str()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }
}

/// Count, per gene, the flagged conditions in which its concentration lies
/// more than `k` standard deviations from that condition's mean.
pub fn gene_outliers(table: &RiboTable, conditions: &[usize], k: f64) -> OutlierGenes {
    let mut counts = vec![0usize; table.len()];
    for &c in conditions {
        let column: Vec<Option<f64>> = table
            .genes
            .iter()
            .map(|g| g.concentrations.get(c).copied().flatten())
            .collect();
        for row in deviating_indices(&column, k) {
            counts[row] += 1;
        }
    }

    OutlierGenes(
        table
            .genes
            .iter()
            .zip(counts)
            .filter(|(_, n)| *n > 0)
            .map(|(g, n)| GeneOutlier {
                gene: g.gene.clone(),
                conditions: n,
            })
            .collect(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::model::RiboGene;

    fn gene(name: &str, subunit: Subunit, values: &[f64]) -> RiboGene {
        RiboGene {
            gene: name.to_string(),
            subunit,
            mw_fg: Some(1.0),
            concentrations: values.iter().map(|&v| Some(v)).collect(),
        }
    }

    fn table(width: usize, genes: Vec<RiboGene>) -> RiboTable {
        RiboTable {
            conditions: (0..width).map(|i| format!("c{i}")).collect(),
            genes,
        }
    }

    #[test]
    fn descriptive_statistics() {
        let v = [1.0, 2.0, 3.0, 4.0];
        assert_eq!(mean(&v), Some(2.5));
        assert!((variance(&v) - 5.0 / 3.0).abs() < 1e-12);
        assert!(variance(&[1.0]).is_nan());
        assert_eq!(mean(&[]), None);
        assert_eq!(quantile(&v, 0.25), 1.75);
        assert_eq!(quantile(&v, 0.5), 2.5);
        assert_eq!(quantile(&[4.0, 1.0, 3.0, 2.0], 0.75), 3.25);
    }

    #[test]
    fn welch_reference_value() {
        let r = welch_t_test(&[1.0, 2.0, 3.0, 4.0, 5.0], &[2.0, 4.0, 6.0, 8.0, 10.0]);
        assert!((r.statistic + 1.897_366_596).abs() < 1e-6);
        assert!((r.df - 5.882_352_941).abs() < 1e-6);
        assert!((r.p_value - 0.107_53).abs() < 1e-3);
    }

    #[test]
    fn welch_zero_variance_identical_samples() {
        let r = welch_t_test(&[5.0; 4], &[5.0; 4]);
        assert!(r.p_value.is_nan() || r.p_value == 1.0);
        assert_eq!(
            MeanComparison::from_p_value(r.p_value, 0.05),
            MeanComparison::MeansEqual
        );
    }

    #[test]
    fn welch_zero_variance_different_means() {
        let r = welch_t_test(&[5.0; 4], &[6.0; 4]);
        assert_eq!(r.p_value, 0.0);
        assert_eq!(r.statistic, f64::NEG_INFINITY);
    }

    #[test]
    fn welch_keeps_tiny_p_values() {
        let a = [100.0, 100.1, 99.9, 100.05, 99.95];
        let b = [0.0, 0.1, -0.1, 0.05, -0.05];
        let r = welch_t_test(&a, &b);
        assert!(r.statistic > 1000.0);
        assert!(r.p_value > 0.0 && r.p_value < 1e-15);
    }

    #[test]
    fn welch_needs_two_observations() {
        assert!(welch_t_test(&[1.0], &[1.0, 2.0]).p_value.is_nan());
    }

    #[test]
    fn equal_subunit_means_give_ratio_one() {
        let t = table(
            1,
            vec![
                gene("rpsA", Subunit::ThirtyS, &[3.0]),
                gene("rpsB", Subunit::ThirtyS, &[5.0]),
                gene("rplB", Subunit::FiftyS, &[4.0]),
            ],
        );
        let summary = summarize_conditions(&t, 0.05);
        assert_eq!(summary[0].ratio, Some(1.0));
        assert_eq!(summary[0].mean_30s, Some(4.0));
    }

    #[test]
    fn ratio_without_50s_is_missing() {
        let t = table(1, vec![gene("rpsA", Subunit::ThirtyS, &[3.0])]);
        assert_eq!(summarize_conditions(&t, 0.05)[0].ratio, None);
    }

    #[test]
    fn ratio_summary_matches_hand_values() {
        let s = RatioSummary::from_ratios(&[Some(1.0), None, Some(2.0), Some(3.0)]).unwrap();
        assert_eq!(s.mean, 2.0);
        assert_eq!(s.variance, 1.0);
        assert_eq!(s.cv, 0.5);
        assert_eq!((s.q1, s.median, s.q3), (1.5, 2.0, 2.5));
        assert!(RatioSummary::from_ratios(&[None]).is_none());
    }

    #[test]
    fn flags_deviating_ratio() {
        let ratios = [Some(1.0), Some(1.0), None, Some(1.0), Some(1.0), Some(2.0)];
        assert_eq!(deviating_indices(&ratios, 1.0), vec![5]);
    }

    #[test]
    fn counts_gene_outliers_across_flagged_conditions() {
        let mut genes: Vec<RiboGene> = (0..10)
            .map(|i| gene(&format!("rps{i}"), Subunit::ThirtyS, &[1.0; 5]))
            .collect();
        genes.push(gene("G", Subunit::FiftyS, &[100.0, 100.0, 100.0, 1.0, 1.0]));
        let t = table(5, genes);

        let outliers = gene_outliers(&t, &[0, 1, 2, 3, 4], 2.0);
        assert_eq!(outliers.get("G"), Some(3));
        assert_eq!(outliers.len(), 1);
        assert_eq!(outliers.get("rps0"), None);

        let fewer = gene_outliers(&t, &[0, 3], 2.0);
        assert_eq!(fewer.get("G"), Some(1));
    }
}
