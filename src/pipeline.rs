use std::fs;
use std::path::PathBuf;

use anyhow::{ensure, Context, Result};
use serde::Serialize;

use crate::color::{generate_palette, subunit_color};
use crate::config::AnalysisConfig;
use crate::data::model::{RiboTable, Subunit};
use crate::data::{filter, loader, merge};
use crate::plot::{self, BoxGroup, ChartText, HeatmapScale};
use crate::stats::{self, ConditionSummary, MeanComparison, OutlierGenes, RatioSummary};

pub const HEATMAP_FILE: &str = "ribo_mori_set_norm.png";
pub const DISPERSION_FILE: &str = "dispersion_15_cond.png";
pub const SUBUNIT_BOX_FILE: &str = "dispersion_30S_50S.png";
pub const RATIO_FILE: &str = "30S_50S_ratio.png";
pub const OUTLIER_BARS_FILE: &str = "outliers_mori.png";
pub const OUTLIER_HEATMAP_FILE: &str = "heatmap_rp_variaciones.png";
pub const SUMMARY_FILE: &str = "summary.json";

/// Results of one run, also written to `summary.json`.
#[derive(Debug, Clone, Serialize)]
pub struct Report {
    pub genes: usize,
    pub genes_30s: usize,
    pub genes_50s: usize,
    pub conditions: Vec<ConditionSummary>,
    pub means_differ: usize,
    pub means_equal: usize,
    pub ratio_summary: Option<RatioSummary>,
    pub outlier_conditions: Vec<String>,
    pub outlier_genes: OutlierGenes,
    pub sampled_conditions: Vec<String>,
    pub images: Vec<PathBuf>,
}

/// Load, merge and analyse the inputs named by `config`, writing every
/// chart and the summary into `config.output_dir`.
pub fn run(config: &AnalysisConfig) -> Result<Report> {
    let out = &config.output_dir;
    if out.is_dir() {
        log::info!("Output directory {} already exists", out.display());
    } else {
        fs::create_dir_all(out).with_context(|| format!("creating {}", out.display()))?;
        log::info!("Created output directory {}", out.display());
    }

    let table = load_table(config)?;
    let mut images = Vec::new();

    let path = out.join(HEATMAP_FILE);
    plot::heatmap(
        &path,
        &table,
        HeatmapScale::Sequential,
        ChartText {
            title: "Ribosomal protein abundance in E. coli (copies per µm³)",
            x_desc: "Growth condition",
            y_desc: "Ribosomal protein",
        },
    )?;
    images.push(path);

    for gene in filter::all_zero_genes(&table) {
        if !config.excluded_genes.iter().any(|g| g == gene) {
            log::warn!("Gene {gene} is zero in every condition but is not excluded");
        }
    }
    let table = filter::exclude_genes(table, &config.excluded_genes);

    // Dispersion of a random subset of conditions.
    let picked = filter::sample_conditions(
        table.conditions.len(),
        config.sample_conditions,
        config.seed,
    );
    let sampled = filter::select_conditions(&table, &picked);
    let path = out.join(DISPERSION_FILE);
    let groups: Vec<BoxGroup> = sampled
        .conditions
        .iter()
        .zip(generate_palette(sampled.conditions.len()))
        .enumerate()
        .map(|(i, (c, color))| BoxGroup {
            label: c.clone(),
            values: sampled.column(i, None),
            color,
        })
        .collect();
    plot::boxplot(
        &path,
        &groups,
        ChartText {
            title: &format!("Ribosomal protein abundance, {} random conditions", groups.len()),
            x_desc: "Growth condition",
            y_desc: "Copies per µm³",
        },
    )?;
    images.push(path);

    // 30S vs 50S: pooled dispersion and per-condition Welch tests.
    let path = out.join(SUBUNIT_BOX_FILE);
    let groups: Vec<BoxGroup> = [Subunit::ThirtyS, Subunit::FiftyS]
        .into_iter()
        .map(|s| BoxGroup {
            label: s.to_string(),
            values: table.pooled(s),
            color: subunit_color(s),
        })
        .collect();
    plot::boxplot(
        &path,
        &groups,
        ChartText {
            title: "Ribosomal protein abundance by subunit",
            x_desc: "Ribosomal subunit",
            y_desc: "Copies per µm³",
        },
    )?;
    images.push(path);

    let summaries = stats::summarize_conditions(&table, config.alpha);
    let means_differ = summaries
        .iter()
        .filter(|s| s.comparison == MeanComparison::MeansDiffer)
        .count();
    let means_equal = summaries.len() - means_differ;
    log::info!(
        "Welch test (alpha = {}): means differ in {means_differ} condition(s), equal in {means_equal}",
        config.alpha
    );

    let path = out.join(RATIO_FILE);
    plot::ratio_bars(
        &path,
        &summaries,
        ChartText {
            title: "30S/50S ratio - Mori et al. (2021)",
            x_desc: "30S/50S ratio",
            y_desc: "Growth condition",
        },
    )?;
    images.push(path);

    // Outlier conditions and the genes driving them.
    let ratios: Vec<Option<f64>> = summaries.iter().map(|s| s.ratio).collect();
    let ratio_summary = RatioSummary::from_ratios(&ratios);
    if let Some(rs) = &ratio_summary {
        log::info!(
            "30S/50S ratio: mean {:.3}, sd {:.3}, cv {:.3}, quartiles {:.3} / {:.3} / {:.3}",
            rs.mean,
            rs.std,
            rs.cv,
            rs.q1,
            rs.median,
            rs.q3
        );
    }
    let flagged = stats::outlier_conditions(&summaries, config.ratio_sd_threshold);
    let outlier_genes = stats::gene_outliers(&table, &flagged, config.gene_sd_threshold);
    log::info!(
        "{} outlier condition(s), {} gene(s) deviating within them",
        flagged.len(),
        outlier_genes.len()
    );

    let title = "Ribosomal proteins linked to 30S/50S ratio changes";
    let path = out.join(OUTLIER_BARS_FILE);
    plot::outlier_bars(
        &path,
        &outlier_genes,
        ChartText {
            title,
            x_desc: "Ribosomal protein",
            y_desc: "Number of conditions",
        },
    )?;
    images.push(path);

    let focus = filter::select_genes(&filter::select_conditions(&table, &flagged), &outlier_genes.genes());
    let path = out.join(OUTLIER_HEATMAP_FILE);
    plot::heatmap(
        &path,
        &focus,
        HeatmapScale::Diverging,
        ChartText {
            title,
            x_desc: "Growth condition",
            y_desc: "Ribosomal protein",
        },
    )?;
    images.push(path);

    let images = images.into_iter().filter(|p| p.exists()).collect();
    let report = Report {
        genes: table.len(),
        genes_30s: table.genes.iter().filter(|g| g.subunit == Subunit::ThirtyS).count(),
        genes_50s: table.genes.iter().filter(|g| g.subunit == Subunit::FiftyS).count(),
        outlier_conditions: flagged.iter().map(|&i| table.conditions[i].clone()).collect(),
        sampled_conditions: sampled.conditions,
        conditions: summaries,
        means_differ,
        means_equal,
        ratio_summary,
        outlier_genes,
        images,
    };

    let path = out.join(SUMMARY_FILE);
    let json = serde_json::to_string_pretty(&report).context("serialising summary")?;
    fs::write(&path, json).with_context(|| format!("writing {}", path.display()))?;
    log::info!("Summary saved: {}", path.display());

    Ok(report)
}

/// Read every input and produce the annotated concentration table.
pub fn load_table(config: &AnalysisConfig) -> Result<RiboTable> {
    let weights = loader::load_fasta_weights(&config.fasta)?;
    let genes = loader::load_gene_list(&config.gene_list, &weights)?;
    ensure!(!genes.is_empty(), "{} lists no genes", config.gene_list.display());

    let [first, second] = &config.proteomics;
    let first = loader::load_proteomics(&first.path, &first.sheet)?;
    let second = loader::load_proteomics(&second.path, &second.sheet)?;
    let proteomics = merge::concat(first, second)?;
    ensure!(!proteomics.is_empty(), "proteomics tables have no gene rows");

    let table = merge::annotate(&genes, &proteomics, config.cell_dry_mass_fg)?;
    ensure!(
        !table.is_empty(),
        "none of the {} listed genes is a 30S/50S protein in the proteomics tables",
        genes.len()
    );
    Ok(table)
}
