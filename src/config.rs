use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Optional overrides file looked up in the base directory.
pub const CONFIG_FILE_NAME: &str = "ribo-stoich.json";

/// A proteomics table and the sheet to read from it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableSource {
    pub path: PathBuf,
    /// Worksheet name; ignored for delimited text files.
    #[serde(default)]
    pub sheet: String,
}

/// Everything a run needs, with every path already resolved.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisConfig {
    pub gene_list: PathBuf,
    pub fasta: PathBuf,
    pub proteomics: [TableSource; 2],
    pub output_dir: PathBuf,
    /// Dry biomass of one cell, femtograms.
    pub cell_dry_mass_fg: f64,
    /// Significance level of the per-condition Welch test.
    pub alpha: f64,
    /// Ratio deviation (in SDs) that flags a condition.
    pub ratio_sd_threshold: f64,
    /// Concentration deviation (in SDs) that flags a gene in a flagged condition.
    pub gene_sd_threshold: f64,
    /// Conditions shown in the dispersion box plot.
    pub sample_conditions: usize,
    pub seed: Option<u64>,
    /// Genes removed before any dispersion or outlier analysis.
    pub excluded_genes: Vec<String>,
}

// ---------------------------------------------------------------------------
// On-disk overrides
// ---------------------------------------------------------------------------

/// Contents of `ribo-stoich.json`; every field is optional and relative
/// paths are taken from the base directory.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ConfigFile {
    pub gene_list: Option<PathBuf>,
    pub fasta: Option<PathBuf>,
    pub proteomics: Option<[TableSource; 2]>,
    pub output_dir: Option<PathBuf>,
    pub cell_dry_mass_fg: Option<f64>,
    pub alpha: Option<f64>,
    pub ratio_sd_threshold: Option<f64>,
    pub gene_sd_threshold: Option<f64>,
    pub sample_conditions: Option<usize>,
    pub seed: Option<u64>,
    pub excluded_genes: Option<Vec<String>>,
}

impl ConfigFile {
    pub fn read(path: &Path) -> Result<ConfigFile> {
        let file = File::open(path).with_context(|| format!("opening {}", path.display()))?;
        serde_json::from_reader(BufReader::new(file))
            .with_context(|| format!("parsing {}", path.display()))
    }
}

impl AnalysisConfig {
    /// The fixed layout of the published data set under `base`.
    pub fn from_base_dir(base: &Path) -> AnalysisConfig {
        AnalysisConfig {
            gene_list: base.join("inputs/smart_table.txt"),
            fasta: base.join("inputs/proteinas_interes.fasta"),
            proteomics: [
                TableSource {
                    path: base.join("datasets/msb20209536-sup-0009-datasetev8.xlsx"),
                    sheet: "EV8-AbsoluteMassFractions-1".to_string(),
                },
                TableSource {
                    path: base.join("datasets/msb20209536-sup-0010-datasetev9.xlsx"),
                    sheet: "EV9-AbsoluteMassFractions-2".to_string(),
                },
            ],
            output_dir: base.join("imagenes"),
            cell_dry_mass_fg: 135.0,
            alpha: 0.05,
            ratio_sd_threshold: 1.0,
            gene_sd_threshold: 2.0,
            sample_conditions: 15,
            seed: None,
            excluded_genes: vec!["ykgO".to_string()],
        }
    }

    /// Defaults for `base`, overridden by `base/ribo-stoich.json` when present.
    pub fn load(base: &Path) -> Result<AnalysisConfig> {
        let path = base.join(CONFIG_FILE_NAME);
        let mut config = AnalysisConfig::from_base_dir(base);
        if path.is_file() {
            log::info!("Reading configuration from {}", path.display());
            config.apply(base, ConfigFile::read(&path)?);
        }
        Ok(config)
    }

    pub fn apply(&mut self, base: &Path, file: ConfigFile) {
        if let Some(p) = file.gene_list {
            self.gene_list = base.join(p);
        }
        if let Some(p) = file.fasta {
            self.fasta = base.join(p);
        }
        if let Some(sources) = file.proteomics {
            self.proteomics = sources.map(|s| TableSource {
                path: base.join(s.path),
                sheet: s.sheet,
            });
        }
        if let Some(p) = file.output_dir {
            self.output_dir = base.join(p);
        }
        if let Some(v) = file.cell_dry_mass_fg {
            self.cell_dry_mass_fg = v;
        }
        if let Some(v) = file.alpha {
            self.alpha = v;
        }
        if let Some(v) = file.ratio_sd_threshold {
            self.ratio_sd_threshold = v;
        }
        if let Some(v) = file.gene_sd_threshold {
            self.gene_sd_threshold = v;
        }
        if let Some(v) = file.sample_conditions {
            self.sample_conditions = v;
        }
        if file.seed.is_some() {
            self.seed = file.seed;
        }
        if let Some(v) = file.excluded_genes {
            self.excluded_genes = v;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_follow_published_layout() {
        let cfg = AnalysisConfig::from_base_dir(Path::new("/work"));
        assert_eq!(cfg.gene_list, Path::new("/work/inputs/smart_table.txt"));
        assert_eq!(cfg.proteomics[1].sheet, "EV9-AbsoluteMassFractions-2");
        assert_eq!(cfg.output_dir, Path::new("/work/imagenes"));
        assert_eq!(cfg.excluded_genes, vec!["ykgO"]);
    }

    #[test]
    fn missing_file_keeps_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = AnalysisConfig::load(dir.path()).unwrap();
        assert_eq!(cfg, AnalysisConfig::from_base_dir(dir.path()));
    }

    #[test]
    fn file_overrides_are_resolved_against_base() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join(CONFIG_FILE_NAME),
            r#"{
                "proteomics": [
                    {"path": "data/ev8.csv"},
                    {"path": "data/ev9.csv", "sheet": "ignored"}
                ],
                "output_dir": "out",
                "seed": 42,
                "excluded_genes": []
            }"#,
        )
        .unwrap();

        let cfg = AnalysisConfig::load(dir.path()).unwrap();
        assert_eq!(cfg.proteomics[0].path, dir.path().join("data/ev8.csv"));
        assert_eq!(cfg.proteomics[0].sheet, "");
        assert_eq!(cfg.output_dir, dir.path().join("out"));
        assert_eq!(cfg.seed, Some(42));
        assert!(cfg.excluded_genes.is_empty());
        assert_eq!(cfg.alpha, 0.05);
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(CONFIG_FILE_NAME), r#"{"alfa": 0.1}"#).unwrap();
        assert!(AnalysisConfig::load(dir.path()).is_err());
    }
}
