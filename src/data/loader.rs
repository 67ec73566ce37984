use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{Context, Result, bail};
use bio::io::fasta;
use calamine::{Data, Reader, open_workbook_auto};

use super::model::{
    GENE_LOCUS_COLUMN, GENE_NAME_COLUMN, GeneList, GeneRecord, PROTEIN_ID_COLUMN, ProteomicsRow,
    ProteomicsTable,
};
use super::weight::protein_weight;

// ---------------------------------------------------------------------------
// Proteomics tables
// ---------------------------------------------------------------------------

/// Load a proteomics abundance table.  Dispatch by extension.
///
/// Supported formats:
/// * `.xlsx` / `.xlsm` / `.xls` / `.xlsb` / `.ods` – the named `sheet` is read
/// * `.csv` – comma separated, `sheet` is ignored
/// * `.tsv` / `.txt` – tab separated, `sheet` is ignored
///
/// The first row is the header. `Gene name`, `Gene locus` and `Protein ID`
/// must be present; every other column is a growth condition.
pub fn load_proteomics(path: &Path, sheet: &str) -> Result<ProteomicsTable> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    let table = match ext.as_str() {
        "xlsx" | "xlsm" | "xls" | "xlsb" | "ods" => load_workbook(path, sheet),
        "csv" => load_delimited(path, b','),
        "tsv" | "txt" => load_delimited(path, b'\t'),
        other => bail!("Unsupported proteomics file extension: .{other}"),
    }
    .with_context(|| format!("loading proteomics table {}", path.display()))?;

    log::info!(
        "Loaded {} genes x {} conditions from {}",
        table.len(),
        table.conditions.len(),
        path.display()
    );
    Ok(table)
}

fn load_workbook(path: &Path, sheet: &str) -> Result<ProteomicsTable> {
    let mut workbook = open_workbook_auto(path).context("opening workbook")?;
    let range = workbook
        .worksheet_range(sheet)
        .with_context(|| format!("reading sheet '{sheet}'"))?;

    let mut rows = range.rows();
    let headers: Vec<String> = rows
        .next()
        .context("sheet is empty")?
        .iter()
        .map(cell_to_string)
        .collect();

    let body = rows.map(|row| {
        (0..headers.len())
            .map(|i| row.get(i).map(cell_to_string).unwrap_or_default())
            .collect::<Vec<String>>()
    });
    build_table(&headers, body)
}

fn cell_to_string(cell: &Data) -> String {
    match cell {
        Data::String(s) => s.clone(),
        Data::Float(f) => f.to_string(),
        Data::Int(i) => i.to_string(),
        Data::Bool(b) => b.to_string(),
        Data::Empty => String::new(),
        other => format!("{other:?}"),
    }
}

fn load_delimited(path: &Path, delimiter: u8) -> Result<ProteomicsTable> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .flexible(true)
        .from_path(path)
        .context("opening delimited file")?;
    let headers: Vec<String> = reader
        .headers()
        .context("reading headers")?
        .iter()
        .map(|h| h.to_string())
        .collect();

    let mut body = Vec::new();
    for (row_no, result) in reader.records().enumerate() {
        let record = result.with_context(|| format!("row {row_no}"))?;
        body.push(
            (0..headers.len())
                .map(|i| record.get(i).unwrap_or("").to_string())
                .collect::<Vec<String>>(),
        );
    }
    build_table(&headers, body)
}

/// Assemble a table from a header row and string cells.
fn build_table<I>(headers: &[String], body: I) -> Result<ProteomicsTable>
where
    I: IntoIterator<Item = Vec<String>>,
{
    let column = |name: &str| {
        headers
            .iter()
            .position(|h| h.trim() == name)
            .with_context(|| format!("missing '{name}' column"))
    };
    let gene_idx = column(GENE_NAME_COLUMN)?;
    let locus_idx = column(GENE_LOCUS_COLUMN)?;
    let protein_idx = column(PROTEIN_ID_COLUMN)?;

    let condition_cols: Vec<(usize, String)> = headers
        .iter()
        .enumerate()
        .filter(|(i, _)| ![gene_idx, locus_idx, protein_idx].contains(i))
        .map(|(i, h)| (i, h.trim().to_string()))
        .collect();

    let mut rows = Vec::new();
    for cells in body {
        let gene = cells[gene_idx].trim().to_string();
        if gene.is_empty() && cells.iter().all(|c| c.trim().is_empty()) {
            continue;
        }
        let fractions = condition_cols
            .iter()
            .map(|(i, _)| parse_fraction(&cells[*i]))
            .collect();
        rows.push(ProteomicsRow {
            gene,
            locus: cells[locus_idx].trim().to_string(),
            protein_id: cells[protein_idx].trim().to_string(),
            fractions,
        });
    }

    Ok(ProteomicsTable {
        conditions: condition_cols.into_iter().map(|(_, h)| h).collect(),
        rows,
    })
}

/// Empty or non-numeric cells are missing values.
fn parse_fraction(s: &str) -> Option<f64> {
    s.trim().parse::<f64>().ok().filter(|v| !v.is_nan())
}

// ---------------------------------------------------------------------------
// FASTA → molecular weights
// ---------------------------------------------------------------------------

/// Read a FASTA file and compute the molecular weight (Da) of every record,
/// keyed by record id.  Records whose weight cannot be computed are left out.
pub fn load_fasta_weights(path: &Path) -> Result<BTreeMap<String, f64>> {
    let reader = fasta::Reader::from_file(path)
        .with_context(|| format!("opening FASTA {}", path.display()))?;

    let mut weights = BTreeMap::new();
    for result in reader.records() {
        let record = result.with_context(|| format!("reading FASTA {}", path.display()))?;
        match protein_weight(record.seq()) {
            Ok(w) => {
                weights.insert(record.id().to_string(), w);
            }
            Err(e) => log::warn!("No molecular weight for {}: {e}", record.id()),
        }
    }

    log::info!("Computed {} molecular weights from {}", weights.len(), path.display());
    Ok(weights)
}

// ---------------------------------------------------------------------------
// Gene list (tab separated smart table)
// ---------------------------------------------------------------------------

/// Load the tab-separated gene list and attach molecular weights.
///
/// Only the `Proteins` and `Gene` columns are kept.  Whitespace inside the
/// protein identifier becomes `_` so it matches FASTA record ids.
pub fn load_gene_list(path: &Path, weights: &BTreeMap<String, f64>) -> Result<GeneList> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(b'\t')
        .flexible(true)
        .from_path(path)
        .with_context(|| format!("opening gene list {}", path.display()))?;
    let headers = reader.headers().context("reading gene list headers")?.clone();

    let proteins_idx = headers
        .iter()
        .position(|h| h.trim() == "Proteins")
        .context("gene list missing 'Proteins' column")?;
    let gene_idx = headers
        .iter()
        .position(|h| h.trim() == "Gene")
        .context("gene list missing 'Gene' column")?;

    let mut records = Vec::new();
    for (row_no, result) in reader.records().enumerate() {
        let record = result.with_context(|| format!("gene list row {row_no}"))?;
        let protein = normalize_identifier(record.get(proteins_idx).unwrap_or(""));
        let gene = record.get(gene_idx).unwrap_or("").trim().to_string();

        let molecular_weight = weights.get(&protein).copied();
        if molecular_weight.is_none() {
            log::warn!("No sequence for protein '{protein}' (gene '{gene}')");
        }
        records.push(GeneRecord {
            protein,
            gene,
            molecular_weight,
        });
    }

    log::info!("Loaded {} gene list rows from {}", records.len(), path.display());
    Ok(GeneList::new(records))
}

/// Replace every whitespace character with `_`.
pub fn normalize_identifier(s: &str) -> String {
    s.trim()
        .chars()
        .map(|c| if c.is_whitespace() { '_' } else { c })
        .collect()
}
