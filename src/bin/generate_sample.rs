use std::fs;
use std::io::Write;
use std::path::Path;

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

const AMINO_ACIDS: &[u8] = b"ACDEFGHIKLMNPQRSTVWY";

struct Gene {
    symbol: String,
    protein: String,
    /// Mean mass fraction at the reference growth rate.
    fraction: f64,
    /// Subunit-specific response to the condition (30S vs 50S drift).
    small_subunit: bool,
}

fn random_sequence(rng: &mut StdRng, len: usize) -> String {
    let mut seq = String::with_capacity(len);
    seq.push('M');
    for _ in 1..len {
        seq.push(*AMINO_ACIDS.choose(rng).unwrap() as char);
    }
    seq
}

fn ribosomal_genes(rng: &mut StdRng) -> Vec<Gene> {
    let mut genes = Vec::new();
    for (i, letter) in ('A'..='U').enumerate() {
        genes.push(Gene {
            symbol: format!("rps{letter}"),
            protein: format!("30S ribosomal subunit protein S{}", i + 1),
            fraction: rng.gen_range(0.002..0.006),
            small_subunit: true,
        });
    }
    for (i, letter) in ('A'..='Y').enumerate() {
        genes.push(Gene {
            symbol: format!("rpl{letter}"),
            protein: format!("50S ribosomal subunit protein L{}", i + 1),
            fraction: rng.gen_range(0.002..0.006),
            small_subunit: false,
        });
    }
    genes.push(Gene {
        symbol: "ykgO".to_string(),
        protein: "50S ribosomal subunit protein L36 2".to_string(),
        fraction: 0.0,
        small_subunit: false,
    });
    genes
}

fn write_sheet(
    path: &Path,
    rows: &[(String, Vec<f64>)],
    conditions: &[String],
) -> Result<(), csv::Error> {
    let mut writer = csv::Writer::from_path(path)?;
    let mut header = vec![
        "Gene name".to_string(),
        "Gene locus".to_string(),
        "Protein ID".to_string(),
    ];
    header.extend(conditions.iter().cloned());
    writer.write_record(&header)?;

    for (i, (gene, values)) in rows.iter().enumerate() {
        let mut record = vec![gene.clone(), format!("b{:04}", 1000 + i), format!("P{:05}", i)];
        record.extend(values.iter().map(|v| format!("{v:.6e}")));
        writer.write_record(&record)?;
    }
    writer.flush()?;
    Ok(())
}

fn main() {
    let mut rng = StdRng::seed_from_u64(42);
    let out = Path::new("sample_data");
    fs::create_dir_all(out.join("inputs")).expect("Failed to create inputs dir");
    fs::create_dir_all(out.join("datasets")).expect("Failed to create datasets dir");

    let genes = ribosomal_genes(&mut rng);

    // Gene list and sequences
    let mut list = fs::File::create(out.join("inputs/smart_table.txt")).expect("Failed to create gene list");
    let mut fasta =
        fs::File::create(out.join("inputs/proteinas_interes.fasta")).expect("Failed to create FASTA");
    writeln!(list, "Gene\tProteins\tAccession-1").unwrap();
    for g in &genes {
        writeln!(list, "{}\t{}\tEG{}", g.symbol, g.protein, g.symbol).unwrap();
        let len = rng.gen_range(50..250);
        writeln!(fasta, ">{}", g.protein.replace(' ', "_")).unwrap();
        writeln!(fasta, "{}", random_sequence(&mut rng, len)).unwrap();
    }
    writeln!(list, "rmf\tribosome modulation factor\tEGrmf").unwrap();
    writeln!(fasta, ">ribosome_modulation_factor\n{}", random_sequence(&mut rng, 55)).unwrap();

    // Proteomics: ribosomal genes plus some non-ribosomal background
    let background = ["lacZ", "tufA", "rmf", "groL", "dnaK", "ompA"];
    let sheets = [("ev8.csv", "Glucose"), ("ev9.csv", "Stress")];
    let n_conditions = 30;

    for (file_name, prefix) in sheets {
        let conditions: Vec<String> = (1..=n_conditions).map(|i| format!("{prefix}_{i}")).collect();
        // Growth-rate scaling per condition, and a 30S drift in a few of them.
        let growth: Vec<f64> = (0..n_conditions).map(|_| rng.gen_range(0.5..1.5)).collect();
        let drift: Vec<f64> = (0..n_conditions)
            .map(|_| if rng.gen_bool(0.1) { rng.gen_range(1.4..1.8) } else { 1.0 })
            .collect();

        let mut rows: Vec<(String, Vec<f64>)> = Vec::new();
        for g in &genes {
            let values = (0..n_conditions)
                .map(|c| {
                    let skew = if g.small_subunit { drift[c] } else { 1.0 };
                    g.fraction * growth[c] * skew * rng.gen_range(0.9..1.1)
                })
                .collect();
            rows.push((g.symbol.clone(), values));
        }
        for name in background {
            let values = (0..n_conditions).map(|_| rng.gen_range(0.0001..0.02)).collect();
            rows.push((name.to_string(), values));
        }

        write_sheet(&out.join("datasets").join(file_name), &rows, &conditions)
            .expect("Failed to write proteomics table");
    }

    let config = serde_json::json!({
        "proteomics": [
            { "path": "datasets/ev8.csv" },
            { "path": "datasets/ev9.csv" }
        ],
        "seed": 42
    });
    fs::write(
        out.join("ribo-stoich.json"),
        serde_json::to_string_pretty(&config).unwrap(),
    )
    .expect("Failed to write config");

    println!(
        "Wrote {} ribosomal genes x {} conditions to {}",
        genes.len(),
        2 * n_conditions,
        out.display()
    );
}
