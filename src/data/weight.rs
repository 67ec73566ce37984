use thiserror::Error;

/// Average mass of water, removed once per peptide bond.
const WATER_DA: f64 = 18.0153;

/// Daltons to femtograms.
pub const DALTON_TO_FG: f64 = 1.660_540_2e-9;

#[derive(Debug, Error, PartialEq)]
pub enum WeightError {
    #[error("empty protein sequence")]
    EmptySequence,
    #[error("unknown residue '{residue}' at position {position}")]
    UnknownResidue { residue: char, position: usize },
}

/// Average (IUPAC) mass of a free amino acid, in Daltons.
fn residue_weight(residue: u8) -> Option<f64> {
    let w = match residue.to_ascii_uppercase() {
        b'A' => 89.0932,
        b'C' => 121.1582,
        b'D' => 133.1027,
        b'E' => 147.1293,
        b'F' => 165.1891,
        b'G' => 75.0666,
        b'H' => 155.1546,
        b'I' => 131.1729,
        b'K' => 146.1876,
        b'L' => 131.1729,
        b'M' => 149.2113,
        b'N' => 132.1179,
        b'O' => 255.3134,
        b'P' => 115.1305,
        b'Q' => 146.1445,
        b'R' => 174.201,
        b'S' => 105.0926,
        b'T' => 119.1192,
        b'U' => 168.0532,
        b'V' => 117.1463,
        b'W' => 204.2252,
        b'Y' => 181.1885,
        _ => return None,
    };
    Some(w)
}

/// Average molecular weight of a protein sequence in Daltons.
///
/// A trailing stop codon (`*`) is ignored; any other unknown symbol is an error.
pub fn protein_weight(sequence: &[u8]) -> Result<f64, WeightError> {
    let sequence = sequence.strip_suffix(b"*").unwrap_or(sequence);
    if sequence.is_empty() {
        return Err(WeightError::EmptySequence);
    }

    let mut total = 0.0;
    for (position, &residue) in sequence.iter().enumerate() {
        total += residue_weight(residue).ok_or(WeightError::UnknownResidue {
            residue: residue as char,
            position,
        })?;
    }

    Ok(total - (sequence.len() - 1) as f64 * WATER_DA)
}
