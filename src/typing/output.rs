//! Tab-separated prediction output

use super::classifier::{ClassificationResult, Confidence};
use std::io::{BufRead, Write};

/// Header row of the prediction table
pub const TSV_HEADER: &str = "protein_id\ttype\tconfidence\tprobability\te_value\tscore\thmm_model";

/// Format a number like printf's `%.<precision>g`: fixed or scientific
/// notation depending on the exponent, trailing zeros removed.
pub fn format_general(value: f64, precision: usize) -> String {
    if value.is_nan() {
        return "nan".to_string();
    }
    if value.is_infinite() {
        return if value > 0.0 { "inf" } else { "-inf" }.to_string();
    }
    if value == 0.0 {
        return "0".to_string();
    }

    let precision = precision.max(1);
    let scientific = format!("{:.*e}", precision - 1, value);
    let (mantissa, exponent) = match scientific.split_once('e') {
        Some(parts) => parts,
        None => return scientific,
    };
    let exponent: i32 = exponent.parse().unwrap_or(0);

    if exponent < -4 || exponent >= precision as i32 {
        let sign = if exponent < 0 { '-' } else { '+' };
        format!(
            "{}e{}{:02}",
            trim_fraction(mantissa),
            sign,
            exponent.unsigned_abs()
        )
    } else {
        let decimals = (precision as i32 - 1 - exponent).max(0) as usize;
        trim_fraction(&format!("{:.*}", decimals, value)).to_string()
    }
}

fn trim_fraction(s: &str) -> &str {
    if s.contains('.') {
        s.trim_end_matches('0').trim_end_matches('.')
    } else {
        s
    }
}

/// Format one result as a table row (without newline)
pub fn format_row(result: &ClassificationResult) -> String {
    format!(
        "{}\t{}\t{}\t{:.1}\t{}\t{:?}\t{}",
        result.query_id,
        result.family_label,
        result.confidence,
        result.probability,
        format_general(result.e_value, 4),
        result.score,
        result.source_model
    )
}

/// Write the header and one row per result
pub fn write_tsv<W: Write>(mut writer: W, results: &[ClassificationResult]) -> std::io::Result<()> {
    writeln!(writer, "{}", TSV_HEADER)?;
    for result in results {
        writeln!(writer, "{}", format_row(result))?;
    }
    writer.flush()
}

/// Read a prediction table back. Probability and e-value carry the
/// rounding applied when written.
pub fn read_tsv<R: BufRead>(reader: R) -> anyhow::Result<Vec<ClassificationResult>> {
    let mut results = Vec::new();

    for (number, line) in reader.lines().enumerate() {
        let line = line?;
        if number == 0 {
            if line != TSV_HEADER {
                anyhow::bail!("unexpected header: {}", line);
            }
            continue;
        }
        if line.trim().is_empty() {
            continue;
        }

        let fields: Vec<&str> = line.split('\t').collect();
        if fields.len() != 7 {
            anyhow::bail!("line {}: expected 7 columns, found {}", number + 1, fields.len());
        }

        results.push(ClassificationResult {
            query_id: fields[0].to_string(),
            family_label: fields[1].to_string(),
            confidence: fields[2]
                .parse::<Confidence>()
                .map_err(|e| anyhow::anyhow!("line {}: {}", number + 1, e))?,
            probability: fields[3].parse()?,
            e_value: fields[4].parse()?,
            score: fields[5].parse()?,
            source_model: fields[6].to_string(),
        });
    }

    Ok(results)
}
