//! Delimited-text input and output
//!
//! Input files may be comma, semicolon or tab separated; the delimiter is
//! sniffed from the header line. Column names are normalized so `ID`/`id`
//! and `Texto Mascarado`/`texto_mascarado`/`texto` are all accepted.

use crate::domain::{Classification, FieldKind, PiiError, Record, Result};
use std::path::{Path, PathBuf};

/// Aggregate output columns, written before the per-field columns
pub const AGGREGATE_COLUMNS: [&str; 2] = ["nao_publico", "detector_prioritario"];

/// A parsed table with its original headers
#[derive(Debug, Clone)]
pub struct Table {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
    pub delimiter: u8,
}

impl Table {
    /// Index of the first header whose normalized form matches one of `names`
    ///
    /// Earlier names win over later ones.
    pub fn find_column(&self, names: &[&str]) -> Option<usize> {
        names.iter().find_map(|wanted| {
            self.headers
                .iter()
                .position(|header| normalize_header(header) == *wanted)
        })
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Lower-cases, trims and joins words with `_`
pub fn normalize_header(header: &str) -> String {
    header
        .trim()
        .trim_start_matches('\u{feff}')
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("_")
}

/// Picks the most frequent of `,`, `;` and tab in the first line
pub fn sniff_delimiter(sample: &str) -> u8 {
    let first_line = sample.lines().next().unwrap_or("");
    [b',', b';', b'\t']
        .into_iter()
        .map(|d| (d, first_line.bytes().filter(|b| *b == d).count()))
        .filter(|(_, count)| *count > 0)
        .max_by_key(|(_, count)| *count)
        .map(|(d, _)| d)
        .unwrap_or(b',')
}

/// Reads a delimited file into memory
pub fn read_table(path: impl AsRef<Path>) -> Result<Table> {
    let path = path.as_ref();
    let contents = std::fs::read_to_string(path).map_err(|e| {
        PiiError::InputShape(format!("Failed to read {}: {e}", path.display()))
    })?;
    parse_table(&contents)
}

/// Parses delimited text with a sniffed delimiter
pub fn parse_table(contents: &str) -> Result<Table> {
    let delimiter = sniff_delimiter(contents);
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .flexible(true)
        .from_reader(contents.as_bytes());

    let headers: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();
    if headers.iter().all(|h| h.trim().is_empty()) {
        return Err(PiiError::InputShape("Input has no header row".to_string()));
    }

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        let mut row: Vec<String> = record.iter().map(str::to_string).collect();
        row.resize(headers.len(), String::new());
        rows.push(row);
    }

    Ok(Table {
        headers,
        rows,
        delimiter,
    })
}

/// Builds records from the identifier and text columns
///
/// With `reuse_existing`, per-field columns already in the table are attached
/// as pre-computed values.
///
/// # Errors
///
/// Returns [`PiiError::InputShape`] when the identifier or text column is absent
pub fn load_records(table: &Table, reuse_existing: bool) -> Result<Vec<Record>> {
    let id_col = table.find_column(&["id"]);
    let text_col = table.find_column(&["texto_mascarado", "texto"]);

    let (id_col, text_col) = match (id_col, text_col) {
        (Some(id), Some(text)) => (id, text),
        _ => {
            let mut missing = Vec::new();
            if id_col.is_none() {
                missing.push("ID");
            }
            if text_col.is_none() {
                missing.push("Texto Mascarado");
            }
            return Err(PiiError::InputShape(format!(
                "Input must contain the columns {}; found: {}",
                missing.join(", "),
                table.headers.join(", ")
            )));
        }
    };

    let field_cols: Vec<(FieldKind, usize)> = if reuse_existing {
        FieldKind::PRIORITY
            .iter()
            .filter_map(|kind| table.find_column(&[kind.column()]).map(|idx| (*kind, idx)))
            .collect()
    } else {
        Vec::new()
    };

    Ok(table
        .rows
        .iter()
        .map(|row| {
            let text = row[text_col].clone();
            let text = if text.trim().is_empty() { None } else { Some(text) };
            field_cols.iter().fold(
                Record::new(row[id_col].trim(), text),
                |record, (kind, idx)| record.with_precomputed(*kind, row[*idx].clone()),
            )
        })
        .collect())
}

/// `<dir>/<stem>_classificado.csv`
pub fn default_output_path(input: &Path) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "saida".to_string());
    input.with_file_name(format!("{stem}_classificado.csv"))
}

fn output_value(classification: &Classification, column: &str) -> String {
    let flags = &classification.flags;
    match column {
        "nao_publico" => u8::from(flags.nao_publico).to_string(),
        "detector_prioritario" => flags
            .detector_prioritario
            .map(|kind| kind.column().to_string())
            .unwrap_or_default(),
        other => FieldKind::from_column(other)
            .map(|kind| u8::from(flags.get(kind)).to_string())
            .unwrap_or_default(),
    }
}

/// Writes the input table with the classification columns
///
/// Input columns are kept in place; output columns already present are
/// overwritten, the rest are appended. Rows and classifications are paired
/// by position.
pub fn write_classified(
    path: impl AsRef<Path>,
    table: &Table,
    classifications: &[Classification],
) -> Result<()> {
    if table.rows.len() != classifications.len() {
        return Err(PiiError::InputShape(format!(
            "{} rows but {} classifications",
            table.rows.len(),
            classifications.len()
        )));
    }

    let output_columns: Vec<&str> = AGGREGATE_COLUMNS
        .iter()
        .copied()
        .chain(FieldKind::OUTPUT_ORDER.iter().map(FieldKind::column))
        .collect();

    let mut headers = table.headers.clone();
    let mut positions = Vec::with_capacity(output_columns.len());
    for column in &output_columns {
        let idx = match table.find_column(&[column]) {
            Some(idx) => idx,
            None => {
                headers.push((*column).to_string());
                headers.len() - 1
            }
        };
        positions.push(idx);
    }

    let path = path.as_ref();
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    let mut writer = csv::WriterBuilder::new()
        .delimiter(table.delimiter)
        .from_path(path)?;
    writer.write_record(&headers)?;

    for (row, classification) in table.rows.iter().zip(classifications) {
        let mut out = row.clone();
        out.resize(headers.len(), String::new());
        for (column, idx) in output_columns.iter().zip(&positions) {
            out[*idx] = output_value(classification, column);
        }
        writer.write_record(&out)?;
    }
    writer.flush()?;
    Ok(())
}
