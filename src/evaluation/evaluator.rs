//! Scores predictions against a gold standard
//!
//! Both tables are joined on their identifier with an outer join: a row
//! present on one side only counts as 0 on the other. Identifiers repeated
//! on either side join as a cartesian product and trigger a warning. All
//! label cells go through the same 0/1 coercion as pre-computed detector
//! columns.
//!
//! When the gold table has no `nao_publico` column it is derived as the OR
//! of the five per-field columns, which must then all be present.

use super::metrics::{ConfusionMatrix, Metrics};
use crate::adapters::tabular::{normalize_header, read_table, Table};
use crate::detection::BinaryCoercer;
use crate::domain::{FieldKind, PiiError, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::path::Path;

const AGGREGATE: &str = "nao_publico";

/// One labelled row keyed by normalized column name
#[derive(Debug, Clone, PartialEq)]
pub struct LabelRow {
    pub id: String,
    pub values: BTreeMap<String, Option<String>>,
}

impl LabelRow {
    pub fn get(&self, column: &str) -> Option<&str> {
        self.values.get(column).and_then(|v| v.as_deref())
    }
}

/// Identifier plus label columns, from CSV or a JSON array of objects
#[derive(Debug, Clone, PartialEq)]
pub struct LabelTable {
    pub name: String,
    pub columns: Vec<String>,
    pub rows: Vec<LabelRow>,
}

fn json_cell(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        Value::Bool(b) => Some(if *b { "1" } else { "0" }.to_string()),
        Value::Number(n) => Some(n.to_string()),
        other => Some(other.to_string()),
    }
}

impl LabelTable {
    /// Reads a `.json` file as a JSON array, anything else as delimited text
    pub fn load(path: impl AsRef<Path>, name: &str) -> Result<Self> {
        let path = path.as_ref();
        let is_json = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
        if is_json {
            let content = std::fs::read_to_string(path).map_err(|e| {
                PiiError::Evaluation(format!("Failed to read {}: {e}", path.display()))
            })?;
            Self::from_json(&content, name)
        } else {
            Self::from_table(&read_table(path)?, name)
        }
    }

    pub fn from_table(table: &Table, name: &str) -> Result<Self> {
        let id_col = table
            .find_column(&["id"])
            .ok_or_else(|| PiiError::Evaluation(format!("{name} has no 'id' column")))?;
        let columns: Vec<String> = table.headers.iter().map(|h| normalize_header(h)).collect();
        let rows = table
            .rows
            .iter()
            .map(|row| LabelRow {
                id: row[id_col].trim().to_string(),
                values: columns
                    .iter()
                    .zip(row)
                    .map(|(column, cell)| (column.clone(), Some(cell.clone())))
                    .collect(),
            })
            .collect();
        Ok(Self {
            name: name.to_string(),
            columns,
            rows,
        })
    }

    pub fn from_json(content: &str, name: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(content)
            .map_err(|e| PiiError::Evaluation(format!("{name} is not valid JSON: {e}")))?;
        let Value::Array(items) = value else {
            return Err(PiiError::Evaluation(format!(
                "{name} must be a JSON array of objects"
            )));
        };

        let mut columns: Vec<String> = Vec::new();
        let mut rows = Vec::with_capacity(items.len());
        for item in &items {
            let Value::Object(object) = item else {
                return Err(PiiError::Evaluation(format!(
                    "{name} must be a JSON array of objects"
                )));
            };
            let values: BTreeMap<String, Option<String>> = object
                .iter()
                .map(|(key, value)| (normalize_header(key), json_cell(value)))
                .collect();
            for key in values.keys() {
                if !columns.contains(key) {
                    columns.push(key.clone());
                }
            }
            let id = values
                .get("id")
                .cloned()
                .flatten()
                .unwrap_or_default()
                .trim()
                .to_string();
            rows.push(LabelRow { id, values });
        }

        if !rows.is_empty() && !columns.iter().any(|c| c == "id") {
            return Err(PiiError::Evaluation(format!("{name} has no 'id' column")));
        }
        Ok(Self {
            name: name.to_string(),
            columns,
            rows,
        })
    }

    pub fn has_column(&self, column: &str) -> bool {
        self.columns.iter().any(|c| c == column)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationReport {
    pub aggregate: Metrics,
    pub per_field: BTreeMap<FieldKind, Metrics>,
    pub joined_rows: usize,
    pub predictions_only: usize,
    pub gold_only: usize,
    pub duplicate_ids: usize,
    /// True when the gold aggregate was derived from per-field columns
    pub gold_derived: bool,
}

impl EvaluationReport {
    pub fn format_console(&self) -> String {
        let rule = "───────────────────────────────────────────────────────────────\n";
        let mut output = String::new();
        output.push('\n');
        output.push_str("═══════════════════════════════════════════════════════════════\n");
        output.push_str("                     EVALUATION REPORT                         \n");
        output.push_str("═══════════════════════════════════════════════════════════════\n\n");

        output.push_str("🎯 NAO_PUBLICO\n");
        output.push_str(rule);
        output.push_str(&metrics_block(&self.aggregate));
        if self.gold_derived {
            output.push_str("  (gold derived from per-field columns)\n");
        }
        output.push('\n');

        if !self.per_field.is_empty() {
            output.push_str("🔍 PER FIELD\n");
            output.push_str(rule);
            output.push_str(&format!(
                "  {:12} {:>5} {:>5} {:>5} {:>10} {:>8} {:>8}\n",
                "field", "tp", "fp", "fn", "precision", "recall", "f1"
            ));
            for (kind, m) in &self.per_field {
                output.push_str(&format!(
                    "  {:12} {:>5} {:>5} {:>5} {:>10.4} {:>8.4} {:>8.4}\n",
                    kind.column(),
                    m.counts.tp,
                    m.counts.fp,
                    m.counts.fn_,
                    m.precision,
                    m.recall,
                    m.f1
                ));
            }
            output.push('\n');
        }

        output.push_str("🔗 JOIN\n");
        output.push_str(rule);
        output.push_str(&format!("  Joined rows:        {}\n", self.joined_rows));
        output.push_str(&format!("  Predictions only:   {}\n", self.predictions_only));
        output.push_str(&format!("  Gold only:          {}\n", self.gold_only));
        output.push_str(&format!("  Duplicate ids:      {}\n", self.duplicate_ids));
        output.push_str("═══════════════════════════════════════════════════════════════\n");
        output
    }

    pub fn format_json(&self) -> std::result::Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

fn metrics_block(m: &Metrics) -> String {
    format!(
        "  tp={} fp={} fn={} tn={}\n  precision={:.4} recall={:.4} f1={:.4}\n",
        m.counts.tp, m.counts.fp, m.counts.fn_, m.counts.tn, m.precision, m.recall, m.f1
    )
}

/// Joined row pairs as indices into the prediction and gold tables
struct Join {
    pairs: Vec<(Option<usize>, Option<usize>)>,
    predictions_only: usize,
    gold_only: usize,
    duplicate_ids: usize,
}

fn outer_join(predictions: &LabelTable, gold: &LabelTable) -> Join {
    let mut order: Vec<&str> = Vec::new();
    let mut pred_rows: HashMap<&str, Vec<usize>> = HashMap::new();
    let mut gold_rows: HashMap<&str, Vec<usize>> = HashMap::new();

    for (idx, row) in predictions.rows.iter().enumerate() {
        let entry = pred_rows.entry(row.id.as_str()).or_default();
        if entry.is_empty() {
            order.push(row.id.as_str());
        }
        entry.push(idx);
    }
    for (idx, row) in gold.rows.iter().enumerate() {
        let entry = gold_rows.entry(row.id.as_str()).or_default();
        if entry.is_empty() && !pred_rows.contains_key(row.id.as_str()) {
            order.push(row.id.as_str());
        }
        entry.push(idx);
    }

    let empty = Vec::new();
    let mut join = Join {
        pairs: Vec::new(),
        predictions_only: 0,
        gold_only: 0,
        duplicate_ids: 0,
    };
    for id in order {
        let p = pred_rows.get(id).unwrap_or(&empty);
        let g = gold_rows.get(id).unwrap_or(&empty);
        if p.len() > 1 || g.len() > 1 {
            join.duplicate_ids += 1;
        }
        match (p.is_empty(), g.is_empty()) {
            (false, true) => {
                join.predictions_only += p.len();
                join.pairs.extend(p.iter().map(|i| (Some(*i), None)));
            }
            (true, false) => {
                join.gold_only += g.len();
                join.pairs.extend(g.iter().map(|j| (None, Some(*j))));
            }
            _ => {
                for i in p {
                    join.pairs.extend(g.iter().map(|j| (Some(*i), Some(*j))));
                }
            }
        }
    }
    if join.duplicate_ids > 0 {
        tracing::warn!(
            duplicate_ids = join.duplicate_ids,
            "Duplicate identifiers joined as a cartesian product"
        );
    }
    join
}

/// Gold aggregate per gold row
fn gold_aggregate(gold: &LabelTable, coercer: &BinaryCoercer) -> Result<(Vec<u8>, bool)> {
    if gold.has_column(AGGREGATE) {
        let label = format!("{}.{AGGREGATE}", gold.name);
        let values = gold
            .rows
            .iter()
            .map(|row| coercer.coerce(&label, row.get(AGGREGATE)))
            .collect();
        return Ok((values, false));
    }

    let missing: Vec<&str> = FieldKind::PRIORITY
        .iter()
        .map(FieldKind::column)
        .filter(|column| !gold.has_column(column))
        .collect();
    if !missing.is_empty() {
        return Err(PiiError::Evaluation(format!(
            "{} has neither '{AGGREGATE}' nor the per-field columns; missing: {}",
            gold.name,
            missing.join(", ")
        )));
    }
    let values = gold
        .rows
        .iter()
        .map(|row| {
            let any = FieldKind::PRIORITY.iter().any(|kind| {
                let label = format!("{}.{}", gold.name, kind.column());
                coercer.coerce(&label, row.get(kind.column())) == 1
            });
            u8::from(any)
        })
        .collect();
    Ok((values, true))
}

fn column_values(table: &LabelTable, column: &str, coercer: &BinaryCoercer) -> Vec<u8> {
    let label = format!("{}.{column}", table.name);
    table
        .rows
        .iter()
        .map(|row| coercer.coerce(&label, row.get(column)))
        .collect()
}

fn score(join: &Join, predicted: &[u8], expected: &[u8]) -> Metrics {
    ConfusionMatrix::from_pairs(join.pairs.iter().map(|(p, g)| {
        (
            p.map(|i| predicted[i]).unwrap_or(0),
            g.map(|j| expected[j]).unwrap_or(0),
        )
    }))
    .metrics()
}

/// Scores the aggregate and every per-field column present on both sides
///
/// # Errors
///
/// Returns [`PiiError::Evaluation`] when the predictions lack `nao_publico`
/// or the gold table can provide neither the aggregate nor all five
/// per-field columns.
pub fn evaluate(predictions: &LabelTable, gold: &LabelTable) -> Result<EvaluationReport> {
    if !predictions.has_column(AGGREGATE) && !predictions.is_empty() {
        return Err(PiiError::Evaluation(format!(
            "{} has no '{AGGREGATE}' column",
            predictions.name
        )));
    }

    let coercer = BinaryCoercer::new();
    let (gold_values, gold_derived) = gold_aggregate(gold, &coercer)?;
    let predicted = column_values(predictions, AGGREGATE, &coercer);
    let join = outer_join(predictions, gold);

    let aggregate = score(&join, &predicted, &gold_values);
    let per_field = FieldKind::OUTPUT_ORDER
        .iter()
        .filter(|kind| predictions.has_column(kind.column()) && gold.has_column(kind.column()))
        .map(|kind| {
            let p = column_values(predictions, kind.column(), &coercer);
            let g = column_values(gold, kind.column(), &coercer);
            (*kind, score(&join, &p, &g))
        })
        .collect();

    tracing::info!(
        joined = join.pairs.len(),
        precision = aggregate.precision,
        recall = aggregate.recall,
        "Evaluation finished"
    );

    Ok(EvaluationReport {
        aggregate,
        per_field,
        joined_rows: join.pairs.len(),
        predictions_only: join.predictions_only,
        gold_only: join.gold_only,
        duplicate_ids: join.duplicate_ids,
        gold_derived,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::tabular::parse_table;

    fn predictions(csv: &str) -> LabelTable {
        LabelTable::from_table(&parse_table(csv).unwrap(), "predicoes").unwrap()
    }

    #[test]
    fn test_reference_metrics() {
        // tp: 1,2,3  fp: 4  fn: 5,6  tn: 7
        let pred = predictions("ID;nao_publico\n1;1\n2;1\n3;1\n4;1\n5;0\n6;0\n7;0\n");
        let gold = LabelTable::from_json(
            r#"[{"id":1,"nao_publico":1},{"id":2,"nao_publico":1},{"id":3,"nao_publico":1},
                {"id":4,"nao_publico":0},{"id":5,"nao_publico":1},{"id":6,"nao_publico":1},
                {"id":7,"nao_publico":0}]"#,
            "gabarito",
        )
        .unwrap();
        let report = evaluate(&pred, &gold).unwrap();
        assert_eq!(report.aggregate.counts, ConfusionMatrix::new(3, 1, 2, 1));
        assert!((report.aggregate.precision - 0.75).abs() < 1e-9);
        assert!((report.aggregate.recall - 0.6).abs() < 1e-9);
        assert!(!report.gold_derived);
    }

    #[test]
    fn test_gold_derived_from_fields() {
        let pred = predictions("id,nao_publico,cpf\n1,1,1\n2,0,0\n");
        let gold = LabelTable::from_json(
            r#"[{"ID":"1","email":0,"cpf":1,"telefone":0,"rg":0,"nome":0},
                {"ID":"2","email":0,"cpf":0,"telefone":0,"rg":0,"nome":1}]"#,
            "gabarito",
        )
        .unwrap();
        let report = evaluate(&pred, &gold).unwrap();
        assert!(report.gold_derived);
        assert_eq!(report.aggregate.counts, ConfusionMatrix::new(1, 0, 1, 0));
        assert_eq!(report.per_field[&FieldKind::Cpf].counts.tp, 1);
        assert!(!report.per_field.contains_key(&FieldKind::Email));
    }

    #[test]
    fn test_incomplete_gold_is_rejected() {
        let pred = predictions("id,nao_publico\n1,1\n");
        let gold = LabelTable::from_json(r#"[{"id":"1","cpf":1}]"#, "gabarito").unwrap();
        let err = evaluate(&pred, &gold).unwrap_err();
        assert!(err.to_string().contains("email"));
    }

    #[test]
    fn test_outer_join_counts_unmatched_as_zero() {
        let pred = predictions("id,nao_publico\n1,1\n2,1\n");
        let gold = predictions("id,nao_publico\n2,1\n3,1\n");
        let report = evaluate(&pred, &gold).unwrap();
        assert_eq!(report.predictions_only, 1);
        assert_eq!(report.gold_only, 1);
        assert_eq!(report.aggregate.counts, ConfusionMatrix::new(1, 1, 1, 0));
    }

    #[test]
    fn test_duplicates_form_cartesian_product() {
        let pred = predictions("id,nao_publico\n1,1\n1,0\n");
        let gold = predictions("id,nao_publico\n1,1\n1,1\n");
        let report = evaluate(&pred, &gold).unwrap();
        assert_eq!(report.joined_rows, 4);
        assert_eq!(report.duplicate_ids, 1);
        assert_eq!(report.aggregate.counts.tp, 2);
        assert_eq!(report.aggregate.counts.fn_, 2);
    }

    #[test]
    fn test_non_binary_values_become_zero() {
        let pred = predictions("id,nao_publico\n1,sim\n2,1\n");
        let gold = predictions("id,nao_publico\n1,1\n2,\n");
        let report = evaluate(&pred, &gold).unwrap();
        assert_eq!(report.aggregate.counts, ConfusionMatrix::new(0, 1, 1, 0));
    }

    #[test]
    fn test_predictions_need_aggregate() {
        let pred = predictions("id,cpf\n1,1\n");
        let gold = predictions("id,nao_publico\n1,1\n");
        assert!(evaluate(&pred, &gold).is_err());
    }

    #[test]
    fn test_json_must_be_array() {
        assert!(LabelTable::from_json(r#"{"id": 1}"#, "gabarito").is_err());
        assert!(LabelTable::from_json(r#"[{"x": 1}]"#, "gabarito").is_err());
    }
}
