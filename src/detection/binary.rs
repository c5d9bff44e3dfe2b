//! 0/1 coercion for externally supplied label columns
//!
//! Values that parse as the numbers 0 or 1 (`"1"`, `"1.0"`, `" 0 "`) keep
//! their value. Blank or absent cells become 0 silently. Anything else becomes
//! 0 and triggers one warning per column.

use std::collections::HashSet;
use std::sync::{Mutex, PoisonError};

/// Outcome of coercing one cell
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryValue {
    Zero,
    One,
    Missing,
    Invalid,
}

impl BinaryValue {
    pub fn parse(raw: Option<&str>) -> Self {
        let Some(raw) = raw.map(str::trim).filter(|v| !v.is_empty()) else {
            return BinaryValue::Missing;
        };
        match raw.parse::<f64>() {
            Ok(v) if v == 0.0 => BinaryValue::Zero,
            Ok(v) if v == 1.0 => BinaryValue::One,
            _ => BinaryValue::Invalid,
        }
    }

    pub fn as_u8(self) -> u8 {
        u8::from(self == BinaryValue::One)
    }
}

/// Coerces cells while remembering which columns have already warned
#[derive(Debug, Default)]
pub struct BinaryCoercer {
    warned: Mutex<HashSet<String>>,
}

impl BinaryCoercer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn coerce(&self, column: &str, raw: Option<&str>) -> u8 {
        let value = BinaryValue::parse(raw);
        if value == BinaryValue::Invalid {
            let mut warned = self.warned.lock().unwrap_or_else(PoisonError::into_inner);
            if warned.insert(column.to_string()) {
                tracing::warn!(column, "Non-binary values found; coercing to 0");
            }
        }
        value.as_u8()
    }

    /// Columns that produced at least one invalid value
    pub fn warned_columns(&self) -> Vec<String> {
        let mut columns: Vec<String> = self
            .warned
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .cloned()
            .collect();
        columns.sort();
        columns
    }
}
