//! Confusion counts and derived metrics

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfusionMatrix {
    pub tp: usize,
    pub fp: usize,
    #[serde(rename = "fn")]
    pub fn_: usize,
    pub tn: usize,
}

impl ConfusionMatrix {
    pub fn new(tp: usize, fp: usize, fn_: usize, tn: usize) -> Self {
        Self { tp, fp, fn_, tn }
    }

    /// Counts `(predicted, expected)` pairs of 0/1 values
    pub fn from_pairs(pairs: impl IntoIterator<Item = (u8, u8)>) -> Self {
        pairs.into_iter().fold(Self::default(), |mut m, pair| {
            m.add(pair.0 == 1, pair.1 == 1);
            m
        })
    }

    pub fn add(&mut self, predicted: bool, expected: bool) {
        match (predicted, expected) {
            (true, true) => self.tp += 1,
            (true, false) => self.fp += 1,
            (false, true) => self.fn_ += 1,
            (false, false) => self.tn += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.tp + self.fp + self.fn_ + self.tn
    }

    /// `tp / (tp + fp)`, 0 when nothing was predicted positive
    pub fn precision(&self) -> f64 {
        ratio(self.tp, self.tp + self.fp)
    }

    /// `tp / (tp + fn)`, 0 when nothing was expected positive
    pub fn recall(&self) -> f64 {
        ratio(self.tp, self.tp + self.fn_)
    }

    pub fn f1(&self) -> f64 {
        let (p, r) = (self.precision(), self.recall());
        if p + r == 0.0 {
            0.0
        } else {
            2.0 * p * r / (p + r)
        }
    }

    pub fn metrics(&self) -> Metrics {
        Metrics {
            counts: *self,
            precision: self.precision(),
            recall: self.recall(),
            f1: self.f1(),
        }
    }
}

fn ratio(num: usize, den: usize) -> f64 {
    if den == 0 {
        0.0
    } else {
        num as f64 / den as f64
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Metrics {
    #[serde(flatten)]
    pub counts: ConfusionMatrix,
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reference_counts() {
        let m = ConfusionMatrix::new(3, 1, 2, 0);
        assert!((m.precision() - 0.75).abs() < 1e-9);
        assert!((m.recall() - 0.6).abs() < 1e-9);
        assert!((m.f1() - 0.6667).abs() < 1e-3);
    }

    #[test]
    fn test_zero_denominators() {
        let m = ConfusionMatrix::new(0, 0, 4, 1);
        assert_eq!(m.precision(), 0.0);
        assert_eq!(m.recall(), 0.0);
        assert_eq!(m.f1(), 0.0);
        assert_eq!(ConfusionMatrix::default().metrics().f1, 0.0);
    }

    #[test]
    fn test_from_pairs() {
        let m = ConfusionMatrix::from_pairs([(1, 1), (1, 0), (0, 1), (0, 0), (1, 1)]);
        assert_eq!(m, ConfusionMatrix::new(2, 1, 1, 1));
        assert_eq!(m.total(), 5);
    }

    #[test]
    fn test_metrics_json_shape() {
        let json = serde_json::to_value(ConfusionMatrix::new(1, 0, 0, 0).metrics()).unwrap();
        assert_eq!(json["tp"], 1);
        assert_eq!(json["fn"], 0);
        assert_eq!(json["precision"], 1.0);
    }
}
