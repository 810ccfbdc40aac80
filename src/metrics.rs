use crate::model::ResultSummary;

/// Aggregate figures over the current result rows, for display only.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ResultTotals {
    pub identities: usize,
    pub samples: u64,
    pub errors: u64,
    /// Sample-weighted mean of the per-identity averages.
    pub weighted_average: Option<f64>,
    pub fastest: Option<f64>,
    pub slowest: Option<f64>,
}

impl ResultTotals {
    /// Error share over all samples, 0.0 when nothing was sampled.
    pub fn error_rate(&self) -> f64 {
        if self.samples == 0 {
            0.0
        } else {
            self.errors as f64 / self.samples as f64
        }
    }
}

/// Compute totals over result rows.
pub fn compute_totals(rows: &[ResultSummary]) -> ResultTotals {
    let samples: u64 = rows.iter().map(|r| r.count).sum();
    let errors: u64 = rows.iter().map(|r| r.errors).sum();
    let weighted_average = if samples == 0 {
        None
    } else {
        let weighted: f64 = rows.iter().map(|r| r.average * r.count as f64).sum();
        Some(weighted / samples as f64)
    };
    let fastest = rows
        .iter()
        .filter(|r| r.count > 0)
        .map(|r| r.min)
        .fold(None, |acc: Option<f64>, v| Some(acc.map_or(v, |a| a.min(v))));
    let slowest = rows
        .iter()
        .filter(|r| r.count > 0)
        .map(|r| r.max)
        .fold(None, |acc: Option<f64>, v| Some(acc.map_or(v, |a| a.max(v))));
    ResultTotals {
        identities: rows.len(),
        samples,
        errors,
        weighted_average,
        fastest,
        slowest,
    }
}
