/// Decides the confidence attached to a successful analysis.
pub trait ConfidenceStrategy: Send + Sync {
    /// `reported` is the model's own certainty, when it gave one.
    fn score(&self, reported: Option<f64>) -> f64;
}

/// Trust the model's value when it is usable, otherwise use `default`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ModelReportedConfidence {
    pub default: f64,
}

impl Default for ModelReportedConfidence {
    fn default() -> Self {
        Self { default: 0.85 }
    }
}

impl ConfidenceStrategy for ModelReportedConfidence {
    fn score(&self, reported: Option<f64>) -> f64 {
        match reported {
            Some(value) if value.is_finite() && (0.0..=1.0).contains(&value) => value,
            _ => self.default.clamp(0.0, 1.0),
        }
    }
}

/// Always the same value, whatever the model says.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FixedConfidence(pub f64);

impl ConfidenceStrategy for FixedConfidence {
    fn score(&self, _reported: Option<f64>) -> f64 {
        self.0.clamp(0.0, 1.0)
    }
}
