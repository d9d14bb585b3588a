//! Evaluator configuration.

/// Limits applied to one evaluator.
///
/// ```
/// use verse::EvaluatorConfig;
///
/// let config = EvaluatorConfig::new().with_step_limit(10_000);
/// assert_eq!(config.step_limit, 10_000);
/// assert_eq!(config.history_limit, EvaluatorConfig::default().history_limit);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EvaluatorConfig {
    /// Steps one run may execute before it is abandoned.
    pub step_limit: usize,
    /// Values kept per stream for `←`.
    pub history_limit: usize,
}

impl Default for EvaluatorConfig {
    fn default() -> Self {
        Self {
            step_limit: 1_000_000,
            history_limit: 256,
        }
    }
}

impl EvaluatorConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_step_limit(mut self, step_limit: usize) -> Self {
        self.step_limit = step_limit;
        self
    }

    pub fn with_history_limit(mut self, history_limit: usize) -> Self {
        self.history_limit = history_limit;
        self
    }
}
