/// Errors raised by the aggregation and planning engine.
#[derive(Debug, Clone, PartialEq)]
pub enum PlanError {
    /// An observation that cannot be folded into any demand cell.
    InvalidRecord(String),
    /// A capacity or cost policy that makes every derived number meaningless.
    InvalidPolicy(String),
}

impl std::fmt::Display for PlanError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PlanError::InvalidRecord(msg) => write!(f, "invalid record: {msg}"),
            PlanError::InvalidPolicy(msg) => write!(f, "invalid policy: {msg}"),
        }
    }
}

impl std::error::Error for PlanError {}
