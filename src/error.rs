use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum AnalyticsError {
    #[error("At least 2 participants with completed attempts are required, found {found}")]
    InsufficientData { found: usize },

    #[error("Statistical analysis requires at least one score")]
    NoData,
}
