use thiserror::Error;

/// Failure kinds a profiling run can surface to its caller.
///
/// Everything that can go wrong collapses into one of two buckets: the input
/// never became a table, or the analysis/report stage fell over afterwards.
/// Both carry a message suitable for direct display.
#[derive(Debug, Error)]
pub enum ProfileError {
    /// No (encoding, delimiter) combination produced a multi-column table.
    /// Terminal for the whole run; no partial report is produced.
    #[error("unable to parse CSV input: {0}")]
    Parse(String),
    /// Statistic computation, chart rendering, or report writing failed after
    /// a table was parsed successfully.
    #[error("analysis failed: {0}")]
    Analysis(String),
}
