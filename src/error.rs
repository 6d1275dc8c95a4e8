use thiserror::Error;

/// Fatal errors raised while building the op tree or driving a session.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum LayoutError {
    #[error("unknown op id `{0}`")]
    UnknownOp(String),
    #[error("duplicate op id `{0}` in payload")]
    DuplicateOp(String),
    #[error("malformed op payload: {0}")]
    Payload(String),
    #[error("tween endpoints for visual {handle} have {from} and {to} points")]
    PointCountMismatch { handle: u64, from: usize, to: usize },
    #[error("invalid layout config: {0}")]
    InvalidConfig(String),
}

/// Recoverable problems found during a layout pass. The pass keeps going
/// with a best-effort result and records these on the pass stats.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum LayoutWarning {
    #[error("row {row} of `{parent}` has an empty x-range [{start}, {end}]; skipped")]
    EmptyRowRange {
        parent: String,
        row: i64,
        start: f32,
        end: f32,
    },
    #[error("x nudge inside `{parent}` stopped after {visits} visits")]
    NudgeVisitCap { parent: String, visits: usize },
}
