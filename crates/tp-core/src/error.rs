use thiserror::Error;

pub type TpResult<T> = Result<T, TpError>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum TpError {
    #[error("Unit mismatch for {what}: expected {expected}, got {actual}")]
    UnitMismatch {
        what: &'static str,
        expected: &'static str,
        actual: &'static str,
    },

    #[error("Invariant violated: {what}")]
    Invariant { what: String },
}
