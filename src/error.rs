use ndarray_linalg::error::LinalgError;
use thiserror::Error;

/// Failures raised while building or diagonalizing a Hamiltonian block.
///
/// All of these are fatal for the computation in progress: the assembly is
/// deterministic given (N, Q, J) so nothing here is worth retrying.
#[derive(Error, Debug)]
pub enum KitaevError {
    #[error("invalid sector N={n}, Q={q}: need N >= 1 and 0 <= Q <= N")]
    InvalidSector { n: usize, q: usize },

    /// A term must have i<j and k<l, all below N.
    #[error("invalid term ({i},{j},{k},{l}) for N={n}")]
    InvalidTerm {
        i: usize,
        j: usize,
        k: usize,
        l: usize,
        n: usize,
    },

    #[error("mode {mode} out of range for N={n}")]
    ModeOutOfRange { mode: usize, n: usize },

    #[error("occupations must be strictly ascending, got {0:?}")]
    InvalidOccupations(Vec<usize>),

    #[error("rank {rank} out of range for dimension {dim}")]
    RankOutOfRange { rank: usize, dim: usize },

    /// A nonzero bra left the sector. Indicates a broken case dispatch.
    #[error("term ({i},{j},{k},{l}) produced charge {found}, expected {expected}")]
    ChargeViolation {
        i: usize,
        j: usize,
        k: usize,
        l: usize,
        expected: usize,
        found: usize,
    },

    #[error("block has not been diagonalized")]
    NotDiagonalized,

    #[error("only eigenvalues were computed for this block")]
    EigenvectorsUnavailable,

    #[error("expected shape {expected:?}, got {found:?}")]
    ShapeMismatch {
        expected: Vec<usize>,
        found: Vec<usize>,
    },

    #[error("config error: {0}")]
    Config(String),

    #[error("eigensolver failed: {0}")]
    Linalg(#[from] LinalgError),
}

pub type KitaevResult<T> = Result<T, KitaevError>;

impl From<KitaevError> for pyo3::PyErr {
    fn from(err: KitaevError) -> Self {
        pyo3::exceptions::PyValueError::new_err(err.to_string())
    }
}
