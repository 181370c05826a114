use thiserror::Error;

/// Top-level error type for the vortex-lattice kernel.
#[derive(Debug, Error)]
pub enum VorlatError {
    #[error(transparent)]
    Geometry(#[from] GeometryError),

    #[error(transparent)]
    Lattice(#[from] LatticeError),

    #[error(transparent)]
    Wake(#[from] WakeError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Errors related to geometric inputs.
#[derive(Debug, Error)]
pub enum GeometryError {
    #[error("zero-length vector")]
    ZeroVector,
}

/// Errors related to lattice bookkeeping and assembly buffers.
#[derive(Debug, Error)]
pub enum LatticeError {
    #[error("entity not found: {0}")]
    EntityNotFound(String),

    #[error("buffer length {actual} does not match the {expected} assigned equations")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("node is the free end of more than one wake edge: {0}")]
    SharedFreeNode(String),
}

/// Errors related to wake edge state.
#[derive(Debug, Error)]
pub enum WakeError {
    #[error("edge carries no wake data")]
    NotAWakeEdge,

    #[error("wake step length is already assigned")]
    StepLengthAlreadyAssigned,

    #[error("wake step length {0} must be finite and non-negative")]
    InvalidStepLength(f64),

    #[error("wake residual equation numbers are already assigned")]
    EquationNumbersAlreadyAssigned,

    #[error("wake residual equation {0} is assigned to more than one edge")]
    OverlappingEquationNumbers(usize),
}

/// Errors related to kernel configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("parameter {parameter} = {value} is invalid")]
    InvalidParameter { parameter: &'static str, value: f64 },
}

/// Convenience type alias for results using [`VorlatError`].
pub type Result<T> = std::result::Result<T, VorlatError>;
