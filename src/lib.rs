pub mod config;
pub mod error;
pub mod forces;
pub mod kernel;
pub mod lattice;
pub mod math;
pub mod operations;
pub mod relaxation;

pub use config::{KernelConfig, Tolerance};
pub use error::{Result, VorlatError};
pub use lattice::{EdgeId, Lattice, NodeId, VortexEdge};
