pub mod assembly;
pub mod motion;
pub mod query;

pub use assembly::{
    wake_equation_count, AssembleWakeResidual, AssignWakeEquations, UpdateVelocities,
    WakeJacobianProduct, WakeJacobianTransposeProduct,
};
pub use motion::{RelaxWake, RelaxationNorms, RigidMotion};
pub use query::{ForceTotals, IntegrateForces};
