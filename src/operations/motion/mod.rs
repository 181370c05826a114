mod relax_wake;
mod rigid_motion;

pub use relax_wake::{RelaxWake, RelaxationNorms};
pub use rigid_motion::RigidMotion;
