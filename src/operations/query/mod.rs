mod integrate_forces;

pub use integrate_forces::{ForceTotals, IntegrateForces};
