mod assemble_residual;
mod assign_equations;
mod jacobian_product;
mod update_velocities;

pub use assemble_residual::AssembleWakeResidual;
pub use assign_equations::AssignWakeEquations;
pub use jacobian_product::{WakeJacobianProduct, WakeJacobianTransposeProduct};
pub use update_velocities::UpdateVelocities;

use crate::error::LatticeError;
use crate::lattice::{CirculationChannel, EdgeId, Lattice, VortexEdge};
use crate::math::{Point3, Vector3};

/// Length of the global wake residual vector: one past the highest assigned
/// equation number.
#[must_use]
pub fn wake_equation_count(lattice: &Lattice) -> usize {
    lattice
        .wake_edges()
        .filter_map(|(_, edge)| edge.wake()?.equation_numbers())
        .map(|eq| eq[2] + 1)
        .max()
        .unwrap_or(0)
}

fn check_length(expected: usize, actual: usize) -> Result<(), LatticeError> {
    if expected == actual {
        Ok(())
    } else {
        Err(LatticeError::DimensionMismatch { expected, actual })
    }
}

/// Velocity induced at `point` by every edge except `skip`.
pub(crate) fn induced_velocity_at(
    edges: &[(EdgeId, &VortexEdge)],
    skip: EdgeId,
    point: &Point3,
    channel: CirculationChannel,
) -> Vector3 {
    edges
        .iter()
        .filter(|(id, _)| *id != skip)
        .map(|(_, edge)| edge.induced_velocity(point, edge.circulation.channel(channel)))
        .sum()
}
