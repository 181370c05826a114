use crate::error::Result;
use crate::lattice::Lattice;
use crate::relaxation::ResidualKind;

use super::{check_length, wake_equation_count};

/// Adds every wake edge's residual into a global vector at the edge's
/// equation numbers, using the velocity stored on the edge.
#[derive(Debug)]
pub struct AssembleWakeResidual {
    kind: ResidualKind,
}

impl AssembleWakeResidual {
    /// Creates a new `AssembleWakeResidual` operation.
    #[must_use]
    pub fn new(kind: ResidualKind) -> Self {
        Self { kind }
    }

    /// Executes the scatter. Contributions are added to `residual`, not
    /// written over it.
    ///
    /// # Errors
    ///
    /// Returns an error if `residual` does not match the number of assigned
    /// wake equations.
    pub fn execute(&self, lattice: &Lattice, residual: &mut [f64]) -> Result<()> {
        check_length(wake_equation_count(lattice), residual.len())?;
        for (_, edge) in lattice.wake_edges() {
            let Some(numbers) = edge.wake().and_then(|wake| wake.equation_numbers()) else {
                continue;
            };
            let r = edge.wake_residual(edge.velocity(), self.kind);
            for (component, number) in numbers.into_iter().enumerate() {
                residual[number] += r[component];
            }
        }
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;
    use crate::error::{LatticeError, VorlatError};
    use crate::lattice::{CirculationChannel, WakeDirection, WakeEdgeData};
    use crate::math::{Point3, Vector3};
    use crate::operations::{AssignWakeEquations, UpdateVelocities};

    fn p(x: f64, y: f64, z: f64) -> Point3 {
        Point3::new(x, y, z)
    }

    fn two_edge_lattice() -> Lattice {
        let mut lattice = Lattice::default();
        for y in [0.0, 1.0] {
            let a = lattice.add_node(p(0.0, y, 0.0));
            let b = lattice.add_node(p(0.0, y, 0.5));
            let edge = lattice.add_edge(a, b).unwrap();
            lattice
                .attach_wake(edge, WakeEdgeData::new(WakeDirection::Downstream))
                .unwrap();
            lattice
                .edge_mut(edge)
                .unwrap()
                .set_velocity(Vector3::new(2.0, 0.0, 0.0));
        }
        lattice.resolve_wake_step_lengths().unwrap();
        AssignWakeEquations::new().execute(&mut lattice).unwrap();
        lattice
    }

    #[test]
    fn residuals_are_scattered_additively() {
        let lattice = two_edge_lattice();
        let mut residual = vec![1.0; 6];
        AssembleWakeResidual::new(ResidualKind::Steady)
            .execute(&lattice, &mut residual)
            .unwrap();
        // Each edge: dS V̂ - Δ = (0.5, 0, 0) - (0, 0, 0.5).
        let expected = [1.5, 1.0, 0.5, 1.5, 1.0, 0.5];
        for (r, e) in residual.iter().zip(expected) {
            assert_relative_eq!(*r, e, epsilon = 1e-15);
        }
    }

    #[test]
    fn perturbation_sweep_leaves_residual_unchanged() {
        let mut lattice = two_edge_lattice();
        let ids: Vec<_> = lattice.wake_edges().map(|(id, _)| id).collect();
        for id in ids {
            let edge = lattice.edge_mut(id).unwrap();
            edge.circulation.gamma = 0.5;
            edge.circulation.delta_gamma = 3.0;
        }
        let kind = ResidualKind::Steady;
        let mut before = vec![0.0; 6];
        AssembleWakeResidual::new(kind)
            .execute(&lattice, &mut before)
            .unwrap();

        UpdateVelocities::new(CirculationChannel::Delta)
            .execute(&mut lattice)
            .unwrap();
        let mut after = vec![0.0; 6];
        AssembleWakeResidual::new(kind)
            .execute(&lattice, &mut after)
            .unwrap();
        assert_eq!(before, after);
    }

    #[test]
    fn wrong_buffer_length_is_rejected() {
        let lattice = two_edge_lattice();
        let mut residual = vec![0.0; 5];
        assert!(matches!(
            AssembleWakeResidual::new(ResidualKind::Steady).execute(&lattice, &mut residual),
            Err(VorlatError::Lattice(LatticeError::DimensionMismatch {
                expected: 6,
                actual: 5
            }))
        ));
    }
}
