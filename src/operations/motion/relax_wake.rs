use tracing::debug;

use crate::error::Result;
use crate::lattice::{Lattice, NodeId};
use crate::math::Vector3;
use crate::relaxation::ResidualKind;

/// Steady relaxation is under-relaxed relative to the configured factor.
const STEADY_UNDER_RELAXATION: f64 = 0.85;

/// Residual norms of one relaxation sweep.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RelaxationNorms {
    /// Largest residual component.
    pub max: f64,
    /// Euclidean norm of all residual components.
    pub l2: f64,
}

/// One fixed-point sweep of the wake: every free node moves by a relaxed
/// fraction of its edge residual.
///
/// All residuals are evaluated from the velocities stored on the edges
/// before any node moves, so the sweep does not depend on edge order.
#[derive(Debug)]
pub struct RelaxWake {
    kind: ResidualKind,
}

impl RelaxWake {
    /// Creates a new `RelaxWake` operation.
    #[must_use]
    pub fn new(kind: ResidualKind) -> Self {
        Self { kind }
    }

    /// Executes the sweep and returns the residual norms before the move.
    ///
    /// # Errors
    ///
    /// Returns an error if a free node is missing from the lattice.
    pub fn execute(&self, lattice: &mut Lattice) -> Result<RelaxationNorms> {
        let relax = match self.kind {
            ResidualKind::Steady => STEADY_UNDER_RELAXATION * lattice.config().wake_relaxation,
            ResidualKind::Unsteady { .. } => lattice.config().wake_relaxation,
        };

        let moves: Vec<(NodeId, Vector3)> = lattice
            .wake_edges()
            .filter_map(|(_, edge)| {
                let (node, _) = edge.wake_free_end()?;
                Some((node, edge.wake_residual(edge.velocity(), self.kind)))
            })
            .collect();

        let mut norms = RelaxationNorms { max: 0.0, l2: 0.0 };
        for (node, residual) in &moves {
            norms.max = norms.max.max(residual.amax());
            norms.l2 += residual.norm_squared();
            lattice.node_mut(*node)?.point += relax * residual;
        }
        norms.l2 = norms.l2.sqrt();

        lattice.refresh_geometry()?;
        debug!(
            max = norms.max,
            l2 = norms.l2,
            nodes = moves.len(),
            "relaxed wake"
        );
        Ok(norms)
    }
}
