use rayon::prelude::*;
use tracing::debug;

use crate::error::Result;
use crate::lattice::{CirculationChannel, EdgeId, Lattice, VortexEdge};
use crate::math::Vector3;

use super::induced_velocity_at;

/// Evaluates the velocity at the centroid of every wake edge and stores it
/// on the edge for the selected channel.
///
/// For [`CirculationChannel::Gamma`] the result is the local freestream plus
/// the velocity induced by every other edge, written to
/// [`VortexEdge::velocity`]. Perturbation channels store the induced velocity
/// alone in [`VortexEdge::channel_velocity`] and leave the total velocity
/// untouched.
#[derive(Debug)]
pub struct UpdateVelocities {
    channel: CirculationChannel,
}

impl UpdateVelocities {
    /// Creates a new `UpdateVelocities` operation.
    #[must_use]
    pub fn new(channel: CirculationChannel) -> Self {
        Self { channel }
    }

    /// Executes the sweep, writing each wake edge's velocity.
    ///
    /// # Errors
    ///
    /// Returns an error if an edge disappears during the update.
    pub fn execute(&self, lattice: &mut Lattice) -> Result<()> {
        let updates = self.evaluate(lattice);
        for (id, velocity) in &updates {
            lattice
                .edge_mut(*id)?
                .set_channel_velocity(self.channel, *velocity);
        }
        debug!(edges = updates.len(), channel = ?self.channel, "updated wake velocities");
        Ok(())
    }

    fn evaluate(&self, lattice: &Lattice) -> Vec<(EdgeId, Vector3)> {
        let edges: Vec<(EdgeId, &VortexEdge)> = lattice.edges().collect();
        let targets: Vec<(EdgeId, &VortexEdge)> = lattice.wake_edges().collect();
        targets
            .par_iter()
            .map(|(id, edge)| {
                let induced = induced_velocity_at(&edges, *id, edge.centroid(), self.channel);
                let velocity = match self.channel {
                    CirculationChannel::Gamma => edge.local_free_stream() + induced,
                    _ => induced,
                };
                (*id, velocity)
            })
            .collect()
    }
}
