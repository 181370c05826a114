use tracing::debug;

use crate::error::Result;
use crate::lattice::{Lattice, RotorWakeMode};
use crate::math::{Point3, UnitQuaternion, Vector3};

/// Rotates every node about an origin and then translates it.
///
/// Edge caches are refreshed afterwards and projected rotor thrust axes turn
/// with the body.
#[derive(Debug)]
pub struct RigidMotion {
    rotation: UnitQuaternion,
    origin: Point3,
    translation: Vector3,
}

impl RigidMotion {
    /// Creates a new `RigidMotion` operation.
    #[must_use]
    pub fn new(rotation: UnitQuaternion, origin: Point3, translation: Vector3) -> Self {
        Self {
            rotation,
            origin,
            translation,
        }
    }

    /// Pure translation.
    #[must_use]
    pub fn translation(translation: Vector3) -> Self {
        Self::new(UnitQuaternion::identity(), Point3::origin(), translation)
    }

    /// Executes the motion, modifying the lattice in-place.
    ///
    /// # Errors
    ///
    /// Returns an error if an edge references a missing node.
    pub fn execute(&self, lattice: &mut Lattice) -> Result<()> {
        for (_, node) in lattice.nodes_mut() {
            let arm = node.point - self.origin;
            node.point = self.origin + self.rotation * arm + self.translation;
        }
        for (_, edge) in lattice.edges_mut() {
            if let Some(wake) = edge.wake_mut() {
                if let RotorWakeMode::Projected { thrust } = wake.rotor {
                    wake.rotor = RotorWakeMode::Projected {
                        thrust: self.rotation * thrust,
                    };
                }
            }
        }
        lattice.refresh_geometry()?;
        debug!(
            angle = self.rotation.angle(),
            translation = ?self.translation,
            "applied rigid motion"
        );
        Ok(())
    }
}
