use crate::lattice::VortexEdge;
use crate::math::{Point3, Vector3};

use super::integral::FilamentIntegral;

/// Divisor softening the off-axis term of the supersonic endpoint cone test.
const CONE_SOFTENING: f64 = 0.7;

/// Which filament endpoints bound the integral at a field point.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IntegrationLimits {
    /// The primitive is evaluated at `s = 0`.
    pub node1: bool,
    /// The primitive is evaluated at `s = 1`.
    pub node2: bool,
}

impl IntegrationLimits {
    /// Both endpoints contribute.
    pub const FULL: Self = Self {
        node1: true,
        node2: true,
    };

    /// Neither endpoint contributes.
    pub const NONE: Self = Self {
        node1: false,
        node2: false,
    };

    /// Whether the field point receives no influence.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        !self.node1 && !self.node2
    }
}

impl FilamentIntegral {
    /// `F(1) - F(0)` restricted to the contributing endpoints.
    pub(crate) fn difference(&self, limits: IntegrationLimits) -> f64 {
        let upper = if limits.node2 { self.value(1.0) } else { 0.0 };
        let lower = if limits.node1 { self.value(0.0) } else { 0.0 };
        upper - lower
    }
}

impl VortexEdge {
    /// Endpoints whose forward Mach cone contains `point`.
    ///
    /// Subsonic flow always integrates over the whole filament. For `M ≥ 1` a
    /// point upstream of both nodes sees nothing, and each endpoint only
    /// contributes when the point lies downstream of it and inside its
    /// softened cone `(Xi - x)² + β² ((Yi - y)² + (Zi - z)²) / 0.7 > 0`.
    #[must_use]
    pub fn integration_limits(&self, point: &Point3) -> IntegrationLimits {
        let flow = self.compressibility();
        if !flow.is_supersonic() {
            return IntegrationLimits::FULL;
        }
        let (x1, x2) = (self.x1(), self.x2());
        if point.x < x1.x && point.x < x2.x {
            return IntegrationLimits::NONE;
        }
        let beta2 = flow.beta2();
        let inside = |node: &Point3| {
            let dx = node.x - point.x;
            let dy = node.y - point.y;
            let dz = node.z - point.z;
            point.x > node.x && dx * dx + beta2 * (dy * dy + dz * dz) / CONE_SOFTENING > 0.0
        };
        IntegrationLimits {
            node1: inside(x1),
            node2: inside(x2),
        }
    }

    /// Velocity induced at `point` by this filament carrying `circulation`,
    /// regularized with the edge's own core width.
    ///
    /// `circulation` may be `Γ` or any of its perturbation channels; the
    /// result is linear in it.
    #[must_use]
    pub fn induced_velocity(&self, point: &Point3, circulation: f64) -> Vector3 {
        self.induced_velocity_with_core(point, circulation, self.core_width())
    }

    /// [`VortexEdge::induced_velocity`] with an explicit core width.
    #[must_use]
    pub fn induced_velocity_with_core(
        &self,
        point: &Point3,
        circulation: f64,
        core_width: f64,
    ) -> Vector3 {
        if self.flags.suppresses_influence() {
            return Vector3::zeros();
        }
        let limits = self.integration_limits(point);
        if limits.is_empty() {
            return Vector3::zeros();
        }

        let flow = self.compressibility();
        let offset = self.x1() - point;
        let integral = FilamentIntegral::new(
            self.span(),
            &offset,
            flow.beta2(),
            core_width,
            self.tolerance(),
        );
        let f = integral.difference(limits);

        let mut q = -flow.circulation_scale(circulation) * f * self.span().cross(&offset);
        if self.flags.symmetry_plane_edge {
            q.y = 0.0;
        }
        q
    }
}
