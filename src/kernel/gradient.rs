use crate::lattice::VortexEdge;
use crate::math::{Matrix3, Point3, Vector3};

use super::integral::{weights, FilamentIntegral, Primitive};
use super::IntegrationLimits;

/// Induced velocity and its 30 analytic partial derivatives.
///
/// Each Jacobian block holds `m[(i, j)] = ∂q_i / ∂x_j`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InducedVelocityGradient {
    /// Induced velocity `q`.
    pub velocity: Vector3,
    /// `∂q / ∂X1`.
    pub d_node1: Matrix3,
    /// `∂q / ∂X2`.
    pub d_node2: Matrix3,
    /// `∂q / ∂P` for the field point `P`.
    pub d_point: Matrix3,
    /// `∂q / ∂M`.
    pub d_mach: Vector3,
}

impl InducedVelocityGradient {
    /// All outputs zero.
    #[must_use]
    pub fn zero() -> Self {
        Self {
            velocity: Vector3::zeros(),
            d_node1: Matrix3::zeros(),
            d_node2: Matrix3::zeros(),
            d_point: Matrix3::zeros(),
            d_mach: Vector3::zeros(),
        }
    }

    /// Whether every output is exactly zero.
    #[must_use]
    pub fn is_zero(&self) -> bool {
        *self == Self::zero()
    }

    fn clear_spanwise(&mut self) {
        self.velocity.y = 0.0;
        self.d_node1.row_mut(1).fill(0.0);
        self.d_node2.row_mut(1).fill(0.0);
        self.d_point.row_mut(1).fill(0.0);
        self.d_mach.y = 0.0;
    }
}

impl FilamentIntegral {
    fn difference_with_partials(&self, limits: IntegrationLimits) -> Primitive {
        let upper = if limits.node2 {
            self.with_partials(1.0)
        } else {
            Primitive::ZERO
        };
        let lower = if limits.node1 {
            self.with_partials(0.0)
        } else {
            Primitive::ZERO
        };
        upper - lower
    }
}

impl VortexEdge {
    /// Induced velocity at `point` with its exact derivatives with respect to
    /// both endpoints, the field point and the Mach number.
    ///
    /// Follows [`VortexEdge::induced_velocity`] branch for branch: the same
    /// integration limits and singularity tests decide which terms exist, and
    /// the symmetry-plane and suppression masks zero the same outputs.
    #[must_use]
    pub fn gradient_induced_velocity(
        &self,
        point: &Point3,
        circulation: f64,
    ) -> InducedVelocityGradient {
        self.gradient_induced_velocity_with_core(point, circulation, self.core_width())
    }

    /// [`VortexEdge::gradient_induced_velocity`] with an explicit core width,
    /// matching [`VortexEdge::induced_velocity_with_core`].
    #[must_use]
    pub fn gradient_induced_velocity_with_core(
        &self,
        point: &Point3,
        circulation: f64,
        core_width: f64,
    ) -> InducedVelocityGradient {
        if self.flags.suppresses_influence() {
            return InducedVelocityGradient::zero();
        }
        let limits = self.integration_limits(point);
        if limits.is_empty() {
            return InducedVelocityGradient::zero();
        }

        let flow = self.compressibility();
        let beta2 = flow.beta2();
        let span = self.span();
        let offset = self.x1() - point;

        let integral =
            FilamentIntegral::new(span, &offset, beta2, core_width, self.tolerance());
        let f = integral.difference_with_partials(limits);

        let scale = flow.circulation_scale(circulation);
        let cross = span.cross(&offset);

        // a = dᵀWd, b = 2 LᵀWd, c = LᵀWL.
        let w = weights(beta2);
        let w_offset = offset.component_mul(&w);
        let w_span = span.component_mul(&w);
        let df_d_offset = 2.0 * (f.d_a * w_offset + f.d_b * w_span);
        let df_d_span = 2.0 * (f.d_b * w_offset + f.d_c * w_span);

        // L × d = -[d]ₓ L = [L]ₓ d.
        let dcross_d_span = -offset.cross_matrix();
        let dcross_d_offset = span.cross_matrix();

        let dq_d_span = -scale * (f.value * dcross_d_span + cross * df_d_span.transpose());
        let dq_d_offset = -scale * (f.value * dcross_d_offset + cross * df_d_offset.transpose());

        // Only the cross-stream terms of a, b and c carry β².
        let da_d_beta2 = offset.y * offset.y + offset.z * offset.z;
        let db_d_beta2 = 2.0 * (span.y * offset.y + span.z * offset.z);
        let dc_d_beta2 = span.y * span.y + span.z * span.z;
        let df_d_beta2 = f.d_a * da_d_beta2 + f.d_b * db_d_beta2 + f.d_c * dc_d_beta2;
        let df_d_mach = df_d_beta2 * flow.d_beta2_d_mach();

        let d_mach = -(flow.d_circulation_scale_d_mach(circulation) * f.value
            + scale * df_d_mach)
            * cross;

        let mut gradient = InducedVelocityGradient {
            velocity: -scale * f.value * cross,
            d_node1: dq_d_offset - dq_d_span,
            d_node2: dq_d_span,
            d_point: -dq_d_offset,
            d_mach,
        };
        if self.flags.symmetry_plane_edge {
            gradient.clear_spanwise();
        }
        gradient
    }
}
