//! Kutta-Joukowski force and moment contributions of an edge and their
//! sensitivities.

use crate::lattice::VortexEdge;
use crate::math::{Matrix3, Point3, Vector3};

/// Edge force and its derivatives.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ForceSensitivity {
    /// `F`.
    pub force: Vector3,
    /// `∂F / ∂Γ`.
    pub d_circulation: Vector3,
    /// `∂F / ∂V`.
    pub d_velocity: Matrix3,
    /// `∂F / ∂X1`.
    pub d_node1: Matrix3,
    /// `∂F / ∂X2`.
    pub d_node2: Matrix3,
}

impl ForceSensitivity {
    /// All outputs zero.
    #[must_use]
    pub fn zero() -> Self {
        Self {
            force: Vector3::zeros(),
            d_circulation: Vector3::zeros(),
            d_velocity: Matrix3::zeros(),
            d_node1: Matrix3::zeros(),
            d_node2: Matrix3::zeros(),
        }
    }

    /// `dF/dM` given the Mach derivatives of the velocity and circulation.
    #[must_use]
    pub fn d_mach(&self, d_velocity_d_mach: &Vector3, d_circulation_d_mach: f64) -> Vector3 {
        self.d_velocity * d_velocity_d_mach + self.d_circulation * d_circulation_d_mach
    }

    /// `dF/dV∞` given the freestream Jacobian of the velocity.
    #[must_use]
    pub fn d_free_stream(&self, d_velocity_d_free_stream: &Matrix3) -> Matrix3 {
        self.d_velocity * d_velocity_d_free_stream
    }

    /// Moment `(C - ref) × F` about `reference`, `C` being the edge centroid.
    #[must_use]
    pub fn moment_about(&self, centroid: &Point3, reference: &Point3) -> MomentSensitivity {
        let arm = centroid - reference;
        let arm_x = arm.cross_matrix();
        // ∂r/∂X1 = ∂r/∂X2 = I/2 and ∂(r × F)/∂r = -[F]ₓ.
        let d_arm = -0.5 * self.force.cross_matrix();
        MomentSensitivity {
            moment: arm.cross(&self.force),
            d_circulation: arm.cross(&self.d_circulation),
            d_velocity: arm_x * self.d_velocity,
            d_node1: arm_x * self.d_node1 + d_arm,
            d_node2: arm_x * self.d_node2 + d_arm,
        }
    }
}

/// Edge moment about a fixed reference point and its derivatives.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MomentSensitivity {
    pub moment: Vector3,
    pub d_circulation: Vector3,
    pub d_velocity: Matrix3,
    pub d_node1: Matrix3,
    pub d_node2: Matrix3,
}

impl MomentSensitivity {
    /// `dM/dM∞` given the Mach derivatives of the velocity and circulation.
    #[must_use]
    pub fn d_mach(&self, d_velocity_d_mach: &Vector3, d_circulation_d_mach: f64) -> Vector3 {
        self.d_velocity * d_velocity_d_mach + self.d_circulation * d_circulation_d_mach
    }

    /// `dM/dV∞` given the freestream Jacobian of the velocity.
    #[must_use]
    pub fn d_free_stream(&self, d_velocity_d_free_stream: &Matrix3) -> Matrix3 {
        self.d_velocity * d_velocity_d_free_stream
    }
}

impl VortexEdge {
    /// `(∂L/∂X1, ∂L/∂X2) = (-ê, ê)`.
    #[must_use]
    pub fn length_gradient(&self) -> (Vector3, Vector3) {
        let dir = *self.direction();
        (-dir, dir)
    }

    /// `∂ê/∂X2 = (I - ê êᵀ) / L`; the node 1 block is its negative.
    ///
    /// Zero for a zero-length edge.
    #[must_use]
    pub fn direction_gradient(&self) -> Matrix3 {
        if self.length() == 0.0 {
            return Matrix3::zeros();
        }
        let dir = self.direction();
        (Matrix3::identity() - dir * dir.transpose()) / self.length()
    }

    /// Kutta-Joukowski force `(V × ê) L Γ`.
    ///
    /// Zero for suppressed edges.
    #[must_use]
    pub fn force(&self, velocity: &Vector3, circulation: f64) -> Vector3 {
        if self.flags.suppresses_influence() {
            return Vector3::zeros();
        }
        velocity.cross(self.direction()) * (self.length() * circulation)
    }

    /// Trefftz-plane force `-(W × ê) L Γ` from the wake-induced downwash `W`.
    #[must_use]
    pub fn trefftz_force(&self, downwash: &Vector3, circulation: f64) -> Vector3 {
        -self.force(downwash, circulation)
    }

    /// [`VortexEdge::force`] with its derivatives with respect to `Γ`, `V`
    /// and both node positions.
    #[must_use]
    pub fn force_sensitivity(&self, velocity: &Vector3, circulation: f64) -> ForceSensitivity {
        if self.flags.suppresses_influence() {
            return ForceSensitivity::zero();
        }
        let length = self.length();
        let dir = self.direction();
        let v_cross_dir = velocity.cross(dir);

        let (dl_d_node1, dl_d_node2) = self.length_gradient();
        let ddir_d_node2 = self.direction_gradient();
        let v_x = velocity.cross_matrix();

        let d_node2 =
            circulation * (v_cross_dir * dl_d_node2.transpose() + length * v_x * ddir_d_node2);
        let d_node1 =
            circulation * (v_cross_dir * dl_d_node1.transpose() - length * v_x * ddir_d_node2);

        ForceSensitivity {
            force: v_cross_dir * (length * circulation),
            d_circulation: v_cross_dir * length,
            d_velocity: -circulation * length * dir.cross_matrix(),
            d_node1,
            d_node2,
        }
    }

    /// [`VortexEdge::trefftz_force`] with its derivatives.
    #[must_use]
    pub fn trefftz_force_sensitivity(
        &self,
        downwash: &Vector3,
        circulation: f64,
    ) -> ForceSensitivity {
        let s = self.force_sensitivity(downwash, circulation);
        ForceSensitivity {
            force: -s.force,
            d_circulation: -s.d_circulation,
            d_velocity: -s.d_velocity,
            d_node1: -s.d_node1,
            d_node2: -s.d_node2,
        }
    }
}
