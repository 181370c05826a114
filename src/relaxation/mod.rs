//! Wake relaxation residuals and their matrix-free Jacobian products.

mod residual;

use crate::math::{Matrix3, Vector3};

/// Which residual a wake edge contributes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ResidualKind {
    /// Align the filament with the local flow at fixed step length.
    Steady,
    /// Convect the free end from its upstream neighbour's previous position.
    Unsteady {
        /// Physical time step `Δt`.
        delta_time: f64,
        /// Current time step index, compared against the edge's gate.
        time_step: usize,
    },
}

/// Independent inputs of one wake residual.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WakePerturbation {
    /// Total velocity at the edge.
    pub velocity: Vector3,
    /// Local freestream velocity.
    pub free_stream: Vector3,
    /// Position of node 1.
    pub node1: Vector3,
    /// Position of node 2.
    pub node2: Vector3,
}

impl WakePerturbation {
    /// No perturbation.
    #[must_use]
    pub fn zero() -> Self {
        Self {
            velocity: Vector3::zeros(),
            free_stream: Vector3::zeros(),
            node1: Vector3::zeros(),
            node2: Vector3::zeros(),
        }
    }

    /// Sum of the dot products over all four blocks.
    #[must_use]
    pub fn dot(&self, other: &Self) -> f64 {
        self.velocity.dot(&other.velocity)
            + self.free_stream.dot(&other.free_stream)
            + self.node1.dot(&other.node1)
            + self.node2.dot(&other.node2)
    }
}

/// Jacobian of a wake residual with respect to its inputs.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WakeJacobian {
    /// `∂R / ∂V`.
    pub d_velocity: Matrix3,
    /// `∂R / ∂V∞`.
    pub d_free_stream: Matrix3,
    /// `∂R / ∂X1`.
    pub d_node1: Matrix3,
    /// `∂R / ∂X2`.
    pub d_node2: Matrix3,
}

impl WakeJacobian {
    /// All blocks zero.
    #[must_use]
    pub fn zero() -> Self {
        Self {
            d_velocity: Matrix3::zeros(),
            d_free_stream: Matrix3::zeros(),
            d_node1: Matrix3::zeros(),
            d_node2: Matrix3::zeros(),
        }
    }

    /// Whether every block is exactly zero.
    #[must_use]
    pub fn is_zero(&self) -> bool {
        *self == Self::zero()
    }

    /// `J x`.
    #[must_use]
    pub fn apply(&self, x: &WakePerturbation) -> Vector3 {
        self.d_velocity * x.velocity
            + self.d_free_stream * x.free_stream
            + self.d_node1 * x.node1
            + self.d_node2 * x.node2
    }

    /// `Jᵀ y`.
    #[must_use]
    pub fn apply_transpose(&self, y: &Vector3) -> WakePerturbation {
        WakePerturbation {
            velocity: self.d_velocity.tr_mul(y),
            free_stream: self.d_free_stream.tr_mul(y),
            node1: self.d_node1.tr_mul(y),
            node2: self.d_node2.tr_mul(y),
        }
    }

    fn project(&mut self, projector: &Matrix3) {
        self.d_velocity = projector * self.d_velocity;
        self.d_free_stream = projector * self.d_free_stream;
        self.d_node1 = projector * self.d_node1;
        self.d_node2 = projector * self.d_node2;
    }
}
