use crate::lattice::{RotorWakeMode, VortexEdge, WakeEdgeData};
use crate::math::{axis_projector, normalize_jacobian, Matrix3, Vector3};

use super::{ResidualKind, WakeJacobian, WakePerturbation};

/// Velocity that convects a wake edge, with its derivatives with respect to
/// the total velocity and the freestream.
struct ConvectingVelocity {
    value: Vector3,
    d_velocity: Matrix3,
    d_free_stream: Matrix3,
}

impl ConvectingVelocity {
    /// Applies the rotor limiter: only the component of the induced velocity
    /// along `-thrust` survives, so the wake may only contract.
    fn new(rotor: &RotorWakeMode, velocity: &Vector3, free_stream: &Vector3) -> Self {
        match rotor.thrust() {
            Some(thrust) => {
                let t: Vector3 = **thrust;
                let dot = t.dot(&(velocity - free_stream)).min(0.0);
                let d_velocity = if dot < 0.0 {
                    axis_projector(thrust)
                } else {
                    Matrix3::zeros()
                };
                Self {
                    value: free_stream + dot * t,
                    d_velocity,
                    d_free_stream: Matrix3::identity() - d_velocity,
                }
            }
            None => Self {
                value: *velocity,
                d_velocity: Matrix3::identity(),
                d_free_stream: Matrix3::zeros(),
            },
        }
    }
}

impl VortexEdge {
    /// Wake data when the edge produces residual contributions of `kind`.
    fn contributing_wake(&self, kind: ResidualKind) -> Option<&WakeEdgeData> {
        if self.flags.suppresses_influence() {
            return None;
        }
        let wake = self.wake().filter(|wake| wake.is_active())?;
        match kind {
            ResidualKind::Steady => Some(wake),
            ResidualKind::Unsteady { time_step, .. } => {
                wake.is_valid_at(time_step).then_some(wake)
            }
        }
    }

    /// Rotor limiter applied to `velocity` and the edge's local freestream.
    ///
    /// Returns `velocity` unchanged for non-rotor and unprojected rotor wakes.
    #[must_use]
    pub fn relaxed_velocity(&self, velocity: &Vector3) -> Vector3 {
        match self.wake() {
            Some(wake) => {
                ConvectingVelocity::new(&wake.rotor, velocity, self.local_free_stream()).value
            }
            None => *velocity,
        }
    }

    /// Steady wake residual `R = dS V̂ - Δ` driving the free end onto the
    /// local flow direction, where `Δ` runs from the fixed to the free end.
    ///
    /// Projected rotor wakes reduce `R` to its thrust-axis component. Zero
    /// for non-wake, inactive or suppressed edges and for zero flow speed.
    #[must_use]
    pub fn compute_residual(&self, velocity: &Vector3) -> Vector3 {
        self.wake_residual(velocity, ResidualKind::Steady)
    }

    /// Unsteady wake residual `R = X_up(n-1) + Ṽ Δt - X_free`.
    ///
    /// Zero until `time_step` reaches the edge's minimum valid time step.
    #[must_use]
    pub fn compute_unsteady_residual(
        &self,
        velocity: &Vector3,
        delta_time: f64,
        time_step: usize,
    ) -> Vector3 {
        let kind = ResidualKind::Unsteady {
            delta_time,
            time_step,
        };
        self.wake_residual(velocity, kind)
    }

    /// Residual of the given kind.
    #[must_use]
    pub fn wake_residual(&self, velocity: &Vector3, kind: ResidualKind) -> Vector3 {
        self.residual_and_jacobian(velocity, kind)
            .map_or_else(Vector3::zeros, |(residual, _)| residual)
    }

    /// Jacobian of [`VortexEdge::wake_residual`] with respect to the velocity,
    /// the freestream and both node positions.
    #[must_use]
    pub fn wake_jacobian(&self, velocity: &Vector3, kind: ResidualKind) -> WakeJacobian {
        self.residual_and_jacobian(velocity, kind)
            .map_or_else(WakeJacobian::zero, |(_, jacobian)| jacobian)
    }

    /// Matrix-free product `J x` of the wake residual Jacobian.
    #[must_use]
    pub fn wake_matrix_vector_product(
        &self,
        velocity: &Vector3,
        kind: ResidualKind,
        x: &WakePerturbation,
    ) -> Vector3 {
        self.wake_jacobian(velocity, kind).apply(x)
    }

    /// Matrix-free transpose product `Jᵀ y` of the wake residual Jacobian.
    #[must_use]
    pub fn wake_transpose_matrix_vector_product(
        &self,
        velocity: &Vector3,
        kind: ResidualKind,
        y: &Vector3,
    ) -> WakePerturbation {
        self.wake_jacobian(velocity, kind).apply_transpose(y)
    }

    fn residual_and_jacobian(
        &self,
        velocity: &Vector3,
        kind: ResidualKind,
    ) -> Option<(Vector3, WakeJacobian)> {
        let wake = self.contributing_wake(kind)?;
        let convecting = ConvectingVelocity::new(&wake.rotor, velocity, self.local_free_stream());
        match kind {
            ResidualKind::Steady => self.steady(wake, &convecting),
            ResidualKind::Unsteady { delta_time, .. } => {
                Some(self.unsteady(wake, &convecting, delta_time))
            }
        }
    }

    fn steady(
        &self,
        wake: &WakeEdgeData,
        convecting: &ConvectingVelocity,
    ) -> Option<(Vector3, WakeJacobian)> {
        let speed = convecting.value.norm();
        if speed == 0.0 {
            return None;
        }
        let step = wake.step_length()?;
        let sign = wake.sign();

        let mut residual = convecting.value * (step / speed) - sign * self.span();
        let d_unit = step * normalize_jacobian(&convecting.value);
        let mut jacobian = WakeJacobian {
            d_velocity: d_unit * convecting.d_velocity,
            d_free_stream: d_unit * convecting.d_free_stream,
            d_node1: Matrix3::from_diagonal_element(sign),
            d_node2: Matrix3::from_diagonal_element(-sign),
        };

        if let Some(thrust) = wake.rotor.thrust() {
            let projector = axis_projector(thrust);
            residual = projector * residual;
            jacobian.project(&projector);
        }
        Some((residual, jacobian))
    }

    fn unsteady(
        &self,
        wake: &WakeEdgeData,
        convecting: &ConvectingVelocity,
        delta_time: f64,
    ) -> (Vector3, WakeJacobian) {
        let (free, fixed) = if wake.sign() > 0.0 {
            (self.x2(), self.x1())
        } else {
            (self.x1(), self.x2())
        };
        let upstream = wake.stored_location().unwrap_or(*fixed);
        let residual = upstream + convecting.value * delta_time - free;

        let mut jacobian = WakeJacobian {
            d_velocity: delta_time * convecting.d_velocity,
            d_free_stream: delta_time * convecting.d_free_stream,
            ..WakeJacobian::zero()
        };
        // Before the first stored step the upstream point is the live fixed end.
        let d_fixed = if wake.stored_location().is_some() {
            Matrix3::zeros()
        } else {
            Matrix3::identity()
        };
        if wake.sign() > 0.0 {
            jacobian.d_node1 = d_fixed;
            jacobian.d_node2 = -Matrix3::identity();
        } else {
            jacobian.d_node1 = -Matrix3::identity();
            jacobian.d_node2 = d_fixed;
        }
        (residual, jacobian)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;
    use crate::lattice::{NodeId, WakeDirection};
    use crate::math::Point3;

    fn p(x: f64, y: f64, z: f64) -> Point3 {
        Point3::new(x, y, z)
    }

    fn v(x: f64, y: f64, z: f64) -> Vector3 {
        Vector3::new(x, y, z)
    }

    fn wake_edge(x1: Point3, x2: Point3, wake: WakeEdgeData, step: f64) -> VortexEdge {
        let mut edge = VortexEdge::new(NodeId::default(), x1, NodeId::default(), x2);
        let mut wake = wake;
        wake.set_step_length(step).unwrap();
        edge.create_wake_edge_space(wake);
        edge
    }

    fn downstream() -> WakeEdgeData {
        WakeEdgeData::new(WakeDirection::Downstream)
    }

    const UNSTEADY: ResidualKind = ResidualKind::Unsteady {
        delta_time: 0.1,
        time_step: 5,
    };

    #[test]
    fn aligned_edge_has_zero_residual() {
        let edge = wake_edge(p(0.0, 0.0, 0.0), p(0.5, 0.0, 0.0), downstream(), 0.5);
        assert_relative_eq!(edge.compute_residual(&v(3.0, 0.0, 0.0)), Vector3::zeros());
    }

    #[test]
    fn residual_points_to_flow_aligned_position() {
        let edge = wake_edge(p(0.0, 0.0, 0.0), p(0.0, 1.0, 0.0), downstream(), 1.0);
        let residual = edge.compute_residual(&v(2.0, 0.0, 0.0));
        assert_relative_eq!(residual, v(1.0, -1.0, 0.0));

        // Upstream orientation: node 1 is free, Δ = X1 - X2.
        let edge = wake_edge(
            p(1.0, 0.0, 0.0),
            p(0.0, 0.0, 0.0),
            WakeEdgeData::new(WakeDirection::Upstream),
            1.0,
        );
        assert_relative_eq!(edge.compute_residual(&v(1.0, 0.0, 0.0)), Vector3::zeros());
    }

    #[test]
    fn zero_speed_gives_zero_residual() {
        let edge = wake_edge(p(0.0, 0.0, 0.0), p(0.0, 1.0, 0.0), downstream(), 1.0);
        assert_eq!(edge.compute_residual(&Vector3::zeros()), Vector3::zeros());
        assert!(edge.wake_jacobian(&Vector3::zeros(), ResidualKind::Steady).is_zero());
    }

    #[test]
    fn inactive_and_suppressed_edges_contribute_nothing() {
        let velocity = v(1.0, 0.2, 0.0);
        let x = WakePerturbation {
            velocity: v(1.0, 1.0, 1.0),
            node2: v(0.0, 1.0, 0.0),
            ..WakePerturbation::zero()
        };

        let inactive = wake_edge(p(0.0, 0.0, 0.0), p(0.0, 1.0, 0.0), downstream(), 0.0);
        let mut frozen = wake_edge(p(0.0, 0.0, 0.0), p(0.0, 1.0, 0.0), downstream(), 1.0);
        frozen.flags.frozen_trailing_edge = true;
        let mut concave = frozen.clone();
        concave.flags.frozen_trailing_edge = false;
        concave.flags.concave_trailing_edge = true;
        let unresolved = {
            let mut edge = VortexEdge::new(
                NodeId::default(),
                p(0.0, 0.0, 0.0),
                NodeId::default(),
                p(0.0, 1.0, 0.0),
            );
            edge.create_wake_edge_space(downstream());
            edge
        };

        for edge in [&inactive, &frozen, &concave, &unresolved] {
            for kind in [ResidualKind::Steady, UNSTEADY] {
                assert_eq!(edge.wake_residual(&velocity, kind), Vector3::zeros());
                assert_eq!(
                    edge.wake_matrix_vector_product(&velocity, kind, &x),
                    Vector3::zeros()
                );
                assert_eq!(
                    edge.wake_transpose_matrix_vector_product(&velocity, kind, &v(1.0, 2.0, 3.0)),
                    WakePerturbation::zero()
                );
            }
        }
    }

    #[test]
    fn non_wake_edge_has_zero_residual() {
        let edge = VortexEdge::new(
            NodeId::default(),
            p(0.0, 0.0, 0.0),
            NodeId::default(),
            p(1.0, 0.0, 0.0),
        );
        assert_eq!(edge.compute_residual(&v(1.0, 1.0, 0.0)), Vector3::zeros());
        assert_eq!(edge.relaxed_velocity(&v(1.0, 1.0, 0.0)), v(1.0, 1.0, 0.0));
    }

    #[test]
    fn rotor_clamp_is_exactly_zero_for_expansion() {
        // Thrust along +x; the induced part pushes along +x (expansion).
        let rotor = RotorWakeMode::projected(v(1.0, 0.0, 0.0)).unwrap();
        let mut edge = wake_edge(
            p(0.0, 0.0, 0.0),
            p(-0.3, 0.4, 0.0),
            downstream().with_rotor(rotor),
            0.5,
        );
        edge.set_local_free_stream(v(-1.0, 0.0, 0.0));
        let velocity = v(-0.5, 0.3, 0.2);
        let convecting = ConvectingVelocity::new(&rotor, &velocity, edge.local_free_stream());
        assert_eq!(convecting.d_velocity, Matrix3::zeros());
        assert_eq!(edge.relaxed_velocity(&velocity), v(-1.0, 0.0, 0.0));
    }

    #[test]
    fn rotor_clamp_keeps_contraction() {
        let rotor = RotorWakeMode::projected(v(1.0, 0.0, 0.0)).unwrap();
        let mut edge = wake_edge(
            p(0.0, 0.0, 0.0),
            p(-0.3, 0.4, 0.0),
            downstream().with_rotor(rotor),
            0.5,
        );
        edge.set_local_free_stream(v(-1.0, 0.0, 0.0));
        assert_relative_eq!(edge.relaxed_velocity(&v(-1.5, 0.3, 0.2)), v(-1.5, 0.0, 0.0));
    }

    #[test]
    fn projected_rotor_residual_lies_on_thrust_axis() {
        let rotor = RotorWakeMode::projected(v(0.0, 0.0, 2.0)).unwrap();
        let mut edge = wake_edge(
            p(0.0, 0.0, 0.0),
            p(0.2, 0.3, -0.4),
            downstream().with_rotor(rotor),
            0.5,
        );
        edge.set_local_free_stream(v(0.1, 0.0, -0.5));
        let residual = edge.compute_residual(&v(0.3, 0.2, -1.2));
        assert_relative_eq!(residual.x, 0.0);
        assert_relative_eq!(residual.y, 0.0);
        assert!(residual.z.abs() > 0.0);
        assert_eq!(edge.wake().unwrap().rotor.thrust().map(|t| t.z), Some(1.0));
    }

    #[test]
    fn unprojected_rotor_uses_full_velocity() {
        let fixed = wake_edge(p(0.0, 0.0, 0.0), p(0.2, 0.3, -0.4), downstream(), 0.5);
        let mut rotor = wake_edge(
            p(0.0, 0.0, 0.0),
            p(0.2, 0.3, -0.4),
            downstream().with_rotor(RotorWakeMode::Unprojected),
            0.5,
        );
        rotor.set_local_free_stream(v(1.0, 0.0, 0.0));
        let velocity = v(0.3, 0.2, -1.2);
        assert_eq!(fixed.compute_residual(&velocity), rotor.compute_residual(&velocity));
        assert!(rotor.wake().unwrap().rotor.thrust().is_none());
    }

    #[test]
    fn unsteady_residual_convects_from_stored_location() {
        let mut edge = wake_edge(p(0.0, 0.0, 0.0), p(1.0, 0.0, 0.0), downstream(), 1.0);
        edge.store_wake_location();
        edge.update_geometry(p(0.1, 0.0, 0.0), p(0.9, 0.1, 0.0));
        let residual = edge.compute_unsteady_residual(&v(2.0, 0.0, 0.0), 0.5, 1);
        // X_up(n-1) + V Δt - X_free = (0,0,0) + (1,0,0) - (0.9,0.1,0).
        assert_relative_eq!(residual, v(0.1, -0.1, 0.0), epsilon = 1e-15);
    }

    #[test]
    fn unsteady_residual_is_time_gated() {
        let mut wake = downstream().with_min_valid_time_step(4);
        wake.set_step_length(1.0).unwrap();
        let mut edge = VortexEdge::new(
            NodeId::default(),
            p(0.0, 0.0, 0.0),
            NodeId::default(),
            p(1.0, 1.0, 0.0),
        );
        edge.create_wake_edge_space(wake);
        assert_eq!(edge.compute_unsteady_residual(&v(1.0, 0.0, 0.0), 0.1, 3), Vector3::zeros());
        assert!(edge.compute_unsteady_residual(&v(1.0, 0.0, 0.0), 0.1, 4).norm() > 0.0);
    }

    fn check_jacobian(edge: &VortexEdge, velocity: Vector3, kind: ResidualKind) {
        let h = 1e-6;
        let jac = edge.wake_jacobian(&velocity, kind);
        let base_free_stream = *edge.local_free_stream();
        for j in 0..3 {
            let mut plus = velocity;
            let mut minus = velocity;
            plus[j] += h;
            minus[j] -= h;
            let fd = (edge.wake_residual(&plus, kind) - edge.wake_residual(&minus, kind))
                / (2.0 * h);
            assert_relative_eq!(jac.d_velocity.column(j).into_owned(), fd, epsilon = 1e-7);

            let mut shifted = edge.clone();
            let mut plus = base_free_stream;
            plus[j] += h;
            shifted.set_local_free_stream(plus);
            let r_plus = shifted.wake_residual(&velocity, kind);
            let mut minus = base_free_stream;
            minus[j] -= h;
            shifted.set_local_free_stream(minus);
            let r_minus = shifted.wake_residual(&velocity, kind);
            assert_relative_eq!(
                jac.d_free_stream.column(j).into_owned(),
                (r_plus - r_minus) / (2.0 * h),
                epsilon = 1e-7
            );

            for node in 0..2 {
                let mut moved = edge.clone();
                let (mut x1, mut x2) = (*edge.x1(), *edge.x2());
                let target = if node == 0 { &mut x1 } else { &mut x2 };
                target[j] += h;
                moved.update_geometry(x1, x2);
                let r_plus = moved.wake_residual(&velocity, kind);
                let target = if node == 0 { &mut x1 } else { &mut x2 };
                target[j] -= 2.0 * h;
                moved.update_geometry(x1, x2);
                let r_minus = moved.wake_residual(&velocity, kind);
                let block = if node == 0 { jac.d_node1 } else { jac.d_node2 };
                assert_relative_eq!(
                    block.column(j).into_owned(),
                    (r_plus - r_minus) / (2.0 * h),
                    epsilon = 1e-7
                );
            }
        }
    }

    #[test]
    fn steady_jacobian_matches_finite_differences() {
        let edge = wake_edge(p(0.0, 0.0, 0.0), p(0.4, 0.3, -0.1), downstream(), 0.6);
        check_jacobian(&edge, v(1.2, 0.3, -0.4), ResidualKind::Steady);

        let edge = wake_edge(
            p(0.4, 0.3, -0.1),
            p(0.0, 0.0, 0.0),
            WakeEdgeData::new(WakeDirection::Upstream),
            0.6,
        );
        check_jacobian(&edge, v(1.2, 0.3, -0.4), ResidualKind::Steady);
    }

    #[test]
    fn rotor_jacobian_matches_finite_differences() {
        let rotor = RotorWakeMode::projected(v(1.0, 0.2, 0.0)).unwrap();
        let mut edge = wake_edge(
            p(0.0, 0.0, 0.0),
            p(-0.3, 0.4, 0.1),
            downstream().with_rotor(rotor),
            0.5,
        );
        edge.set_local_free_stream(v(-1.0, 0.1, 0.0));
        // Contracting: the clamp is inactive.
        let velocity = v(-1.6, 0.3, 0.2);
        check_jacobian(&edge, velocity, ResidualKind::Steady);
        check_jacobian(&edge, velocity, UNSTEADY);
    }

    #[test]
    fn unsteady_jacobian_matches_finite_differences() {
        let mut edge = wake_edge(p(0.0, 0.0, 0.0), p(0.4, 0.3, -0.1), downstream(), 0.6);
        edge.store_wake_location();
        check_jacobian(&edge, v(1.2, 0.3, -0.4), UNSTEADY);
    }

    #[test]
    fn unsteady_jacobian_without_stored_location_follows_fixed_end() {
        let velocity = v(1.2, 0.3, -0.4);
        let edge = wake_edge(p(0.0, 0.0, 0.0), p(0.4, 0.3, -0.1), downstream(), 0.6);
        let jac = edge.wake_jacobian(&velocity, UNSTEADY);
        assert_eq!(jac.d_node1, Matrix3::identity());
        assert_eq!(jac.d_node2, -Matrix3::identity());
        check_jacobian(&edge, velocity, UNSTEADY);

        let edge = wake_edge(
            p(0.4, 0.3, -0.1),
            p(0.0, 0.0, 0.0),
            WakeEdgeData::new(WakeDirection::Upstream),
            0.6,
        );
        let jac = edge.wake_jacobian(&velocity, UNSTEADY);
        assert_eq!(jac.d_node1, -Matrix3::identity());
        assert_eq!(jac.d_node2, Matrix3::identity());
        check_jacobian(&edge, velocity, UNSTEADY);

        // Once a location is stored the fixed end no longer enters.
        let mut edge = wake_edge(p(0.0, 0.0, 0.0), p(0.4, 0.3, -0.1), downstream(), 0.6);
        edge.store_wake_location();
        assert_eq!(edge.wake_jacobian(&velocity, UNSTEADY).d_node1, Matrix3::zeros());
    }

    #[test]
    fn products_agree_with_jacobian() {
        let edge = wake_edge(p(0.0, 0.0, 0.0), p(0.4, 0.3, -0.1), downstream(), 0.6);
        let velocity = v(1.2, 0.3, -0.4);
        let x = WakePerturbation {
            velocity: v(0.1, 0.2, 0.3),
            free_stream: v(-0.2, 0.0, 0.1),
            node1: v(0.0, 0.5, 0.0),
            node2: v(0.3, 0.0, -0.2),
        };
        let y = v(0.7, -0.3, 0.2);
        let jx = edge.wake_matrix_vector_product(&velocity, ResidualKind::Steady, &x);
        let jty = edge.wake_transpose_matrix_vector_product(&velocity, ResidualKind::Steady, &y);
        assert_relative_eq!(y.dot(&jx), jty.dot(&x), epsilon = 1e-14);
    }
}
