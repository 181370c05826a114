use std::ops::Add;

use rayon::prelude::*;
use tracing::debug;

use crate::lattice::{CirculationChannel, EdgeId, Lattice, VortexEdge};
use crate::math::{Point3, Vector3};
use crate::operations::assembly::induced_velocity_at;

/// Integrated loads on the bound edges of a lattice.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ForceTotals {
    /// Sum of the Kutta-Joukowski forces.
    pub force: Vector3,
    /// Sum of the Trefftz-plane forces from the wake-induced downwash.
    pub trefftz_force: Vector3,
    /// Moment of [`ForceTotals::force`] about the reference point.
    pub moment: Vector3,
}

impl Add for ForceTotals {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self {
            force: self.force + rhs.force,
            trefftz_force: self.trefftz_force + rhs.trefftz_force,
            moment: self.moment + rhs.moment,
        }
    }
}

/// Sums the force and moment over every bound (non-wake) edge.
///
/// Each edge sees its local freestream plus the velocity induced by all
/// other edges at its centroid. The Trefftz force uses the velocity induced
/// by wake edges alone.
#[derive(Debug)]
pub struct IntegrateForces {
    reference: Point3,
}

impl IntegrateForces {
    /// Creates a new `IntegrateForces` query taking moments about `reference`.
    #[must_use]
    pub fn new(reference: Point3) -> Self {
        Self { reference }
    }

    /// Executes the query.
    #[must_use]
    pub fn execute(&self, lattice: &Lattice) -> ForceTotals {
        let edges: Vec<(EdgeId, &VortexEdge)> = lattice.edges().collect();
        let wakes: Vec<(EdgeId, &VortexEdge)> = lattice.wake_edges().collect();
        let bound: Vec<(EdgeId, &VortexEdge)> = edges
            .iter()
            .filter(|(_, edge)| !edge.is_wake_edge())
            .copied()
            .collect();

        let totals = bound
            .par_iter()
            .map(|(id, edge)| {
                let gamma = edge.circulation.gamma;
                let centroid = edge.centroid();
                let velocity = edge.local_free_stream()
                    + induced_velocity_at(&edges, *id, centroid, CirculationChannel::Gamma);
                let downwash =
                    induced_velocity_at(&wakes, *id, centroid, CirculationChannel::Gamma);
                let force = edge.force(&velocity, gamma);
                ForceTotals {
                    force,
                    trefftz_force: edge.trefftz_force(&downwash, gamma),
                    moment: (centroid - self.reference).cross(&force),
                }
            })
            .reduce(ForceTotals::default, Add::add);

        debug!(
            edges = bound.len(),
            force = ?totals.force,
            "integrated forces"
        );
        totals
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;
    use crate::lattice::{WakeDirection, WakeEdgeData};

    fn p(x: f64, y: f64, z: f64) -> Point3 {
        Point3::new(x, y, z)
    }

    fn v(x: f64, y: f64, z: f64) -> Vector3 {
        Vector3::new(x, y, z)
    }

    #[test]
    fn isolated_bound_edge_lift_and_moment() {
        let mut lattice = Lattice::default();
        let a = lattice.add_node(p(0.0, -1.0, 0.0));
        let b = lattice.add_node(p(0.0, 1.0, 0.0));
        let e = lattice.add_edge(a, b).unwrap();
        let edge = lattice.edge_mut(e).unwrap();
        edge.circulation.gamma = 2.0;
        edge.set_local_free_stream(v(1.0, 0.0, 0.0));

        let totals = IntegrateForces::new(p(-1.0, 0.0, 0.0)).execute(&lattice);
        assert_relative_eq!(totals.force, v(0.0, 0.0, 4.0), epsilon = 1e-14);
        assert_relative_eq!(totals.moment, v(0.0, -4.0, 0.0), epsilon = 1e-14);
        assert_relative_eq!(totals.trefftz_force, Vector3::zeros());
    }

    #[test]
    fn wake_edges_carry_no_load_but_induce_downwash() {
        let mut lattice = Lattice::default();
        let a = lattice.add_node(p(0.0, -1.0, 0.0));
        let b = lattice.add_node(p(0.0, 1.0, 0.0));
        let bound = lattice.add_edge(a, b).unwrap();
        {
            let edge = lattice.edge_mut(bound).unwrap();
            edge.circulation.gamma = 1.0;
            edge.set_local_free_stream(v(1.0, 0.0, 0.0));
        }

        // Trailing legs of a horseshoe.
        let far_a = lattice.add_node(p(5.0, -1.0, 0.0));
        let far_b = lattice.add_node(p(5.0, 1.0, 0.0));
        let mut trails = Vec::new();
        let legs = [
            (far_a, a, WakeDirection::Upstream),
            (b, far_b, WakeDirection::Downstream),
        ];
        for (n1, n2, direction) in legs {
            let trail = lattice.add_edge(n1, n2).unwrap();
            lattice
                .attach_wake(trail, WakeEdgeData::new(direction))
                .unwrap();
            lattice.edge_mut(trail).unwrap().circulation.gamma = 1.0;
            trails.push(trail);
        }

        let totals = IntegrateForces::new(p(0.0, 0.0, 0.0)).execute(&lattice);

        let centroid = p(0.0, 0.0, 0.0);
        let downwash: Vector3 = trails
            .iter()
            .map(|t| lattice.edge(*t).unwrap().induced_velocity(&centroid, 1.0))
            .sum();
        let edge = lattice.edge(bound).unwrap();
        let expected_force = edge.force(&(v(1.0, 0.0, 0.0) + downwash), 1.0);
        assert_relative_eq!(totals.force, expected_force, epsilon = 1e-14);
        assert_relative_eq!(
            totals.trefftz_force,
            edge.trefftz_force(&downwash, 1.0),
            epsilon = 1e-14
        );
        // The downwash tilts the force, producing induced drag along x.
        assert!(totals.trefftz_force.x.abs() > 0.0);
    }
}
