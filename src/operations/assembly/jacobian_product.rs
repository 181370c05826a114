use rayon::prelude::*;
use slotmap::SecondaryMap;
use tracing::trace;

use crate::error::Result;
use crate::kernel::InducedVelocityGradient;
use crate::lattice::{EdgeId, Lattice, NodeId, VortexEdge};
use crate::math::{Matrix3, Vector3};
use crate::relaxation::{ResidualKind, WakeJacobian, WakePerturbation};

use super::{check_length, wake_equation_count};

/// Sensitivity of a wake edge's velocity to one inducing edge.
struct Influence {
    node1: NodeId,
    node2: NodeId,
    gradient: InducedVelocityGradient,
}

/// Linearized residual of one numbered wake edge.
struct WakeRow {
    equations: [usize; 3],
    node1: NodeId,
    node2: NodeId,
    jacobian: WakeJacobian,
    influences: Vec<Influence>,
}

/// Exact linearization of the wake residuals with respect to the free-node
/// positions, including the coupling through the induced velocity at every
/// wake edge centroid.
struct Linearization {
    rows: Vec<WakeRow>,
    /// Equation numbers of every free node.
    unknowns: SecondaryMap<NodeId, [usize; 3]>,
    size: usize,
}

impl Linearization {
    fn new(lattice: &Lattice, kind: ResidualKind) -> Self {
        let edges: Vec<(EdgeId, &VortexEdge)> = lattice.edges().collect();
        let numbered: Vec<(EdgeId, &VortexEdge, [usize; 3])> = lattice
            .wake_edges()
            .filter_map(|(id, edge)| Some((id, edge, edge.wake()?.equation_numbers()?)))
            .collect();

        let mut unknowns = SecondaryMap::new();
        for (_, edge, equations) in &numbered {
            if let Some((node, _)) = edge.wake_free_end() {
                unknowns.insert(node, *equations);
            }
        }

        let rows = numbered
            .par_iter()
            .filter_map(|(id, edge, equations)| {
                let jacobian = edge.wake_jacobian(edge.velocity(), kind);
                if jacobian.is_zero() {
                    return None;
                }
                let influences = if jacobian.d_velocity == Matrix3::zeros() {
                    Vec::new()
                } else {
                    edges
                        .iter()
                        .filter(|(other, _)| other != id)
                        .map(|(_, inducing)| Influence {
                            node1: inducing.node1(),
                            node2: inducing.node2(),
                            gradient: inducing.gradient_induced_velocity(
                                edge.centroid(),
                                inducing.circulation.gamma,
                            ),
                        })
                        .collect()
                };
                Some(WakeRow {
                    equations: *equations,
                    node1: edge.node1(),
                    node2: edge.node2(),
                    jacobian,
                    influences,
                })
            })
            .collect();

        Self {
            rows,
            unknowns,
            size: wake_equation_count(lattice),
        }
    }

    /// Displacement of `node` under the unknown vector `x`; fixed nodes do
    /// not move.
    fn displacement(&self, x: &[f64], node: NodeId) -> Vector3 {
        self.unknowns
            .get(node)
            .map_or_else(Vector3::zeros, |eq| Vector3::new(x[eq[0]], x[eq[1]], x[eq[2]]))
    }

    fn product(&self, x: &[f64]) -> Vec<f64> {
        let mut out = vec![0.0; self.size];
        for row in &self.rows {
            let node1 = self.displacement(x, row.node1);
            let node2 = self.displacement(x, row.node2);
            let centroid = 0.5 * (node1 + node2);
            let velocity: Vector3 = row
                .influences
                .iter()
                .map(|influence| {
                    let g = &influence.gradient;
                    g.d_node1 * self.displacement(x, influence.node1)
                        + g.d_node2 * self.displacement(x, influence.node2)
                        + g.d_point * centroid
                })
                .sum();
            let perturbation = WakePerturbation {
                velocity,
                free_stream: Vector3::zeros(),
                node1,
                node2,
            };
            let jx = row.jacobian.apply(&perturbation);
            for (component, number) in row.equations.into_iter().enumerate() {
                out[number] += jx[component];
            }
        }
        out
    }

    fn transpose_product(&self, y: &[f64]) -> Vec<f64> {
        let mut gradient: SecondaryMap<NodeId, Vector3> = SecondaryMap::new();
        let mut add = |node: NodeId, value: Vector3| {
            if let Some(entry) = gradient.entry(node) {
                *entry.or_insert_with(Vector3::zeros) += value;
            }
        };

        for row in &self.rows {
            let eq = row.equations;
            let seed = Vector3::new(y[eq[0]], y[eq[1]], y[eq[2]]);
            let g = row.jacobian.apply_transpose(&seed);
            add(row.node1, g.node1);
            add(row.node2, g.node2);
            for influence in &row.influences {
                let d = &influence.gradient;
                add(influence.node1, d.d_node1.tr_mul(&g.velocity));
                add(influence.node2, d.d_node2.tr_mul(&g.velocity));
                let through_centroid = 0.5 * d.d_point.tr_mul(&g.velocity);
                add(row.node1, through_centroid);
                add(row.node2, through_centroid);
            }
        }

        let mut out = vec![0.0; self.size];
        for (node, eq) in &self.unknowns {
            if let Some(value) = gradient.get(node) {
                for (component, number) in eq.iter().enumerate() {
                    out[*number] = value[component];
                }
            }
        }
        out
    }
}

/// Matrix-free product `J x` of the global wake residual Jacobian.
///
/// `x` holds free-node displacements addressed by each wake edge's equation
/// numbers. The product linearizes the residual through both the edge
/// geometry and the induced velocity at every wake centroid, with the edge
/// velocities taken as stored by the last velocity update.
#[derive(Debug)]
pub struct WakeJacobianProduct {
    kind: ResidualKind,
}

impl WakeJacobianProduct {
    /// Creates a new `WakeJacobianProduct` operation.
    #[must_use]
    pub fn new(kind: ResidualKind) -> Self {
        Self { kind }
    }

    /// Executes the product.
    ///
    /// # Errors
    ///
    /// Returns an error if `x` does not match the number of wake equations.
    pub fn execute(&self, lattice: &Lattice, x: &[f64]) -> Result<Vec<f64>> {
        check_length(wake_equation_count(lattice), x.len())?;
        let linearization = Linearization::new(lattice, self.kind);
        trace!(rows = linearization.rows.len(), "wake jacobian product");
        Ok(linearization.product(x))
    }
}

/// Matrix-free transpose product `Jᵀ y`, the adjoint of
/// [`WakeJacobianProduct`].
#[derive(Debug)]
pub struct WakeJacobianTransposeProduct {
    kind: ResidualKind,
}

impl WakeJacobianTransposeProduct {
    /// Creates a new `WakeJacobianTransposeProduct` operation.
    #[must_use]
    pub fn new(kind: ResidualKind) -> Self {
        Self { kind }
    }

    /// Executes the transpose product.
    ///
    /// # Errors
    ///
    /// Returns an error if `y` does not match the number of wake equations.
    pub fn execute(&self, lattice: &Lattice, y: &[f64]) -> Result<Vec<f64>> {
        check_length(wake_equation_count(lattice), y.len())?;
        let linearization = Linearization::new(lattice, self.kind);
        trace!(rows = linearization.rows.len(), "wake jacobian transpose product");
        Ok(linearization.transpose_product(y))
    }
}
