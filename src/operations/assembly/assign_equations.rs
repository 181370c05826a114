use std::collections::{HashMap, HashSet};

use tracing::debug;

use crate::error::{LatticeError, Result, WakeError};
use crate::lattice::{EdgeId, Lattice, NodeId};

use super::wake_equation_count;

/// Gives every wake edge three contiguous residual equation numbers.
///
/// Edges that already carry numbers keep them; new numbers start after the
/// highest existing one. Each wake edge owns the unknowns of its free node,
/// so no two wake edges may share a free node or an equation number.
#[derive(Debug, Default)]
pub struct AssignWakeEquations;

impl AssignWakeEquations {
    /// Creates a new `AssignWakeEquations` operation.
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Executes the assignment, returning the number of wake equations.
    ///
    /// # Errors
    ///
    /// Returns an error if two wake edges share a free node or an equation
    /// number.
    pub fn execute(&self, lattice: &mut Lattice) -> Result<usize> {
        let mut next = wake_equation_count(lattice);
        let pending: Vec<EdgeId> = lattice
            .wake_edges()
            .filter(|(_, edge)| {
                edge.wake()
                    .is_some_and(|wake| wake.equation_numbers().is_none())
            })
            .map(|(id, _)| id)
            .collect();

        for id in &pending {
            if let Some(wake) = lattice.edge_mut(*id)?.wake_mut() {
                wake.assign_equation_numbers(next)?;
                next += 3;
            }
        }
        debug!(assigned = pending.len(), equations = next, "assigned wake equations");

        verify(lattice)?;
        Ok(next)
    }
}

/// Checks that equation numbers and free nodes are unique across wake edges.
fn verify(lattice: &Lattice) -> Result<()> {
    let mut equations = HashSet::new();
    let mut free_nodes: HashMap<NodeId, EdgeId> = HashMap::new();
    for (id, edge) in lattice.wake_edges() {
        let Some(numbers) = edge.wake().and_then(|wake| wake.equation_numbers()) else {
            continue;
        };
        for number in numbers {
            if !equations.insert(number) {
                return Err(WakeError::OverlappingEquationNumbers(number).into());
            }
        }
        if let Some((node, _)) = edge.wake_free_end() {
            if free_nodes.insert(node, id).is_some() {
                return Err(LatticeError::SharedFreeNode(format!("{node:?}")).into());
            }
        }
    }
    Ok(())
}
