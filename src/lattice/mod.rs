pub mod edge;
pub mod node;
pub mod wake;

pub use edge::{Circulation, CirculationChannel, EdgeFlags, EdgeId, LoopIndex, VortexEdge};
pub use node::{NodeData, NodeId};
pub use wake::{RotorWakeMode, WakeDirection, WakeEdgeData};

use slotmap::SlotMap;
use tracing::debug;

use crate::config::{KernelConfig, Tolerance};
use crate::error::{LatticeError, Result, WakeError};
use crate::kernel::Compressibility;
use crate::math::Point3;

/// Central arena that owns the nodes and vortex edges of a lattice.
///
/// Edges reference nodes via typed IDs and cache their coordinates; call
/// [`Lattice::refresh_geometry`] after moving nodes directly.
#[derive(Debug, Clone, Default)]
pub struct Lattice {
    config: KernelConfig,
    nodes: SlotMap<NodeId, NodeData>,
    edges: SlotMap<EdgeId, VortexEdge>,
    time_step: usize,
}

impl Lattice {
    /// Creates an empty lattice with the given configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid.
    pub fn new(config: KernelConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            ..Self::default()
        })
    }

    /// The configuration applied to every edge.
    #[must_use]
    pub fn config(&self) -> &KernelConfig {
        &self.config
    }

    /// Current unsteady time step.
    #[must_use]
    pub fn time_step(&self) -> usize {
        self.time_step
    }

    fn compressibility(&self) -> Compressibility {
        Compressibility::new(self.config.mach, self.config.karman_tsien_factor)
    }

    // --- Node operations ---

    /// Inserts a node and returns its ID.
    pub fn add_node(&mut self, point: Point3) -> NodeId {
        self.nodes.insert(NodeData::new(point))
    }

    /// Returns a reference to the node data, or an error if not found.
    ///
    /// # Errors
    ///
    /// Returns an error if the entity is not found in the store.
    pub fn node(&self, id: NodeId) -> std::result::Result<&NodeData, LatticeError> {
        self.nodes
            .get(id)
            .ok_or_else(|| LatticeError::EntityNotFound("node".into()))
    }

    /// Returns a mutable reference to the node data, or an error if not found.
    ///
    /// Edge caches are stale until [`Lattice::refresh_geometry`] runs.
    ///
    /// # Errors
    ///
    /// Returns an error if the entity is not found in the store.
    pub fn node_mut(&mut self, id: NodeId) -> std::result::Result<&mut NodeData, LatticeError> {
        self.nodes
            .get_mut(id)
            .ok_or_else(|| LatticeError::EntityNotFound("node".into()))
    }

    /// Iterates over all nodes.
    pub fn nodes(&self) -> impl Iterator<Item = (NodeId, &NodeData)> {
        self.nodes.iter()
    }

    /// Iterates mutably over all nodes; edge caches go stale until
    /// [`Lattice::refresh_geometry`].
    pub(crate) fn nodes_mut(&mut self) -> impl Iterator<Item = (NodeId, &mut NodeData)> {
        self.nodes.iter_mut()
    }

    // --- Edge operations ---

    /// Creates an edge between two existing nodes, configured with the
    /// lattice Mach number, tolerance and core width.
    ///
    /// # Errors
    ///
    /// Returns an error if either node is not found.
    pub fn add_edge(&mut self, node1: NodeId, node2: NodeId) -> Result<EdgeId> {
        let x1 = self.node(node1)?.point;
        let x2 = self.node(node2)?.point;
        let mut edge = VortexEdge::new(node1, x1, node2, x2);
        edge.set_compressibility(self.compressibility());
        edge.set_tolerance(self.config.tolerance());
        edge.set_core_width(self.config.core_width);
        Ok(self.edges.insert(edge))
    }

    /// Returns a reference to the edge, or an error if not found.
    ///
    /// # Errors
    ///
    /// Returns an error if the entity is not found in the store.
    pub fn edge(&self, id: EdgeId) -> std::result::Result<&VortexEdge, LatticeError> {
        self.edges
            .get(id)
            .ok_or_else(|| LatticeError::EntityNotFound("edge".into()))
    }

    /// Returns a mutable reference to the edge, or an error if not found.
    ///
    /// # Errors
    ///
    /// Returns an error if the entity is not found in the store.
    pub fn edge_mut(&mut self, id: EdgeId) -> std::result::Result<&mut VortexEdge, LatticeError> {
        self.edges
            .get_mut(id)
            .ok_or_else(|| LatticeError::EntityNotFound("edge".into()))
    }

    /// Iterates over all edges.
    pub fn edges(&self) -> impl Iterator<Item = (EdgeId, &VortexEdge)> {
        self.edges.iter()
    }

    /// Iterates mutably over all edges.
    pub fn edges_mut(&mut self) -> impl Iterator<Item = (EdgeId, &mut VortexEdge)> {
        self.edges.iter_mut()
    }

    /// Iterates over edges that carry wake data.
    pub fn wake_edges(&self) -> impl Iterator<Item = (EdgeId, &VortexEdge)> {
        self.edges.iter().filter(|(_, edge)| edge.is_wake_edge())
    }

    /// Number of edges.
    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// Attaches wake data to an edge.
    ///
    /// # Errors
    ///
    /// Returns an error if the edge is not found.
    pub fn attach_wake(&mut self, id: EdgeId, wake: WakeEdgeData) -> Result<()> {
        self.edge_mut(id)?.create_wake_edge_space(wake);
        Ok(())
    }

    // --- Global parameters ---

    /// Sets the freestream Mach number on the lattice and every edge.
    ///
    /// # Errors
    ///
    /// Returns an error if the Mach number is not finite.
    pub fn set_mach(&mut self, mach: f64) -> Result<()> {
        let config = KernelConfig {
            mach,
            ..self.config
        };
        config.validate()?;
        self.config = config;
        let flow = self.compressibility();
        for edge in self.edges.values_mut() {
            edge.set_compressibility(flow);
        }
        debug!(mach, beta2 = flow.beta2(), "set lattice Mach number");
        Ok(())
    }

    /// Sets the linear singularity tolerance; the squared and quartic values
    /// follow.
    ///
    /// # Errors
    ///
    /// Returns an error if the tolerance is not a positive finite value.
    pub fn set_tolerance(&mut self, linear: f64) -> Result<()> {
        let config = KernelConfig {
            tolerance: linear,
            ..self.config
        };
        config.validate()?;
        self.config = config;
        let tolerance = Tolerance::new(linear);
        for edge in self.edges.values_mut() {
            edge.set_tolerance(tolerance);
        }
        debug!(linear, "set lattice tolerance");
        Ok(())
    }

    /// Sets the core width of every edge.
    ///
    /// # Errors
    ///
    /// Returns an error if the width is negative or not finite.
    pub fn set_core_width(&mut self, core_width: f64) -> Result<()> {
        let config = KernelConfig {
            core_width,
            ..self.config
        };
        config.validate()?;
        self.config = config;
        for edge in self.edges.values_mut() {
            edge.set_core_width(core_width);
        }
        Ok(())
    }

    // --- Geometry and wake lifecycle ---

    /// Re-reads node positions into every edge cache.
    ///
    /// # Errors
    ///
    /// Returns an error if an edge references a removed node.
    pub fn refresh_geometry(&mut self) -> Result<()> {
        for edge in self.edges.values_mut() {
            let x1 = self
                .nodes
                .get(edge.node1())
                .ok_or_else(|| LatticeError::EntityNotFound("node".into()))?
                .point;
            let x2 = self
                .nodes
                .get(edge.node2())
                .ok_or_else(|| LatticeError::EntityNotFound("node".into()))?
                .point;
            edge.update_geometry(x1, x2);
        }
        Ok(())
    }

    /// Assigns `dS` = current length to every unresolved wake edge and returns
    /// how many were resolved.
    ///
    /// # Errors
    ///
    /// Returns an error if a step length is rejected.
    pub fn resolve_wake_step_lengths(&mut self) -> Result<usize> {
        let mut resolved = 0;
        for edge in self.edges.values_mut() {
            let length = edge.length();
            if let Some(wake) = edge.wake_mut() {
                if !wake.is_resolved() {
                    wake.set_step_length(length)?;
                    resolved += 1;
                }
            }
        }
        debug!(resolved, "resolved wake step lengths");
        Ok(resolved)
    }

    /// Stores the upstream end of every wake edge and moves to the next time
    /// step.
    pub fn advance_time_step(&mut self) {
        for edge in self.edges.values_mut() {
            edge.store_wake_location();
        }
        self.time_step += 1;
        debug!(time_step = self.time_step, "advanced time step");
    }

    /// Wake data of an edge.
    ///
    /// # Errors
    ///
    /// Returns an error if the edge is missing or is not a wake edge.
    pub fn wake(&self, id: EdgeId) -> Result<&WakeEdgeData> {
        self.edge(id)?
            .wake()
            .ok_or_else(|| WakeError::NotAWakeEdge.into())
    }
}
