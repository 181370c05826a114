use std::f64::consts::FRAC_PI_2;

use crate::config::Tolerance;
use crate::kernel::Compressibility;
use crate::math::mach_cone::{mach_cone_interval, ConeInterval};
use crate::math::{Point3, Vector3};

use super::node::NodeId;
use super::wake::WakeEdgeData;

slotmap::new_key_type! {
    /// Unique identifier for an edge in the lattice store.
    pub struct EdgeId;
}

/// Index of a loop owned outside this crate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LoopIndex(pub usize);

/// Classification flags of an edge.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[allow(clippy::struct_excessive_bools)]
pub struct EdgeFlags {
    pub trailing_edge: bool,
    pub boundary_edge: bool,
    pub wake_trailing_edge: bool,
    /// The spanwise velocity and its derivatives are forced to zero.
    pub symmetry_plane_edge: bool,
    /// Suppressed concave trailing edge: contributes nothing anywhere.
    pub concave_trailing_edge: bool,
    /// Frozen trailing edge: contributes nothing anywhere.
    pub frozen_trailing_edge: bool,
    pub node1_on_symmetry_plane: bool,
    pub node2_on_symmetry_plane: bool,
}

impl EdgeFlags {
    /// Whether every contribution of the edge is forced to zero.
    #[must_use]
    pub fn suppresses_influence(&self) -> bool {
        self.concave_trailing_edge || self.frozen_trailing_edge
    }
}

/// Circulation channels carried by an edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CirculationChannel {
    /// Circulation strength `Γ`.
    Gamma,
    /// Perturbation `ΔΓ`.
    Delta,
    /// Mesh sensitivity `dΓ/dMesh`.
    Mesh,
    /// Stall sensitivity `dΓ/dStall`.
    Stall,
    /// Vortex-stretching sensitivity `dΓ/dStretch`.
    Stretch,
}

/// Circulation strength and its sensitivity channels.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Circulation {
    pub gamma: f64,
    pub delta_gamma: f64,
    pub d_gamma_d_mesh: f64,
    pub d_gamma_d_stall: f64,
    pub d_gamma_d_stretch: f64,
}

impl CirculationChannel {
    /// Slot of a perturbation channel; `None` for `Γ` itself.
    fn perturbation_slot(self) -> Option<usize> {
        match self {
            Self::Gamma => None,
            Self::Delta => Some(0),
            Self::Mesh => Some(1),
            Self::Stall => Some(2),
            Self::Stretch => Some(3),
        }
    }
}

impl Circulation {
    /// Circulation with only `Γ` set.
    #[must_use]
    pub fn new(gamma: f64) -> Self {
        Self {
            gamma,
            ..Self::default()
        }
    }

    /// Value of one channel.
    #[must_use]
    pub fn channel(&self, channel: CirculationChannel) -> f64 {
        match channel {
            CirculationChannel::Gamma => self.gamma,
            CirculationChannel::Delta => self.delta_gamma,
            CirculationChannel::Mesh => self.d_gamma_d_mesh,
            CirculationChannel::Stall => self.d_gamma_d_stall,
            CirculationChannel::Stretch => self.d_gamma_d_stretch,
        }
    }
}

/// A straight vortex filament between two lattice nodes.
///
/// The edge references its nodes by ID and caches their coordinates together
/// with the derived span, unit direction, length and centroid. The cache is
/// refreshed by [`VortexEdge::update_geometry`] whenever the nodes move.
#[derive(Debug, Clone)]
pub struct VortexEdge {
    node1: NodeId,
    node2: NodeId,
    x1: Point3,
    x2: Point3,
    span: Vector3,
    direction: Vector3,
    length: f64,
    centroid: Point3,
    core_width: f64,
    flow: Compressibility,
    tolerance: Tolerance,
    velocity: Vector3,
    perturbation_velocities: [Vector3; 4],
    local_free_stream: Vector3,
    wake: Option<WakeEdgeData>,
    /// Circulation strength and sensitivity channels.
    pub circulation: Circulation,
    /// Classification flags.
    pub flags: EdgeFlags,
    /// Loop on the left of the edge.
    pub loop_left: Option<LoopIndex>,
    /// Loop on the right of the edge.
    pub loop_right: Option<LoopIndex>,
}

impl VortexEdge {
    /// Creates an edge between two nodes at the given positions.
    #[must_use]
    pub fn new(node1: NodeId, x1: Point3, node2: NodeId, x2: Point3) -> Self {
        let mut edge = Self {
            node1,
            node2,
            x1,
            x2,
            span: Vector3::zeros(),
            direction: Vector3::zeros(),
            length: 0.0,
            centroid: x1,
            core_width: 0.0,
            flow: Compressibility::default(),
            tolerance: Tolerance::default(),
            velocity: Vector3::zeros(),
            perturbation_velocities: [Vector3::zeros(); 4],
            local_free_stream: Vector3::zeros(),
            wake: None,
            circulation: Circulation::default(),
            flags: EdgeFlags::default(),
            loop_left: None,
            loop_right: None,
        };
        edge.update_geometry(x1, x2);
        edge
    }

    /// Moves the endpoints and recomputes span, direction, length and centroid.
    ///
    /// A zero-length edge keeps a zero direction vector.
    pub fn update_geometry(&mut self, x1: Point3, x2: Point3) {
        self.x1 = x1;
        self.x2 = x2;
        self.span = x2 - x1;
        self.length = self.span.norm();
        self.direction = if self.length > 0.0 {
            self.span / self.length
        } else {
            Vector3::zeros()
        };
        self.centroid = nalgebra::center(&x1, &x2);
    }

    /// ID of node 1.
    #[must_use]
    pub fn node1(&self) -> NodeId {
        self.node1
    }

    /// ID of node 2.
    #[must_use]
    pub fn node2(&self) -> NodeId {
        self.node2
    }

    /// Cached position of node 1.
    #[must_use]
    pub fn x1(&self) -> &Point3 {
        &self.x1
    }

    /// Cached position of node 2.
    #[must_use]
    pub fn x2(&self) -> &Point3 {
        &self.x2
    }

    /// Unnormalized filament vector `X2 - X1`.
    #[must_use]
    pub fn span(&self) -> &Vector3 {
        &self.span
    }

    /// Unit direction of the filament.
    #[must_use]
    pub fn direction(&self) -> &Vector3 {
        &self.direction
    }

    /// Filament length.
    #[must_use]
    pub fn length(&self) -> f64 {
        self.length
    }

    /// Midpoint of the filament, where edge velocities are evaluated.
    #[must_use]
    pub fn centroid(&self) -> &Point3 {
        &self.centroid
    }

    /// Core regularization width used by [`VortexEdge::induced_velocity`].
    #[must_use]
    pub fn core_width(&self) -> f64 {
        self.core_width
    }

    /// Sets the core regularization width.
    pub fn set_core_width(&mut self, core_width: f64) {
        self.core_width = core_width;
    }

    /// Compressibility state of the edge.
    #[must_use]
    pub fn compressibility(&self) -> &Compressibility {
        &self.flow
    }

    /// Mach number seen by the edge.
    #[must_use]
    pub fn mach(&self) -> f64 {
        self.flow.mach()
    }

    /// Sets the Mach number, keeping the Karman-Tsien factor.
    pub fn set_mach(&mut self, mach: f64) {
        self.flow = Compressibility::new(mach, self.flow.karman_tsien_factor());
    }

    /// Replaces the compressibility state.
    pub fn set_compressibility(&mut self, flow: Compressibility) {
        self.flow = flow;
    }

    /// Singularity tolerances of the edge.
    #[must_use]
    pub fn tolerance(&self) -> Tolerance {
        self.tolerance
    }

    /// Sets the singularity tolerances.
    pub fn set_tolerance(&mut self, tolerance: Tolerance) {
        self.tolerance = tolerance;
    }

    /// Total velocity at the edge evaluation point, as last stored.
    #[must_use]
    pub fn velocity(&self) -> &Vector3 {
        &self.velocity
    }

    /// Overwrites the stored total velocity.
    pub fn set_velocity(&mut self, velocity: Vector3) {
        self.velocity = velocity;
    }

    /// Velocity stored for one circulation channel: the total velocity for
    /// `Γ`, the induced velocity alone for a perturbation channel.
    #[must_use]
    pub fn channel_velocity(&self, channel: CirculationChannel) -> &Vector3 {
        match channel.perturbation_slot() {
            Some(slot) => &self.perturbation_velocities[slot],
            None => &self.velocity,
        }
    }

    /// Stores the velocity of one circulation channel. Perturbation channels
    /// never touch the total velocity.
    pub fn set_channel_velocity(&mut self, channel: CirculationChannel, velocity: Vector3) {
        match channel.perturbation_slot() {
            Some(slot) => self.perturbation_velocities[slot] = velocity,
            None => self.velocity = velocity,
        }
    }

    /// Freestream velocity at the edge, including rotational contributions.
    #[must_use]
    pub fn local_free_stream(&self) -> &Vector3 {
        &self.local_free_stream
    }

    /// Sets the local freestream velocity.
    pub fn set_local_free_stream(&mut self, velocity: Vector3) {
        self.local_free_stream = velocity;
    }

    /// Whether the edge carries wake data.
    #[must_use]
    pub fn is_wake_edge(&self) -> bool {
        self.wake.is_some()
    }

    /// Wake data, if any.
    #[must_use]
    pub fn wake(&self) -> Option<&WakeEdgeData> {
        self.wake.as_ref()
    }

    /// Mutable wake data, if any.
    pub fn wake_mut(&mut self) -> Option<&mut WakeEdgeData> {
        self.wake.as_mut()
    }

    /// Attaches wake data, replacing any existing wake state.
    pub fn create_wake_edge_space(&mut self, wake: WakeEdgeData) {
        self.wake = Some(wake);
    }

    /// Node and position of the free end of a wake edge.
    #[must_use]
    pub fn wake_free_end(&self) -> Option<(NodeId, Point3)> {
        self.wake.as_ref().map(|wake| {
            if wake.sign() > 0.0 {
                (self.node2, self.x2)
            } else {
                (self.node1, self.x1)
            }
        })
    }

    /// Node and position of the upstream (fixed) end of a wake edge.
    #[must_use]
    pub fn wake_fixed_end(&self) -> Option<(NodeId, Point3)> {
        self.wake.as_ref().map(|wake| {
            if wake.sign() > 0.0 {
                (self.node1, self.x1)
            } else {
                (self.node2, self.x2)
            }
        })
    }

    /// Stores the upstream end for the next unsteady time step.
    pub fn store_wake_location(&mut self) {
        if let Some((_, fixed)) = self.wake_fixed_end() {
            if let Some(wake) = self.wake.as_mut() {
                wake.store_location(fixed);
            }
        }
    }

    /// Sub-interval of the filament inside the upstream Mach cone of `point`.
    ///
    /// Meaningful for supersonic flow only.
    #[must_use]
    pub fn mach_cone_interval(&self, point: &Point3) -> Option<ConeInterval> {
        mach_cone_interval(
            point,
            &self.x1,
            &self.span,
            self.flow.mach(),
            self.tolerance.linear(),
        )
    }

    /// Angle between the edge and the y-z plane, with the direction clamped.
    fn sweep_angle(&self) -> f64 {
        FRAC_PI_2 - self.direction.x.clamp(-1.0, 1.0).acos()
    }

    /// Generalized principal part of the downwash of a supersonic edge.
    ///
    /// `Ws = ½ √(-β² - tan²θ) cos θ` for `M > 1` when the argument is
    /// positive, zero otherwise.
    #[must_use]
    pub fn principal_part_of_downwash(&self) -> f64 {
        let mach = self.flow.mach();
        if mach < 1.0 {
            return 0.0;
        }
        let theta = self.sweep_angle();
        let t = theta.tan();
        let arg = -(1.0 - mach * mach) - t * t;
        if mach > 1.0 && arg > 0.0 {
            0.5 * arg.sqrt() * theta.cos()
        } else {
            0.0
        }
    }

    /// Whether the edge has a supersonic leading-edge component: nearly
    /// streamwise, or swept less than the Mach angle.
    #[must_use]
    pub fn is_supersonic_edge(&self) -> bool {
        if self.direction.x.clamp(-1.0, 1.0).abs() > 0.99 {
            return true;
        }
        let mach = self.flow.mach();
        let t = self.sweep_angle().tan();
        let arg = -(1.0 - mach * mach) - t * t;
        mach > 1.0 && arg > 0.0
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;
    use crate::lattice::wake::WakeDirection;

    fn p(x: f64, y: f64, z: f64) -> Point3 {
        Point3::new(x, y, z)
    }

    fn edge(x1: Point3, x2: Point3) -> VortexEdge {
        VortexEdge::new(NodeId::default(), x1, NodeId::default(), x2)
    }

    #[test]
    fn geometry_is_cached() {
        let e = edge(p(1.0, 0.0, 0.0), p(1.0, 3.0, 4.0));
        assert_relative_eq!(e.length(), 5.0);
        assert_relative_eq!(*e.direction(), Vector3::new(0.0, 0.6, 0.8));
        assert_relative_eq!(*e.span(), Vector3::new(0.0, 3.0, 4.0));
        assert_relative_eq!(*e.centroid(), p(1.0, 1.5, 2.0));
    }

    #[test]
    fn update_geometry_refreshes_cache() {
        let mut e = edge(p(0.0, 0.0, 0.0), p(1.0, 0.0, 0.0));
        e.update_geometry(p(0.0, 0.0, 0.0), p(0.0, 2.0, 0.0));
        assert_relative_eq!(e.length(), 2.0);
        assert_relative_eq!(e.direction().norm(), 1.0);
        assert_relative_eq!(*e.direction(), Vector3::new(0.0, 1.0, 0.0));
    }

    #[test]
    fn zero_length_edge_has_zero_direction() {
        let e = edge(p(1.0, 1.0, 1.0), p(1.0, 1.0, 1.0));
        assert_relative_eq!(e.length(), 0.0);
        assert_eq!(*e.direction(), Vector3::zeros());
    }

    #[test]
    fn circulation_channels() {
        let c = Circulation {
            gamma: 1.0,
            delta_gamma: 2.0,
            d_gamma_d_mesh: 3.0,
            d_gamma_d_stall: 4.0,
            d_gamma_d_stretch: 5.0,
        };
        assert_relative_eq!(c.channel(CirculationChannel::Gamma), 1.0);
        assert_relative_eq!(c.channel(CirculationChannel::Delta), 2.0);
        assert_relative_eq!(c.channel(CirculationChannel::Mesh), 3.0);
        assert_relative_eq!(c.channel(CirculationChannel::Stall), 4.0);
        assert_relative_eq!(c.channel(CirculationChannel::Stretch), 5.0);
    }

    #[test]
    fn wake_ends_follow_direction() {
        let mut e = edge(p(0.0, 0.0, 0.0), p(1.0, 0.0, 0.0));
        assert!(e.wake_free_end().is_none());

        e.create_wake_edge_space(WakeEdgeData::new(WakeDirection::Upstream));
        assert_relative_eq!(e.wake_free_end().unwrap().1, p(0.0, 0.0, 0.0));
        assert_relative_eq!(e.wake_fixed_end().unwrap().1, p(1.0, 0.0, 0.0));

        // Re-creating the wake space replaces the old state.
        e.create_wake_edge_space(WakeEdgeData::new(WakeDirection::Downstream));
        assert_relative_eq!(e.wake_free_end().unwrap().1, p(1.0, 0.0, 0.0));
    }

    #[test]
    fn store_wake_location_keeps_upstream_end() {
        let mut e = edge(p(0.0, 0.0, 0.0), p(1.0, 0.0, 0.0));
        e.create_wake_edge_space(WakeEdgeData::new(WakeDirection::Downstream));
        e.store_wake_location();
        e.update_geometry(p(0.5, 0.0, 0.0), p(1.5, 0.0, 0.0));
        assert_eq!(e.wake().and_then(WakeEdgeData::stored_location), Some(p(0.0, 0.0, 0.0)));
    }

    #[test]
    fn subsonic_edge_has_no_principal_downwash() {
        let mut e = edge(p(0.0, 0.0, 0.0), p(0.2, 1.0, 0.0));
        e.set_mach(0.5);
        assert_relative_eq!(e.principal_part_of_downwash(), 0.0);
    }

    #[test]
    fn unswept_supersonic_edge() {
        // Spanwise edge at M = 2: θ = 0, Ws = ½ √(M² - 1).
        let mut e = edge(p(0.0, 0.0, 0.0), p(0.0, 1.0, 0.0));
        e.set_mach(2.0);
        assert_relative_eq!(e.principal_part_of_downwash(), 0.5 * 3.0_f64.sqrt(), epsilon = 1e-12);
        assert!(e.is_supersonic_edge());
    }

    #[test]
    fn highly_swept_edge_is_subsonic_leading_edge() {
        // Swept 80 degrees at M = 1.2 lies inside the Mach cone.
        let sweep = 80.0_f64.to_radians();
        let mut e = edge(p(0.0, 0.0, 0.0), p(sweep.sin(), sweep.cos(), 0.0));
        e.set_mach(1.2);
        assert!(!e.is_supersonic_edge());
        assert_relative_eq!(e.principal_part_of_downwash(), 0.0);
    }

    #[test]
    fn streamwise_edge_counts_as_supersonic() {
        let e = edge(p(0.0, 0.0, 0.0), p(1.0, 0.0, 0.0));
        assert!(e.is_supersonic_edge());
    }
}
