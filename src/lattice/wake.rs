use crate::error::{GeometryError, WakeError};
use crate::math::{Point3, UnitVector3, Vector3, TOLERANCE};

use super::edge::{EdgeId, LoopIndex};

/// Which endpoint of a wake edge is the free, downstream end.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WakeDirection {
    /// Node 2 is free; the edge points downstream.
    Downstream,
    /// Node 1 is free; the edge points upstream.
    Upstream,
}

impl WakeDirection {
    /// `+1` when node 2 is free, `-1` when node 1 is free.
    #[must_use]
    pub fn sign(self) -> f64 {
        match self {
            Self::Downstream => 1.0,
            Self::Upstream => -1.0,
        }
    }
}

/// How a wake edge treats rotor induced velocity.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RotorWakeMode {
    /// Fixed-wing wake: the full local velocity drives the filament.
    Fixed,
    /// Rotor wake whose correction is reduced to the thrust axis, and whose
    /// induced velocity may only contract the wake toward the rotor.
    Projected {
        /// Unit thrust vector of the rotor.
        thrust: UnitVector3,
    },
    /// Rotor wake relaxed with the full local velocity.
    Unprojected,
}

impl RotorWakeMode {
    /// Creates a projected rotor mode from a thrust vector of any length.
    ///
    /// # Errors
    ///
    /// Returns [`GeometryError::ZeroVector`] if the thrust vector is zero-length.
    pub fn projected(thrust: Vector3) -> Result<Self, GeometryError> {
        UnitVector3::try_new(thrust, TOLERANCE)
            .map(|thrust| Self::Projected { thrust })
            .ok_or(GeometryError::ZeroVector)
    }

    /// Solver mode code: 0 fixed, 1 projected, 2 unprojected.
    #[must_use]
    pub fn code(&self) -> u8 {
        match self {
            Self::Fixed => 0,
            Self::Projected { .. } => 1,
            Self::Unprojected => 2,
        }
    }

    /// Thrust axis, only present in projected mode.
    #[must_use]
    pub fn thrust(&self) -> Option<&UnitVector3> {
        match self {
            Self::Projected { thrust } => Some(thrust),
            Self::Fixed | Self::Unprojected => None,
        }
    }
}

/// Trailing-wake state owned by a wake edge.
///
/// The step length and the residual equation numbers are assigned once and
/// are immutable afterwards; only the orientation of the edge changes while
/// the wake relaxes.
#[derive(Debug, Clone, PartialEq)]
pub struct WakeEdgeData {
    direction: WakeDirection,
    step_length: Option<f64>,
    equation_numbers: Option<[usize; 3]>,
    /// Upstream trailing-edge loop pair this wake edge trails from.
    pub trailing_loops: [Option<LoopIndex>; 2],
    /// Bound edge the wake filament is shed from.
    pub source_edge: Option<EdgeId>,
    /// Rotor treatment of the local velocity.
    pub rotor: RotorWakeMode,
    /// First time step at which the edge contributes in unsteady analyses.
    pub min_valid_time_step: usize,
    stored_location: Option<Point3>,
}

impl WakeEdgeData {
    /// Creates unresolved wake data for a fixed-wing wake.
    #[must_use]
    pub fn new(direction: WakeDirection) -> Self {
        Self {
            direction,
            step_length: None,
            equation_numbers: None,
            trailing_loops: [None, None],
            source_edge: None,
            rotor: RotorWakeMode::Fixed,
            min_valid_time_step: 0,
            stored_location: None,
        }
    }

    /// Sets the rotor mode.
    #[must_use]
    pub fn with_rotor(mut self, rotor: RotorWakeMode) -> Self {
        self.rotor = rotor;
        self
    }

    /// Sets the first valid time step.
    #[must_use]
    pub fn with_min_valid_time_step(mut self, time_step: usize) -> Self {
        self.min_valid_time_step = time_step;
        self
    }

    /// Which end is free.
    #[must_use]
    pub fn direction(&self) -> WakeDirection {
        self.direction
    }

    /// Direction sign, see [`WakeDirection::sign`].
    #[must_use]
    pub fn sign(&self) -> f64 {
        self.direction.sign()
    }

    /// Target step length, `None` while unresolved.
    #[must_use]
    pub fn step_length(&self) -> Option<f64> {
        self.step_length
    }

    /// Whether the step length has been assigned.
    #[must_use]
    pub fn is_resolved(&self) -> bool {
        self.step_length.is_some()
    }

    /// Whether the edge produces residual contributions: resolved with a
    /// positive step length.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.step_length.is_some_and(|ds| ds > 0.0)
    }

    /// Whether an unsteady analysis at `time_step` has reached this edge.
    #[must_use]
    pub fn is_valid_at(&self, time_step: usize) -> bool {
        time_step >= self.min_valid_time_step
    }

    /// Assigns the step length, moving the edge from unresolved to active.
    ///
    /// # Errors
    ///
    /// Returns an error if the step length is already assigned or is
    /// negative or non-finite.
    pub fn set_step_length(&mut self, step_length: f64) -> Result<(), WakeError> {
        if self.step_length.is_some() {
            return Err(WakeError::StepLengthAlreadyAssigned);
        }
        if !step_length.is_finite() || step_length < 0.0 {
            return Err(WakeError::InvalidStepLength(step_length));
        }
        self.step_length = Some(step_length);
        Ok(())
    }

    /// Residual equation numbers for x, y and z, once assigned.
    #[must_use]
    pub fn equation_numbers(&self) -> Option<[usize; 3]> {
        self.equation_numbers
    }

    /// Residual equation of the x component.
    #[must_use]
    pub fn equation_number_for_x(&self) -> Option<usize> {
        self.equation_numbers.map(|eq| eq[0])
    }

    /// Residual equation of the y component.
    #[must_use]
    pub fn equation_number_for_y(&self) -> Option<usize> {
        self.equation_numbers.map(|eq| eq[1])
    }

    /// Residual equation of the z component.
    #[must_use]
    pub fn equation_number_for_z(&self) -> Option<usize> {
        self.equation_numbers.map(|eq| eq[2])
    }

    /// Assigns three contiguous equation numbers starting at `first`.
    ///
    /// # Errors
    ///
    /// Returns an error if numbers were already assigned.
    pub fn assign_equation_numbers(&mut self, first: usize) -> Result<[usize; 3], WakeError> {
        if self.equation_numbers.is_some() {
            return Err(WakeError::EquationNumbersAlreadyAssigned);
        }
        let numbers = [first, first + 1, first + 2];
        self.equation_numbers = Some(numbers);
        Ok(numbers)
    }

    /// Upstream-end location stored at the previous time step.
    #[must_use]
    pub fn stored_location(&self) -> Option<Point3> {
        self.stored_location
    }

    pub(crate) fn store_location(&mut self, location: Point3) {
        self.stored_location = Some(location);
    }
}
