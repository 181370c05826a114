use crate::error::ConfigError;

/// Singularity tolerances of the vortex kernel.
///
/// The linear and squared values are always derived from one linear
/// tolerance and can never be set independently.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tolerance {
    linear: f64,
    squared: f64,
}

impl Tolerance {
    /// Linear tolerance used by the solver unless configured otherwise.
    pub const DEFAULT_LINEAR: f64 = 1e-7;

    /// Creates the tolerance set from a linear tolerance.
    #[must_use]
    pub fn new(linear: f64) -> Self {
        Self {
            linear,
            squared: linear * linear,
        }
    }

    /// Linear tolerance.
    #[must_use]
    pub fn linear(&self) -> f64 {
        self.linear
    }

    /// Square of the linear tolerance.
    #[must_use]
    pub fn squared(&self) -> f64 {
        self.squared
    }
}

impl Default for Tolerance {
    fn default() -> Self {
        Self::new(Self::DEFAULT_LINEAR)
    }
}

/// Parameters shared by every edge of a lattice.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KernelConfig {
    /// Freestream Mach number.
    pub mach: f64,
    /// Linear singularity tolerance.
    pub tolerance: f64,
    /// Vortex core regularization width applied to new edges.
    pub core_width: f64,
    /// Karman-Tsien factor `k` in `β² = 1 - (k M)²`.
    pub karman_tsien_factor: f64,
    /// Relaxation factor applied by wake sweeps.
    pub wake_relaxation: f64,
}

impl Default for KernelConfig {
    fn default() -> Self {
        Self {
            mach: 0.0,
            tolerance: Tolerance::DEFAULT_LINEAR,
            core_width: 0.0,
            karman_tsien_factor: 1.0,
            wake_relaxation: 1.0,
        }
    }
}

impl KernelConfig {
    /// Returns the tolerance set derived from [`KernelConfig::tolerance`].
    #[must_use]
    pub fn tolerance(&self) -> Tolerance {
        Tolerance::new(self.tolerance)
    }

    /// Checks that every parameter is usable by the kernel.
    ///
    /// The Mach number is only checked for finiteness; its physical range is
    /// the caller's responsibility.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidParameter`] naming the first bad field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |parameter: &'static str, value: f64| {
            Err(ConfigError::InvalidParameter { parameter, value })
        };

        if !self.mach.is_finite() {
            return invalid("mach", self.mach);
        }
        if !self.tolerance.is_finite() || self.tolerance <= 0.0 {
            return invalid("tolerance", self.tolerance);
        }
        if !self.core_width.is_finite() || self.core_width < 0.0 {
            return invalid("core_width", self.core_width);
        }
        if !self.karman_tsien_factor.is_finite() || self.karman_tsien_factor <= 0.0 {
            return invalid("karman_tsien_factor", self.karman_tsien_factor);
        }
        if !(self.wake_relaxation > 0.0 && self.wake_relaxation <= 2.0) {
            return invalid("wake_relaxation", self.wake_relaxation);
        }
        Ok(())
    }
}
