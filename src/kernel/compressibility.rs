use std::f64::consts::PI;

/// Compressibility state of the freestream seen by an edge.
///
/// `β² = 1 - (k M)²` scales the cross-stream (y, z) directions of the
/// filament integral, where `k` is the Karman-Tsien factor (1 gives the
/// classical Prandtl-Glauert factor). `κ` is 2 for subsonic and 1 for
/// supersonic flow and only enters the leading coefficient `Γ β² / (2π κ)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Compressibility {
    mach: f64,
    kappa: f64,
    karman_tsien_factor: f64,
}

impl Compressibility {
    /// Creates the compressibility state for a Mach number.
    #[must_use]
    pub fn new(mach: f64, karman_tsien_factor: f64) -> Self {
        let kappa = if mach < 1.0 { 2.0 } else { 1.0 };
        Self {
            mach,
            kappa,
            karman_tsien_factor,
        }
    }

    /// Incompressible flow (`M = 0`).
    #[must_use]
    pub fn incompressible() -> Self {
        Self::new(0.0, 1.0)
    }

    /// Freestream Mach number.
    #[must_use]
    pub fn mach(&self) -> f64 {
        self.mach
    }

    /// `κ`: 2 for subsonic flow, 1 otherwise.
    #[must_use]
    pub fn kappa(&self) -> f64 {
        self.kappa
    }

    /// Karman-Tsien factor `k`.
    #[must_use]
    pub fn karman_tsien_factor(&self) -> f64 {
        self.karman_tsien_factor
    }

    /// Whether the freestream is sonic or faster.
    #[must_use]
    pub fn is_supersonic(&self) -> bool {
        self.mach >= 1.0
    }

    /// `β² = 1 - (k M)²`.
    #[must_use]
    pub fn beta2(&self) -> f64 {
        let km = self.karman_tsien_factor * self.mach;
        1.0 - km * km
    }

    /// `∂β²/∂M = -2 k² M`.
    #[must_use]
    pub fn d_beta2_d_mach(&self) -> f64 {
        -2.0 * self.karman_tsien_factor * self.karman_tsien_factor * self.mach
    }

    /// Leading coefficient `Γ β² / (2π κ)` of the velocity integrals.
    #[must_use]
    pub fn circulation_scale(&self, circulation: f64) -> f64 {
        circulation * self.beta2() / (2.0 * PI * self.kappa)
    }

    /// Mach derivative of [`Compressibility::circulation_scale`].
    ///
    /// `κ` is piecewise constant, so only `β²` contributes.
    #[must_use]
    pub fn d_circulation_scale_d_mach(&self, circulation: f64) -> f64 {
        circulation * self.d_beta2_d_mach() / (2.0 * PI * self.kappa)
    }
}

impl Default for Compressibility {
    fn default() -> Self {
        Self::incompressible()
    }
}
