//! Closed-form primitive of the compressible filament integral.
//!
//! Along the filament `X(s) = X1 + s L`, `s ∈ [0, 1]`, the scaled squared
//! distance to the field point is the quadratic `R(s) = a + b s + c s²` with
//! the cross-stream components weighted by `β²`. The primitive of
//! `R^{-3/2}` (regularized by the core width `ε`) is
//!
//! `F(s) = (2 / d) (2 c s + b) √R / (R + ε²)`, `d = 4 a c - b²`.

use crate::config::Tolerance;
use crate::math::Vector3;

/// Coefficients of the quadratic integrand for one field point.
#[derive(Debug, Clone, Copy)]
pub(crate) struct FilamentIntegral {
    pub a: f64,
    pub b: f64,
    pub c: f64,
    pub d: f64,
    core2: f64,
    tolerance: Tolerance,
}

/// Primitive value and its partials with respect to `a`, `b` and `c`
/// (`d` is expanded through its definition).
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub(crate) struct Primitive {
    pub value: f64,
    pub d_a: f64,
    pub d_b: f64,
    pub d_c: f64,
}

impl Primitive {
    pub const ZERO: Self = Self {
        value: 0.0,
        d_a: 0.0,
        d_b: 0.0,
        d_c: 0.0,
    };
}

impl std::ops::Sub for Primitive {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        Self {
            value: self.value - rhs.value,
            d_a: self.d_a - rhs.d_a,
            d_b: self.d_b - rhs.d_b,
            d_c: self.d_c - rhs.d_c,
        }
    }
}

/// Cross-stream weights `(1, β², β²)`.
pub(crate) fn weights(beta2: f64) -> Vector3 {
    Vector3::new(1.0, beta2, beta2)
}

impl FilamentIntegral {
    /// Builds the coefficients from the filament span `L = X2 - X1` and the
    /// offset `X1 - P` from the field point to the first endpoint.
    pub fn new(
        span: &Vector3,
        offset: &Vector3,
        beta2: f64,
        core_width: f64,
        tolerance: Tolerance,
    ) -> Self {
        let w = weights(beta2);
        let a = offset.component_mul(&w).dot(offset);
        let b = 2.0 * span.component_mul(&w).dot(offset);
        let c = span.component_mul(&w).dot(span);
        Self {
            a,
            b,
            c,
            d: 4.0 * a * c - b * b,
            core2: core_width * core_width,
            tolerance,
        }
    }

    /// `R(s)` when the primitive is regular at `s`, `None` on the
    /// desingularized branch (`|d| ≤ tol²`, `R ≤ tol` or `R ≤ ε²`).
    fn regular_radius(&self, s: f64) -> Option<f64> {
        let r = self.a + self.b * s + self.c * s * s;
        if self.d.abs() <= self.tolerance.squared()
            || r <= self.tolerance.linear()
            || r <= self.core2
        {
            return None;
        }
        Some(r)
    }

    /// `F(s)`.
    pub fn value(&self, s: f64) -> f64 {
        match self.regular_radius(s) {
            Some(r) => {
                let root = r.sqrt();
                (2.0 / self.d) * (2.0 * self.c * s + self.b) * root / (r + self.core2)
            }
            None => 0.0,
        }
    }

    /// `F(s)` together with `∂F/∂a`, `∂F/∂b` and `∂F/∂c`.
    ///
    /// Takes exactly the same branch as [`FilamentIntegral::value`].
    pub fn with_partials(&self, s: f64) -> Primitive {
        let Some(r) = self.regular_radius(s) else {
            return Primitive::ZERO;
        };

        let root = r.sqrt();
        let denom = r + self.core2;
        let g = root / denom;
        let dg_dr = (self.core2 - r) / (2.0 * root * denom * denom);

        let k = 2.0 * self.c * s + self.b;
        let value = (2.0 / self.d) * k * root / denom;

        // R depends on (a, b, c) as (1, s, s²); d = 4ac - b².
        let d_a = 2.0 * k * dg_dr / self.d - value * 4.0 * self.c / self.d;
        let d_b = 2.0 * (g + k * s * dg_dr) / self.d + value * 2.0 * self.b / self.d;
        let d_c = 2.0 * (2.0 * s * g + k * s * s * dg_dr) / self.d - value * 4.0 * self.a / self.d;

        Primitive {
            value,
            d_a,
            d_b,
            d_c,
        }
    }
}
