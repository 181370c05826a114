//! Compressible induced velocity of a straight vortex filament and its exact
//! analytic gradient.

mod bound_vortex;
mod compressibility;
mod gradient;
pub(crate) mod integral;

pub use bound_vortex::IntegrationLimits;
pub use compressibility::Compressibility;
pub use gradient::InducedVelocityGradient;
