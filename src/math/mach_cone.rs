use super::{Point3, Vector3};

/// Quadratic leading coefficient below which the cone/line equation is
/// treated as linear.
const LINEAR_TOLERANCE: f64 = 1e-8;

/// Parametric sub-interval `[start, end]` of a segment lying inside a Mach cone.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConeInterval {
    /// Segment parameter where the segment enters the cone.
    pub start: f64,
    /// Segment parameter where the segment leaves the cone.
    pub end: f64,
}

/// Intersects the segment `start + t * direction`, `t ∈ [0, 1]`, with the
/// upstream-facing Mach cone whose apex is `apex`.
///
/// The cone is the quadric `x² + (1 - M²)(y² + z²) = 0` centred on the apex
/// with its axis along the streamwise x direction. Returns `None` when the
/// line misses the cone or only meets the downstream nappe. A single tangent
/// intersection inside the segment is resolved by the side of the cone the
/// segment start lies on; `tolerance` is the parameter distance under which
/// two roots count as one.
#[must_use]
pub fn mach_cone_interval(
    apex: &Point3,
    start: &Point3,
    direction: &Vector3,
    mach: f64,
    tolerance: f64,
) -> Option<ConeInterval> {
    let cross_weight = 1.0 - mach * mach;
    let weights = Vector3::new(1.0, cross_weight, cross_weight);
    let offset = start - apex;

    let aq = direction.component_mul(&weights).dot(direction);
    let bq = 2.0 * offset.component_mul(&weights).dot(direction);
    let cq = offset.component_mul(&weights).dot(&offset);

    let (mut t1, mut t2) = if aq.abs() >= LINEAR_TOLERANCE {
        let delta = bq * bq - 4.0 * aq * cq;
        if delta < 0.0 {
            return None;
        }
        let root = delta.sqrt();
        let v1 = -(bq + root) / (2.0 * aq);
        let v2 = -(bq - root) / (2.0 * aq);
        (v1.min(v2), v1.max(v2))
    } else {
        if bq == 0.0 {
            return None;
        }
        let t = -cq / bq;
        (t, t)
    };

    // Both roots on the downstream nappe
    let xi1 = offset.x + t1 * direction.x;
    let xi2 = offset.x + t2 * direction.x;
    if xi1 > 0.0 && xi2 > 0.0 {
        return None;
    }
    if xi1 > 0.0 && xi2 <= 0.0 {
        t1 = t2;
    }
    if xi2 > 0.0 && xi1 <= 0.0 {
        t2 = t1;
    }

    if t1 > 0.0 && t2 < 1.0 && (t1 - t2).abs() <= tolerance {
        let hit = offset + direction * t1;
        let normal = -2.0 * hit.component_mul(&weights);
        let back_to_start = offset - hit;
        if normal.dot(&back_to_start) > 0.0 {
            // Segment start is outside the cone
            t2 = 1.0;
        } else {
            t1 = 0.0;
        }
    }

    let interval = ConeInterval {
        start: t1.max(0.0),
        end: t2.min(1.0),
    };
    (interval.start <= interval.end).then_some(interval)
}
