//! Ray intersection helpers shared by the pickable structures.

use glam::{Mat4, Vec3};

/// A world-space ray with a unit direction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ray {
    pub origin: Vec3,
    pub direction: Vec3,
}

impl Ray {
    /// Creates a ray, normalizing `direction`. Returns `None` for a zero
    /// direction.
    #[must_use]
    pub fn new(origin: Vec3, direction: Vec3) -> Option<Self> {
        let direction = direction.normalize_or_zero();
        (direction != Vec3::ZERO).then_some(Self { origin, direction })
    }

    /// Point at distance `t` along the ray.
    #[must_use]
    pub fn at(&self, t: f32) -> Vec3 {
        self.origin + self.direction * t
    }

    /// Expresses the ray in the local frame of `transform`.
    ///
    /// Distances along the returned ray are local distances; use
    /// [`Ray::at`] and transform back to measure in world space.
    #[must_use]
    pub fn to_local(&self, transform: Mat4) -> Option<Self> {
        let inverse = transform.inverse();
        if !inverse.is_finite() {
            return None;
        }
        Self::new(
            inverse.transform_point3(self.origin),
            inverse.transform_vector3(self.direction),
        )
    }
}

/// Möller-Trumbore ray/triangle intersection. Returns the distance along
/// the ray.
#[must_use]
pub fn ray_intersect_triangle(ray: &Ray, v0: Vec3, v1: Vec3, v2: Vec3) -> Option<f32> {
    let eps = 1e-6;
    let edge1 = v1 - v0;
    let edge2 = v2 - v0;
    let h = ray.direction.cross(edge2);
    let a = edge1.dot(h);
    if a.abs() < eps {
        return None;
    }
    let f = 1.0 / a;
    let s = ray.origin - v0;
    let u = f * s.dot(h);
    if !(0.0..=1.0).contains(&u) {
        return None;
    }
    let q = s.cross(edge1);
    let v = f * ray.direction.dot(q);
    if v < 0.0 || u + v > 1.0 {
        return None;
    }
    let t = f * edge2.dot(q);
    if t > eps {
        Some(t)
    } else {
        None
    }
}

/// Closest approach between a ray and the segment `a`-`b`.
///
/// Returns `(t, distance)`: the distance along the ray of its closest point
/// and the gap between the ray and the segment there. `None` when the
/// closest point lies behind the ray origin.
#[must_use]
pub fn ray_segment_closest(ray: &Ray, a: Vec3, b: Vec3) -> Option<(f32, f32)> {
    let v = b - a;
    let c = v.dot(v);
    if c < 1e-12 {
        let t = ray.direction.dot(a - ray.origin);
        return (t >= 0.0).then(|| (t, ray.at(t).distance(a)));
    }

    let w0 = ray.origin - a;
    let b_dot = ray.direction.dot(v);
    let d = ray.direction.dot(w0);
    let e = v.dot(w0);
    let denom = c - b_dot * b_dot;

    let s = if denom.abs() < 1e-8 {
        0.0
    } else {
        ((e - b_dot * d) / denom).clamp(0.0, 1.0)
    };
    let on_segment = a + v * s;
    let t = ray.direction.dot(on_segment - ray.origin);
    (t >= 0.0).then(|| (t, ray.at(t).distance(on_segment)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_triangle_hit_and_miss() {
        let ray = Ray::new(Vec3::new(0.2, 0.2, 5.0), Vec3::NEG_Z).unwrap();
        let t = ray_intersect_triangle(&ray, Vec3::ZERO, Vec3::X, Vec3::Y).unwrap();
        assert!((t - 5.0).abs() < 1e-5);

        let miss = Ray::new(Vec3::new(2.0, 2.0, 5.0), Vec3::NEG_Z).unwrap();
        assert!(ray_intersect_triangle(&miss, Vec3::ZERO, Vec3::X, Vec3::Y).is_none());
    }

    #[test]
    fn test_segment_distance() {
        let ray = Ray::new(Vec3::new(0.0, 0.05, 5.0), Vec3::NEG_Z).unwrap();
        let (t, distance) =
            ray_segment_closest(&ray, Vec3::new(-1.0, 0.0, 0.0), Vec3::new(1.0, 0.0, 0.0)).unwrap();
        assert!((t - 5.0).abs() < 1e-5);
        assert!((distance - 0.05).abs() < 1e-5);
    }

    #[test]
    fn test_segment_endpoint_clamp() {
        let ray = Ray::new(Vec3::new(3.0, 0.0, 5.0), Vec3::NEG_Z).unwrap();
        let (_, distance) =
            ray_segment_closest(&ray, Vec3::new(-1.0, 0.0, 0.0), Vec3::new(1.0, 0.0, 0.0)).unwrap();
        assert!((distance - 2.0).abs() < 1e-5);
    }

    #[test]
    fn test_segment_behind_origin() {
        let ray = Ray::new(Vec3::new(0.0, 0.0, 5.0), Vec3::Z).unwrap();
        assert!(ray_segment_closest(&ray, Vec3::NEG_X, Vec3::X).is_none());
    }

    #[test]
    fn test_zero_direction_rejected() {
        assert!(Ray::new(Vec3::ZERO, Vec3::ZERO).is_none());
    }
}
