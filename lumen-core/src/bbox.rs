//! Axis-aligned bounding boxes.

use nalgebra::Vector3;

/// An axis-aligned bounding box. `Default` yields the "empty" box (min at
/// `+MAX`, max at `-MAX`) so that growing it with points or other boxes
/// behaves correctly from an empty starting state.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct BoundingBox {
    pub min: Vector3<f32>,
    pub max: Vector3<f32>,
}

impl Default for BoundingBox {
    #[inline]
    fn default() -> Self {
        Self {
            min: Vector3::new(f32::MAX, f32::MAX, f32::MAX),
            max: Vector3::new(-f32::MAX, -f32::MAX, -f32::MAX),
        }
    }
}

impl BoundingBox {
    #[inline]
    pub fn from_min_max(min: Vector3<f32>, max: Vector3<f32>) -> Self {
        Self { min, max }
    }

    #[inline]
    pub fn from_point(point: Vector3<f32>) -> Self {
        Self {
            min: point,
            max: point,
        }
    }

    #[inline]
    pub fn from_points(points: &[Vector3<f32>]) -> Self {
        let mut bbox = Self::default();
        for p in points {
            bbox.add_point(*p);
        }
        bbox
    }

    #[inline]
    pub fn add_point(&mut self, p: Vector3<f32>) {
        self.min = self.min.zip_map(&p, |a, b| a.min(b));
        self.max = self.max.zip_map(&p, |a, b| a.max(b));
    }

    #[inline]
    pub fn add_box(&mut self, other: &BoundingBox) {
        self.add_point(other.min);
        self.add_point(other.max);
    }

    #[inline]
    pub fn center(&self) -> Vector3<f32> {
        (self.min + self.max) * 0.5
    }

    #[inline]
    pub fn half_extents(&self) -> Vector3<f32> {
        (self.max - self.min) * 0.5
    }

    #[inline]
    pub fn inflate(&mut self, delta: Vector3<f32>) {
        self.min -= delta * 0.5;
        self.max += delta * 0.5;
    }

    pub fn contains_point(&self, p: Vector3<f32>) -> bool {
        p.x >= self.min.x
            && p.x <= self.max.x
            && p.y >= self.min.y
            && p.y <= self.max.y
            && p.z >= self.min.z
            && p.z <= self.max.z
    }

    pub fn intersects_box(&self, other: &BoundingBox) -> bool {
        self.min.x <= other.max.x
            && self.max.x >= other.min.x
            && self.min.y <= other.max.y
            && self.max.y >= other.min.y
            && self.min.z <= other.max.z
            && self.max.z >= other.min.z
    }

    pub fn intersects_sphere(&self, center: Vector3<f32>, radius: f32) -> bool {
        let closest = Vector3::new(
            center.x.clamp(self.min.x, self.max.x),
            center.y.clamp(self.min.y, self.max.y),
            center.z.clamp(self.min.z, self.max.z),
        );
        (closest - center).norm_squared() <= radius * radius
    }

    /// Slab-method ray/box test. Returns the entry/exit ray parameters, or
    /// `None` if the ray misses the box entirely (including when it starts
    /// and ends before/after the box along the ray's `[0,1]` parametrization
    /// is not bounded here; callers treat negative `t` as "behind the ray
    /// origin" themselves).
    pub fn ray_intersection(&self, origin: Vector3<f32>, dir: Vector3<f32>) -> Option<(f32, f32)> {
        let (mut tmin, mut tmax) = slab(origin.x, dir.x, self.min.x, self.max.x);
        let (tymin, tymax) = slab(origin.y, dir.y, self.min.y, self.max.y);
        if tmin > tymax || tymin > tmax {
            return None;
        }
        if tymin > tmin {
            tmin = tymin;
        }
        if tymax < tmax {
            tmax = tymax;
        }
        let (tzmin, tzmax) = slab(origin.z, dir.z, self.min.z, self.max.z);
        if tmin > tzmax || tzmin > tmax {
            return None;
        }
        if tzmin > tmin {
            tmin = tzmin;
        }
        if tzmax < tmax {
            tmax = tzmax;
        }
        Some((tmin, tmax))
    }
}

#[inline]
fn slab(origin: f32, dir: f32, min: f32, max: f32) -> (f32, f32) {
    if dir >= 0.0 {
        ((min - origin) / dir, (max - origin) / dir)
    } else {
        ((max - origin) / dir, (min - origin) / dir)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grow_by_points_is_tight() {
        let bbox = BoundingBox::from_points(&[
            Vector3::new(-1.0, 0.0, 0.0),
            Vector3::new(1.0, 2.0, -3.0),
        ]);
        assert_eq!(bbox.min, Vector3::new(-1.0, 0.0, -3.0));
        assert_eq!(bbox.max, Vector3::new(1.0, 2.0, 0.0));
    }

    #[test]
    fn ray_through_center_hits() {
        let bbox = BoundingBox::from_min_max(Vector3::new(-1.0, -1.0, -1.0), Vector3::new(1.0, 1.0, 1.0));
        let hit = bbox.ray_intersection(Vector3::new(0.0, 0.0, -5.0), Vector3::new(0.0, 0.0, 1.0));
        assert!(hit.is_some());
        let (tmin, tmax) = hit.unwrap();
        assert!((tmin - 4.0).abs() < 1e-4);
        assert!((tmax - 6.0).abs() < 1e-4);
    }

    #[test]
    fn ray_parallel_and_outside_misses() {
        let bbox = BoundingBox::from_min_max(Vector3::new(-1.0, -1.0, -1.0), Vector3::new(1.0, 1.0, 1.0));
        let miss = bbox.ray_intersection(Vector3::new(5.0, 5.0, -5.0), Vector3::new(0.0, 0.0, 1.0));
        assert!(miss.is_none());
    }
}
