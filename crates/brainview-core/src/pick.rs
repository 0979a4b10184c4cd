//! Ray vs point-cloud picking
//!
//! A point counts as hit when its perpendicular distance to the ray is within
//! a threshold and it lies in front of the ray origin. Among all hits the one
//! nearest along the ray wins.

use glam::Vec3;

/// Default hit radius in world units
pub const DEFAULT_POINT_THRESHOLD: f32 = 1.0;

/// A ray with normalized direction
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ray {
    pub origin: Vec3,
    pub direction: Vec3,
}

impl Ray {
    /// Returns None for a zero-length or non-finite direction
    pub fn new(origin: Vec3, direction: Vec3) -> Option<Self> {
        Some(Self {
            origin,
            direction: direction.try_normalize()?,
        })
    }
}

/// Axis-aligned bounding box
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    pub min: Vec3,
    pub max: Vec3,
}

impl Aabb {
    pub fn from_points(points: &[[f32; 3]]) -> Option<Self> {
        let (first, rest) = points.split_first()?;
        let first = Vec3::from_array(*first);
        Some(rest.iter().fold(
            Self {
                min: first,
                max: first,
            },
            |aabb, p| {
                let p = Vec3::from_array(*p);
                Self {
                    min: aabb.min.min(p),
                    max: aabb.max.max(p),
                }
            },
        ))
    }

    pub fn union(&self, other: &Aabb) -> Aabb {
        Aabb {
            min: self.min.min(other.min),
            max: self.max.max(other.max),
        }
    }

    /// Grow by `amount` on every side
    pub fn inflate(&self, amount: f32) -> Aabb {
        Aabb {
            min: self.min - Vec3::splat(amount),
            max: self.max + Vec3::splat(amount),
        }
    }

    /// Slab test. Returns the entry distance (0 when the origin is inside),
    /// or None when the box is missed or entirely behind the origin.
    pub fn intersect_ray(&self, ray: &Ray) -> Option<f32> {
        let mut t_near = f32::NEG_INFINITY;
        let mut t_far = f32::INFINITY;

        for axis in 0..3 {
            let o = ray.origin[axis];
            let d = ray.direction[axis];
            if d.abs() <= f32::EPSILON {
                if o < self.min[axis] || o > self.max[axis] {
                    return None;
                }
                continue;
            }
            let t1 = (self.min[axis] - o) / d;
            let t2 = (self.max[axis] - o) / d;
            t_near = t_near.max(t1.min(t2));
            t_far = t_far.min(t1.max(t2));
        }

        if t_near <= t_far && t_far >= 0.0 {
            Some(t_near.max(0.0))
        } else {
            None
        }
    }
}

/// A pickable point cloud, borrowed from wherever the positions live
#[derive(Debug, Clone, Copy)]
pub struct PointCloud<'a, K> {
    pub part: K,
    pub points: &'a [[f32; 3]],
    /// Precomputed bounds; computed on the fly when None
    pub bounds: Option<Aabb>,
}

impl<'a, K> PointCloud<'a, K> {
    pub fn new(part: K, points: &'a [[f32; 3]]) -> Self {
        Self {
            part,
            points,
            bounds: None,
        }
    }

    pub fn with_bounds(mut self, bounds: Aabb) -> Self {
        self.bounds = Some(bounds);
        self
    }
}

/// Nearest point hit
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointHit<K> {
    pub part: K,
    pub point_index: usize,
    pub distance_along_ray: f32,
    pub distance_to_ray: f32,
}

/// Find the point nearest along the ray within `threshold` of it
pub fn pick_nearest<'a, K, I>(ray: &Ray, clouds: I, threshold: f32) -> Option<PointHit<K>>
where
    K: Copy,
    I: IntoIterator<Item = PointCloud<'a, K>>,
{
    if !threshold.is_finite() || threshold < 0.0 {
        return None;
    }
    let threshold_sq = threshold * threshold;
    let mut best: Option<PointHit<K>> = None;

    for cloud in clouds {
        let Some(bounds) = cloud.bounds.or_else(|| Aabb::from_points(cloud.points)) else {
            continue;
        };

        // Broad phase: skip clouds whose inflated box is missed or starts
        // beyond the best hit so far
        let Some(entry) = bounds.inflate(threshold).intersect_ray(ray) else {
            continue;
        };
        if best.is_some_and(|b| entry > b.distance_along_ray) {
            continue;
        }

        for (i, point) in cloud.points.iter().enumerate() {
            let to_point = Vec3::from_array(*point) - ray.origin;
            let t = to_point.dot(ray.direction);
            if t < 0.0 {
                continue;
            }

            let dist_sq = (to_point.length_squared() - t * t).max(0.0);
            if dist_sq > threshold_sq {
                continue;
            }

            if best.map_or(true, |b| t < b.distance_along_ray) {
                best = Some(PointHit {
                    part: cloud.part,
                    point_index: i,
                    distance_along_ray: t,
                    distance_to_ray: dist_sq.sqrt(),
                });
            }
        }
    }

    best
}

#[cfg(test)]
mod tests {
    use super::*;

    fn down_z() -> Ray {
        Ray::new(Vec3::new(0.0, 0.0, 100.0), Vec3::NEG_Z).unwrap()
    }

    #[test]
    fn test_ray_normalizes() {
        let ray = Ray::new(Vec3::ZERO, Vec3::new(0.0, 3.0, 4.0)).unwrap();
        assert!((ray.direction.y - 0.6).abs() < 1e-6);
        assert!((ray.direction.z - 0.8).abs() < 1e-6);
        assert!(Ray::new(Vec3::ZERO, Vec3::ZERO).is_none());
        assert!(Ray::new(Vec3::ZERO, Vec3::splat(f32::NAN)).is_none());
    }

    #[test]
    fn test_aabb_intersect() {
        let aabb = Aabb::from_points(&[[-1.0, -1.0, -1.0], [1.0, 1.0, 1.0]]).unwrap();
        assert_eq!(aabb.intersect_ray(&down_z()), Some(99.0));

        let miss = Ray::new(Vec3::new(5.0, 0.0, 100.0), Vec3::NEG_Z).unwrap();
        assert_eq!(aabb.intersect_ray(&miss), None);

        let behind = Ray::new(Vec3::new(0.0, 0.0, 10.0), Vec3::Z).unwrap();
        assert_eq!(aabb.intersect_ray(&behind), None);

        let inside = Ray::new(Vec3::ZERO, Vec3::X).unwrap();
        assert_eq!(aabb.intersect_ray(&inside), Some(0.0));
    }

    #[test]
    fn test_nearest_cloud_wins() {
        let far = [[0.0, 0.0, -10.0], [0.2, 0.0, -12.0]];
        let near = [[0.5, 0.0, 20.0], [8.0, 0.0, 30.0]];
        let clouds = [PointCloud::new("far", &far[..]), PointCloud::new("near", &near[..])];

        let hit = pick_nearest(&down_z(), clouds, DEFAULT_POINT_THRESHOLD).unwrap();
        assert_eq!(hit.part, "near");
        assert_eq!(hit.point_index, 0);
        assert!((hit.distance_along_ray - 80.0).abs() < 1e-4);
        assert!((hit.distance_to_ray - 0.5).abs() < 1e-4);
    }

    #[test]
    fn test_points_behind_origin_ignored() {
        let behind = [[0.0, 0.0, 150.0]];
        let ahead = [[0.0, 0.3, -50.0]];
        let clouds = [
            PointCloud::new(1u32, &behind[..]),
            PointCloud::new(2u32, &ahead[..]),
        ];

        let hit = pick_nearest(&down_z(), clouds, 1.0).unwrap();
        assert_eq!(hit.part, 2);
    }

    #[test]
    fn test_threshold() {
        let points = [[1.5, 0.0, 0.0]];
        assert!(pick_nearest(&down_z(), [PointCloud::new(0, &points[..])], 1.0).is_none());

        let hit = pick_nearest(&down_z(), [PointCloud::new(0, &points[..])], 2.0).unwrap();
        assert!((hit.distance_to_ray - 1.5).abs() < 1e-5);
    }

    #[test]
    fn test_unusable_threshold_never_hits() {
        let points = [[0.0, 0.0, 0.0], [40.0, 40.0, 0.0]];
        for threshold in [f32::NAN, f32::INFINITY, -1.0] {
            let clouds = [PointCloud::new(0, &points[..])];
            assert!(pick_nearest(&down_z(), clouds, threshold).is_none());
        }
    }

    #[test]
    fn test_empty_and_precomputed_bounds() {
        let empty: [[f32; 3]; 0] = [];
        assert!(pick_nearest(&down_z(), [PointCloud::new(0, &empty[..])], 1.0).is_none());

        let points = [[0.0, 0.0, 0.0]];
        let cloud = PointCloud::new(7, &points[..])
            .with_bounds(Aabb::from_points(&points).unwrap());
        assert_eq!(pick_nearest(&down_z(), [cloud], 1.0).map(|h| h.part), Some(7));
    }
}
