use crate::units::*;
use cgmath::prelude::*;

/// Axis aligned box, used both for the simulation domain and for static obstacles.
#[derive(Copy, Clone, Debug)]
pub struct Aabb {
    pub min: Point,
    pub max: Point,
}

impl Aabb {
    pub fn new(min: Point, max: Point) -> Aabb {
        Aabb { min, max }
    }

    pub fn extent(&self) -> Vector {
        self.max - self.min
    }

    pub fn contains(&self, position: Point) -> bool {
        position.x >= self.min.x
            && position.y >= self.min.y
            && position.z >= self.min.z
            && position.x <= self.max.x
            && position.y <= self.max.y
            && position.z <= self.max.z
    }

    /// Pulls an escaped position back per axis.
    ///
    /// A component outside the box lands on the violated bound, then moves back towards the
    /// pre-prediction position by the restitution factor. Restitution 0 leaves it exactly on
    /// the bound, killing all outward motion; it does not bounce.
    pub(super) fn resolve_containment(&self, predicted: Point, previous: Point, restitution: Real) -> Point {
        let mut resolved = predicted;
        for axis in 0..3 {
            let bound = if resolved[axis] < self.min[axis] {
                self.min[axis]
            } else if resolved[axis] > self.max[axis] {
                self.max[axis]
            } else {
                continue;
            };
            resolved[axis] = bound + restitution * (previous[axis] - bound);
        }
        resolved
    }
}

/// Static scene obstacle. Particles may never rest inside one.
#[derive(Copy, Clone, Debug)]
pub enum ObstacleVolume {
    Slab(Aabb),
    Sphere { center: Point, radius: Real },
}

impl ObstacleVolume {
    /// Moves a penetrating position back out, with the same restitution rule as the domain
    /// bounds. Returns `None` if the position doesn't touch the obstacle.
    pub(super) fn resolve_penetration(&self, predicted: Point, previous: Point, restitution: Real) -> Option<Point> {
        match *self {
            ObstacleVolume::Slab(slab) => {
                if !slab.contains(predicted) {
                    return None;
                }
                // Exit through the face with the smallest penetration depth.
                let mut exit_axis = 0;
                let mut exit_bound = 0.0;
                let mut min_depth = Real::MAX;
                for axis in 0..3 {
                    let depth_min = predicted[axis] - slab.min[axis];
                    if depth_min < min_depth {
                        min_depth = depth_min;
                        exit_axis = axis;
                        exit_bound = slab.min[axis];
                    }
                    let depth_max = slab.max[axis] - predicted[axis];
                    if depth_max < min_depth {
                        min_depth = depth_max;
                        exit_axis = axis;
                        exit_bound = slab.max[axis];
                    }
                }
                let mut resolved = predicted;
                resolved[exit_axis] = exit_bound + restitution * (previous[exit_axis] - exit_bound);
                Some(resolved)
            }

            ObstacleVolume::Sphere { center, radius } => {
                let to_predicted = predicted - center;
                let distance_sq = to_predicted.magnitude2();
                if distance_sq >= radius * radius {
                    return None;
                }
                // A particle sitting exactly on the center has no exit direction, eject upwards.
                let normal = if distance_sq > 1.0e-12 {
                    to_predicted / distance_sq.sqrt()
                } else {
                    Vector::unit_y()
                };
                let surface = center + normal * radius;
                Some(surface + restitution * (previous - surface))
            }
        }
    }
}

/// Optional region teleport rule.
///
/// A predicted position entering the trigger volume is translated by a fixed offset and the
/// particle's reconstructed velocity is replaced with `exit_velocity`. This exists to support
/// looping scenes (e.g. a waterfall feeding its own source), it is not a physical law.
#[derive(Copy, Clone, Debug)]
pub struct PortalRegion {
    pub region: Aabb,
    pub offset: Vector,
    pub exit_velocity: Vector,
}

impl PortalRegion {
    pub(super) fn resolve_teleport(&self, predicted: Point) -> Option<Point> {
        if self.region.contains(predicted) {
            Some(predicted + self.offset)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use more_asserts::*;

    #[test]
    fn domain_zero_restitution_snaps_to_bound() {
        let domain = Aabb::new(Point::new(-1.0, 0.0, -1.0), Point::new(1.0, 2.0, 1.0));
        let resolved = domain.resolve_containment(Point::new(1.5, -0.25, 0.0), Point::new(0.9, 0.1, 0.0), 0.0);
        assert_eq!(resolved, Point::new(1.0, 0.0, 0.0));
    }

    #[test]
    fn domain_restitution_pulls_towards_previous_position() {
        let domain = Aabb::new(Point::new(-1.0, 0.0, -1.0), Point::new(1.0, 2.0, 1.0));
        let resolved = domain.resolve_containment(Point::new(0.0, -1.0, 0.0), Point::new(0.0, 0.5, 0.0), 0.5);
        assert_eq!(resolved, Point::new(0.0, 0.25, 0.0));
        assert!(domain.contains(resolved));
    }

    #[test]
    fn slab_ejects_through_nearest_face() {
        let slab = ObstacleVolume::Slab(Aabb::new(Point::new(0.0, 0.0, 0.0), Point::new(4.0, 1.0, 4.0)));
        let resolved = slab
            .resolve_penetration(Point::new(2.0, 0.9, 2.0), Point::new(2.0, 1.2, 2.0), 0.0)
            .unwrap();
        assert_eq!(resolved, Point::new(2.0, 1.0, 2.0));
        assert_eq!(slab.resolve_penetration(Point::new(5.0, 0.5, 2.0), Point::new(5.0, 1.5, 2.0), 0.0), None);
    }

    #[test]
    fn sphere_ejects_radially() {
        let sphere = ObstacleVolume::Sphere {
            center: Point::new(0.0, 0.0, 0.0),
            radius: 1.0,
        };
        let resolved = sphere
            .resolve_penetration(Point::new(0.5, 0.0, 0.0), Point::new(1.5, 0.0, 0.0), 0.0)
            .unwrap();
        assert_le!((resolved.x - 1.0).abs(), 1.0e-6);
        assert_eq!(sphere.resolve_penetration(Point::new(2.0, 0.0, 0.0), Point::new(2.5, 0.0, 0.0), 0.0), None);
    }

    #[test]
    fn portal_translates_entering_positions() {
        let portal = PortalRegion {
            region: Aabb::new(Point::new(-1.0, -1.0, -1.0), Point::new(1.0, 0.0, 1.0)),
            offset: Vector::new(0.0, 3.0, 0.0),
            exit_velocity: Vector::new(0.0, -1.0, 0.0),
        };
        assert_eq!(
            portal.resolve_teleport(Point::new(0.0, -0.5, 0.0)),
            Some(Point::new(0.0, 2.5, 0.0))
        );
        assert_eq!(portal.resolve_teleport(Point::new(0.0, 0.5, 0.0)), None);
    }
}
