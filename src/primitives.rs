//! Closest-point functions of static shapes.
//!
//! Every function follows the [`Environment`](crate::environment::Environment)
//! contract: a point inside the solid comes back unchanged, any other point is
//! mapped to the nearest point of the solid's boundary. Shapes are measured
//! with the exact length regardless of the world's metric.

use crate::math::{self, Unit, F, INFINITY};
use crate::rotation;
use crate::vec::Vec3;

/// Solid axis-aligned box; `max_corner` is the half-size vector.
pub fn aabox(point: Vec3, center: Vec3, max_corner: Vec3) -> Vec3 {
    let clamp = |p: Unit, c: Unit, m: Unit| {
        let shifted = p.wrapping_sub(c);

        if shifted > m {
            c + m
        } else if shifted < -m {
            c - m
        } else {
            p
        }
    };

    Vec3::new(
        clamp(point.x, center.x, max_corner.x),
        clamp(point.y, center.y, max_corner.y),
        clamp(point.z, center.z, max_corner.z),
    )
}

/// Hollow axis-aligned box of full `size`: the solid is everything outside
/// it, e.g. a room.
pub fn aabox_inside(point: Vec3, center: Vec3, size: Vec3) -> Vec3 {
    let size = size.div_plain(2);
    let shifted = point - center;

    let mut a = size - shifted;
    let b = shifted + size;
    let mut sign = [1, 1, 1];

    if b.x < a.x {
        a.x = b.x;
        sign[0] = -1;
    }

    if b.y < a.y {
        a.y = b.y;
        sign[1] = -1;
    }

    if b.z < a.z {
        a.z = b.z;
        sign[2] = -1;
    }

    if a.x < 0 || a.y < 0 || a.z < 0 {
        return point;
    }

    let mut result = point;

    if a.x < a.y {
        if a.x < a.z {
            result.x = center.x + sign[0] * size.x;
        } else {
            result.z = center.z + sign[2] * size.z;
        }
    } else if a.y < a.z {
        result.y = center.y + sign[1] * size.y;
    } else {
        result.z = center.z + sign[2] * size.z;
    }

    result
}

/// Solid box rotated by an Euler `rotation` about its center.
pub fn rotated_box(point: Vec3, center: Vec3, max_corner: Vec3, rotation: Vec3) -> Vec3 {
    let local = rotation::point_rotate(point - center, rotation::rotation_inverse(rotation));
    let clamped = aabox(local, Vec3::ZERO, max_corner);

    // rotating back and forth is lossy, so report inside points untouched
    if clamped == local {
        return point;
    }

    center + rotation::point_rotate(clamped, rotation)
}

/// Solid sphere.
pub fn sphere(point: Vec3, center: Vec3, radius: Unit) -> Vec3 {
    let dir = point - center;
    let l = dir.length();

    if l <= radius {
        return point;
    }

    center + dir.scale_ratio(radius, l)
}

/// Hollow sphere: the solid is everything outside the ball.
pub fn sphere_inside(point: Vec3, center: Vec3, radius: Unit) -> Vec3 {
    let shifted = point - center;

    if shifted.length() >= radius {
        return point;
    }

    center + shifted.normalized().times(radius)
}

/// Half-space behind the plane through `center`; `normal` points away from
/// the solid and need not be normalized.
pub fn half_plane(point: Vec3, center: Vec3, normal: Vec3) -> Vec3 {
    let depth = (point - center).dot_plain(normal);

    if depth < 0 {
        return point;
    }

    let l = math::non_zero(normal.length());
    let depth = (depth / l as i64) as Unit;

    point - normal.scale_ratio(F, l).times(depth)
}

/// Everything below `height` on the Y axis.
pub fn ground(point: Vec3, height: Unit) -> Vec3 {
    let mut point = point;

    if point.y > height {
        point.y = height;
    }

    point
}

/// Infinitely long solid cylinder around the line through `center` along
/// `direction`.
pub fn infinite_cylinder(point: Vec3, center: Vec3, direction: Vec3, radius: Unit) -> Vec3 {
    let d = point - center;
    let d = d - d.project(direction);
    let l = d.length();

    if l <= radius {
        return point;
    }

    point - d.scale_ratio(l - radius, l)
}

/// Finite solid cylinder; `direction` runs from the center to the middle of
/// one cap, so its length is half the height.
pub fn cylinder(point: Vec3, center: Vec3, direction: Vec3, radius: Unit) -> Vec3 {
    let local = point - center;
    let projected = local.project(direction);

    let mut result = infinite_cylinder(local, Vec3::ZERO, direction, radius);

    let l_dir = math::non_zero(direction.length());
    let l_diff = projected.length() - l_dir;

    if l_diff > 0 {
        let over = direction.scale_ratio(l_diff, l_dir);

        result = if projected.dot(over) >= 0 {
            result - over
        } else {
            result + over
        };
    }

    center + result
}

/// Solid cone with its base circle of `radius` at `center` and its apex at
/// `center + direction`.
pub fn cone(point: Vec3, center: Vec3, direction: Vec3, mut radius: Unit) -> Vec3 {
    let mut point = point - center;

    if radius < 0 {
        log::warn!("degenerate cone radius {}, clamping to 0", radius);
        radius = 0;
    }

    if point.dot(direction) <= 0 {
        // below the base plane
        point = half_plane(point, Vec3::ZERO, -direction);

        let dist = point.length();

        if dist > radius {
            point = point.scale_ratio(radius, dist);
        }
    } else {
        let height = math::non_zero(direction.length());

        let along = point.project(direction);
        let y = along.length();
        let across = point - along;
        let x = across.length();

        // too close to the axis for the slant computation to be stable
        if x < 20 {
            if y >= height {
                point = direction;
            }
        } else {
            let scaled_radius = radius - math::mul_div(y, radius, height);

            if y > height || x > scaled_radius {
                let rim = across.scale_ratio(radius, x);
                point = line_segment(point, rim, direction);
            }
        }
    }

    point + center
}

/// Closest point on the segment `a`-`b`. The segment has no volume, so only
/// points on it come back unchanged.
pub fn line_segment(point: Vec3, a: Vec3, b: Vec3) -> Vec3 {
    let b = b - a;
    let mut point = (point - a).project(b);

    let taxicab = |v: Vec3| math::abs(v.x) as i64 + math::abs(v.y) as i64 + math::abs(v.z) as i64;

    if point.dot(b) < 0 {
        point = Vec3::ZERO;
    } else if taxicab(point) > taxicab(b) {
        point = b;
    }

    point + a
}

/// Axis along which a [`aa_tri_prism`] is extruded.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum PrismAxis {
    /// Triangle in the XY plane, extruded along Z.
    Z,
    /// Triangle in the XZ plane (its second coordinate is Z), extruded along Y.
    Y,
    /// Triangle in the ZY plane (its first coordinate is Z), extruded along X.
    X,
}

impl PrismAxis {
    fn swap(self, p: Vec3) -> Vec3 {
        match self {
            PrismAxis::Z => p,
            PrismAxis::Y => Vec3::new(p.x, p.z, p.y),
            PrismAxis::X => Vec3::new(p.z, p.y, p.x),
        }
    }
}

/// Solid triangular prism, e.g. a ramp.
///
/// `sides` holds the three triangle vertices as `[x0, y0, x1, y1, x2, y2]`
/// relative to `center`, in counter-clockwise order. `depth` is the full
/// extent along the extrusion axis.
pub fn aa_tri_prism(point: Vec3, center: Vec3, sides: &[Unit; 6], depth: Unit, axis: PrismAxis) -> Vec3 {
    let mut point = axis.swap(point - center);

    let depth = depth / 2;
    point.z = math::keep_in_range(point.z, -depth, depth);

    for i in (0..6).step_by(2) {
        let i2 = if i < 4 { i + 2 } else { 0 };

        let (ax, ay) = (sides[i], sides[i + 1]);
        let (bx, by) = (sides[i2], sides[i2 + 1]);

        let p = half_plane(point, Vec3::new(ax, ay, 0), Vec3::new(by - ay, ax - bx, 0));

        if p.x != point.x || p.y != point.y {
            point = p;

            let (px, py) = (point.x as i64, point.y as i64);
            let before_a = (bx - ax) as i64 * (px - ax as i64) + (by - ay) as i64 * (py - ay as i64);
            let past_b = (ax - bx) as i64 * (px - bx as i64) + (ay - by) as i64 * (py - by as i64);

            // clamp to the edge's end vertices
            if before_a < 0 {
                point.x = ax;
                point.y = ay;
            } else if past_b < 0 {
                point.x = bx;
                point.y = by;
            }

            break;
        }
    }

    axis.swap(point) + center
}

/// Height-field terrain below the surface sampled at grid corners.
///
/// `height(x, z)` gives the surface height at grid corner `(x, z)`; the cell
/// size is `grid_size`. The search spirals out from the query's cell and
/// stops once no closer cell can be within `max_distance`, giving up after
/// 1024 cells.
pub fn heightmap<H>(point: Vec3, center: Vec3, grid_size: Unit, height: H, max_distance: Unit) -> Vec3
where
    H: Fn(i32, i32) -> Unit,
{
    let point = point - center;
    let g = math::non_zero(grid_size);

    let mut closest_p = Vec3::INFINITY;
    let mut closest_d = INFINITY;

    let start_x = point.x / g - (point.x < 0) as i32;
    let start_y = point.z / g - (point.z < 0) as i32;

    let (mut square_x, mut square_y) = (start_x, start_y);

    let mut spiral_dir = 1u8;
    let mut spiral_step = 1u16;
    let mut spiral_steps_left = 1u16;

    let mut bl = Vec3::new(square_x * g, height(square_x, square_y), square_y * g);
    let mut br = Vec3::new(bl.x + g, height(square_x + 1, square_y), bl.z);
    let mut tl = Vec3::new(bl.x, height(square_x, square_y + 1), bl.z + g);
    let mut tr = Vec3::new(br.x, height(square_x + 1, square_y + 1), tl.z);

    for _ in 0..1024 {
        let ring = math::min(math::abs(square_x - start_x), math::abs(square_y - start_y));

        if (ring as i64 - 1) * g as i64 > math::min(max_distance, closest_d) as i64 {
            break;
        }

        for lower in [true, false] {
            let (origin, normal) = if lower {
                (bl, (tl - bl).cross(br - bl).normalized())
            } else {
                (tr, (br - tr).cross(tl - tr).normalized())
            };

            let test_p = half_plane(point, origin, normal);
            let test_d = test_p.distance(point);

            if test_d >= closest_d {
                continue;
            }

            let inside = if lower {
                test_p.x >= bl.x && test_p.z >= bl.z && test_p.x - bl.x <= tl.z - test_p.z
            } else {
                test_p.x <= tr.x && test_p.z <= tr.z && test_p.x - bl.x >= tl.z - test_p.z
            };

            if inside {
                closest_p = test_p;
                closest_d = test_d;
            } else {
                for (a, b) in [(origin, br), (origin, tl), (br, tl)] {
                    let edge_p = line_segment(point, a, b);
                    let edge_d = edge_p.distance(point);

                    if edge_d < closest_d {
                        closest_p = edge_p;
                        closest_d = edge_d;
                    }
                }
            }
        }

        match spiral_dir {
            0 => {
                square_y += 1;
                bl = tl;
                br = tr;
                tl = Vec3::new(bl.x, height(square_x, square_y + 1), bl.z + g);
                tr = Vec3::new(br.x, height(square_x + 1, square_y + 1), bl.z + g);
            }
            1 => {
                square_x += 1;
                bl = br;
                tl = tr;
                tr = Vec3::new(tl.x + g, height(square_x + 1, square_y + 1), tl.z);
                br = Vec3::new(bl.x + g, height(square_x + 1, square_y), bl.z);
            }
            2 => {
                square_y -= 1;
                tl = bl;
                tr = br;
                bl = Vec3::new(tl.x, height(square_x, square_y), tl.z - g);
                br = Vec3::new(tr.x, height(square_x + 1, square_y), tr.z - g);
            }
            _ => {
                square_x -= 1;
                br = bl;
                tr = tl;
                tl = Vec3::new(tr.x - g, height(square_x, square_y + 1), tr.z);
                bl = Vec3::new(br.x - g, height(square_x, square_y), br.z);
            }
        }

        spiral_steps_left -= 1;

        if spiral_steps_left == 0 {
            spiral_dir = if spiral_dir != 0 { spiral_dir - 1 } else { 3 };

            if spiral_dir == 3 || spiral_dir == 1 {
                spiral_step += 1;
            }

            spiral_steps_left = spiral_step;
        }
    }

    closest_p + center
}
