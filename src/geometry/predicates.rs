//! Numeric predicates.
//!
//! Every sidedness test answers with a tri-state enum and is thresholded by
//! [`EPSILON`] as a distance: a point is `On` a line when it lies within
//! `EPSILON` of it, and `On` a circle when its distance from the center is
//! within `EPSILON` of the radius. Near-degenerate configurations come back as
//! `On` and the caller decides what to do with them; nothing here panics or
//! errors.
//!
//! [`cross2`] and [`exact_orientation`] are the untoleranced sign tests, used
//! where a decision must follow the floating-point geometry exactly.

use std::f64::consts::TAU;

use nalgebra::{Matrix3, Matrix4, Point2, Point3, Vector2, Vector3};

use super::{approx_eq2, EPSILON};

/// Position of a point relative to a directed line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Orientation {
    /// Strictly to the left (counter-clockwise turn).
    Left,
    /// Collinear within tolerance.
    On,
    /// Strictly to the right (clockwise turn).
    Right,
}

/// Position of a point relative to a circle (or sphere).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CircleTest {
    /// Strictly inside.
    Inside,
    /// On the boundary within tolerance, or the defining points are degenerate.
    On,
    /// Strictly outside.
    Outside,
}

/// Twice the signed area of triangle `abc`, positive when counter-clockwise.
#[inline]
pub fn cross2(a: &Point2<f64>, b: &Point2<f64>, c: &Point2<f64>) -> f64 {
    (b.x - a.x) * (c.y - a.y) - (b.y - a.y) * (c.x - a.x)
}

/// Which side of the directed line `a -> b` the point `c` lies on.
///
/// `c` is `On` when its distance from the line is at most [`EPSILON`], so the
/// answer does not depend on the length of `a -> b`. Coincident `a` and `b`
/// define no line and yield `On`.
#[inline]
pub fn orientation(a: &Point2<f64>, b: &Point2<f64>, c: &Point2<f64>) -> Orientation {
    let len = (b - a).norm();
    if len == 0.0 {
        return Orientation::On;
    }
    let distance = cross2(a, b, c) / len;
    if distance > EPSILON {
        Orientation::Left
    } else if distance < -EPSILON {
        Orientation::Right
    } else {
        Orientation::On
    }
}

/// Sign of [`cross2`] with no tolerance.
///
/// The endpoints are put in a fixed order before evaluating, so the two
/// half-edges of a shared edge always classify a point consistently.
pub fn exact_orientation(a: &Point2<f64>, b: &Point2<f64>, c: &Point2<f64>) -> Orientation {
    let swapped = (b.x, b.y) < (a.x, a.y);
    let det = if swapped { -cross2(b, a, c) } else { cross2(a, b, c) };
    if det > 0.0 {
        Orientation::Left
    } else if det < 0.0 {
        Orientation::Right
    } else {
        Orientation::On
    }
}

/// Signed area of triangle `abc`, positive when counter-clockwise.
#[inline]
pub fn triangle_area(a: &Point2<f64>, b: &Point2<f64>, c: &Point2<f64>) -> f64 {
    0.5 * cross2(a, b, c)
}

/// Whether `d` lies inside the circle through `a`, `b`, `c`.
///
/// `d` is `On` when its distance from the circumcenter is within [`EPSILON`]
/// of the circumradius. The answer does not depend on the winding of
/// `a, b, c`. Collinear `a, b, c` define no circle and yield
/// [`CircleTest::On`].
pub fn in_circle(a: &Point2<f64>, b: &Point2<f64>, c: &Point2<f64>, d: &Point2<f64>) -> CircleTest {
    let orient = cross2(a, b, c);
    if orient == 0.0 {
        return CircleTest::On;
    }

    let row = |p: &Point2<f64>| {
        let dx = p.x - d.x;
        let dy = p.y - d.y;
        [dx, dy, dx * dx + dy * dy]
    };
    let [r0, r1, r2] = [row(a), row(b), row(c)];
    let m = Matrix3::new(
        r0[0], r0[1], r0[2], //
        r1[0], r1[1], r1[2], //
        r2[0], r2[1], r2[2],
    );
    // The lifted determinant equals `orient * (r² - |d - o|²)`.
    let power = m.determinant() / orient;
    let radius = (b - a).norm() * (c - b).norm() * (a - c).norm() / (2.0 * orient.abs());
    classify_margin(power, radius)
}

/// Classify a point by its power `r² - |p - o|²` against a circle or sphere
/// of radius `r`, turning the power into the distance margin `r - |p - o|`.
fn classify_margin(power: f64, radius: f64) -> CircleTest {
    if !power.is_finite() || !radius.is_finite() {
        return CircleTest::On;
    }
    let distance = (radius * radius - power).max(0.0).sqrt();
    let margin = power / (radius + distance);
    if margin > EPSILON {
        CircleTest::Inside
    } else if margin < -EPSILON {
        CircleTest::Outside
    } else {
        CircleTest::On
    }
}

/// Six times the signed volume of tetrahedron `abcd`.
///
/// Positive when `d` lies below the plane of `a, b, c` as seen with `a, b, c`
/// counter-clockwise from above.
#[inline]
pub fn orient3d(a: &Point3<f64>, b: &Point3<f64>, c: &Point3<f64>, d: &Point3<f64>) -> f64 {
    let m = Matrix3::from_rows(&[
        (a - d).transpose(),
        (b - d).transpose(),
        (c - d).transpose(),
    ]);
    m.determinant()
}

/// Whether `e` lies inside the sphere through `a`, `b`, `c`, `d`.
///
/// Thresholded like [`in_circle`] and independent of the orientation of the
/// tetrahedron; coplanar `a, b, c, d` yield [`CircleTest::On`].
pub fn in_sphere(
    a: &Point3<f64>,
    b: &Point3<f64>,
    c: &Point3<f64>,
    d: &Point3<f64>,
    e: &Point3<f64>,
) -> CircleTest {
    let orient = orient3d(a, b, c, d);
    if orient == 0.0 {
        return CircleTest::On;
    }

    let mut m = Matrix4::zeros();
    for (i, p) in [a, b, c, d].into_iter().enumerate() {
        let v = p - e;
        m[(i, 0)] = v.x;
        m[(i, 1)] = v.y;
        m[(i, 2)] = v.z;
        m[(i, 3)] = v.norm_squared();
    }
    let power = m.determinant() / orient;
    let (ab, ac, ad) = (b - a, c - a, d - a);
    let offset = (ac.cross(&ad) * ab.norm_squared()
        + ad.cross(&ab) * ac.norm_squared()
        + ab.cross(&ac) * ad.norm_squared())
        / (2.0 * ab.dot(&ac.cross(&ad)));
    classify_margin(power, offset.norm())
}

/// Center of the circle through three points.
///
/// Returns `None` when the points are collinear; callers are expected to rule
/// that out with [`orientation`] first.
pub fn circumcenter(a: &Point2<f64>, b: &Point2<f64>, c: &Point2<f64>) -> Option<Point2<f64>> {
    let d = 2.0 * cross2(a, b, c);
    if d.abs() < f64::EPSILON {
        return None;
    }

    let ab = b - a;
    let ac = c - a;
    let ab2 = ab.norm_squared();
    let ac2 = ac.norm_squared();

    let ux = (ac.y * ab2 - ab.y * ac2) / d;
    let uy = (ab.x * ac2 - ac.x * ab2) / d;
    Some(Point2::new(a.x + ux, a.y + uy))
}

/// The point on segment `ab` closest to `p`.
pub fn closest_point_on_segment(a: &Point2<f64>, b: &Point2<f64>, p: &Point2<f64>) -> Point2<f64> {
    let ab = b - a;
    let len2 = ab.norm_squared();
    if len2 == 0.0 {
        return *a;
    }
    let t = ((p - a).dot(&ab) / len2).clamp(0.0, 1.0);
    a + ab * t
}

/// Perpendicular distance from `p` to the infinite line through `a` and `b`.
pub fn distance_to_line(a: &Point2<f64>, b: &Point2<f64>, p: &Point2<f64>) -> f64 {
    let len = (b - a).norm();
    if len == 0.0 {
        return (p - a).norm();
    }
    cross2(a, b, p).abs() / len
}

/// Perpendicular distance from `p` to the infinite 3D line through `a` and `b`.
pub fn distance_to_line3(a: &Point3<f64>, b: &Point3<f64>, p: &Point3<f64>) -> f64 {
    let ab = b - a;
    let len = ab.norm();
    if len == 0.0 {
        return (p - a).norm();
    }
    ab.cross(&(p - a)).norm() / len
}

/// Signed distance from `p` to the plane through `plane_point` with unit
/// normal `normal`. Positive on the side the normal points to.
#[inline]
pub fn distance_to_plane(normal: &Vector3<f64>, plane_point: &Point3<f64>, p: &Point3<f64>) -> f64 {
    normal.dot(&(p - plane_point))
}

/// Counter-clockwise angle from `from` to `to`, in `[0, 2π)`.
pub fn angle_ccw(from: &Vector2<f64>, to: &Vector2<f64>) -> f64 {
    let cross = from.x * to.y - from.y * to.x;
    let angle = cross.atan2(from.dot(to));
    if angle < 0.0 {
        angle + TAU
    } else {
        angle
    }
}

/// Whether `p` lies inside or on the boundary of triangle `abc` (any winding).
pub fn point_in_triangle(
    a: &Point2<f64>,
    b: &Point2<f64>,
    c: &Point2<f64>,
    p: &Point2<f64>,
) -> bool {
    let o1 = orientation(a, b, p);
    let o2 = orientation(b, c, p);
    let o3 = orientation(c, a, p);

    let has_left = [o1, o2, o3].contains(&Orientation::Left);
    let has_right = [o1, o2, o3].contains(&Orientation::Right);
    !(has_left && has_right)
}

/// Even-odd point-in-polygon test. The polygon is implicitly closed.
pub fn point_in_polygon(polygon: &[Point2<f64>], p: &Point2<f64>) -> bool {
    let n = polygon.len();
    if n < 3 {
        return false;
    }

    let mut inside = false;
    let mut j = n - 1;
    for i in 0..n {
        let pi = &polygon[i];
        let pj = &polygon[j];
        if (pi.y > p.y) != (pj.y > p.y) {
            let x_cross = pj.x + (p.y - pj.y) / (pi.y - pj.y) * (pi.x - pj.x);
            if p.x < x_cross {
                inside = !inside;
            }
        }
        j = i;
    }
    inside
}

/// Whether the quadrilateral `a, b, c, d` (in order) is strictly convex.
pub fn is_convex_quad(a: &Point2<f64>, b: &Point2<f64>, c: &Point2<f64>, d: &Point2<f64>) -> bool {
    let turns = [
        orientation(a, b, c),
        orientation(b, c, d),
        orientation(c, d, a),
        orientation(d, a, b),
    ];
    turns.iter().all(|&o| o == Orientation::Left) || turns.iter().all(|&o| o == Orientation::Right)
}

/// Whether `p` lies on segment `ab` strictly between its endpoints.
pub fn on_open_segment(a: &Point2<f64>, b: &Point2<f64>, p: &Point2<f64>) -> bool {
    if orientation(a, b, p) != Orientation::On || approx_eq2(a, p) || approx_eq2(b, p) {
        return false;
    }
    (p - a).dot(&(b - a)) > 0.0 && (p - b).dot(&(a - b)) > 0.0
}

/// Whether segments `ab` and `cd` cross at a single interior point of both.
///
/// Touching at an endpoint and collinear overlap do not count.
pub fn segment_crosses_properly(
    a: &Point2<f64>,
    b: &Point2<f64>,
    c: &Point2<f64>,
    d: &Point2<f64>,
) -> bool {
    let o1 = orientation(a, b, c);
    let o2 = orientation(a, b, d);
    let o3 = orientation(c, d, a);
    let o4 = orientation(c, d, b);

    o1 != Orientation::On
        && o2 != Orientation::On
        && o3 != Orientation::On
        && o4 != Orientation::On
        && o1 != o2
        && o3 != o4
}

/// Whether segments `ab` and `cd` meet anywhere other than a shared endpoint.
///
/// Covers proper crossings, T-junctions, collinear overlap, and identical
/// segments. This is the conflict test for forced edges.
pub fn segments_cross(a: &Point2<f64>, b: &Point2<f64>, c: &Point2<f64>, d: &Point2<f64>) -> bool {
    if segment_crosses_properly(a, b, c, d) {
        return true;
    }

    let same = (approx_eq2(a, c) && approx_eq2(b, d)) || (approx_eq2(a, d) && approx_eq2(b, c));
    if same {
        return true;
    }

    on_open_segment(a, b, c)
        || on_open_segment(a, b, d)
        || on_open_segment(c, d, a)
        || on_open_segment(c, d, b)
}
