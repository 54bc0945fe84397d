use euclid::{Point2D, Transform2D};

pub struct Space;
pub type Transform = Transform2D<f64, Space, Space>;

/// `[llx, lly, urx, ury]` in default user space.
pub type Rect = [f64; 4];

/// A PDF matrix `[a b c d e f]`.
pub type Matrix = [f64; 6];

pub const IDENTITY_MATRIX: Matrix = [1.0, 0.0, 0.0, 1.0, 0.0, 0.0];

/// Reorder a rectangle so that `rect[0] <= rect[2]` and `rect[1] <= rect[3]`.
pub fn normalize_rect(rect: Rect) -> Rect {
    [
        rect[0].min(rect[2]),
        rect[1].min(rect[3]),
        rect[0].max(rect[2]),
        rect[1].max(rect[3]),
    ]
}

pub(crate) fn to_transform(m: &Matrix) -> Transform {
    Transform::new(m[0], m[1], m[2], m[3], m[4], m[5])
}

/// Bounding box of `rect` after transformation by `matrix`.
pub fn axial_aligned_bounding_box(rect: &Rect, matrix: &Matrix) -> Rect {
    let t = to_transform(matrix);
    let corners = [
        t.transform_point(Point2D::new(rect[0], rect[1])),
        t.transform_point(Point2D::new(rect[0], rect[3])),
        t.transform_point(Point2D::new(rect[2], rect[1])),
        t.transform_point(Point2D::new(rect[2], rect[3])),
    ];

    let mut bounds = [
        f64::INFINITY,
        f64::INFINITY,
        f64::NEG_INFINITY,
        f64::NEG_INFINITY,
    ];
    for p in corners {
        bounds[0] = bounds[0].min(p.x);
        bounds[1] = bounds[1].min(p.y);
        bounds[2] = bounds[2].max(p.x);
        bounds[3] = bounds[3].max(p.y);
    }
    bounds
}
