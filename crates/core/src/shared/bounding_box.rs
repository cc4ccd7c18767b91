/// A detected face rectangle in frame pixel coordinates.
///
/// Edges are stored explicitly: `top`/`bottom` are rows, `left`/`right`
/// are columns, with `bottom` and `right` exclusive. Boxes carry no
/// identity across frames.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct BoundingBox {
    pub top: i32,
    pub left: i32,
    pub bottom: i32,
    pub right: i32,
}

impl BoundingBox {
    pub fn new(top: i32, left: i32, bottom: i32, right: i32) -> Self {
        Self {
            top,
            left,
            bottom,
            right,
        }
    }

    /// Builds a box from corner points `(x1, y1)` - `(x2, y2)`.
    pub fn from_corners(x1: i32, y1: i32, x2: i32, y2: i32) -> Self {
        Self::new(y1, x1, y2, x2)
    }

    pub fn width(&self) -> i32 {
        self.right - self.left
    }

    pub fn height(&self) -> i32 {
        self.bottom - self.top
    }

    /// `(bottom - top) * (right - left)`, widened so large frames cannot overflow.
    pub fn area(&self) -> i64 {
        i64::from(self.height()) * i64::from(self.width())
    }

    pub fn is_empty(&self) -> bool {
        self.width() <= 0 || self.height() <= 0
    }

    /// Grows every edge by `margin` times the box's own width/height.
    pub fn expand(&self, margin: f64) -> Self {
        let dx = (self.width() as f64 * margin).round() as i32;
        let dy = (self.height() as f64 * margin).round() as i32;
        Self::new(
            self.top - dy,
            self.left - dx,
            self.bottom + dy,
            self.right + dx,
        )
    }

    /// Intersection with `[0, width) x [0, height)`.
    pub fn clamp_to(&self, width: u32, height: u32) -> Self {
        let w = width as i32;
        let h = height as i32;
        Self::new(
            self.top.clamp(0, h),
            self.left.clamp(0, w),
            self.bottom.clamp(0, h),
            self.right.clamp(0, w),
        )
    }

    pub fn iou(&self, other: &BoundingBox) -> f64 {
        let inter = BoundingBox::new(
            self.top.max(other.top),
            self.left.max(other.left),
            self.bottom.min(other.bottom),
            self.right.min(other.right),
        );
        if inter.is_empty() {
            return 0.0;
        }
        let inter_area = inter.area() as f64;
        let union = self.area() as f64 + other.area() as f64 - inter_area;
        if union <= 0.0 {
            0.0
        } else {
            inter_area / union
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rstest::rstest;

    #[test]
    fn test_area_uses_edge_differences() {
        let b = BoundingBox::new(0, 0, 100, 100);
        assert_eq!(b.area(), 10_000);
        assert_eq!(BoundingBox::new(0, 0, 50, 50).area(), 2_500);
    }

    #[test]
    fn test_area_does_not_overflow_i32() {
        let b = BoundingBox::new(0, 0, 60_000, 60_000);
        assert_eq!(b.area(), 3_600_000_000);
    }

    #[test]
    fn test_from_corners_maps_axes() {
        let b = BoundingBox::from_corners(10, 20, 30, 60);
        assert_eq!(b, BoundingBox::new(20, 10, 60, 30));
        assert_eq!(b.width(), 20);
        assert_eq!(b.height(), 40);
    }

    #[rstest]
    #[case::zero_width(BoundingBox::new(0, 10, 10, 10), true)]
    #[case::zero_height(BoundingBox::new(5, 0, 5, 10), true)]
    #[case::inverted(BoundingBox::new(10, 10, 0, 0), true)]
    #[case::regular(BoundingBox::new(0, 0, 1, 1), false)]
    fn test_is_empty(#[case] b: BoundingBox, #[case] expected: bool) {
        assert_eq!(b.is_empty(), expected);
    }

    #[test]
    fn test_expand_grows_each_edge() {
        let b = BoundingBox::new(100, 100, 200, 150).expand(0.2);
        // width 50 -> 10 px per side, height 100 -> 20 px per side
        assert_eq!(b, BoundingBox::new(80, 90, 220, 160));
    }

    #[test]
    fn test_clamp_to_frame() {
        let b = BoundingBox::new(-10, -5, 500, 700).clamp_to(640, 480);
        assert_eq!(b, BoundingBox::new(0, 0, 480, 640));
    }

    #[test]
    fn test_clamp_fully_outside_is_empty() {
        let b = BoundingBox::new(10, 700, 20, 800).clamp_to(640, 480);
        assert!(b.is_empty());
    }

    #[test]
    fn test_iou_identical() {
        let a = BoundingBox::new(10, 10, 110, 110);
        assert_relative_eq!(a.iou(&a), 1.0);
    }

    #[test]
    fn test_iou_partial_overlap() {
        // a: x 0..100, b: x 50..150, same rows
        // inter 5000, union 15000
        let a = BoundingBox::new(0, 0, 100, 100);
        let b = BoundingBox::new(0, 50, 100, 150);
        assert_relative_eq!(a.iou(&b), 5000.0 / 15000.0);
    }

    #[test]
    fn test_iou_touching_edges_is_zero() {
        let a = BoundingBox::new(0, 0, 50, 50);
        let b = BoundingBox::new(0, 50, 50, 100);
        assert_relative_eq!(a.iou(&b), 0.0);
    }
}
