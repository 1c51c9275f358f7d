use glam::{Vec2, Vec3};

/// Axis-aligned rectangle defined by min and max corners
///
/// `min` is the bottom-left corner, `max` the top-right corner.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Rect {
    pub min: [f32; 2],
    pub max: [f32; 2],
}

impl Rect {
    pub const fn new(min: [f32; 2], max: [f32; 2]) -> Self {
        Self { min, max }
    }

    pub fn from_min_size(min: [f32; 2], size: [f32; 2]) -> Self {
        Self {
            min,
            max: [min[0] + size[0], min[1] + size[1]],
        }
    }

    /// A rectangle large enough to never clip anything.
    pub const fn everything() -> Self {
        Self::new([-f32::MAX, -f32::MAX], [f32::MAX, f32::MAX])
    }

    pub fn width(&self) -> f32 {
        self.max[0] - self.min[0]
    }

    pub fn height(&self) -> f32 {
        self.max[1] - self.min[1]
    }

    pub fn size(&self) -> [f32; 2] {
        [self.width(), self.height()]
    }

    pub fn is_empty(&self) -> bool {
        self.max[0] <= self.min[0] || self.max[1] <= self.min[1]
    }

    /// Point-in-rectangle test, half-open: the max edges are outside.
    ///
    /// An empty rectangle contains no point.
    pub fn contains(&self, point: [f32; 2]) -> bool {
        point[0] >= self.min[0]
            && point[0] < self.max[0]
            && point[1] >= self.min[1]
            && point[1] < self.max[1]
    }

    /// True when the two rectangles share a region of non-zero area.
    pub fn overlaps(&self, other: &Rect) -> bool {
        self.min[0] < other.max[0]
            && other.min[0] < self.max[0]
            && self.min[1] < other.max[1]
            && other.min[1] < self.max[1]
    }

    /// Intersection of two rectangles. Disjoint rectangles produce an empty rectangle.
    pub fn intersect(&self, other: &Rect) -> Rect {
        let min = [
            self.min[0].max(other.min[0]),
            self.min[1].max(other.min[1]),
        ];
        let max = [
            self.max[0].min(other.max[0]).max(min[0]),
            self.max[1].min(other.max[1]).max(min[1]),
        ];
        Rect::new(min, max)
    }

    /// Grow the rectangle by `amount` on every side; a negative amount shrinks it.
    pub fn expand(&self, amount: f32) -> Rect {
        Rect::new(
            [self.min[0] - amount, self.min[1] - amount],
            [self.max[0] + amount, self.max[1] + amount],
        )
    }

    /// Corners in quad order: bottom-left, bottom-right, top-left, top-right.
    pub fn corners(&self) -> [Vec2; 4] {
        [
            Vec2::new(self.min[0], self.min[1]),
            Vec2::new(self.max[0], self.min[1]),
            Vec2::new(self.min[0], self.max[1]),
            Vec2::new(self.max[0], self.max[1]),
        ]
    }

    /// Smallest rectangle containing all `points`.
    pub fn bounding(points: &[Vec2]) -> Rect {
        let mut min = Vec2::splat(f32::MAX);
        let mut max = Vec2::splat(-f32::MAX);
        for p in points {
            min = min.min(*p);
            max = max.max(*p);
        }
        Rect::new(min.to_array(), max.to_array())
    }

    /// `[min_x, min_y, max_x, max_y]`, the layout the shaders expect for clip rectangles.
    pub const fn to_array(&self) -> [f32; 4] {
        [self.min[0], self.min[1], self.max[0], self.max[1]]
    }
}

/// Per-corner radii for boxes, in quad order: bottom-left, bottom-right, top-left, top-right.
///
/// A positive radius rounds the corner, a negative radius cuts it with a chamfer of that size.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct CornerRadii(pub [f32; 4]);

impl CornerRadii {
    pub const fn new(bottom_left: f32, bottom_right: f32, top_left: f32, top_right: f32) -> Self {
        Self([bottom_left, bottom_right, top_left, top_right])
    }

    pub const fn uniform(radius: f32) -> Self {
        Self([radius; 4])
    }

    /// Grow the magnitude of every corner by `amount`, keeping its sign.
    ///
    /// A corner whose magnitude would drop below zero becomes square.
    pub fn grow(self, amount: f32) -> Self {
        Self(self.0.map(|r| {
            if r == 0.0 {
                return 0.0;
            }
            let magnitude = (r.abs() + amount).max(0.0);
            magnitude.copysign(r)
        }))
    }

    pub fn scale(self, factor: f32) -> Self {
        Self(self.0.map(|r| r * factor))
    }

    pub const fn to_array(self) -> [f32; 4] {
        self.0
    }
}

/// A (possibly rotated) quadrilateral given by its four corners.
///
/// Corner order matches vertex emission: bottom-left, bottom-right, top-left, top-right.
/// The `z` component of each corner is its depth.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Quad {
    pub corners: [Vec3; 4],
}

impl Quad {
    pub const fn new(corners: [Vec3; 4]) -> Self {
        Self { corners }
    }

    pub fn from_rect(rect: &Rect, z: f32) -> Self {
        Self::new(rect.corners().map(|c| c.extend(z)))
    }

    /// Axis-aligned bounds of the quad, ignoring depth.
    pub fn bounding_rect(&self) -> Rect {
        Rect::bounding(&self.corners.map(|c| c.truncate()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_overlaps_excludes_touching_edges() {
        let a = Rect::new([0.0, 0.0], [10.0, 10.0]);
        assert!(a.overlaps(&Rect::new([5.0, 5.0], [15.0, 15.0])));
        assert!(!a.overlaps(&Rect::new([10.0, 0.0], [20.0, 10.0])));
    }

    #[test]
    fn test_intersect_disjoint_is_empty() {
        let a = Rect::new([0.0, 0.0], [10.0, 10.0]);
        let b = Rect::new([20.0, 20.0], [30.0, 30.0]);
        assert!(a.intersect(&b).is_empty());
        assert_eq!(
            a.intersect(&Rect::new([5.0, -5.0], [15.0, 5.0])),
            Rect::new([5.0, 0.0], [10.0, 5.0])
        );
    }

    #[test]
    fn test_contains_is_half_open() {
        let a = Rect::new([0.0, 0.0], [10.0, 10.0]);
        assert!(a.contains([0.0, 0.0]));
        assert!(a.contains([9.5, 9.5]));
        assert!(!a.contains([10.0, 5.0]));
        assert!(!a.contains([5.0, 10.0]));

        let collapsed = Rect::new([1000.0, 0.0], [1000.0, 70.0]);
        assert!(collapsed.is_empty());
        assert!(!collapsed.contains([1000.0, 0.0]));
    }

    #[test]
    fn test_corner_order() {
        let c = Rect::new([1.0, 2.0], [3.0, 4.0]).corners();
        assert_eq!(c[0], Vec2::new(1.0, 2.0));
        assert_eq!(c[1], Vec2::new(3.0, 2.0));
        assert_eq!(c[2], Vec2::new(1.0, 4.0));
        assert_eq!(c[3], Vec2::new(3.0, 4.0));
    }

    #[test]
    fn test_radii_grow_keeps_sign() {
        let radii = CornerRadii::new(5.0, -5.0, 0.0, 0.5).grow(-1.0);
        assert_eq!(radii.to_array(), [4.0, -4.0, 0.0, 0.0]);
        let radii = CornerRadii::new(5.0, -5.0, 0.0, 1.0).grow(1.0);
        assert_eq!(radii.to_array(), [6.0, -6.0, 0.0, 2.0]);
    }
}
