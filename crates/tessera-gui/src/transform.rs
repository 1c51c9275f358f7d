use glam::{Affine3A, Vec2, Vec3};

use crate::{Quad, Rect};

/// Affine transform from a local coordinate system to a parent (or window) coordinate system.
///
/// The linear part is 3×3; the z axis carries depth, so translating along z moves a
/// drawing in front of or behind its siblings.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Transform(pub Affine3A);

impl Default for Transform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Transform {
    pub const IDENTITY: Self = Self(Affine3A::IDENTITY);

    pub fn translate(x: f32, y: f32, z: f32) -> Self {
        Self(Affine3A::from_translation(Vec3::new(x, y, z)))
    }

    pub fn scale(x: f32, y: f32) -> Self {
        Self(Affine3A::from_scale(Vec3::new(x, y, 1.0)))
    }

    /// Counter-clockwise rotation around the z axis.
    pub fn rotate(angle: f32) -> Self {
        Self(Affine3A::from_rotation_z(angle))
    }

    /// `self` applied after `inner`.
    pub fn then(self, inner: Transform) -> Self {
        Self(self.0 * inner.0)
    }

    pub fn inverse(self) -> Self {
        Self(self.0.inverse())
    }

    pub fn transform_point(&self, point: Vec3) -> Vec3 {
        self.0.transform_point3(point)
    }

    pub fn transform_point2(&self, point: Vec2) -> Vec3 {
        self.transform_point(point.extend(0.0))
    }

    pub fn transform_rect(&self, rect: &Rect) -> Quad {
        Quad::new(rect.corners().map(|c| self.transform_point2(c)))
    }

    pub fn transform_quad(&self, quad: &Quad) -> Quad {
        Quad::new(quad.corners.map(|c| self.transform_point(c)))
    }

    /// Axis-aligned bounds of a transformed rectangle.
    pub fn bounding_rect(&self, rect: &Rect) -> Rect {
        self.transform_rect(rect).bounding_rect()
    }

    /// Lengths of the transformed unit x and y vectors.
    ///
    /// Used to scale distances that are given in local units.
    pub fn axis_scales(&self) -> [f32; 2] {
        [
            self.0.matrix3.x_axis.length(),
            self.0.matrix3.y_axis.length(),
        ]
    }
}

impl std::ops::Mul for Transform {
    type Output = Transform;

    fn mul(self, rhs: Transform) -> Transform {
        self.then(rhs)
    }
}
