use glam::Vec2;
use tessera_gui::Rect;

/// One segment of a glyph contour.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum PathSegment {
    Line(Vec2, Vec2),
    Quadratic(Vec2, Vec2, Vec2),
    Cubic(Vec2, Vec2, Vec2, Vec2),
}

impl PathSegment {
    pub fn start(&self) -> Vec2 {
        match *self {
            Self::Line(p0, _) | Self::Quadratic(p0, _, _) | Self::Cubic(p0, _, _, _) => p0,
        }
    }

    pub fn end(&self) -> Vec2 {
        match *self {
            Self::Line(_, p1) | Self::Quadratic(_, _, p1) | Self::Cubic(_, _, _, p1) => p1,
        }
    }

    fn map(&self, f: impl Fn(Vec2) -> Vec2) -> Self {
        match *self {
            Self::Line(p0, p1) => Self::Line(f(p0), f(p1)),
            Self::Quadratic(p0, c, p1) => Self::Quadratic(f(p0), f(c), f(p1)),
            Self::Cubic(p0, c0, c1, p1) => Self::Cubic(f(p0), f(c0), f(c1), f(p1)),
        }
    }

    /// Append the segment as a polyline to `out`, excluding the start point.
    ///
    /// Curves are subdivided so that no chord deviates more than roughly `tolerance`.
    pub fn flatten_into(&self, tolerance: f32, out: &mut Vec<Vec2>) {
        match *self {
            Self::Line(_, p1) => out.push(p1),
            Self::Quadratic(p0, c, p1) => {
                // Chord error of n uniform steps is |p0 - 2c + p1| / (4n²).
                let deviation = (p0 - 2.0 * c + p1).length();
                let steps = ((deviation / (4.0 * tolerance)).sqrt().ceil() as usize).clamp(1, 64);
                for i in 1..=steps {
                    let t = i as f32 / steps as f32;
                    let mt = 1.0 - t;
                    out.push(mt * mt * p0 + 2.0 * mt * t * c + t * t * p1);
                }
            }
            Self::Cubic(p0, c0, c1, p1) => {
                let deviation = (p0 - 2.0 * c0 + c1)
                    .length()
                    .max((c0 - 2.0 * c1 + p1).length());
                let steps =
                    ((6.0 * deviation / (8.0 * tolerance)).sqrt().ceil() as usize).clamp(1, 64);
                for i in 1..=steps {
                    let t = i as f32 / steps as f32;
                    let mt = 1.0 - t;
                    out.push(
                        mt * mt * mt * p0
                            + 3.0 * mt * mt * t * c0
                            + 3.0 * mt * t * t * c1
                            + t * t * t * p1,
                    );
                }
            }
        }
    }
}

/// A closed sequence of segments.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Contour {
    pub segments: Vec<PathSegment>,
}

impl Contour {
    /// The contour as a closed polygon (the first point is not repeated).
    pub fn flatten(&self, tolerance: f32) -> Vec<Vec2> {
        let Some(first) = self.segments.first() else {
            return Vec::new();
        };
        let mut points = vec![first.start()];
        for segment in &self.segments {
            segment.flatten_into(tolerance, &mut points);
        }
        if points.len() > 1 && points.last() == points.first() {
            points.pop();
        }
        points
    }
}

/// Vector outline of a glyph.
///
/// Coordinates are y-up. Outlines coming from a font collaborator are in EM units; the
/// rasterizer expects them scaled and offset into pixel space first.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct GlyphPath {
    pub contours: Vec<Contour>,
}

impl GlyphPath {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.contours.iter().all(|c| c.segments.is_empty())
    }

    /// Tight bounds over all end points and control points.
    ///
    /// Control points can lie slightly outside the curve, so this may be a little larger than
    /// the exact ink bounds. An empty path has an empty rectangle at the origin.
    pub fn bounding_box(&self) -> Rect {
        let mut points = Vec::new();
        for segment in self.contours.iter().flat_map(|c| c.segments.iter()) {
            match *segment {
                PathSegment::Line(p0, p1) => points.extend([p0, p1]),
                PathSegment::Quadratic(p0, c, p1) => points.extend([p0, c, p1]),
                PathSegment::Cubic(p0, c0, c1, p1) => points.extend([p0, c0, c1, p1]),
            }
        }
        if points.is_empty() {
            return Rect::new([0.0, 0.0], [0.0, 0.0]);
        }
        Rect::bounding(&points)
    }

    /// `point * scale + offset` applied to every point.
    pub fn transformed(&self, scale: f32, offset: Vec2) -> GlyphPath {
        GlyphPath {
            contours: self
                .contours
                .iter()
                .map(|c| Contour {
                    segments: c
                        .segments
                        .iter()
                        .map(|s| s.map(|p| p * scale + offset))
                        .collect(),
                })
                .collect(),
        }
    }
}

/// Incremental construction of a [`GlyphPath`] in move/line/curve/close commands.
#[derive(Debug, Default)]
pub struct PathBuilder {
    path: GlyphPath,
    current: Contour,
    start: Vec2,
    cursor: Vec2,
}

impl PathBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn move_to(&mut self, p: Vec2) -> &mut Self {
        self.close();
        self.start = p;
        self.cursor = p;
        self
    }

    pub fn line_to(&mut self, p: Vec2) -> &mut Self {
        self.current
            .segments
            .push(PathSegment::Line(self.cursor, p));
        self.cursor = p;
        self
    }

    pub fn quad_to(&mut self, c: Vec2, p: Vec2) -> &mut Self {
        self.current
            .segments
            .push(PathSegment::Quadratic(self.cursor, c, p));
        self.cursor = p;
        self
    }

    pub fn cubic_to(&mut self, c0: Vec2, c1: Vec2, p: Vec2) -> &mut Self {
        self.current
            .segments
            .push(PathSegment::Cubic(self.cursor, c0, c1, p));
        self.cursor = p;
        self
    }

    /// Finish the current contour, adding a closing line when it is open.
    pub fn close(&mut self) -> &mut Self {
        if self.current.segments.is_empty() {
            return self;
        }
        if self.cursor != self.start {
            self.current
                .segments
                .push(PathSegment::Line(self.cursor, self.start));
        }
        self.path.contours.push(std::mem::take(&mut self.current));
        self.cursor = self.start;
        self
    }

    pub fn build(mut self) -> GlyphPath {
        self.close();
        self.path
    }
}

impl GlyphPath {
    /// Closed axis-aligned rectangle, counter-clockwise.
    pub fn rectangle(rect: Rect) -> GlyphPath {
        let [bl, br, tl, tr] = rect.corners();
        let mut builder = PathBuilder::new();
        builder.move_to(bl).line_to(br).line_to(tr).line_to(tl);
        builder.build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_closes_contours() {
        let mut builder = PathBuilder::new();
        builder
            .move_to(Vec2::ZERO)
            .line_to(Vec2::X)
            .line_to(Vec2::ONE)
            .move_to(Vec2::splat(5.0))
            .line_to(Vec2::new(6.0, 5.0))
            .line_to(Vec2::new(6.0, 6.0));
        let path = builder.build();
        assert_eq!(path.contours.len(), 2);
        assert_eq!(path.contours[0].segments.len(), 3);
        assert_eq!(path.contours[0].segments[2].end(), Vec2::ZERO);
    }

    #[test]
    fn test_quadratic_flatten_ends_on_curve() {
        let segment = PathSegment::Quadratic(Vec2::ZERO, Vec2::new(5.0, 10.0), Vec2::new(10.0, 0.0));
        let mut points = Vec::new();
        segment.flatten_into(0.1, &mut points);
        assert!(points.len() > 2);
        assert_eq!(*points.last().unwrap(), Vec2::new(10.0, 0.0));
        // Apex of the parabola is at half the control height.
        let top = points.iter().map(|p| p.y).fold(0.0, f32::max);
        assert!((top - 5.0).abs() < 0.1);
    }

    #[test]
    fn test_quadratic_chords_stay_within_tolerance() {
        let (p0, c, p1) = (Vec2::ZERO, Vec2::new(5.0, 10.0), Vec2::new(10.0, 0.0));
        for tolerance in [0.05, 0.1, 0.25, 1.0] {
            let mut points = vec![p0];
            PathSegment::Quadratic(p0, c, p1).flatten_into(tolerance, &mut points);
            let steps = points.len() - 1;
            for (i, chord) in points.windows(2).enumerate() {
                // The curve point halfway along the chord's parameter range is the farthest.
                let t = (i as f32 + 0.5) / steps as f32;
                let mt = 1.0 - t;
                let on_curve = mt * mt * p0 + 2.0 * mt * t * c + t * t * p1;
                let error = (on_curve - (chord[0] + chord[1]) * 0.5).length();
                assert!(error <= tolerance + 1e-4, "error {error} above {tolerance}");
            }
        }
    }

    #[test]
    fn test_bounding_box_and_transform() {
        let path = GlyphPath::rectangle(Rect::new([0.1, -0.2], [0.6, 0.7]));
        let scaled = path.transformed(10.0, Vec2::new(3.0, 3.0));
        let b = scaled.bounding_box();
        assert!((b.min[0] - 4.0).abs() < 1e-5);
        assert!((b.min[1] - 1.0).abs() < 1e-5);
        assert!((b.max[0] - 9.0).abs() < 1e-5);
        assert!((b.max[1] - 10.0).abs() < 1e-5);
    }

    #[test]
    fn test_empty_path() {
        let path = GlyphPath::new();
        assert!(path.is_empty());
        assert!(path.bounding_box().is_empty());
    }
}
