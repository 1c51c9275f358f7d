use crate::constants::MAX_VERTICES;

/// Bounded, append-only list of vertices for one pipeline and one frame.
///
/// The renderer copies the span into the pipeline's vertex buffer after all widgets have
/// drawn and resets it for the next frame. A span never grows past [`MAX_VERTICES`], so
/// every vertex is addressable by a 16-bit index.
#[derive(Debug)]
pub struct VertexSpan<T> {
    label: &'static str,
    vertices: Vec<T>,
}

impl<T: Copy> VertexSpan<T> {
    pub fn new(label: &'static str) -> Self {
        Self {
            label,
            vertices: Vec::with_capacity(MAX_VERTICES),
        }
    }

    /// # Panics
    ///
    /// Panics when the span already holds [`MAX_VERTICES`] vertices.
    #[inline]
    pub fn push(&mut self, vertex: T) {
        if self.vertices.len() >= MAX_VERTICES {
            panic!(
                "too many {} vertices in one frame, the limit is {MAX_VERTICES}",
                self.label
            );
        }
        self.vertices.push(vertex);
    }

    /// Append the corners of one quad in bottom-left, bottom-right, top-left, top-right order.
    pub fn push_quad(&mut self, corners: [T; 4]) {
        for vertex in corners {
            self.push(vertex);
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.vertices.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }

    pub fn remaining(&self) -> usize {
        MAX_VERTICES - self.vertices.len()
    }

    pub fn as_slice(&self) -> &[T] {
        &self.vertices
    }

    /// Number of indices to draw all quads in the span.
    pub fn index_count(&self) -> u32 {
        (self.vertices.len() * 3 / 2) as u32
    }

    pub fn clear(&mut self) {
        self.vertices.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_index_count() {
        let mut span = VertexSpan::new("test");
        span.push_quad([0u32, 1, 2, 3]);
        span.push_quad([4u32, 5, 6, 7]);
        assert_eq!(span.len(), 8);
        assert_eq!(span.index_count(), 12);
        span.clear();
        assert!(span.is_empty());
        assert_eq!(span.remaining(), MAX_VERTICES);
    }

    #[test]
    #[should_panic(expected = "too many test vertices")]
    fn test_overflow_is_fatal() {
        let mut span = VertexSpan::new("test");
        for _ in 0..=MAX_VERTICES {
            span.push(0u8);
        }
    }
}
