use crate::constants::{MAX_QUADS, QUAD_INDEX_COUNT};

/// Indices drawing every quad of a full vertex span as two triangles.
///
/// Quad `i` uses vertices `4i..4i+4` in bottom-left, bottom-right, top-left, top-right order
/// and is drawn as the triangles BL-BR-TL and TL-BR-TR.
pub fn quad_indices() -> Vec<u16> {
    let mut indices = Vec::with_capacity(QUAD_INDEX_COUNT);
    for quad in 0..MAX_QUADS {
        let base = (quad * 4) as u16;
        indices.extend_from_slice(&[base, base + 1, base + 2, base + 2, base + 1, base + 3]);
    }
    indices
}

/// The index buffer shared by all pipelines, filled at creation.
pub fn create_quad_index_buffer(device: &wgpu::Device) -> wgpu::Buffer {
    let indices = quad_indices();
    let buffer = device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("Tessera Quad Index Buffer"),
        size: (indices.len() * std::mem::size_of::<u16>()) as u64,
        usage: wgpu::BufferUsages::INDEX,
        mapped_at_creation: true,
    });
    buffer
        .slice(..)
        .get_mapped_range_mut()
        .copy_from_slice(bytemuck::cast_slice(&indices));
    buffer.unmap();
    buffer
}
