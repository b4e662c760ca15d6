//! Vertex array, vertex buffer and element buffer wrappers.
//!
//! Attribute pointers are recorded against whichever vertex array and
//! array buffer are bound at the time of the call. The wrappers do not
//! check that order; [`Mesh::new`] performs the whole sequence correctly.

use bytemuck::Pod;

use crate::{
    binding::{Bound, Unbind},
    context::{BufferTarget, BufferUsage, GraphicsContext},
    error::{gl_int, Result},
};

/// How to read one float attribute out of an interleaved vertex stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VertexAttribute {
    /// Attribute slot (`layout (location = N)` in the shader).
    pub slot: u32,
    /// Number of `f32` components (1 to 4).
    pub components: usize,
    /// Bytes between the starts of consecutive vertices. 0 means tightly
    /// packed.
    pub stride: usize,
    /// Byte offset of the first component within a vertex.
    pub offset: usize,
}

impl VertexAttribute {
    /// Describe an attribute.
    #[must_use]
    pub const fn new(slot: u32, components: usize, stride: usize, offset: usize) -> Self {
        Self {
            slot,
            components,
            stride,
            offset,
        }
    }

    /// Size of one attribute value in bytes.
    #[must_use]
    pub const fn size(&self) -> usize {
        self.components * std::mem::size_of::<f32>()
    }

    /// Stride with the tightly-packed default resolved.
    #[must_use]
    pub const fn effective_stride(&self) -> usize {
        if self.stride == 0 {
            self.size()
        } else {
            self.stride
        }
    }

    /// Pull this attribute's floats out of raw vertex bytes, vertex by
    /// vertex.
    ///
    /// An attribute with no components, or one whose offset lies past the
    /// end of `bytes`, yields nothing.
    #[must_use]
    pub fn extract(&self, bytes: &[u8]) -> Vec<f32> {
        let size = self.size();
        if size == 0 {
            return Vec::new();
        }
        let stride = self.effective_stride();
        let mut out = Vec::new();
        let mut start = Some(self.offset);
        while let Some(chunk) = start
            .and_then(|start| Some(start..start.checked_add(size)?))
            .and_then(|range| bytes.get(range))
        {
            out.extend(bytemuck::pod_collect_to_vec::<u8, f32>(chunk));
            start = start.and_then(|start| start.checked_add(stride));
        }
        out
    }
}

/// GPU storage for vertex data (`GL_ARRAY_BUFFER`).
pub struct VertexBuffer<'gl, C: GraphicsContext> {
    gl: &'gl C,
    handle: C::Buffer,
    len: usize,
}

impl<'gl, C: GraphicsContext> VertexBuffer<'gl, C> {
    /// Create a buffer and upload `data` with static usage.
    ///
    /// The buffer is left bound to `GL_ARRAY_BUFFER`, ready for
    /// [`VertexArray::attrib_pointer`].
    ///
    /// # Errors
    ///
    /// [`Error::Allocation`](crate::Error::Allocation) if the driver refuses
    /// to create the buffer.
    pub fn new<T: Pod>(gl: &'gl C, data: &[T]) -> Result<Self> {
        let handle = gl.create_buffer()?;
        let mut buffer = Self { gl, handle, len: 0 };
        buffer.write(data, BufferUsage::StaticDraw);
        log::debug!("created vertex buffer {handle:?} ({} bytes)", buffer.len);
        Ok(buffer)
    }

    /// Replace the buffer contents. Leaves the buffer bound.
    pub fn write<T: Pod>(&mut self, data: &[T], usage: BufferUsage) {
        let bytes: &[u8] = bytemuck::cast_slice(data);
        self.bind();
        self.gl.buffer_data(BufferTarget::Array, bytes, usage);
        self.len = bytes.len();
    }

    /// Size of the contents in bytes.
    #[must_use]
    pub fn len_bytes(&self) -> usize {
        self.len
    }

    /// Read the whole buffer back as floats.
    ///
    /// Clears the `GL_ARRAY_BUFFER` binding on return.
    #[must_use]
    pub fn read_back(&self) -> Vec<f32> {
        bytemuck::pod_collect_to_vec(&self.read_bytes())
    }

    /// Read one attribute back through the same stride and offset it is
    /// described with.
    ///
    /// Clears the `GL_ARRAY_BUFFER` binding on return.
    #[must_use]
    pub fn read_attribute(&self, attribute: &VertexAttribute) -> Vec<f32> {
        attribute.extract(&self.read_bytes())
    }

    fn read_bytes(&self) -> Vec<u8> {
        let mut bytes = vec![0u8; self.len];
        let _bound = self.bound();
        self.gl.read_buffer(BufferTarget::Array, 0, &mut bytes);
        bytes
    }

    /// The GL buffer name.
    #[must_use]
    pub fn handle(&self) -> C::Buffer {
        self.handle
    }

    /// Bind to `GL_ARRAY_BUFFER`.
    pub fn bind(&self) {
        self.gl.bind_buffer(BufferTarget::Array, Some(self.handle));
    }

    /// Bind for the lifetime of the returned guard.
    pub fn bound(&self) -> Bound<'_, Self> {
        self.bind();
        Bound::new(self)
    }

    /// Release the buffer. Equivalent to dropping it.
    pub fn delete(self) {
        drop(self);
    }
}

impl<C: GraphicsContext> Unbind for VertexBuffer<'_, C> {
    fn unbind(&self) {
        self.gl.bind_buffer(BufferTarget::Array, None);
    }
}

impl<C: GraphicsContext> Drop for VertexBuffer<'_, C> {
    fn drop(&mut self) {
        self.gl.delete_buffer(self.handle);
    }
}

/// GPU storage for `u32` triangle indices (`GL_ELEMENT_ARRAY_BUFFER`).
///
/// The element buffer binding is part of vertex array state: binding or
/// unbinding while a vertex array is bound changes that vertex array.
pub struct ElementBuffer<'gl, C: GraphicsContext> {
    gl: &'gl C,
    handle: C::Buffer,
    count: usize,
}

impl<'gl, C: GraphicsContext> ElementBuffer<'gl, C> {
    /// Create a buffer and upload `indices`. Leaves the buffer bound, which
    /// attaches it to the bound vertex array, if any.
    ///
    /// # Errors
    ///
    /// [`Error::Allocation`](crate::Error::Allocation) if the driver refuses
    /// to create the buffer.
    pub fn new(gl: &'gl C, indices: &[u32]) -> Result<Self> {
        let handle = gl.create_buffer()?;
        let buffer = Self {
            gl,
            handle,
            count: indices.len(),
        };
        buffer.bind();
        gl.buffer_data(
            BufferTarget::ElementArray,
            bytemuck::cast_slice(indices),
            BufferUsage::StaticDraw,
        );
        log::debug!("created element buffer {handle:?} ({} indices)", indices.len());
        Ok(buffer)
    }

    /// Number of indices stored.
    #[must_use]
    pub fn count(&self) -> usize {
        self.count
    }

    /// The GL buffer name.
    #[must_use]
    pub fn handle(&self) -> C::Buffer {
        self.handle
    }

    /// Bind to `GL_ELEMENT_ARRAY_BUFFER`.
    pub fn bind(&self) {
        self.gl
            .bind_buffer(BufferTarget::ElementArray, Some(self.handle));
    }

    /// Bind for the lifetime of the returned guard.
    pub fn bound(&self) -> Bound<'_, Self> {
        self.bind();
        Bound::new(self)
    }

    /// Release the buffer. Equivalent to dropping it.
    pub fn delete(self) {
        drop(self);
    }
}

impl<C: GraphicsContext> Unbind for ElementBuffer<'_, C> {
    /// Unbind the vertex array first, or this detaches the indices from it.
    fn unbind(&self) {
        self.gl.bind_buffer(BufferTarget::ElementArray, None);
    }
}

impl<C: GraphicsContext> Drop for ElementBuffer<'_, C> {
    fn drop(&mut self) {
        self.gl.delete_buffer(self.handle);
    }
}

/// Attribute layout plus element buffer binding (a vertex array object).
pub struct VertexArray<'gl, C: GraphicsContext> {
    gl: &'gl C,
    handle: C::VertexArray,
}

impl<'gl, C: GraphicsContext> VertexArray<'gl, C> {
    /// Create an empty vertex array. It is not bound.
    ///
    /// # Errors
    ///
    /// [`Error::Allocation`](crate::Error::Allocation) if the driver refuses
    /// to create it.
    pub fn new(gl: &'gl C) -> Result<Self> {
        let handle = gl.create_vertex_array()?;
        log::debug!("created vertex array {handle:?}");
        Ok(Self { gl, handle })
    }

    /// Enable `slot` and describe it as `components` floats, `stride` bytes
    /// apart, starting `offset` bytes into the bound array buffer.
    ///
    /// Applies to the *bound* vertex array, sourcing the *bound* array
    /// buffer. Bind both first.
    ///
    /// # Errors
    ///
    /// [`Error::TooLarge`](crate::Error::TooLarge) if a size does not fit
    /// GL's integer range.
    pub fn attrib_pointer(
        &self,
        slot: u32,
        components: usize,
        stride: usize,
        offset: usize,
    ) -> Result<()> {
        let components = gl_int("component count", components)?;
        let stride = gl_int("vertex stride", stride)?;
        let offset = gl_int("attribute offset", offset)?;
        self.gl.enable_vertex_attrib_array(slot);
        self.gl
            .vertex_attrib_pointer_f32(slot, components, stride, offset);
        Ok(())
    }

    /// [`attrib_pointer`](Self::attrib_pointer) for every attribute in
    /// `layout`.
    ///
    /// # Errors
    ///
    /// See [`attrib_pointer`](Self::attrib_pointer).
    pub fn set_layout(&self, layout: &[VertexAttribute]) -> Result<()> {
        for attribute in layout {
            self.attrib_pointer(
                attribute.slot,
                attribute.components,
                attribute.stride,
                attribute.offset,
            )?;
        }
        Ok(())
    }

    /// The GL vertex array name.
    #[must_use]
    pub fn handle(&self) -> C::VertexArray {
        self.handle
    }

    /// Make this the active vertex array.
    pub fn bind(&self) {
        self.gl.bind_vertex_array(Some(self.handle));
    }

    /// Bind for the lifetime of the returned guard.
    pub fn bound(&self) -> Bound<'_, Self> {
        self.bind();
        Bound::new(self)
    }

    /// Release the vertex array. Equivalent to dropping it.
    pub fn delete(self) {
        drop(self);
    }
}

impl<C: GraphicsContext> Unbind for VertexArray<'_, C> {
    fn unbind(&self) {
        self.gl.bind_vertex_array(None);
    }
}

impl<C: GraphicsContext> Drop for VertexArray<'_, C> {
    fn drop(&mut self) {
        self.gl.delete_vertex_array(self.handle);
    }
}

/// A vertex array with its vertex and element buffers.
pub struct Mesh<'gl, C: GraphicsContext> {
    gl: &'gl C,
    // Declared first so the vertex array is deleted before the buffers it
    // references.
    vertex_array: VertexArray<'gl, C>,
    vertex_buffer: VertexBuffer<'gl, C>,
    element_buffer: ElementBuffer<'gl, C>,
}

impl<'gl, C: GraphicsContext> Mesh<'gl, C> {
    /// Upload `vertices` and `indices` and record `layout`.
    ///
    /// Runs the setup in the order GL needs: bind the vertex array, upload
    /// vertices, upload indices (attaching them to the vertex array), set
    /// attribute pointers, then unbind the vertex buffer, the vertex array
    /// and finally the element buffer. Every binding is cleared on return,
    /// including on error.
    ///
    /// # Errors
    ///
    /// [`Error::Allocation`](crate::Error::Allocation) or
    /// [`Error::TooLarge`](crate::Error::TooLarge).
    pub fn new<T: Pod>(
        gl: &'gl C,
        vertices: &[T],
        indices: &[u32],
        layout: &[VertexAttribute],
    ) -> Result<Self> {
        let vertex_array = VertexArray::new(gl)?;
        let (vertex_buffer, element_buffer) = {
            let _vao = vertex_array.bound();
            let vertex_buffer = VertexBuffer::new(gl, vertices)?;
            let element_buffer = ElementBuffer::new(gl, indices)?;
            {
                let _vbo = vertex_buffer.bound();
                vertex_array.set_layout(layout)?;
            }
            (vertex_buffer, element_buffer)
        };
        element_buffer.unbind();

        Ok(Self {
            gl,
            vertex_array,
            vertex_buffer,
            element_buffer,
        })
    }

    /// Number of indices drawn per call.
    #[must_use]
    pub fn index_count(&self) -> usize {
        self.element_buffer.count()
    }

    /// The vertex array.
    #[must_use]
    pub fn vertex_array(&self) -> &VertexArray<'gl, C> {
        &self.vertex_array
    }

    /// The vertex buffer.
    #[must_use]
    pub fn vertex_buffer(&self) -> &VertexBuffer<'gl, C> {
        &self.vertex_buffer
    }

    /// The element buffer.
    #[must_use]
    pub fn element_buffer(&self) -> &ElementBuffer<'gl, C> {
        &self.element_buffer
    }

    /// Issue the indexed draw call. The mesh's vertex array and a program
    /// must already be bound. Returns the number of indices drawn.
    ///
    /// # Errors
    ///
    /// [`Error::TooLarge`](crate::Error::TooLarge) if the index count does
    /// not fit GL's integer range.
    pub fn draw(&self) -> Result<i32> {
        let count = gl_int("index count", self.index_count())?;
        self.gl.draw_elements(count);
        Ok(count)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use proptest::prelude::*;

    use super::*;
    use crate::{
        headless::HeadlessContext,
        types::{Vertex, PYRAMID_INDICES, PYRAMID_VERTICES},
    };

    fn bits(values: &[f32]) -> Vec<u32> {
        values.iter().map(|value| value.to_bits()).collect()
    }

    #[test]
    fn mesh_setup_records_layout_and_leaves_nothing_bound() {
        let gl = HeadlessContext::new();
        let fresh = gl.bindings();
        let mesh = Mesh::new(&gl, &PYRAMID_VERTICES, &PYRAMID_INDICES, &Vertex::LAYOUT).unwrap();

        assert_eq!(gl.get_error(), None);
        assert_eq!(gl.bindings(), fresh);
        assert_eq!(mesh.index_count(), 18);

        let vao = mesh.vertex_array().handle();
        assert_eq!(
            gl.element_buffer_of(vao),
            Some(mesh.element_buffer().handle())
        );
        for attribute in Vertex::LAYOUT {
            let state = gl.attribute(vao, attribute.slot).unwrap();
            assert!(state.enabled);
            assert_eq!(state.buffer, mesh.vertex_buffer().handle());
            assert_eq!(state.stride, 32);
            assert_eq!(usize::try_from(state.offset).unwrap(), attribute.offset);
        }
    }

    #[test]
    fn attribute_pointer_without_a_buffer_is_not_checked_by_the_wrapper() {
        let gl = HeadlessContext::new();
        let vao = VertexArray::new(&gl).unwrap();
        let _vao = vao.bound();
        assert!(vao.attrib_pointer(0, 3, 12, 0).is_ok());
        assert_eq!(gl.get_error(), Some(glow::INVALID_OPERATION));
    }

    #[test]
    fn read_attribute_uses_stride_and_offset() {
        let gl = HeadlessContext::new();
        let buffer = VertexBuffer::new(&gl, &PYRAMID_VERTICES).unwrap();

        let uvs = buffer.read_attribute(&Vertex::LAYOUT[2]);
        let expected: Vec<f32> = PYRAMID_VERTICES.iter().flat_map(|v| v.uv).collect();
        assert_eq!(bits(&uvs), bits(&expected));
        assert_eq!(gl.bindings().array_buffer, None);
    }

    #[test]
    fn write_replaces_contents() {
        let gl = HeadlessContext::new();
        let mut buffer = VertexBuffer::new(&gl, &[1.0f32, 2.0]).unwrap();
        buffer.write(&[3.0f32, 4.0, 5.0], BufferUsage::DynamicDraw);
        assert_eq!(buffer.len_bytes(), 12);
        assert_eq!(buffer.read_back(), vec![3.0, 4.0, 5.0]);
    }

    #[test]
    fn unbinding_twice_matches_unbinding_once() {
        let gl = HeadlessContext::new();
        let mesh = Mesh::new(&gl, &PYRAMID_VERTICES, &PYRAMID_INDICES, &Vertex::LAYOUT).unwrap();
        mesh.vertex_array().bind();
        mesh.vertex_buffer().bind();

        mesh.vertex_buffer().unbind();
        mesh.vertex_array().unbind();
        let once = gl.bindings();
        mesh.vertex_buffer().unbind();
        mesh.vertex_array().unbind();
        mesh.element_buffer().unbind();
        mesh.element_buffer().unbind();
        assert_eq!(gl.bindings(), once);
        assert_eq!(
            gl.element_buffer_of(mesh.vertex_array().handle()),
            Some(mesh.element_buffer().handle())
        );
    }

    #[test]
    fn dropping_a_mesh_releases_every_object_once() {
        let gl = HeadlessContext::new();
        let mesh = Mesh::new(&gl, &PYRAMID_VERTICES, &PYRAMID_INDICES, &Vertex::LAYOUT).unwrap();
        assert_eq!(gl.live_objects(), 3);
        drop(mesh);
        assert_eq!(gl.live_objects(), 0);
        assert_eq!(gl.stray_deletes(), 0);
    }

    #[test]
    fn extract_stops_on_empty_attributes() {
        let gl = HeadlessContext::new();
        let buffer = VertexBuffer::new(&gl, &[1.0f32, 2.0, 3.0]).unwrap();
        assert!(buffer
            .read_attribute(&VertexAttribute::new(0, 0, 0, 0))
            .is_empty());
        assert!(VertexAttribute::new(0, 0, 4, 4).extract(&[0; 16]).is_empty());
    }

    #[test]
    fn extract_with_an_offset_near_usize_max_yields_nothing() {
        let bytes = [0u8; 8];
        assert!(VertexAttribute::new(0, 1, 4, usize::MAX).extract(&bytes).is_empty());
        assert_eq!(
            VertexAttribute::new(0, 1, usize::MAX, 0).extract(&bytes),
            vec![0.0]
        );
    }

    #[test]
    fn extract_handles_tightly_packed_attributes() {
        let attribute = VertexAttribute::new(0, 2, 0, 4);
        let bytes: &[u8] = bytemuck::cast_slice(&[9.0f32, 1.0, 2.0, 3.0, 4.0]);
        assert_eq!(attribute.extract(bytes), vec![1.0, 2.0, 3.0, 4.0]);
    }

    proptest! {
        #[test]
        fn interleaved_vertices_round_trip_bit_for_bit(
            raw in prop::collection::vec(prop::array::uniform8(any::<f32>()), 1..48)
        ) {
            let vertices: Vec<Vertex> = raw.iter().map(|floats| bytemuck::cast(*floats)).collect();
            let gl = HeadlessContext::new();
            let buffer = VertexBuffer::new(&gl, &vertices).unwrap();

            let positions = buffer.read_attribute(&Vertex::LAYOUT[0]);
            let colors = buffer.read_attribute(&Vertex::LAYOUT[1]);
            let uvs = buffer.read_attribute(&Vertex::LAYOUT[2]);

            let mut rebuilt = Vec::new();
            for i in 0..vertices.len() {
                rebuilt.extend_from_slice(&positions[i * 3..i * 3 + 3]);
                rebuilt.extend_from_slice(&colors[i * 3..i * 3 + 3]);
                rebuilt.extend_from_slice(&uvs[i * 2..i * 2 + 2]);
            }
            let original: Vec<f32> = raw.concat();
            prop_assert_eq!(bits(&rebuilt), bits(&original));
        }
    }
}
