//! [`GraphicsContext`] over a real OpenGL context via [glow].
//!
//! [glow]: https://docs.rs/glow

use std::{marker::PhantomData, sync::Arc};

use glow::{HasContext, PixelUnpackData};

use crate::context::{
    BufferTarget, BufferUsage, ClearTargets, GraphicsContext, PixelFormat, Sampling, ShaderStage,
};

/// A current OpenGL context.
///
/// Every GL call glow exposes is `unsafe` because it requires a current
/// context on the calling thread. That requirement is taken once, by
/// [`GlowContext::new`], and upheld for the lifetime of the value. The type
/// is neither `Send` nor `Sync`, so it cannot leave the thread the context is
/// current on.
pub struct GlowContext {
    gl: Arc<glow::Context>,
    _single_thread: PhantomData<*const ()>,
}

impl GlowContext {
    /// Wrap a loaded glow context.
    ///
    /// # Safety
    ///
    /// `gl` must be current on the calling thread and must stay current, and
    /// valid, for as long as the returned value (and every resource created
    /// from it) is alive.
    pub unsafe fn new(gl: Arc<glow::Context>) -> Self {
        Self {
            gl,
            _single_thread: PhantomData,
        }
    }

    /// The underlying glow context, for calls this crate does not wrap.
    #[must_use]
    pub fn raw(&self) -> &glow::Context {
        &self.gl
    }
}

/// GL enum values are small enough that the cast to the `i32` parameter
/// type is always lossless.
#[expect(clippy::cast_possible_wrap)]
const fn param(value: u32) -> i32 {
    value as i32
}

/// The `GL_TEXTUREi` enum for a zero-based unit. Units past the enum range
/// map to an invalid enum, which GL rejects with `GL_INVALID_ENUM`.
const fn texture_unit_enum(unit: u32) -> u32 {
    glow::TEXTURE0.saturating_add(unit)
}

impl GraphicsContext for GlowContext {
    type Shader = glow::Shader;
    type Program = glow::Program;
    type Buffer = glow::Buffer;
    type VertexArray = glow::VertexArray;
    type Texture = glow::Texture;
    type UniformLocation = glow::UniformLocation;

    fn create_shader(&self, stage: ShaderStage) -> Result<Self::Shader, String> {
        unsafe { self.gl.create_shader(stage.gl_enum()) }
    }

    fn shader_source(&self, shader: Self::Shader, source: &str) {
        unsafe { self.gl.shader_source(shader, source) }
    }

    fn compile_shader(&self, shader: Self::Shader) {
        unsafe { self.gl.compile_shader(shader) }
    }

    fn shader_compile_status(&self, shader: Self::Shader) -> bool {
        unsafe { self.gl.get_shader_compile_status(shader) }
    }

    fn shader_info_log(&self, shader: Self::Shader) -> String {
        unsafe { self.gl.get_shader_info_log(shader) }
    }

    fn delete_shader(&self, shader: Self::Shader) {
        unsafe { self.gl.delete_shader(shader) }
    }

    fn create_program(&self) -> Result<Self::Program, String> {
        unsafe { self.gl.create_program() }
    }

    fn attach_shader(&self, program: Self::Program, shader: Self::Shader) {
        unsafe { self.gl.attach_shader(program, shader) }
    }

    fn detach_shader(&self, program: Self::Program, shader: Self::Shader) {
        unsafe { self.gl.detach_shader(program, shader) }
    }

    fn link_program(&self, program: Self::Program) {
        unsafe { self.gl.link_program(program) }
    }

    fn program_link_status(&self, program: Self::Program) -> bool {
        unsafe { self.gl.get_program_link_status(program) }
    }

    fn program_info_log(&self, program: Self::Program) -> String {
        unsafe { self.gl.get_program_info_log(program) }
    }

    fn use_program(&self, program: Option<Self::Program>) {
        unsafe { self.gl.use_program(program) }
    }

    fn delete_program(&self, program: Self::Program) {
        unsafe { self.gl.delete_program(program) }
    }

    fn uniform_location(
        &self,
        program: Self::Program,
        name: &str,
    ) -> Option<Self::UniformLocation> {
        unsafe { self.gl.get_uniform_location(program, name) }
    }

    fn uniform_matrix4(&self, location: &Self::UniformLocation, columns: &[f32; 16]) {
        unsafe {
            self.gl
                .uniform_matrix_4_f32_slice(Some(location), false, columns);
        }
    }

    fn uniform_i32(&self, location: &Self::UniformLocation, value: i32) {
        unsafe { self.gl.uniform_1_i32(Some(location), value) }
    }

    fn uniform_f32(&self, location: &Self::UniformLocation, value: f32) {
        unsafe { self.gl.uniform_1_f32(Some(location), value) }
    }

    fn create_buffer(&self) -> Result<Self::Buffer, String> {
        unsafe { self.gl.create_buffer() }
    }

    fn bind_buffer(&self, target: BufferTarget, buffer: Option<Self::Buffer>) {
        unsafe { self.gl.bind_buffer(target.gl_enum(), buffer) }
    }

    fn buffer_data(&self, target: BufferTarget, data: &[u8], usage: BufferUsage) {
        unsafe {
            self.gl
                .buffer_data_u8_slice(target.gl_enum(), data, usage.gl_enum());
        }
    }

    fn read_buffer(&self, target: BufferTarget, offset: i32, dst: &mut [u8]) {
        unsafe { self.gl.get_buffer_sub_data(target.gl_enum(), offset, dst) }
    }

    fn delete_buffer(&self, buffer: Self::Buffer) {
        unsafe { self.gl.delete_buffer(buffer) }
    }

    fn create_vertex_array(&self) -> Result<Self::VertexArray, String> {
        unsafe { self.gl.create_vertex_array() }
    }

    fn bind_vertex_array(&self, vertex_array: Option<Self::VertexArray>) {
        unsafe { self.gl.bind_vertex_array(vertex_array) }
    }

    fn enable_vertex_attrib_array(&self, slot: u32) {
        unsafe { self.gl.enable_vertex_attrib_array(slot) }
    }

    fn vertex_attrib_pointer_f32(&self, slot: u32, components: i32, stride: i32, offset: i32) {
        unsafe {
            self.gl
                .vertex_attrib_pointer_f32(slot, components, glow::FLOAT, false, stride, offset);
        }
    }

    fn delete_vertex_array(&self, vertex_array: Self::VertexArray) {
        unsafe { self.gl.delete_vertex_array(vertex_array) }
    }

    fn create_texture(&self) -> Result<Self::Texture, String> {
        unsafe { self.gl.create_texture() }
    }

    fn active_texture(&self, unit: u32) {
        unsafe { self.gl.active_texture(texture_unit_enum(unit)) }
    }

    fn bind_texture(&self, texture: Option<Self::Texture>) {
        unsafe { self.gl.bind_texture(glow::TEXTURE_2D, texture) }
    }

    fn tex_image_2d(&self, width: i32, height: i32, format: PixelFormat, pixels: &[u8]) {
        unsafe {
            // Rows of RGB and single-channel images are not 4-byte aligned in
            // general; the default unpack alignment would skew them.
            self.gl.pixel_store_i32(glow::UNPACK_ALIGNMENT, 1);
            self.gl.tex_image_2d(
                glow::TEXTURE_2D,
                0,
                param(format.gl_internal_format()),
                width,
                height,
                0,
                format.gl_format(),
                glow::UNSIGNED_BYTE,
                PixelUnpackData::Slice(Some(pixels)),
            );
        }
    }

    fn set_sampling(&self, sampling: &Sampling) {
        let gl = &self.gl;
        unsafe {
            let wrap = param(sampling.wrap.gl_enum());
            gl.tex_parameter_i32(glow::TEXTURE_2D, glow::TEXTURE_WRAP_S, wrap);
            gl.tex_parameter_i32(glow::TEXTURE_2D, glow::TEXTURE_WRAP_T, wrap);
            gl.tex_parameter_i32(
                glow::TEXTURE_2D,
                glow::TEXTURE_MIN_FILTER,
                param(sampling.min_filter.gl_enum()),
            );
            gl.tex_parameter_i32(
                glow::TEXTURE_2D,
                glow::TEXTURE_MAG_FILTER,
                param(sampling.mag_filter.gl_enum()),
            );
        }
    }

    fn generate_mipmap(&self) {
        unsafe { self.gl.generate_mipmap(glow::TEXTURE_2D) }
    }

    fn delete_texture(&self, texture: Self::Texture) {
        unsafe { self.gl.delete_texture(texture) }
    }

    fn viewport(&self, x: i32, y: i32, width: i32, height: i32) {
        unsafe { self.gl.viewport(x, y, width, height) }
    }

    fn clear_color(&self, [r, g, b, a]: [f32; 4]) {
        unsafe { self.gl.clear_color(r, g, b, a) }
    }

    fn clear(&self, targets: ClearTargets) {
        unsafe { self.gl.clear(targets.mask()) }
    }

    fn set_depth_test(&self, enabled: bool) {
        unsafe {
            if enabled {
                self.gl.enable(glow::DEPTH_TEST);
            } else {
                self.gl.disable(glow::DEPTH_TEST);
            }
        }
    }

    fn draw_elements(&self, index_count: i32) {
        unsafe {
            self.gl
                .draw_elements(glow::TRIANGLES, index_count, glow::UNSIGNED_INT, 0);
        }
    }

    fn get_error(&self) -> Option<u32> {
        match unsafe { self.gl.get_error() } {
            glow::NO_ERROR => None,
            code => Some(code),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn texture_units_map_onto_texture0() {
        assert_eq!(texture_unit_enum(0), glow::TEXTURE0);
        assert_eq!(texture_unit_enum(3), glow::TEXTURE3);
    }

    #[test]
    fn out_of_range_texture_unit_does_not_overflow() {
        assert_eq!(texture_unit_enum(u32::MAX), u32::MAX);
    }
}
