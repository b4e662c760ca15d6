//! The GL surface every wrapper in this crate is written against.
//!
//! [`GraphicsContext`] is deliberately narrow: it exposes only the entry
//! points the wrappers need, with GL enums replaced by small Rust enums.
//! Two implementations exist: [`GlowContext`](crate::gl::GlowContext) for a
//! real OpenGL context, and [`HeadlessContext`](crate::headless::HeadlessContext)
//! for running without a GPU.
//!
//! All binding state behind these calls (active program, vertex array,
//! buffer targets, texture unit) is global to the context. Nothing here
//! enforces call order; see [`binding`](crate::binding) for scoped helpers.

use std::fmt;

/// A shader pipeline stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShaderStage {
    /// Per-vertex stage.
    Vertex,
    /// Per-fragment stage.
    Fragment,
}

impl ShaderStage {
    /// The matching `GL_*_SHADER` constant.
    #[must_use]
    pub fn gl_enum(self) -> u32 {
        match self {
            Self::Vertex => glow::VERTEX_SHADER,
            Self::Fragment => glow::FRAGMENT_SHADER,
        }
    }
}

impl fmt::Display for ShaderStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Vertex => "vertex",
            Self::Fragment => "fragment",
        })
    }
}

/// A buffer binding point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BufferTarget {
    /// `GL_ARRAY_BUFFER`: vertex attribute data.
    Array,
    /// `GL_ELEMENT_ARRAY_BUFFER`: index data. Part of vertex-array state.
    ElementArray,
}

impl BufferTarget {
    /// The matching GL constant.
    #[must_use]
    pub fn gl_enum(self) -> u32 {
        match self {
            Self::Array => glow::ARRAY_BUFFER,
            Self::ElementArray => glow::ELEMENT_ARRAY_BUFFER,
        }
    }
}

/// Usage hint passed with buffer uploads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BufferUsage {
    /// Uploaded once, drawn many times.
    #[default]
    StaticDraw,
    /// Re-uploaded occasionally.
    DynamicDraw,
    /// Re-uploaded every frame.
    StreamDraw,
}

impl BufferUsage {
    /// The matching GL constant.
    #[must_use]
    pub fn gl_enum(self) -> u32 {
        match self {
            Self::StaticDraw => glow::STATIC_DRAW,
            Self::DynamicDraw => glow::DYNAMIC_DRAW,
            Self::StreamDraw => glow::STREAM_DRAW,
        }
    }
}

/// Which framebuffer targets a clear touches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClearTargets {
    /// Clear the color buffer.
    pub color: bool,
    /// Clear the depth buffer.
    pub depth: bool,
}

impl ClearTargets {
    /// Color only.
    pub const COLOR: Self = Self {
        color: true,
        depth: false,
    };

    /// Color and depth.
    pub const COLOR_AND_DEPTH: Self = Self {
        color: true,
        depth: true,
    };

    /// The `glClear` bit mask.
    #[must_use]
    pub fn mask(self) -> u32 {
        let mut mask = 0;
        if self.color {
            mask |= glow::COLOR_BUFFER_BIT;
        }
        if self.depth {
            mask |= glow::DEPTH_BUFFER_BIT;
        }
        mask
    }
}

/// Pixel layout of texture data, both on the CPU side and in GPU storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PixelFormat {
    /// One 8-bit channel.
    Red,
    /// Three 8-bit channels.
    Rgb,
    /// Four 8-bit channels.
    Rgba,
}

impl PixelFormat {
    /// Bytes per pixel.
    #[must_use]
    pub fn channels(self) -> usize {
        match self {
            Self::Red => 1,
            Self::Rgb => 3,
            Self::Rgba => 4,
        }
    }

    /// The client-side format constant (`GL_RED`, `GL_RGB`, `GL_RGBA`).
    #[must_use]
    pub fn gl_format(self) -> u32 {
        match self {
            Self::Red => glow::RED,
            Self::Rgb => glow::RGB,
            Self::Rgba => glow::RGBA,
        }
    }

    /// The sized internal format used for storage.
    #[must_use]
    pub fn gl_internal_format(self) -> u32 {
        match self {
            Self::Red => glow::R8,
            Self::Rgb => glow::RGB8,
            Self::Rgba => glow::RGBA8,
        }
    }
}

/// Texture coordinate wrapping mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Wrap {
    /// Tile the texture.
    #[default]
    Repeat,
    /// Tile, mirroring every other repetition.
    MirroredRepeat,
    /// Clamp to the edge texels.
    ClampToEdge,
}

impl Wrap {
    /// The matching GL constant.
    #[must_use]
    pub fn gl_enum(self) -> u32 {
        match self {
            Self::Repeat => glow::REPEAT,
            Self::MirroredRepeat => glow::MIRRORED_REPEAT,
            Self::ClampToEdge => glow::CLAMP_TO_EDGE,
        }
    }
}

/// Texture filtering mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Filter {
    /// Nearest texel.
    Nearest,
    /// Bilinear.
    Linear,
    /// Trilinear, blending between mip levels. Minification only.
    LinearMipmapLinear,
}

impl Filter {
    /// The matching GL constant.
    #[must_use]
    pub fn gl_enum(self) -> u32 {
        match self {
            Self::Nearest => glow::NEAREST,
            Self::Linear => glow::LINEAR,
            Self::LinearMipmapLinear => glow::LINEAR_MIPMAP_LINEAR,
        }
    }
}

/// Sampler state applied to a texture at upload time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Sampling {
    /// Wrapping on both S and T.
    pub wrap: Wrap,
    /// Minification filter.
    pub min_filter: Filter,
    /// Magnification filter.
    pub mag_filter: Filter,
}

impl Default for Sampling {
    fn default() -> Self {
        Self {
            wrap: Wrap::Repeat,
            min_filter: Filter::LinearMipmapLinear,
            mag_filter: Filter::Linear,
        }
    }
}

/// The narrow set of GL entry points used by the wrappers.
///
/// Every method takes `&self`: GL state lives behind the context, not in
/// Rust values. Implementations are single-threaded.
///
/// Methods that create objects return `Err` with the driver's message when
/// creation fails. Everything else reports failure the way GL does, through
/// the error flag read by [`get_error`](Self::get_error).
pub trait GraphicsContext {
    /// Shader stage object name.
    type Shader: Copy + fmt::Debug;
    /// Program object name.
    type Program: Copy + fmt::Debug;
    /// Buffer object name.
    type Buffer: Copy + fmt::Debug;
    /// Vertex array object name.
    type VertexArray: Copy + fmt::Debug;
    /// Texture object name.
    type Texture: Copy + fmt::Debug;
    /// Resolved uniform location.
    type UniformLocation: fmt::Debug;

    /// Create an empty shader object for `stage`.
    fn create_shader(&self, stage: ShaderStage) -> Result<Self::Shader, String>;
    /// Replace the shader's source text.
    fn shader_source(&self, shader: Self::Shader, source: &str);
    /// Compile the shader's current source.
    fn compile_shader(&self, shader: Self::Shader);
    /// Whether the last compile succeeded.
    fn shader_compile_status(&self, shader: Self::Shader) -> bool;
    /// The compiler's diagnostic text.
    fn shader_info_log(&self, shader: Self::Shader) -> String;
    /// Release a shader object.
    fn delete_shader(&self, shader: Self::Shader);

    /// Create an empty program object.
    fn create_program(&self) -> Result<Self::Program, String>;
    /// Attach a shader stage to a program.
    fn attach_shader(&self, program: Self::Program, shader: Self::Shader);
    /// Detach a shader stage from a program.
    fn detach_shader(&self, program: Self::Program, shader: Self::Shader);
    /// Link the attached stages.
    fn link_program(&self, program: Self::Program);
    /// Whether the last link succeeded.
    fn program_link_status(&self, program: Self::Program) -> bool;
    /// The linker's diagnostic text.
    fn program_info_log(&self, program: Self::Program) -> String;
    /// Set (or clear, with `None`) the active program.
    fn use_program(&self, program: Option<Self::Program>);
    /// Release a program object.
    fn delete_program(&self, program: Self::Program);

    /// Look up an active uniform by exact, case-sensitive name.
    fn uniform_location(&self, program: Self::Program, name: &str)
        -> Option<Self::UniformLocation>;
    /// Write a column-major 4x4 matrix into the active program.
    fn uniform_matrix4(&self, location: &Self::UniformLocation, columns: &[f32; 16]);
    /// Write an `int`, `bool` or sampler unit into the active program.
    fn uniform_i32(&self, location: &Self::UniformLocation, value: i32);
    /// Write a `float` into the active program.
    fn uniform_f32(&self, location: &Self::UniformLocation, value: f32);

    /// Create an empty buffer object.
    fn create_buffer(&self) -> Result<Self::Buffer, String>;
    /// Bind (or clear) the buffer for `target`.
    fn bind_buffer(&self, target: BufferTarget, buffer: Option<Self::Buffer>);
    /// Replace the contents of the buffer bound to `target`.
    fn buffer_data(&self, target: BufferTarget, data: &[u8], usage: BufferUsage);
    /// Copy bytes out of the buffer bound to `target`, starting at `offset`.
    fn read_buffer(&self, target: BufferTarget, offset: i32, dst: &mut [u8]);
    /// Release a buffer object.
    fn delete_buffer(&self, buffer: Self::Buffer);

    /// Create an empty vertex array object.
    fn create_vertex_array(&self) -> Result<Self::VertexArray, String>;
    /// Bind (or clear) the active vertex array.
    fn bind_vertex_array(&self, vertex_array: Option<Self::VertexArray>);
    /// Enable an attribute slot on the bound vertex array.
    fn enable_vertex_attrib_array(&self, slot: u32);
    /// Describe a float attribute, sourced from the bound array buffer, on
    /// the bound vertex array.
    fn vertex_attrib_pointer_f32(&self, slot: u32, components: i32, stride: i32, offset: i32);
    /// Release a vertex array object.
    fn delete_vertex_array(&self, vertex_array: Self::VertexArray);

    /// Create an empty texture object.
    fn create_texture(&self) -> Result<Self::Texture, String>;
    /// Select the texture unit later binds apply to (0-based).
    fn active_texture(&self, unit: u32);
    /// Bind (or clear) the 2D texture on the active unit.
    fn bind_texture(&self, texture: Option<Self::Texture>);
    /// Upload level 0 of the bound 2D texture. `pixels` is tightly packed.
    fn tex_image_2d(&self, width: i32, height: i32, format: PixelFormat, pixels: &[u8]);
    /// Apply wrap and filter state to the bound 2D texture.
    fn set_sampling(&self, sampling: &Sampling);
    /// Generate the full mip chain for the bound 2D texture.
    fn generate_mipmap(&self);
    /// Release a texture object.
    fn delete_texture(&self, texture: Self::Texture);

    /// Set the viewport rectangle.
    fn viewport(&self, x: i32, y: i32, width: i32, height: i32);
    /// Set the color used by color clears.
    fn clear_color(&self, rgba: [f32; 4]);
    /// Clear the selected framebuffer targets.
    fn clear(&self, targets: ClearTargets);
    /// Enable or disable depth testing.
    fn set_depth_test(&self, enabled: bool);
    /// Draw indexed triangles from the bound vertex array's element buffer
    /// (`u32` indices, starting at offset 0).
    fn draw_elements(&self, index_count: i32);

    /// Pop the GL error flag. `None` means `GL_NO_ERROR`.
    fn get_error(&self) -> Option<u32>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clear_mask_combines_bits() {
        assert_eq!(ClearTargets::COLOR.mask(), glow::COLOR_BUFFER_BIT);
        assert_eq!(
            ClearTargets::COLOR_AND_DEPTH.mask(),
            glow::COLOR_BUFFER_BIT | glow::DEPTH_BUFFER_BIT
        );
        let none = ClearTargets {
            color: false,
            depth: false,
        };
        assert_eq!(none.mask(), 0);
    }

    #[test]
    fn pixel_format_channels() {
        assert_eq!(PixelFormat::Red.channels(), 1);
        assert_eq!(PixelFormat::Rgb.channels(), 3);
        assert_eq!(PixelFormat::Rgba.channels(), 4);
        assert_eq!(PixelFormat::Rgb.gl_internal_format(), glow::RGB8);
    }

    #[test]
    fn default_sampling_tiles_with_trilinear_minification() {
        let sampling = Sampling::default();
        assert_eq!(sampling.wrap.gl_enum(), glow::REPEAT);
        assert_eq!(sampling.min_filter.gl_enum(), glow::LINEAR_MIPMAP_LINEAR);
        assert_eq!(sampling.mag_filter.gl_enum(), glow::LINEAR);
    }
}
