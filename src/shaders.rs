//! GLSL sources and the [`ShaderProgram`] wrapper.
//!
//! The built-in shaders target GLSL 3.30 core (OpenGL 3.3).

use std::{fs, path::Path};

use glam::Mat4;

use crate::{
    binding::{Bound, Unbind},
    config::Strictness,
    context::{GraphicsContext, ShaderStage},
    error::{Error, Result},
};

/// Vertex shader for textured, vertex-colored meshes.
///
/// Expects the [`Vertex`](crate::types::Vertex) layout: position at slot 0,
/// color at slot 1, texture coordinates at slot 2.
///
/// # Uniforms
///
/// | Name         | Type   | Description                  |
/// |--------------|--------|------------------------------|
/// | `Model`      | `mat4` | Object to world transform    |
/// | `View`       | `mat4` | World to camera transform    |
/// | `Projection` | `mat4` | Camera to clip transform     |
pub const DEFAULT_VERTEX_SRC: &str = r"#version 330 core

layout (location = 0) in vec3 aPosition;
layout (location = 1) in vec3 aColor;
layout (location = 2) in vec2 aUv;

uniform mat4 Model;
uniform mat4 View;
uniform mat4 Projection;

out vec3 vColor;
out vec2 vUv;

void main() {
    vColor = aColor;
    vUv = aUv;
    gl_Position = Projection * View * Model * vec4(aPosition, 1.0);
}
";

/// Fragment shader for textured, vertex-colored meshes.
///
/// The sampled texel is modulated by the interpolated vertex color.
///
/// # Uniforms
///
/// | Name             | Type        | Description        |
/// |------------------|-------------|--------------------|
/// | `DiffuseSampler` | `sampler2D` | Bound texture unit |
pub const DEFAULT_FRAGMENT_SRC: &str = r"#version 330 core

in vec3 vColor;
in vec2 vUv;

uniform sampler2D DiffuseSampler;

out vec4 FragColor;

void main() {
    FragColor = texture(DiffuseSampler, vUv) * vec4(vColor, 1.0);
}
";

/// Read a shader source file as UTF-8 text.
///
/// # Errors
///
/// Returns [`Error::ResourceRead`] if the file is missing, unreadable or
/// not valid UTF-8.
pub fn read_source(path: &Path) -> Result<String> {
    fs::read_to_string(path).map_err(|source| Error::ResourceRead {
        path: path.to_owned(),
        source,
    })
}

/// A compiled shader stage, deleted when dropped.
struct Stage<'gl, C: GraphicsContext> {
    gl: &'gl C,
    stage: ShaderStage,
    shader: C::Shader,
    /// Compiler diagnostic if compilation failed.
    error: Option<String>,
}

impl<'gl, C: GraphicsContext> Stage<'gl, C> {
    fn compile(gl: &'gl C, stage: ShaderStage, source: &str) -> Result<Self> {
        let shader = gl.create_shader(stage)?;
        gl.shader_source(shader, source);
        gl.compile_shader(shader);

        let error = if gl.shader_compile_status(shader) {
            None
        } else {
            let log = gl.shader_info_log(shader);
            Some(if log.trim().is_empty() {
                format!("{stage} shader failed to compile (driver gave no diagnostic)")
            } else {
                log
            })
        };

        Ok(Self {
            gl,
            stage,
            shader,
            error,
        })
    }
}

impl<C: GraphicsContext> Drop for Stage<'_, C> {
    fn drop(&mut self) {
        self.gl.delete_shader(self.shader);
    }
}

/// A linked vertex + fragment program.
///
/// The program is deleted when this value is dropped (or passed to
/// [`delete`](Self::delete)). The intermediate stage objects never outlive
/// [`new`](Self::new).
///
/// Uniform setters write into whichever program is currently bound, as GL
/// does; bind this program first.
pub struct ShaderProgram<'gl, C: GraphicsContext> {
    gl: &'gl C,
    handle: C::Program,
    strictness: Strictness,
    info_log: String,
}

impl<'gl, C: GraphicsContext> ShaderProgram<'gl, C> {
    /// Compile both stages and link them.
    ///
    /// Stage objects are detached and deleted on every path, whether
    /// compilation and linking succeed or not.
    ///
    /// With [`Strictness::Permissive`] compile and link failures are logged
    /// instead of returned, and the (unusable) program is handed back with
    /// the diagnostics available from [`info_log`](Self::info_log).
    ///
    /// # Errors
    ///
    /// [`Error::Compile`] or [`Error::Link`] in strict mode, and
    /// [`Error::Allocation`] if the driver refuses to create an object.
    pub fn new(
        gl: &'gl C,
        vertex_src: &str,
        fragment_src: &str,
        strictness: Strictness,
    ) -> Result<Self> {
        let vertex = Stage::compile(gl, ShaderStage::Vertex, vertex_src)?;
        let fragment = Stage::compile(gl, ShaderStage::Fragment, fragment_src)?;

        let mut info_log = String::new();
        for stage in [&vertex, &fragment] {
            if let Some(log) = &stage.error {
                if strictness.is_strict() {
                    return Err(Error::Compile {
                        stage: stage.stage,
                        log: log.clone(),
                    });
                }
                log::warn!("{} shader failed to compile, continuing: {log}", stage.stage);
                info_log.push_str(log);
                info_log.push('\n');
            }
        }

        let handle = gl.create_program()?;
        gl.attach_shader(handle, vertex.shader);
        gl.attach_shader(handle, fragment.shader);
        gl.link_program(handle);
        gl.detach_shader(handle, vertex.shader);
        gl.detach_shader(handle, fragment.shader);
        drop((vertex, fragment));

        if !gl.program_link_status(handle) {
            let log = gl.program_info_log(handle);
            if strictness.is_strict() {
                gl.delete_program(handle);
                return Err(Error::Link { log });
            }
            log::warn!("shader program failed to link, continuing: {log}");
            info_log.push_str(&log);
        }

        log::debug!("created shader program {handle:?}");
        Ok(Self {
            gl,
            handle,
            strictness,
            info_log,
        })
    }

    /// Read both stages from disk, then [`new`](Self::new).
    ///
    /// # Errors
    ///
    /// [`Error::ResourceRead`] if either file cannot be read, plus
    /// everything [`new`](Self::new) returns.
    pub fn from_files(
        gl: &'gl C,
        vertex_path: impl AsRef<Path>,
        fragment_path: impl AsRef<Path>,
        strictness: Strictness,
    ) -> Result<Self> {
        let vertex_src = read_source(vertex_path.as_ref())?;
        let fragment_src = read_source(fragment_path.as_ref())?;
        Self::new(gl, &vertex_src, &fragment_src, strictness)
    }

    /// The GL program name.
    #[must_use]
    pub fn handle(&self) -> C::Program {
        self.handle
    }

    /// Diagnostics collected while building a program in permissive mode.
    /// Empty when everything compiled and linked.
    #[must_use]
    pub fn info_log(&self) -> &str {
        &self.info_log
    }

    /// The failure policy this program was built with.
    #[must_use]
    pub fn strictness(&self) -> Strictness {
        self.strictness
    }

    /// Make this the active program.
    pub fn bind(&self) {
        self.gl.use_program(Some(self.handle));
    }

    /// Bind for the lifetime of the returned guard.
    pub fn bound(&self) -> Bound<'_, Self> {
        self.bind();
        Bound::new(self)
    }

    /// Release the program. Equivalent to dropping it.
    pub fn delete(self) {
        drop(self);
    }

    /// Resolve a uniform by exact name.
    ///
    /// `Ok(None)` means the name is not active and the program is
    /// permissive.
    ///
    /// # Errors
    ///
    /// [`Error::UniformNotFound`] in strict mode.
    pub fn uniform_location(&self, name: &str) -> Result<Option<C::UniformLocation>> {
        match self.gl.uniform_location(self.handle, name) {
            Some(location) => Ok(Some(location)),
            None if self.strictness.is_strict() => Err(Error::UniformNotFound {
                name: name.to_owned(),
            }),
            None => {
                log::debug!("uniform `{name}` is not active, skipping writes");
                Ok(None)
            }
        }
    }

    /// Write a matrix through a location resolved earlier. `None` is a
    /// no-op.
    pub fn write_mat4(&self, location: Option<&C::UniformLocation>, value: &Mat4) {
        if let Some(location) = location {
            self.gl.uniform_matrix4(location, &value.to_cols_array());
        }
    }

    /// Write an integer (or sampler unit) through a location resolved
    /// earlier. `None` is a no-op.
    pub fn write_int(&self, location: Option<&C::UniformLocation>, value: i32) {
        if let Some(location) = location {
            self.gl.uniform_i32(location, value);
        }
    }

    /// Look up `name` and write a 4x4 matrix into the bound program.
    ///
    /// # Errors
    ///
    /// See [`uniform_location`](Self::uniform_location).
    pub fn set_uniform_mat4(&self, name: &str, value: &Mat4) -> Result<()> {
        let location = self.uniform_location(name)?;
        self.write_mat4(location.as_ref(), value);
        Ok(())
    }

    /// Look up `name` and write an integer into the bound program.
    ///
    /// # Errors
    ///
    /// See [`uniform_location`](Self::uniform_location).
    pub fn set_uniform_int(&self, name: &str, value: i32) -> Result<()> {
        let location = self.uniform_location(name)?;
        self.write_int(location.as_ref(), value);
        Ok(())
    }

    /// Look up `name` and write a float into the bound program.
    ///
    /// # Errors
    ///
    /// See [`uniform_location`](Self::uniform_location).
    pub fn set_uniform_float(&self, name: &str, value: f32) -> Result<()> {
        if let Some(location) = self.uniform_location(name)? {
            self.gl.uniform_f32(&location, value);
        }
        Ok(())
    }
}

impl<C: GraphicsContext> Unbind for ShaderProgram<'_, C> {
    fn unbind(&self) {
        self.gl.use_program(None);
    }
}

impl<C: GraphicsContext> Drop for ShaderProgram<'_, C> {
    fn drop(&mut self) {
        log::debug!("deleting shader program {:?}", self.handle);
        self.gl.delete_program(self.handle);
    }
}
