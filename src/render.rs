//! The frame loop: owns a program, a mesh and an optional texture, and
//! draws them once per frame.

use crate::{
    buffers::Mesh,
    config::RenderConfig,
    context::{ClearTargets, GraphicsContext},
    error::{gl_int, Error, Result},
    shaders::{ShaderProgram, DEFAULT_FRAGMENT_SRC, DEFAULT_VERTEX_SRC},
    texture::Texture,
    transform::Transforms,
    types::{Vertex, PYRAMID_INDICES, PYRAMID_VERTICES},
    window::{FrameTime, FrameTimer, Window},
};

/// Upper bound on error flags read back after a frame. A lost context can
/// report errors forever.
const MAX_ERROR_DRAIN: usize = 16;

/// Where the frame loop is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    /// The window is open; another frame will be drawn.
    Running,
    /// The window asked to close. Nothing more is drawn.
    Terminated,
}

/// What one call to [`Renderer::render_frame`] did.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameStats {
    /// The frame counter from the timer.
    pub frame_index: u64,
    /// Indices submitted by the draw call.
    pub index_count: i32,
    /// Aspect ratio the projection used.
    pub aspect: f32,
}

/// Uniform locations resolved once at construction.
struct FrameUniforms<L> {
    model: Option<L>,
    view: Option<L>,
    projection: Option<L>,
    sampler: Option<L>,
}

/// Draws one mesh with one program, spinning it about the vertical axis.
///
/// Every frame runs the same sequence: set the viewport, clear, bind the
/// program and vertex array, push the model/view/projection matrices and
/// the sampler unit, bind the texture, draw, then unbind texture, vertex
/// array and program in that order.
///
/// The renderer owns its GL resources. They are released exactly once,
/// when it is dropped, passed to [`destroy`](Self::destroy), or when
/// [`run`](Self::run) returns.
///
/// # Example
///
/// ```
/// use gl_lessons::{
///     headless::HeadlessContext, window::FixedTimestep, RenderConfig, Renderer, Window,
/// };
///
/// struct TenFrames(u32);
///
/// impl Window for TenFrames {
///     fn size(&self) -> [u32; 2] {
///         [800, 600]
///     }
///     fn should_close(&self) -> bool {
///         self.0 == 10
///     }
///     fn poll_events(&mut self) {}
///     fn swap_buffers(&mut self) {
///         self.0 += 1;
///     }
/// }
///
/// # fn main() -> gl_lessons::Result<()> {
/// let gl = HeadlessContext::new();
/// let renderer = Renderer::pyramid(&gl, RenderConfig::default())?;
/// let frames = renderer.run(&mut TenFrames(0), &mut FixedTimestep::sixty_hz())?;
/// assert_eq!(frames, 10);
/// assert_eq!(gl.live_objects(), 0);
/// # Ok(())
/// # }
/// ```
pub struct Renderer<'gl, C: GraphicsContext> {
    gl: &'gl C,
    config: RenderConfig,
    uniforms: FrameUniforms<C::UniformLocation>,
    program: ShaderProgram<'gl, C>,
    mesh: Mesh<'gl, C>,
    texture: Option<Texture<'gl, C>>,
}

impl<'gl, C: GraphicsContext> Renderer<'gl, C> {
    /// Take ownership of a program and mesh and resolve the matrix
    /// uniforms named in `config`.
    ///
    /// # Errors
    ///
    /// [`Error::UniformNotFound`] if the program is strict and lacks a
    /// matrix uniform, and [`Error::Gl`] if setup left the GL error flag set
    /// under [`Strictness::Strict`](crate::config::Strictness::Strict).
    pub fn new(
        gl: &'gl C,
        program: ShaderProgram<'gl, C>,
        mesh: Mesh<'gl, C>,
        config: RenderConfig,
    ) -> Result<Self> {
        let names = &config.uniforms;
        let uniforms = FrameUniforms {
            model: program.uniform_location(&names.model)?,
            view: program.uniform_location(&names.view)?,
            projection: program.uniform_location(&names.projection)?,
            sampler: None,
        };
        let renderer = Self {
            gl,
            config,
            uniforms,
            program,
            mesh,
            texture: None,
        };
        renderer.check_errors("renderer setup")?;
        log::info!(
            "renderer ready: {} indices, {:?}",
            renderer.mesh.index_count(),
            renderer.config.strictness
        );
        Ok(renderer)
    }

    /// The built-in textured pyramid with the default shaders.
    ///
    /// # Errors
    ///
    /// Anything [`ShaderProgram::new`], [`Mesh::new`] or [`new`](Self::new)
    /// returns.
    pub fn pyramid(gl: &'gl C, config: RenderConfig) -> Result<Self> {
        let program = ShaderProgram::new(
            gl,
            DEFAULT_VERTEX_SRC,
            DEFAULT_FRAGMENT_SRC,
            config.strictness,
        )?;
        let mesh = Mesh::new(gl, &PYRAMID_VERTICES, &PYRAMID_INDICES, &Vertex::LAYOUT)?;
        Self::new(gl, program, mesh, config)
    }

    /// Draw with `texture` bound to the configured unit, and resolve the
    /// sampler uniform.
    ///
    /// # Errors
    ///
    /// [`Error::UniformNotFound`] if the program is strict and has no
    /// sampler uniform by the configured name.
    pub fn with_texture(mut self, texture: Texture<'gl, C>) -> Result<Self> {
        self.uniforms.sampler = self.program.uniform_location(&self.config.uniforms.sampler)?;
        self.texture = Some(texture);
        Ok(self)
    }

    /// The configuration in use.
    #[must_use]
    pub fn config(&self) -> &RenderConfig {
        &self.config
    }

    /// The program drawn with.
    #[must_use]
    pub fn program(&self) -> &ShaderProgram<'gl, C> {
        &self.program
    }

    /// The mesh drawn.
    #[must_use]
    pub fn mesh(&self) -> &Mesh<'gl, C> {
        &self.mesh
    }

    /// The texture, if one was attached.
    #[must_use]
    pub fn texture(&self) -> Option<&Texture<'gl, C>> {
        self.texture.as_ref()
    }

    /// Draw one frame into a framebuffer of `size` pixels.
    ///
    /// The size is re-read every frame, so resizes take effect immediately.
    ///
    /// # Errors
    ///
    /// [`Error::Gl`] if the GL error flag is set afterwards and the
    /// configuration is strict; [`Error::TooLarge`] for sizes past GL's
    /// integer range.
    pub fn render_frame(&self, time: &FrameTime, size: [u32; 2]) -> Result<FrameStats> {
        let gl = self.gl;
        let [width, height] = size;
        gl.viewport(
            0,
            0,
            gl_int("viewport width", width as usize)?,
            gl_int("viewport height", height as usize)?,
        );
        gl.clear_color(self.config.clear_color);
        gl.set_depth_test(self.config.depth_test);
        gl.clear(ClearTargets::COLOR_AND_DEPTH);

        let transforms = Transforms::compute(&self.config, time.elapsed, size);
        let index_count = {
            let program = self.program.bound();
            let _vao = self.mesh.vertex_array().bound();

            program.write_mat4(self.uniforms.model.as_ref(), &transforms.model);
            program.write_mat4(self.uniforms.view.as_ref(), &transforms.view);
            program.write_mat4(self.uniforms.projection.as_ref(), &transforms.projection);

            let _texture = match &self.texture {
                Some(texture) => {
                    let unit = gl_int("texture unit", self.config.texture_unit as usize)?;
                    program.write_int(self.uniforms.sampler.as_ref(), unit);
                    Some(texture.bound(self.config.texture_unit))
                }
                None => None,
            };
            self.mesh.draw()?
        };

        self.check_errors("frame")?;
        log::trace!(
            "frame {} drew {index_count} indices at {width}x{height}",
            time.frame_index
        );
        Ok(FrameStats {
            frame_index: time.frame_index,
            index_count,
            aspect: transforms.aspect,
        })
    }

    /// Advance the loop by one step.
    ///
    /// If the window wants to close this returns
    /// [`LoopState::Terminated`] without drawing. Otherwise it ticks the
    /// timer, polls events, renders and swaps buffers.
    ///
    /// # Errors
    ///
    /// See [`render_frame`](Self::render_frame).
    pub fn step(
        &self,
        window: &mut impl Window,
        timer: &mut impl FrameTimer,
    ) -> Result<LoopState> {
        if window.should_close() {
            return Ok(LoopState::Terminated);
        }
        let time = timer.tick();
        window.poll_events();
        self.render_frame(&time, window.size())?;
        window.swap_buffers();
        Ok(LoopState::Running)
    }

    /// Step until the window closes, then release every GL resource.
    /// Returns the number of frames drawn.
    ///
    /// # Errors
    ///
    /// The first error from [`step`](Self::step). Resources are released on
    /// that path too.
    pub fn run(self, window: &mut impl Window, timer: &mut impl FrameTimer) -> Result<u64> {
        let mut frames = 0u64;
        while self.step(window, timer)? == LoopState::Running {
            frames += 1;
        }
        log::info!("window closed after {frames} frames");
        Ok(frames)
    }

    /// Release the program, mesh and texture. Equivalent to dropping the
    /// renderer.
    pub fn destroy(self) {
        drop(self);
    }

    fn check_errors(&self, during: &str) -> Result<()> {
        let Some(first) = self.gl.get_error() else {
            return Ok(());
        };
        for _ in 1..MAX_ERROR_DRAIN {
            match self.gl.get_error() {
                Some(code) => log::debug!("additional GL error 0x{code:04X} during {during}"),
                None => break,
            }
        }
        if self.config.strictness.is_strict() {
            return Err(Error::Gl(first));
        }
        log::warn!("GL error 0x{first:04X} during {during}, continuing");
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::{
        buffers::VertexAttribute,
        config::Strictness,
        headless::{HeadlessContext, UniformValue},
        window::FixedTimestep,
        PixelFormat,
    };

    const PASS_VERTEX_SRC: &str = "#version 330 core
layout (location = 0) in vec3 aPosition;
uniform mat4 Model;
uniform mat4 View;
uniform mat4 Projection;
void main() {
    gl_Position = Projection * View * Model * vec4(aPosition, 1.0);
}
";

    const PASS_FRAGMENT_SRC: &str = "#version 330 core
out vec4 FragColor;
void main() {
    FragColor = vec4(1.0);
}
";

    const BARE_VERTEX_SRC: &str = "#version 330 core
layout (location = 0) in vec3 aPosition;
void main() {
    gl_Position = vec4(aPosition, 1.0);
}
";

    const TRIANGLE: [f32; 9] = [-0.5, -0.5, 0.0, 0.5, -0.5, 0.0, 0.0, 0.5, 0.0];

    /// Stays open for a fixed number of frames at a scripted size.
    struct ScriptedWindow {
        sizes: Vec<[u32; 2]>,
        frame: usize,
        polls: usize,
    }

    impl ScriptedWindow {
        fn new(sizes: Vec<[u32; 2]>) -> Self {
            Self {
                sizes,
                frame: 0,
                polls: 0,
            }
        }
    }

    impl Window for ScriptedWindow {
        fn size(&self) -> [u32; 2] {
            self.sizes[self.frame]
        }

        fn should_close(&self) -> bool {
            self.frame == self.sizes.len()
        }

        fn poll_events(&mut self) {
            self.polls += 1;
        }

        fn swap_buffers(&mut self) {
            self.frame += 1;
        }
    }

    fn triangle_renderer<'gl>(
        gl: &'gl HeadlessContext,
        vertex_src: &str,
        strictness: Strictness,
    ) -> Renderer<'gl, HeadlessContext> {
        let program = ShaderProgram::new(gl, vertex_src, PASS_FRAGMENT_SRC, strictness).unwrap();
        let layout = [VertexAttribute::new(0, 3, 12, 0)];
        let mesh = Mesh::new(gl, &TRIANGLE, &[0, 1, 2], &layout).unwrap();
        let config = RenderConfig {
            strictness,
            ..RenderConfig::default()
        };
        Renderer::new(gl, program, mesh, config).unwrap()
    }

    #[test]
    fn one_frame_draws_the_triangle_without_errors() {
        let gl = HeadlessContext::new();
        let renderer = triangle_renderer(&gl, PASS_VERTEX_SRC, Strictness::Strict);
        let fresh = gl.bindings();

        let mut window = ScriptedWindow::new(vec![[800, 600]]);
        let frames = renderer
            .run(&mut window, &mut FixedTimestep::sixty_hz())
            .unwrap();

        assert_eq!(frames, 1);
        let draws = gl.draw_calls();
        assert_eq!(draws.len(), 1);
        assert_eq!(draws[0].index_count, 3);
        assert_eq!(gl.get_error(), None);
        assert_eq!(gl.bindings(), fresh);
        assert_eq!(gl.live_objects(), 0);
        assert_eq!(gl.stray_deletes(), 0);
    }

    #[test]
    fn matrices_reach_the_shader() {
        let gl = HeadlessContext::new();
        let renderer = triangle_renderer(&gl, PASS_VERTEX_SRC, Strictness::Strict);
        let time = FrameTime {
            delta: 0.5,
            elapsed: 2.0,
            frame_index: 7,
        };
        let stats = renderer.render_frame(&time, [800, 600]).unwrap();
        assert_eq!(stats.frame_index, 7);
        assert_eq!(stats.aspect, 800.0 / 600.0);

        let expected = Transforms::compute(renderer.config(), 2.0, [800, 600]);
        let draw = &gl.draw_calls()[0];
        assert_eq!(
            draw.uniforms["Model"],
            UniformValue::Mat4(expected.model.to_cols_array())
        );
        assert_eq!(
            draw.uniforms["Projection"],
            UniformValue::Mat4(expected.projection.to_cols_array())
        );
        assert_eq!(gl.viewport_rect(), [0, 0, 800, 600]);
        assert_eq!(gl.clear_color_value(), [0.2, 0.2, 0.4, 1.0]);
        assert!(gl.depth_test_enabled());
    }

    #[test]
    fn strict_renderer_needs_the_matrix_uniforms() {
        let gl = HeadlessContext::new();
        let program =
            ShaderProgram::new(&gl, BARE_VERTEX_SRC, PASS_FRAGMENT_SRC, Strictness::Strict).unwrap();
        let mesh = Mesh::new(&gl, &TRIANGLE, &[0, 1, 2], &[VertexAttribute::new(0, 3, 12, 0)]).unwrap();
        let err = Renderer::new(&gl, program, mesh, RenderConfig::default())
            .err()
            .unwrap();
        assert!(matches!(err, Error::UniformNotFound { ref name } if name == "Model"));
        assert_eq!(gl.live_objects(), 0);
    }

    #[test]
    fn permissive_renderer_skips_missing_uniforms() {
        let gl = HeadlessContext::new();
        let renderer = triangle_renderer(&gl, BARE_VERTEX_SRC, Strictness::Permissive);
        let time = FixedTimestep::sixty_hz().tick();
        renderer.render_frame(&time, [640, 480]).unwrap();

        let draw = &gl.draw_calls()[0];
        assert!(draw.uniforms.is_empty());
        assert_eq!(gl.get_error(), None);
    }

    #[test]
    fn gl_errors_fail_strict_frames_only() {
        let gl = HeadlessContext::new();
        let program = ShaderProgram::new(
            &gl,
            PASS_VERTEX_SRC,
            "#version 330 core\nin vec3 vMissing;\nout vec4 FragColor;\nvoid main() {\n    FragColor = vec4(vMissing, 1.0);\n}\n",
            Strictness::Permissive,
        )
        .unwrap();
        let mesh = Mesh::new(&gl, &TRIANGLE, &[0, 1, 2], &[VertexAttribute::new(0, 3, 12, 0)]).unwrap();
        let config = RenderConfig {
            strictness: Strictness::Permissive,
            ..RenderConfig::default()
        };
        let renderer = Renderer::new(&gl, program, mesh, config).unwrap();
        let time = FixedTimestep::sixty_hz().tick();
        assert!(renderer.render_frame(&time, [800, 600]).is_ok());
        assert!(gl.draw_calls().is_empty());

        let strict = Renderer {
            config: RenderConfig::default(),
            ..renderer
        };
        let err = strict.render_frame(&time, [800, 600]).unwrap_err();
        assert!(matches!(err, Error::Gl(glow::INVALID_OPERATION)));
    }

    #[test]
    fn textured_pyramid_runs_and_releases_everything() {
        let gl = HeadlessContext::new();
        let texture = Texture::from_pixels(&gl, 2, 2, PixelFormat::Rgb, &[255; 12]).unwrap();
        let renderer = Renderer::pyramid(&gl, RenderConfig::default())
            .unwrap()
            .with_texture(texture)
            .unwrap();
        let texture_name = renderer.texture().unwrap().handle();
        let fresh = gl.bindings();

        let mut window = ScriptedWindow::new(vec![[800, 600], [800, 600], [1024, 0]]);
        let frames = renderer
            .run(&mut window, &mut FixedTimestep::new(0.25))
            .unwrap();

        assert_eq!(frames, 3);
        assert_eq!(window.polls, 3);
        assert_eq!(gl.clear_count(), 3);
        assert_eq!(gl.viewport_rect(), [0, 0, 1024, 0]);

        let draws = gl.draw_calls();
        assert_eq!(draws.len(), 3);
        for draw in &draws {
            assert_eq!(draw.index_count, 18);
            assert_eq!(draw.textures.get(&0), Some(&texture_name));
            assert_eq!(draw.uniforms["DiffuseSampler"], UniformValue::Int(0));
        }
        assert_ne!(draws[0].uniforms["Model"], draws[1].uniforms["Model"]);
        assert_eq!(gl.bindings(), fresh);
        assert_eq!(gl.live_objects(), 0);
        assert_eq!(gl.stray_deletes(), 0);
    }

    #[test]
    fn closed_window_draws_nothing() {
        let gl = HeadlessContext::new();
        let renderer = triangle_renderer(&gl, PASS_VERTEX_SRC, Strictness::Strict);
        let mut window = ScriptedWindow::new(Vec::new());
        let mut timer = FixedTimestep::sixty_hz();
        assert_eq!(
            renderer.step(&mut window, &mut timer).unwrap(),
            LoopState::Terminated
        );
        assert!(gl.draw_calls().is_empty());
        assert_eq!(window.polls, 0);
    }
}
