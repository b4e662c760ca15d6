//! Renderer configuration.

/// How shader and uniform failures are treated.
///
/// | Condition                    | `Strict`                    | `Permissive`                         |
/// |------------------------------|-----------------------------|--------------------------------------|
/// | Stage compile failure        | `Err(Error::Compile)`       | logged, program returned anyway      |
/// | Program link failure         | `Err(Error::Link)`          | logged, program returned anyway      |
/// | Uniform name not in program  | `Err(Error::UniformNotFound)` | write skipped                      |
/// | GL error flag after a frame  | `Err(Error::Gl)`            | logged                               |
///
/// `Permissive` is handy while iterating on shaders: a typo in a uniform
/// name leaves the rest of the frame drawing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Strictness {
    /// Report every failure as an error.
    #[default]
    Strict,
    /// Log failures and carry on.
    Permissive,
}

impl Strictness {
    /// Whether failures become errors.
    #[must_use]
    pub fn is_strict(self) -> bool {
        self == Self::Strict
    }
}

/// Uniform names shared between the renderer and the shader sources.
///
/// Names are matched exactly and case-sensitively.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UniformNames {
    /// Model matrix (`mat4`).
    pub model: String,
    /// View matrix (`mat4`).
    pub view: String,
    /// Projection matrix (`mat4`).
    pub projection: String,
    /// Diffuse texture sampler (`sampler2D`).
    pub sampler: String,
}

impl Default for UniformNames {
    fn default() -> Self {
        Self {
            model: "Model".to_owned(),
            view: "View".to_owned(),
            projection: "Projection".to_owned(),
            sampler: "DiffuseSampler".to_owned(),
        }
    }
}

/// Settings consumed by [`Renderer`](crate::render::Renderer).
///
/// # Fields
///
/// | Field            | Description                                   | Default               |
/// |------------------|-----------------------------------------------|-----------------------|
/// | `strictness`     | Failure policy                                | `Strict`              |
/// | `clear_color`    | Color the frame is cleared to                 | `[0.2, 0.2, 0.4, 1.0]`|
/// | `depth_test`     | Enable depth testing                          | `true`                |
/// | `fov_y_degrees`  | Vertical field of view                        | `60.0`                |
/// | `near`, `far`    | Clip planes                                   | `0.1`, `100.0`        |
/// | `rotation_speed` | Model spin about +Y, degrees per second       | `50.0`                |
/// | `camera_offset`  | View translation                              | `[0.0, -0.25, -1.2]`  |
/// | `texture_unit`   | Unit the diffuse texture is bound to          | `0`                   |
/// | `uniforms`       | Uniform names                                 | see [`UniformNames`]  |
///
/// ```
/// use gl_lessons::config::{RenderConfig, Strictness};
///
/// let config = RenderConfig {
///     strictness: Strictness::Permissive,
///     rotation_speed: 0.0,
///     ..Default::default()
/// };
/// assert_eq!(config.fov_y_degrees, 60.0);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct RenderConfig {
    /// Failure policy for shaders, uniforms and GL errors.
    pub strictness: Strictness,
    /// RGBA color the color buffer is cleared to each frame.
    pub clear_color: [f32; 4],
    /// Whether depth testing is enabled before drawing.
    pub depth_test: bool,
    /// Vertical field of view of the projection, in degrees.
    pub fov_y_degrees: f32,
    /// Near clip plane distance.
    pub near: f32,
    /// Far clip plane distance.
    pub far: f32,
    /// Model rotation speed about the vertical axis, in degrees per second.
    pub rotation_speed: f32,
    /// Camera translation applied by the view matrix.
    pub camera_offset: [f32; 3],
    /// Texture unit the diffuse texture is bound to.
    pub texture_unit: u32,
    /// Uniform names pushed each frame.
    pub uniforms: UniformNames,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            strictness: Strictness::default(),
            clear_color: [0.2, 0.2, 0.4, 1.0],
            depth_test: true,
            fov_y_degrees: 60.0,
            near: 0.1,
            far: 100.0,
            rotation_speed: 50.0,
            camera_offset: [0.0, -0.25, -1.2],
            texture_unit: 0,
            uniforms: UniformNames::default(),
        }
    }
}
