//! Per-frame model, view and projection matrices.

use glam::{Mat4, Vec3};

use crate::config::RenderConfig;

/// Width over height for a window of `[width, height]` pixels.
///
/// A zero height (a minimized window) counts as 1 so the result stays
/// finite.
#[must_use]
pub fn aspect_ratio([width, height]: [u32; 2]) -> f32 {
    // Window dimensions are far below the f32 mantissa range.
    #[expect(clippy::cast_precision_loss)]
    let (width, height) = (width as f32, height.max(1) as f32);
    width / height
}

/// The three matrices pushed to the shader each frame.
///
/// Nothing carries over between frames: every field is recomputed from
/// the configuration, the elapsed time and the current window size.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transforms {
    /// Object to world: a spin about +Y.
    pub model: Mat4,
    /// World to camera: a fixed translation.
    pub view: Mat4,
    /// Camera to clip space: an OpenGL perspective projection.
    pub projection: Mat4,
    /// Aspect ratio the projection was built with.
    pub aspect: f32,
}

impl Transforms {
    /// Compute the matrices for a frame `elapsed` seconds into the run, in a
    /// window of `size` pixels.
    ///
    /// The model angle is `rotation_speed * elapsed` degrees, so animation
    /// speed does not depend on frame rate.
    #[must_use]
    pub fn compute(config: &RenderConfig, elapsed: f32, size: [u32; 2]) -> Self {
        let aspect = aspect_ratio(size);
        let angle = (config.rotation_speed * elapsed).to_radians();
        Self {
            model: Mat4::from_rotation_y(angle),
            view: Mat4::from_translation(Vec3::from(config.camera_offset)),
            projection: Mat4::perspective_rh_gl(
                config.fov_y_degrees.to_radians(),
                aspect,
                config.near,
                config.far,
            ),
            aspect,
        }
    }

    /// `projection * view * model`.
    #[must_use]
    pub fn model_view_projection(&self) -> Mat4 {
        self.projection * self.view * self.model
    }
}

#[cfg(test)]
mod tests {
    use glam::Vec4;

    use super::*;

    #[test]
    fn aspect_for_800_by_600_is_exact() {
        let transforms = Transforms::compute(&RenderConfig::default(), 0.0, [800, 600]);
        assert_eq!(transforms.aspect, 800.0 / 600.0);

        let expected = Mat4::perspective_rh_gl(60f32.to_radians(), 800.0 / 600.0, 0.1, 100.0);
        assert_eq!(transforms.projection, expected);
        let ratio = transforms.projection.y_axis.y / transforms.projection.x_axis.x;
        assert!((ratio - 800.0 / 600.0).abs() <= f32::EPSILON * 2.0);
    }

    #[test]
    fn minimized_window_keeps_a_finite_aspect() {
        assert_eq!(aspect_ratio([640, 0]), 640.0);
        assert_eq!(aspect_ratio([0, 0]), 0.0);
    }

    #[test]
    fn rotation_follows_elapsed_time() {
        let config = RenderConfig {
            rotation_speed: 90.0,
            ..RenderConfig::default()
        };
        let transforms = Transforms::compute(&config, 1.0, [100, 100]);
        let x = transforms.model * Vec4::X;
        assert!(x.abs_diff_eq(Vec4::new(0.0, 0.0, -1.0, 0.0), 1e-6));

        let still = Transforms::compute(&config, 0.0, [100, 100]);
        assert_eq!(still.model, Mat4::IDENTITY);
    }

    #[test]
    fn view_is_the_camera_offset() {
        let transforms = Transforms::compute(&RenderConfig::default(), 2.5, [1, 1]);
        assert_eq!(
            transforms.view.w_axis,
            Vec4::new(0.0, -0.25, -1.2, 1.0)
        );
    }

    #[test]
    fn resize_changes_the_projection_only() {
        let config = RenderConfig::default();
        let wide = Transforms::compute(&config, 1.0, [1600, 600]);
        let narrow = Transforms::compute(&config, 1.0, [600, 600]);
        assert_eq!(wide.model, narrow.model);
        assert_eq!(wide.view, narrow.view);
        assert_ne!(wide.projection, narrow.projection);
    }
}
