//! 2D textures loaded from image files.

use std::{
    cell::Cell,
    fs,
    path::{Path, PathBuf},
};

use image::DynamicImage;

use crate::{
    binding::{Bound, Unbind},
    context::{GraphicsContext, PixelFormat, Sampling},
    error::{gl_int, Error, Result},
};

/// A 2D texture with a full mip chain.
///
/// Images are flipped vertically on upload, so texture coordinate (0, 0)
/// addresses the bottom-left corner of the source image.
pub struct Texture<'gl, C: GraphicsContext> {
    gl: &'gl C,
    handle: C::Texture,
    width: u32,
    height: u32,
    format: PixelFormat,
    unit: Cell<u32>,
}

impl<'gl, C: GraphicsContext> Texture<'gl, C> {
    /// Read and decode an image file, convert it to `format`, upload it and
    /// generate mipmaps. Sampling is [`Sampling::default`].
    ///
    /// PNG and JPEG are supported.
    ///
    /// # Errors
    ///
    /// [`Error::ResourceRead`] if the file cannot be read,
    /// [`Error::Decode`] if it is not a supported image, and
    /// [`Error::Allocation`] if the driver refuses to create the texture.
    pub fn load(gl: &'gl C, path: impl AsRef<Path>, format: PixelFormat) -> Result<Self> {
        let path = path.as_ref();
        let bytes = fs::read(path).map_err(|source| Error::ResourceRead {
            path: path.to_owned(),
            source,
        })?;
        let image = image::load_from_memory(&bytes).map_err(|source| Error::Decode {
            path: path.to_owned(),
            source,
        })?;
        log::debug!(
            "loaded {} ({}x{})",
            path.display(),
            image.width(),
            image.height()
        );
        Self::from_image(gl, &image, format)
    }

    /// [`load`](Self::load) for an encoded image already in memory.
    ///
    /// # Errors
    ///
    /// [`Error::Decode`] (with an empty path) or [`Error::Allocation`].
    pub fn from_memory(gl: &'gl C, bytes: &[u8], format: PixelFormat) -> Result<Self> {
        let image = image::load_from_memory(bytes).map_err(|source| Error::Decode {
            path: PathBuf::new(),
            source,
        })?;
        Self::from_image(gl, &image, format)
    }

    /// Upload a decoded image, converting it to `format`.
    ///
    /// # Errors
    ///
    /// [`Error::Allocation`] or [`Error::TooLarge`].
    pub fn from_image(gl: &'gl C, image: &DynamicImage, format: PixelFormat) -> Result<Self> {
        let flipped = image.flipv();
        let (width, height) = (flipped.width(), flipped.height());
        let pixels = match format {
            PixelFormat::Red => flipped.into_luma8().into_raw(),
            PixelFormat::Rgb => flipped.into_rgb8().into_raw(),
            PixelFormat::Rgba => flipped.into_rgba8().into_raw(),
        };
        Self::from_pixels(gl, width, height, format, &pixels)
    }

    /// Upload tightly packed rows of 8-bit pixels, bottom row first.
    ///
    /// The texture is bound to unit 0 during the upload and unbound after.
    ///
    /// # Errors
    ///
    /// [`Error::ShortPixelData`] if `pixels` is smaller than the dimensions
    /// require, plus [`Error::Allocation`] or [`Error::TooLarge`].
    pub fn from_pixels(
        gl: &'gl C,
        width: u32,
        height: u32,
        format: PixelFormat,
        pixels: &[u8],
    ) -> Result<Self> {
        let gl_width = gl_int("texture width", width as usize)?;
        let gl_height = gl_int("texture height", height as usize)?;
        let expected = width as usize * height as usize * format.channels();
        if pixels.len() < expected {
            return Err(Error::ShortPixelData {
                expected,
                actual: pixels.len(),
            });
        }

        let handle = gl.create_texture()?;
        let texture = Self {
            gl,
            handle,
            width,
            height,
            format,
            unit: Cell::new(0),
        };
        {
            let _bound = texture.bound(0);
            gl.tex_image_2d(gl_width, gl_height, format, &pixels[..expected]);
            gl.set_sampling(&Sampling::default());
            gl.generate_mipmap();
        }
        log::debug!("created texture {handle:?} ({width}x{height} {format:?})");
        Ok(texture)
    }

    /// The GL texture name.
    #[must_use]
    pub fn handle(&self) -> C::Texture {
        self.handle
    }

    /// Width in pixels.
    #[must_use]
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Height in pixels.
    #[must_use]
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Storage format.
    #[must_use]
    pub fn format(&self) -> PixelFormat {
        self.format
    }

    /// Make `unit` the active texture unit and bind this texture to it.
    pub fn bind(&self, unit: u32) {
        self.gl.active_texture(unit);
        self.gl.bind_texture(Some(self.handle));
        self.unit.set(unit);
    }

    /// Bind to `unit` for the lifetime of the returned guard.
    pub fn bound(&self, unit: u32) -> Bound<'_, Self> {
        self.bind(unit);
        Bound::new(self)
    }

    /// Release the texture. Equivalent to dropping it.
    pub fn delete(self) {
        drop(self);
    }
}

impl<C: GraphicsContext> Unbind for Texture<'_, C> {
    /// Clears the unit this texture was last bound to.
    fn unbind(&self) {
        self.gl.active_texture(self.unit.get());
        self.gl.bind_texture(None);
    }
}

impl<C: GraphicsContext> Drop for Texture<'_, C> {
    fn drop(&mut self) {
        self.gl.delete_texture(self.handle);
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::io;

    use image::{Rgb, RgbImage, Rgba, RgbaImage};

    use super::*;
    use crate::headless::HeadlessContext;

    /// 4x2 image: top row red, bottom row blue.
    fn two_rows() -> RgbaImage {
        RgbaImage::from_fn(4, 2, |_, y| {
            if y == 0 {
                Rgba([255, 0, 0, 255])
            } else {
                Rgba([0, 0, 255, 255])
            }
        })
    }

    #[test]
    fn load_uploads_flipped_pixels_with_mipmaps() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rows.png");
        two_rows().save(&path).unwrap();

        let gl = HeadlessContext::new();
        let texture = Texture::load(&gl, &path, PixelFormat::Rgba).unwrap();
        assert_eq!(gl.get_error(), None);
        assert_eq!((texture.width(), texture.height()), (4, 2));

        let info = gl.texture_info(texture.handle()).unwrap();
        assert_eq!(info.format, PixelFormat::Rgba);
        assert_eq!(info.mip_levels, 3);
        assert_eq!(info.sampling, Some(Sampling::default()));

        let pixels = gl.texture_pixels(texture.handle()).unwrap();
        assert_eq!(&pixels[..4], &[0, 0, 255, 255]);
        assert_eq!(&pixels[16..20], &[255, 0, 0, 255]);
        assert_eq!(gl.bindings().textures[0], None);
    }

    #[test]
    fn conversion_follows_the_requested_format() {
        let image = DynamicImage::ImageRgb8(RgbImage::from_pixel(3, 3, Rgb([10, 20, 30])));
        let gl = HeadlessContext::new();
        let texture = Texture::from_image(&gl, &image, PixelFormat::Red).unwrap();
        assert_eq!(gl.texture_pixels(texture.handle()).unwrap().len(), 9);
        assert_eq!(gl.texture_info(texture.handle()).unwrap().mip_levels, 2);
    }

    #[test]
    fn missing_file_is_a_read_error() {
        let dir = tempfile::tempdir().unwrap();
        let gl = HeadlessContext::new();
        let err = Texture::load(&gl, dir.path().join("nope.png"), PixelFormat::Rgb)
            .err()
            .unwrap();
        match err {
            Error::ResourceRead { source, .. } => assert_eq!(source.kind(), io::ErrorKind::NotFound),
            other => panic!("expected a read error, got {other}"),
        }
        assert_eq!(gl.live_objects(), 0);
    }

    #[test]
    fn garbage_is_a_decode_error() {
        let gl = HeadlessContext::new();
        let err = Texture::from_memory(&gl, b"definitely not a png", PixelFormat::Rgb)
            .err()
            .unwrap();
        assert!(matches!(err, Error::Decode { .. }));
    }

    #[test]
    fn short_pixel_data_is_rejected_before_upload() {
        let gl = HeadlessContext::new();
        let err = Texture::from_pixels(&gl, 2, 2, PixelFormat::Rgb, &[0; 11])
            .err()
            .unwrap();
        assert!(matches!(
            err,
            Error::ShortPixelData {
                expected: 12,
                actual: 11
            }
        ));
        assert_eq!(gl.live_objects(), 0);
    }

    #[test]
    fn out_of_range_unit_is_an_invalid_enum() {
        let gl = HeadlessContext::new();
        let texture = Texture::from_pixels(&gl, 1, 1, PixelFormat::Red, &[7]).unwrap();
        texture.bind(u32::MAX);
        assert_eq!(gl.get_error(), Some(glow::INVALID_ENUM));
        texture.unbind();
        assert_eq!(gl.bindings().active_unit, 0);
    }

    #[test]
    fn unbind_clears_the_unit_it_was_bound_to() {
        let gl = HeadlessContext::new();
        let texture = Texture::from_pixels(&gl, 1, 1, PixelFormat::Rgba, &[1, 2, 3, 4]).unwrap();
        texture.bind(3);
        assert_eq!(gl.bindings().textures[3], Some(texture.handle()));

        texture.unbind();
        let once = gl.bindings();
        texture.unbind();
        assert_eq!(gl.bindings(), once);
        assert_eq!(once.textures[3], None);
        assert_eq!(once.active_unit, 3);
    }
}
