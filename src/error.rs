//! Error types shared by every wrapper in the crate.

use std::{io, path::PathBuf};

use thiserror::Error;

use crate::context::ShaderStage;

/// Convenience alias used by all fallible operations in this crate.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Everything that can go wrong while building or drawing with GL resources.
#[derive(Error, Debug)]
pub enum Error {
    /// A shader source or image file could not be read.
    ///
    /// The OS error code, when there is one, is available through
    /// [`io::Error::raw_os_error`] on `source`.
    #[error("failed to read {}: {source}", path.display())]
    ResourceRead {
        /// The file that was being read.
        path: PathBuf,
        /// The underlying I/O failure.
        #[source]
        source: io::Error,
    },

    /// An image file was read but could not be decoded.
    #[error("failed to decode image {}: {source}", path.display())]
    Decode {
        /// The file that was being decoded (empty for in-memory data).
        path: PathBuf,
        /// The decoder's error.
        #[source]
        source: image::ImageError,
    },

    /// A shader stage failed to compile.
    #[error("{stage} shader compile error: {log}")]
    Compile {
        /// Which stage failed.
        stage: ShaderStage,
        /// The compiler's diagnostic text.
        log: String,
    },

    /// The program failed to link.
    #[error("program link error: {log}")]
    Link {
        /// The linker's diagnostic text.
        log: String,
    },

    /// A uniform name is not active in the linked program.
    #[error("uniform `{name}` not found in program")]
    UniformNotFound {
        /// The name that was looked up.
        name: String,
    },

    /// The driver refused to create an object.
    #[error("GL object creation failed: {0}")]
    Allocation(String),

    /// The GL error flag was set after a frame.
    #[error("GL error 0x{0:04X}")]
    Gl(u32),

    /// Pixel data is shorter than its dimensions and format require.
    #[error("pixel data holds {actual} bytes, {expected} needed")]
    ShortPixelData {
        /// Bytes required by width, height and format.
        expected: usize,
        /// Bytes supplied.
        actual: usize,
    },

    /// A size or count does not fit the signed 32-bit range GL expects.
    #[error("{what} ({value}) exceeds the GL integer range")]
    TooLarge {
        /// What was being converted.
        what: &'static str,
        /// The offending value.
        value: usize,
    },
}

impl From<String> for Error {
    /// glow reports object creation failures as plain strings.
    fn from(message: String) -> Self {
        Self::Allocation(message)
    }
}

/// Convert a byte size or count to the `i32` GL expects.
pub(crate) fn gl_int(what: &'static str, value: usize) -> Result<i32> {
    i32::try_from(value).map_err(|_| Error::TooLarge { what, value })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn gl_int_accepts_small_values() {
        assert!(matches!(gl_int("stride", 32), Ok(32)));
    }

    #[test]
    fn gl_int_rejects_values_past_i32_max() {
        let err = gl_int("index count", usize::MAX).unwrap_err();
        assert!(matches!(err, Error::TooLarge { what: "index count", .. }));
    }

    #[test]
    fn resource_read_keeps_os_error_code() {
        let err = Error::ResourceRead {
            path: PathBuf::from("missing.glsl"),
            source: io::Error::from_raw_os_error(2),
        };
        let Error::ResourceRead { source, .. } = &err else {
            panic!("wrong variant");
        };
        assert_eq!(source.raw_os_error(), Some(2));
        assert!(err.to_string().starts_with("failed to read missing.glsl"));
    }

    #[test]
    fn compile_error_names_the_stage() {
        let err = Error::Compile {
            stage: ShaderStage::Fragment,
            log: "0:3: syntax error".into(),
        };
        assert_eq!(
            err.to_string(),
            "fragment shader compile error: 0:3: syntax error"
        );
    }
}
