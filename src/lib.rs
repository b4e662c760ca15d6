//! Thin, owning wrappers around the OpenGL objects an introductory 3D
//! renderer needs, and a frame loop that draws with them.
//!
//! The pieces, leaf first:
//!
//! - [`ShaderProgram`]: compiles a vertex and a fragment stage, links them
//!   and writes uniforms.
//! - [`VertexArray`], [`VertexBuffer`], [`ElementBuffer`] and [`Mesh`]:
//!   vertex and index storage plus attribute layout.
//! - [`Texture`]: an image file decoded and uploaded with mipmaps.
//! - [`Renderer`]: each frame clears, binds, computes model/view/projection
//!   matrices, pushes them as uniforms and issues the indexed draw call.
//!
//! # Contexts
//!
//! Every wrapper talks to GL through the [`GraphicsContext`] trait and
//! borrows the context it was created on, so no resource outlives it.
//! [`GlowContext`] drives a real context through [glow];
//! [`HeadlessContext`] tracks the same object and binding state in
//! software, for tests and for machines without a GPU.
//!
//! # Ownership and binding
//!
//! Wrappers release their GL object when dropped. Binding stays explicit
//! (`bind`/`unbind`), and every wrapper also hands out a [`Bound`] guard
//! that unbinds on every exit path.
//!
//! # Strictness
//!
//! Missing uniforms, compile and link failures and GL errors are either
//! reported or logged, per [`Strictness`].
//!
//! [glow]: https://docs.rs/glow

pub mod binding;
pub mod buffers;
pub mod config;
pub mod context;
pub mod error;
pub mod gl;
mod glsl;
pub mod headless;
pub mod logging;
pub mod render;
pub mod shaders;
pub mod texture;
pub mod transform;
pub mod types;
pub mod window;

pub use binding::{Bound, Unbind};
pub use buffers::{ElementBuffer, Mesh, VertexArray, VertexAttribute, VertexBuffer};
pub use config::{RenderConfig, Strictness, UniformNames};
pub use context::{GraphicsContext, PixelFormat, ShaderStage};
pub use error::{Error, Result};
pub use gl::GlowContext;
pub use headless::HeadlessContext;
pub use render::{FrameStats, LoopState, Renderer};
pub use shaders::ShaderProgram;
pub use texture::Texture;
pub use transform::Transforms;
pub use types::Vertex;
pub use window::{FixedTimestep, FrameClock, FrameTime, FrameTimer, Window};

pub use glam;
pub use glow;
pub use image;
