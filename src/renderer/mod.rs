//! Rendering module
//!
//! `frame` paints the scene into a CPU pixel buffer at logical resolution;
//! `present` pushes that buffer to the canvas through WebGPU.

pub mod frame;
pub mod present;

pub use frame::{Framebuffer, render};
pub use present::PixelPresenter;
