//! Platform-free core of the kaleidoscope: parameter state, signal fusion,
//! pattern synthesis, wedge compositing and the lattice mirror mapping.

pub mod color;
pub mod compositor;
pub mod constants;
pub mod driver;
pub mod error;
pub mod gesture;
pub mod lattice;
pub mod params;
pub mod pattern;
pub mod raster;
pub mod resource;
pub mod signal;
pub mod store;

pub use color::*;
pub use compositor::*;
pub use driver::*;
pub use error::*;
pub use gesture::*;
pub use lattice::*;
pub use params::*;
pub use pattern::synthesize;
pub use raster::{BlendMode, Canvas2d, Pixmap, RadialGradient, Raster};
pub use resource::*;
pub use signal::*;
pub use store::*;

// Shaders bundled as string constants
pub static HEX_MIRROR_WGSL: &str = include_str!("../shaders/hex_mirror.wgsl");
pub static PRESENT_WGSL: &str = include_str!("../shaders/present.wgsl");
