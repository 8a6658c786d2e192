//! Image reductions behind BlockCam's block scenes.
//!
//! [`Reducer::pixellate`] averages fixed-size blocks of a photo, and
//! [`Reducer::find_edges`] bounds everything that differs from a background
//! color. Both run as wgpu compute dispatches, with a rayon CPU path when no
//! GPU is available.

pub mod config;
pub mod error;
pub mod gpu;
pub mod processing;
pub mod reducer;

pub use error::{InitializationError, ReduceError};
pub use gpu::{GpuContext, GpuOptions, PowerPreference};
pub use processing::color::Color;
pub use processing::extents::{EdgeExtents, ScanningParameters};
pub use processing::grid::{BlockGrid, BlockSize, CellRect};
pub use processing::pixellation::Pixellation;
pub use processing::source::SourceImage;
pub use reducer::{Backend, Reducer, ReducerConfig};
