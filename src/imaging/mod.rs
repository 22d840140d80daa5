//! Image decoding, resizing and encoding.
//!
//! | Operation | Crate / function |
//! |---|---|
//! | **Decode** | `image::ImageReader` (AVIF: `avif-parse` + `rav1d`) |
//! | **Resize** | `resize_exact` with Lanczos3 |
//! | **Encode** | [`RustBackend`] in-process, or [`SquooshBackend`] via subprocess |
//!
//! The module is split into:
//! - **Calculations**: Pure functions for dimension and quality math (unit testable)
//! - **Parameters**: Data structures describing one encode
//! - **Backend**: [`ImageBackend`] trait and the two strategies implementing it
//! - **Operations**: Decode, planning and pixel preparation shared by both strategies

mod avif_decode;
pub mod backend;
mod calculations;
pub mod operations;
mod params;
pub mod rust_backend;
pub mod squoosh;

pub use backend::{BackendError, Dimensions, ImageBackend, SourceImage};
pub use calculations::{avif_cq_level, scale_dimensions};
pub use operations::{load_source, plan_encode};
pub use params::{EncodeParams, Quality, Speed};
pub use rust_backend::RustBackend;
pub use squoosh::SquooshBackend;
