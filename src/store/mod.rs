pub mod repo;
pub mod text;

pub use repo::{WatermarkStore, Watermarks};
pub use text::TextWatermarkStore;
