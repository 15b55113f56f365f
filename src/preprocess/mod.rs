pub mod normalize;

pub use normalize::{normalize, normalize_with, ImageConfig, ImageTensor};
