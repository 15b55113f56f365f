pub mod decoder;

pub use decoder::decode;
