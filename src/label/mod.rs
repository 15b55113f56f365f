pub mod codec;

pub use codec::{
    decode_label, encode_label, parse_label, try_parse_label, Gender, LabelTriple, LabelVector,
    PredictionResult, Race, LABEL_LEN,
};
