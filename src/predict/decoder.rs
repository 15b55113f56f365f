use crate::error::{PipelineError, Result};
use crate::label::{decode_label, LabelVector, PredictionResult, LABEL_LEN};

/// Decodes the first [`LABEL_LEN`] values of a raw model output.
pub fn decode(raw: &[f64]) -> Result<PredictionResult> {
    let head: [f64; LABEL_LEN] = raw
        .get(..LABEL_LEN)
        .and_then(|s| s.try_into().ok())
        .ok_or(PipelineError::OutputTooShort { got: raw.len(), expected: LABEL_LEN })?;
    Ok(decode_label(&LabelVector(head)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::label::{Gender, Race};

    #[test]
    fn decodes_raw_output() {
        let p = decode(&[0.249, 0.2, 0.8, 0.1, 0.1, 0.1, 0.1, 0.6]).unwrap();
        assert_eq!(p, PredictionResult { age: 25, gender: Gender::Female, race: Race::Others });
    }

    #[test]
    fn extra_values_are_ignored() {
        let p = decode(&[0.5, 0.9, 0.1, 0.9, 0.0, 0.0, 0.0, 0.0, 42.0]).unwrap();
        assert_eq!(p.race, Race::White);
        assert_eq!(p.gender, Gender::Male);
    }

    #[test]
    fn short_output_is_rejected() {
        match decode(&[0.1; 7]) {
            Err(PipelineError::OutputTooShort { got, expected }) => assert_eq!((got, expected), (7, 8)),
            other => panic!("unexpected: {:?}", other),
        }
        assert!(decode(&[]).is_err());
    }
}
