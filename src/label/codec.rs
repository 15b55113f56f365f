use serde::{Deserialize, Serialize};

use crate::error::{PipelineError, Result};

/// Number of values in an encoded label: age (1) + gender (2) + race (5).
pub const LABEL_LEN: usize = 8;

const GENDER_OFFSET: usize = 1;
const RACE_OFFSET: usize = 3;
const RACE_CLASSES: usize = 5;

/// Raw label codes as they appear in a file name, not range-checked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelTriple {
    pub age: i64,
    pub gender: i64,
    pub race: i64,
}

/// `[age / 100, gender one-hot (2), race one-hot (5)]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LabelVector(pub [f64; LABEL_LEN]);

impl LabelVector {
    pub fn as_slice(&self) -> &[f64] {
        &self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Gender {
    Male,
    Female,
}

/// Race classes in one-hot index order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Race {
    White,
    Black,
    Asian,
    Indian,
    Others,
}

impl Race {
    pub const ALL: [Race; RACE_CLASSES] =
        [Race::White, Race::Black, Race::Asian, Race::Indian, Race::Others];

    pub fn index(self) -> usize {
        self as usize
    }
}

/// Human-readable decoding of one model output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PredictionResult {
    pub age: i64,
    pub gender: Gender,
    pub race: Race,
}

impl PredictionResult {
    /// Maps the decoded classes back to file-name codes (Male = 0, Female = 1).
    pub fn to_triple(&self) -> LabelTriple {
        LabelTriple {
            age: self.age,
            gender: match self.gender {
                Gender::Male => 0,
                Gender::Female => 1,
            },
            race: self.race.index() as i64,
        }
    }
}

/// Parses `<age>_<gender>_<race>[_<anything>]` from a file name.
///
/// Each field is read as an integer prefix, so `25_0_2.jpg` parses with race
/// `2`. Values are not range-checked here; see [`encode_label`].
pub fn parse_label(filename: &str) -> Option<LabelTriple> {
    let mut parts = filename.split('_');
    let age = parse_int_prefix(parts.next()?)?;
    let gender = parse_int_prefix(parts.next()?)?;
    let race = parse_int_prefix(parts.next()?)?;
    Some(LabelTriple { age, gender, race })
}

/// Like [`parse_label`] but reports the offending name as an error.
pub fn try_parse_label(filename: &str) -> Result<LabelTriple> {
    parse_label(filename).ok_or_else(|| PipelineError::Parse(filename.to_owned()))
}

/// Encodes a triple as a [`LabelVector`].
///
/// Age is divided by 100 without clamping. Any gender code other than `0`
/// encodes as female. A race code outside `0..=4` is an error.
pub fn encode_label(triple: &LabelTriple) -> Result<LabelVector> {
    let race = usize::try_from(triple.race)
        .ok()
        .filter(|&r| r < RACE_CLASSES)
        .ok_or(PipelineError::RaceOutOfRange { code: triple.race })?;

    let mut v = [0.0; LABEL_LEN];
    v[0] = triple.age as f64 / 100.0;
    if triple.gender == 0 {
        v[GENDER_OFFSET] = 1.0;
    } else {
        v[GENDER_OFFSET + 1] = 1.0;
    }
    v[RACE_OFFSET + race] = 1.0;
    Ok(LabelVector(v))
}

/// Decodes a label vector (or raw model output of the same layout).
pub fn decode_label(vector: &LabelVector) -> PredictionResult {
    let v = &vector.0;
    let age = round_half_up(v[0] * 100.0);
    let gender = if v[GENDER_OFFSET] > v[GENDER_OFFSET + 1] {
        Gender::Male
    } else {
        Gender::Female
    };
    let race = Race::ALL[first_argmax(&v[RACE_OFFSET..RACE_OFFSET + RACE_CLASSES])];
    PredictionResult { age, gender, race }
}

/// Reads an optionally signed run of ASCII digits at the start of `s`
/// (after leading whitespace) and ignores whatever follows.
fn parse_int_prefix(s: &str) -> Option<i64> {
    let s = s.trim_start();
    let (sign, rest) = match s.as_bytes().first() {
        Some(b'-') => (-1, &s[1..]),
        Some(b'+') => (1, &s[1..]),
        _ => (1, s),
    };
    let digits = rest.bytes().take_while(u8::is_ascii_digit).count();
    if digits == 0 {
        return None;
    }
    rest[..digits].parse::<i64>().ok().map(|n| sign * n)
}

/// Rounds .5 towards positive infinity.
fn round_half_up(x: f64) -> i64 {
    (x + 0.5).floor() as i64
}

/// Index of the maximum; ties resolve to the earliest index.
fn first_argmax(values: &[f64]) -> usize {
    let mut best = 0;
    for (i, &x) in values.iter().enumerate().skip(1) {
        if x > values[best] {
            best = i;
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_utk_style_name() {
        let t = parse_label("37_1_2_20170116174525125.jpg.chip.jpg").unwrap();
        assert_eq!(t, LabelTriple { age: 37, gender: 1, race: 2 });
    }

    #[test]
    fn trailing_fields_are_ignored() {
        let t = parse_label("5_0_4_a_b_c_d.png").unwrap();
        assert_eq!(t, LabelTriple { age: 5, gender: 0, race: 4 });
    }

    #[test]
    fn integer_prefix_of_third_field() {
        let t = parse_label("25_0_2.jpg").unwrap();
        assert_eq!(t.race, 2);
    }

    #[test]
    fn fewer_than_three_parts_is_none() {
        assert_eq!(parse_label("37_1.jpg"), None);
        assert_eq!(parse_label("photo.jpg"), None);
        assert_eq!(parse_label(""), None);
    }

    #[test]
    fn non_numeric_field_is_none() {
        assert_eq!(parse_label("abc_1_2_x.jpg"), None);
        assert_eq!(parse_label("37__2_x.jpg"), None);
        assert_eq!(parse_label("37_1_-_x.jpg"), None);
    }

    #[test]
    fn ranges_are_not_validated_while_parsing() {
        let t = parse_label("-4_7_9_x.jpg").unwrap();
        assert_eq!(t, LabelTriple { age: -4, gender: 7, race: 9 });
    }

    #[test]
    fn try_parse_reports_the_name() {
        match try_parse_label("bad.jpg") {
            Err(PipelineError::Parse(name)) => assert_eq!(name, "bad.jpg"),
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn encodes_age_gender_race() {
        let v = encode_label(&LabelTriple { age: 37, gender: 1, race: 2 }).unwrap();
        assert!((v.0[0] - 0.37).abs() < 1e-12);
        assert_eq!(&v.0[1..3], &[0.0, 1.0]);
        assert_eq!(&v.0[3..8], &[0.0, 0.0, 1.0, 0.0, 0.0]);
    }

    #[test]
    fn gender_zero_is_male_anything_else_female() {
        let male = encode_label(&LabelTriple { age: 1, gender: 0, race: 0 }).unwrap();
        let other = encode_label(&LabelTriple { age: 1, gender: 3, race: 0 }).unwrap();
        assert_eq!(&male.0[1..3], &[1.0, 0.0]);
        assert_eq!(&other.0[1..3], &[0.0, 1.0]);
    }

    #[test]
    fn age_is_not_clamped() {
        let old = encode_label(&LabelTriple { age: 116, gender: 0, race: 0 }).unwrap();
        let neg = encode_label(&LabelTriple { age: -3, gender: 0, race: 0 }).unwrap();
        assert!((old.0[0] - 1.16).abs() < 1e-12);
        assert!((neg.0[0] + 0.03).abs() < 1e-12);
    }

    #[test]
    fn race_outside_domain_is_an_error() {
        for code in [5, -1, 100] {
            match encode_label(&LabelTriple { age: 20, gender: 0, race: code }) {
                Err(PipelineError::RaceOutOfRange { code: c }) => assert_eq!(c, code),
                other => panic!("race {} gave {:?}", code, other),
            }
        }
        assert!(encode_label(&LabelTriple { age: 20, gender: 0, race: 4 }).is_ok());
    }

    #[test]
    fn decode_recovers_encoded_label() {
        let v = encode_label(&LabelTriple { age: 37, gender: 1, race: 2 }).unwrap();
        let p = decode_label(&v);
        assert_eq!(p, PredictionResult { age: 37, gender: Gender::Female, race: Race::Asian });
    }

    #[test]
    fn decode_rounds_half_up() {
        let mut v = [0.0; LABEL_LEN];
        v[0] = 0.375;
        assert_eq!(decode_label(&LabelVector(v)).age, 38);
        v[0] = 0.3749;
        assert_eq!(decode_label(&LabelVector(v)).age, 37);
    }

    #[test]
    fn decode_ties_pick_female_and_first_race() {
        let v = LabelVector([0.5, 0.4, 0.4, 0.2, 0.9, 0.9, 0.1, 0.0]);
        let p = decode_label(&v);
        assert_eq!(p.gender, Gender::Female);
        assert_eq!(p.race, Race::Black);
    }

    #[test]
    fn soft_outputs_decode_by_argmax() {
        let v = LabelVector([0.612, 0.7, 0.3, 0.1, 0.05, 0.1, 0.6, 0.15]);
        let p = decode_label(&v);
        assert_eq!(p, PredictionResult { age: 61, gender: Gender::Male, race: Race::Indian });
    }

    #[test]
    fn encode_decode_encode_is_stable_for_integer_ages() {
        let triple = LabelTriple { age: 42, gender: 0, race: 4 };
        let first = encode_label(&triple).unwrap();
        let again = encode_label(&decode_label(&first).to_triple()).unwrap();
        for (a, b) in first.0.iter().zip(again.0.iter()) {
            assert!((a - b).abs() < 1e-9);
        }
    }

    #[test]
    fn fractional_age_is_lost_to_rounding() {
        let v = LabelVector([0.376, 1.0, 0.0, 0.0, 0.0, 0.0, 1.0, 0.0]);
        let decoded = decode_label(&v);
        assert_eq!(decoded.age, 38);
        let again = encode_label(&decoded.to_triple()).unwrap();
        assert!((again.0[0] - 0.38).abs() < 1e-12);
        assert_eq!(&again.0[1..], &v.0[1..]);
    }
}
