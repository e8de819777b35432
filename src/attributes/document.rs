//! Attribute documents and the non-finite float convention.
//!
//! JSON has no literal for NaN or infinity, so attribute fields holding
//! `f64` values go through [`non_finite`]: finite values stay numbers,
//! non-finite values become one of the reserved string tokens below. The
//! mapping is exact in both directions: NaN keeps its sign bit, and a NaN
//! other than the default quiet one also keeps its mantissa, written as
//! `"nan(0x<hex>)"` or `"-nan(0x<hex>)"`.
//!
//! | value | token |
//! |-------|-------|
//! | `NaN` | `"nan"` |
//! | `-NaN` | `"-nan"` |
//! | `+inf` | `"inf"` |
//! | `-inf` | `"-inf"` |

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};

use crate::{Error, Result};

/// A rendered attribute value: a JSON object carrying [`TYPE_KEY`].
pub type Document = Map<String, Value>;

/// Discriminant field of every rendered attribute document.
pub const TYPE_KEY: &str = "type";

pub const NAN_TOKEN: &str = "nan";
pub const NEG_NAN_TOKEN: &str = "-nan";
pub const INF_TOKEN: &str = "inf";
pub const NEG_INF_TOKEN: &str = "-inf";

/// Failure while filling an attribute value from its document.
#[derive(Debug, thiserror::Error)]
pub enum FieldError {
    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error("field `{field}`: {reason}")]
    Invalid { field: &'static str, reason: String },
}

/// Render a serde-serializable attribute struct and stamp its type tag.
pub fn render<T: Serialize>(type_tag: &str, value: &T) -> Result<Document> {
    let rendered = serde_json::to_value(value).map_err(|e| Error::MalformedRecord {
        reason: format!("failed to render {type_tag}: {e}"),
        record: Value::Null,
    })?;
    match rendered {
        Value::Object(mut fields) => {
            fields.insert(TYPE_KEY.to_owned(), Value::String(type_tag.to_owned()));
            Ok(fields)
        }
        other => Err(Error::MalformedRecord {
            reason: format!("{type_tag} did not render to an object"),
            record: other,
        }),
    }
}

/// Parse a serde-deserializable attribute struct out of a document.
///
/// The type tag and any fields the struct does not know are ignored.
pub fn parse<T: DeserializeOwned>(document: &Document) -> std::result::Result<T, FieldError> {
    Ok(serde_json::from_value(Value::Object(document.clone()))?)
}

/// A float that serializes with the non-finite token convention.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct JsonFloat(pub f64);

impl Serialize for JsonFloat {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        non_finite::serialize(&self.0, serializer)
    }
}

impl<'de> Deserialize<'de> for JsonFloat {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        non_finite::deserialize(deserializer).map(JsonFloat)
    }
}

/// `#[serde(with = "non_finite")]` for `f64` fields.
pub mod non_finite {
    use super::*;

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Repr {
        Number(f64),
        Token(String),
    }

    const EXPONENT_BITS: u64 = 0x7ff0_0000_0000_0000;
    const MANTISSA_BITS: u64 = 0x000f_ffff_ffff_ffff;
    const SIGN_BIT: u64 = 0x8000_0000_0000_0000;
    const QUIET_NAN_MANTISSA: u64 = 0x0008_0000_0000_0000;

    /// Token for a non-finite value, `None` for finite ones.
    ///
    /// The default quiet NaN is written as a bare `"nan"`. Any other NaN
    /// carries its mantissa in hex, e.g. `"nan(0x8000000000001)"`.
    pub fn encode_token(value: f64) -> Option<String> {
        if value.is_finite() {
            return None;
        }
        let sign = if value.is_sign_negative() { "-" } else { "" };
        if value.is_infinite() {
            return Some(format!("{sign}{INF_TOKEN}"));
        }
        let mantissa = value.to_bits() & MANTISSA_BITS;
        if mantissa == QUIET_NAN_MANTISSA {
            Some(format!("{sign}{NAN_TOKEN}"))
        } else {
            Some(format!("{sign}{NAN_TOKEN}(0x{mantissa:x})"))
        }
    }

    pub fn decode_token(token: &str) -> Option<f64> {
        let (sign, body) = match token.strip_prefix('-') {
            Some(rest) => (SIGN_BIT, rest),
            None => (0, token),
        };
        let mantissa = match body {
            INF_TOKEN => 0,
            NAN_TOKEN => QUIET_NAN_MANTISSA,
            _ => {
                let hex = body.strip_prefix("nan(0x")?.strip_suffix(')')?;
                match u64::from_str_radix(hex, 16) {
                    Ok(m) if m != 0 && m <= MANTISSA_BITS => m,
                    _ => return None,
                }
            }
        };
        Some(f64::from_bits(sign | EXPONENT_BITS | mantissa))
    }

    pub fn serialize<S: Serializer>(value: &f64, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match encode_token(*value) {
            Some(token) => serializer.serialize_str(&token),
            None => serializer.serialize_f64(*value),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<f64, D::Error> {
        match Repr::deserialize(deserializer)? {
            Repr::Number(value) => Ok(value),
            Repr::Token(token) => decode_token(&token).ok_or_else(|| {
                serde::de::Error::custom(format!("unknown float token `{token}`"))
            }),
        }
    }

    /// `#[serde(with = "non_finite::array")]` for `[f64; N]` fields.
    pub mod array {
        use serde::ser::SerializeTuple;

        use super::super::JsonFloat;
        use super::*;

        pub fn serialize<S: Serializer, const N: usize>(
            values: &[f64; N],
            serializer: S,
        ) -> std::result::Result<S::Ok, S::Error> {
            let mut tuple = serializer.serialize_tuple(N)?;
            for value in values {
                tuple.serialize_element(&JsonFloat(*value))?;
            }
            tuple.end()
        }

        pub fn deserialize<'de, D: Deserializer<'de>, const N: usize>(
            deserializer: D,
        ) -> std::result::Result<[f64; N], D::Error> {
            let values: Vec<f64> = Vec::<JsonFloat>::deserialize(deserializer)?
                .into_iter()
                .map(|v| v.0)
                .collect();
            let len = values.len();
            <[f64; N]>::try_from(values)
                .map_err(|_| serde::de::Error::invalid_length(len, &"a fixed-size float array"))
        }
    }
}
