//! Serde helpers that carry raw payload bytes as standard base64 strings.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::{Deserialize, Deserializer, Serializer};

pub fn serialize<S>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_str(&STANDARD.encode(bytes))
}

pub fn deserialize<'de, D>(deserializer: D) -> Result<Vec<u8>, D::Error>
where
    D: Deserializer<'de>,
{
    let encoded = String::deserialize(deserializer)?;
    STANDARD
        .decode(encoded.as_bytes())
        .map_err(serde::de::Error::custom)
}

/// Same encoding for `Option<Vec<u8>>`; `null` or a missing field is `None`.
pub mod option {
    use super::*;

    pub fn serialize<S>(bytes: &Option<Vec<u8>>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match bytes {
            Some(b) => serializer.serialize_some(&STANDARD.encode(b)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Vec<u8>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        Option::<String>::deserialize(deserializer)?
            .map(|encoded| {
                STANDARD
                    .decode(encoded.as_bytes())
                    .map_err(serde::de::Error::custom)
            })
            .transpose()
    }
}

#[cfg(test)]
mod tests {
    use serde::{Deserialize, Serialize};

    #[derive(Serialize, Deserialize)]
    struct Carrier {
        #[serde(with = "super")]
        data: Vec<u8>,
        #[serde(default, with = "super::option")]
        extra: Option<Vec<u8>>,
    }

    #[test]
    fn test_encodes_bytes_as_base64() {
        let c = Carrier {
            data: vec![0xDE, 0xAD, 0xBE, 0xEF],
            extra: None,
        };
        let json = serde_json::to_value(&c).unwrap();
        assert_eq!(json["data"], "3q2+7w==");
        assert!(json["extra"].is_null());
    }

    #[test]
    fn test_missing_optional_field_is_none() {
        let c: Carrier = serde_json::from_str(r#"{"data":"aGVsbG8="}"#).unwrap();
        assert_eq!(c.data, b"hello");
        assert!(c.extra.is_none());
    }

    #[test]
    fn test_rejects_invalid_base64() {
        let err = serde_json::from_str::<Carrier>(r#"{"data":"not base64!"}"#);
        assert!(err.is_err());
    }
}
