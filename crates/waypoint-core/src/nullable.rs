//! Tri-state patch fields.
//!
//! Partial updates need to tell "field absent" from "field explicitly null".
//! Pair `Option<Option<T>>` with `#[serde(default, deserialize_with =
//! "waypoint_core::nullable::deserialize")]`: absent stays `None`, `null`
//! becomes `Some(None)`, and a value becomes `Some(Some(v))`.

use serde::{Deserialize, Deserializer};

/// Deserialize a present field (including `null`) as `Some(..)`.
pub fn deserialize<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

#[cfg(test)]
mod tests {
    use serde::Deserialize;

    #[derive(Debug, Deserialize)]
    struct Patch {
        #[serde(default, deserialize_with = "super::deserialize")]
        list_id: Option<Option<String>>,
    }

    #[test]
    fn distinguishes_absent_null_and_value() {
        let absent: Patch = serde_json::from_str("{}").unwrap();
        assert_eq!(absent.list_id, None);

        let null: Patch = serde_json::from_str(r#"{"list_id": null}"#).unwrap();
        assert_eq!(null.list_id, Some(None));

        let value: Patch = serde_json::from_str(r#"{"list_id": "l1"}"#).unwrap();
        assert_eq!(value.list_id, Some(Some("l1".to_string())));
    }
}
