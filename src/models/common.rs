//! Common types shared across all models.

use serde::{Deserialize, Deserializer, Serialize};

/// Uploader or folder owner.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Upper {
    pub mid: u64,
    pub name: String,
    pub face: String,
}

/// View/favorite counters.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CntInfo {
    pub collect: u64,
    pub play: u64,
    pub danmaku: u64,
}

/// Deserialize `null` as `T::default()`.
///
/// The API sends `null` instead of `[]` for empty lists.
pub(crate) fn null_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Deserialize)]
    struct Wrapper {
        #[serde(default, deserialize_with = "null_default")]
        items: Vec<u32>,
    }

    #[test]
    fn test_null_default() {
        let w: Wrapper = serde_json::from_str(r#"{"items": null}"#).unwrap();
        assert!(w.items.is_empty());
        let w: Wrapper = serde_json::from_str(r#"{}"#).unwrap();
        assert!(w.items.is_empty());
        let w: Wrapper = serde_json::from_str(r#"{"items": [1, 2]}"#).unwrap();
        assert_eq!(w.items, vec![1, 2]);
    }

    #[test]
    fn test_upper_partial() {
        let u: Upper = serde_json::from_str(r#"{"mid": 9, "name": "up"}"#).unwrap();
        assert_eq!(u.mid, 9);
        assert_eq!(u.face, "");
    }
}
