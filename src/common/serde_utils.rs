// src/common/serde_utils.rs

use serde::{Deserialize, Deserializer};

/// Distingue "campo ausente" (`None`) de "campo enviado como null" (`Some(None)`).
///
/// Use com `#[serde(default, deserialize_with = "double_option")]`.
pub fn double_option<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}
