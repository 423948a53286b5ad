// src/filter/expand.rs

use serde::Deserialize;
use utoipa::IntoParams;

// Relações pedidas via `expand=...` (chaves repetidas; valores com vírgula não são divididos)
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Expand(Vec<String>);

impl Expand {
    pub fn new(values: Vec<String>) -> Self {
        Self(
            values
                .into_iter()
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .collect(),
        )
    }

    pub fn has(&self, relation: &str) -> bool {
        self.0.iter().any(|v| v == relation)
    }
}

/// Query string das leituras por ID (`GET /{id}?expand=...`).
#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ExpandParams {
    #[serde(default, alias = "expand[]")]
    pub expand: Vec<String>,
}

impl From<ExpandParams> for Expand {
    fn from(params: ExpandParams) -> Self {
        Expand::new(params.expand)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn comma_joined_value_is_not_split() {
        let expand = Expand::new(vec!["school,orders".into()]);
        assert!(!expand.has("school"));
        assert!(!expand.has("orders"));
    }

    #[test]
    fn repeated_keys_are_honoured() {
        let expand = Expand::new(vec![" school ".into(), "orders.vendor".into()]);
        assert!(expand.has("school"));
        assert!(expand.has("orders.vendor"));
        assert!(!expand.has("orders"));
    }
}
