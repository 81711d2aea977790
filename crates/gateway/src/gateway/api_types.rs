use std::collections::BTreeMap;

use serde::Deserialize;

use crate::types::SecretType;

/// First value of `key` in a decoded query string.
pub(super) fn first_query_value<'a>(params: &'a [(String, String)], key: &str) -> Option<&'a str> {
    params
        .iter()
        .find(|(name, _)| name == key)
        .map(|(_, value)| value.as_str())
}

#[derive(Debug, Default, Deserialize)]
pub(super) struct SecretsQuery {
    pub(super) tree: Option<String>,
    pub(super) removeoverridden: Option<String>,
}

impl SecretsQuery {
    /// Flags are set by presence, e.g. `?tree&removeoverridden`.
    pub(super) fn tree(&self) -> bool {
        flag(self.tree.as_deref())
    }

    pub(super) fn remove_overridden(&self) -> bool {
        flag(self.removeoverridden.as_deref())
    }
}

fn flag(value: Option<&str>) -> bool {
    value.is_some_and(|value| !value.eq_ignore_ascii_case("false") && value != "0")
}

#[derive(Debug, Deserialize)]
pub(super) struct CreateUpdateSecretBody {
    pub(super) name: String,
    #[serde(rename = "type", default)]
    pub(super) secret_type: SecretType,
    #[serde(default)]
    pub(super) data: BTreeMap<String, String>,
    #[serde(default)]
    pub(super) secret_provider_id: Option<String>,
    #[serde(default)]
    pub(super) path: Option<String>,
}
