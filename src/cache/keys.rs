//! Cache key generation.

use std::collections::BTreeMap;
use std::fmt::Display;

/// Build a stable cache key from an API action and its query parameters.
///
/// Parameters are sorted by name and joined as `k=v&k=v`, so the result does
/// not depend on the order the caller assembled them in. Without parameters
/// the key is just the action.
pub fn generate_key<I, K, V>(action: &str, params: I) -> String
where
    I: IntoIterator<Item = (K, V)>,
    K: AsRef<str>,
    V: Display,
{
    let sorted: BTreeMap<String, String> = params
        .into_iter()
        .map(|(name, value)| (name.as_ref().to_string(), value.to_string()))
        .collect();

    if sorted.is_empty() {
        return action.to_string();
    }

    let query = sorted
        .iter()
        .map(|(name, value)| format!("{name}={value}"))
        .collect::<Vec<_>>()
        .join("&");
    format!("{action}?{query}")
}

/// Key under which an entry is persisted in the backing store.
pub(crate) fn storage_key(prefix: &str, key: &str) -> String {
    format!("{prefix}{key}")
}
