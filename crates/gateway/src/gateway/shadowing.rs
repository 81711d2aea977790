use std::cmp::Reverse;
use std::collections::{HashMap, HashSet};

use crate::types::Secret;

/// Drops secrets shadowed by a same named secret declared at a deeper scope.
///
/// The result is ordered deepest scope first; secrets at the same depth keep
/// their input order. When the same name appears twice at the same depth the
/// first occurrence wins.
#[must_use]
pub fn filter_overridden_secrets(secrets: Vec<Secret>) -> Vec<Secret> {
    let mut deepest: HashMap<String, usize> = HashMap::new();
    for secret in &secrets {
        let depth = deepest.entry(secret.name.clone()).or_insert(0);
        *depth = (*depth).max(secret.depth());
    }

    let mut seen = HashSet::new();
    let mut filtered = secrets
        .into_iter()
        .filter(|secret| {
            deepest.get(&secret.name) == Some(&secret.depth()) && seen.insert(secret.name.clone())
        })
        .collect::<Vec<_>>();
    filtered.sort_by_key(|secret| Reverse(secret.depth()));
    filtered
}
