use std::collections::{hash_set, HashSet};

use crate::crawler::ApiKey;

/// The distinct API keys one module references.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CrawlerResults {
    keys: HashSet<ApiKey>,
}

impl CrawlerResults {
    /// Wraps an already deduplicated set.
    #[must_use]
    pub fn new(keys: HashSet<ApiKey>) -> Self {
        CrawlerResults { keys }
    }

    /// Returns `true` if `key` was referenced.
    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.keys.contains(key)
    }

    /// Number of distinct keys.
    #[must_use]
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// Returns `true` if the module references nothing outside itself.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// The keys in no particular order.
    pub fn iter(&self) -> hash_set::Iter<'_, ApiKey> {
        self.keys.iter()
    }

    /// The keys, sorted by their text.
    #[must_use]
    pub fn into_sorted_vec(self) -> Vec<ApiKey> {
        let mut keys: Vec<ApiKey> = self.keys.into_iter().collect();
        keys.sort_unstable();
        keys
    }

    /// Adds every key of `other`.
    pub fn merge(&mut self, other: CrawlerResults) {
        self.keys.extend(other.keys);
    }
}

impl IntoIterator for CrawlerResults {
    type Item = ApiKey;
    type IntoIter = hash_set::IntoIter<ApiKey>;

    fn into_iter(self) -> Self::IntoIter {
        self.keys.into_iter()
    }
}

impl<'a> IntoIterator for &'a CrawlerResults {
    type Item = &'a ApiKey;
    type IntoIter = hash_set::Iter<'a, ApiKey>;

    fn into_iter(self) -> Self::IntoIter {
        self.keys.iter()
    }
}

impl FromIterator<ApiKey> for CrawlerResults {
    fn from_iter<I: IntoIterator<Item = ApiKey>>(iter: I) -> Self {
        CrawlerResults {
            keys: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sorted_and_merged() {
        let mut results: CrawlerResults = ["T:B", "T:A", "T:B"]
            .into_iter()
            .map(ApiKey::from)
            .collect();
        assert_eq!(results.len(), 2);

        results.merge(["M:C.D", "T:A"].into_iter().map(ApiKey::from).collect());
        assert!(results.contains("M:C.D"));
        assert_eq!(
            results.into_sorted_vec(),
            vec![ApiKey::from("M:C.D"), ApiKey::from("T:A"), ApiKey::from("T:B")]
        );
        assert!(CrawlerResults::default().is_empty());
    }
}
