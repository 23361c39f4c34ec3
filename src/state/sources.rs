use std::collections::BTreeSet;

/// Deduplicated set of source subreddits
///
/// Names iterate in sorted order so probe order and the aggregate feed are
/// stable from run to run. Only subreddit validation removes entries.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SourceList {
    names: BTreeSet<String>,
}

impl SourceList {
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            names: names
                .into_iter()
                .map(Into::into)
                .filter(|name: &String| !name.is_empty())
                .collect(),
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names.contains(name)
    }

    /// Removes a subreddit; returns whether it was present
    pub fn remove(&mut self, name: &str) -> bool {
        self.names.remove(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(String::as_str)
    }

    /// Snapshot of the current names, safe to iterate while removing
    pub fn names(&self) -> Vec<String> {
        self.names.iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Builds the multireddit expression `a+b+c`
    pub fn feed_expression(&self) -> String {
        self.names
            .iter()
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join("+")
    }
}
