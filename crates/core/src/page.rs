//! Offset/limit pagination window.

use serde::Deserialize;

/// Offset/limit window applied to id-ordered listings.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Deserialize)]
pub struct Page {
    #[serde(default)]
    pub skip: u64,
    #[serde(default = "Page::default_limit")]
    pub limit: u64,
}

impl Page {
    pub const DEFAULT_LIMIT: u64 = 100;

    pub fn new(skip: u64, limit: u64) -> Self {
        Self { skip, limit }
    }

    fn default_limit() -> u64 {
        Self::DEFAULT_LIMIT
    }

    /// Apply the window to an already ordered iterator.
    pub fn apply<I: Iterator>(self, iter: I) -> impl Iterator<Item = I::Item> {
        iter.skip(usize::try_from(self.skip).unwrap_or(usize::MAX))
            .take(usize::try_from(self.limit).unwrap_or(usize::MAX))
    }
}

impl Default for Page {
    fn default() -> Self {
        Self::new(0, Self::DEFAULT_LIMIT)
    }
}
