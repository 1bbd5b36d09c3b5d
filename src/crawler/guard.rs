use std::cell::Cell;

use crate::{Error::RecursionLimit, Result};

/// Counts one level of crawl nesting while alive.
///
/// Entering fails once the counter is above `limit`; dropping the guard gives the level back,
/// on early returns and `?` alike.
pub(crate) struct DepthGuard<'a> {
    depth: &'a Cell<usize>,
}

impl<'a> DepthGuard<'a> {
    pub(crate) fn enter(depth: &'a Cell<usize>, limit: usize) -> Result<Self> {
        if depth.get() > limit {
            return Err(RecursionLimit(limit));
        }

        depth.set(depth.get() + 1);
        Ok(DepthGuard { depth })
    }
}

impl Drop for DepthGuard<'_> {
    fn drop(&mut self) {
        self.depth.set(self.depth.get().saturating_sub(1));
    }
}
