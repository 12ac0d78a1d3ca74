//! Worker-pool settings and cancellation shared by the batch kernels.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{GeoError, Result};

/// How a batch is fanned out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "mode")]
pub enum Parallelism {
    Sequential,
    Threads {
        /// 0 uses the available parallelism
        threads: usize,
        /// Minimum number of items handed to one task
        chunk_size: usize,
    },
}

impl Default for Parallelism {
    fn default() -> Self {
        Parallelism::Sequential
    }
}

impl Parallelism {
    /// One task per item on all available cores.
    pub fn all_cores() -> Self {
        Parallelism::Threads {
            threads: 0,
            chunk_size: 1,
        }
    }
}

/// Cooperative cancellation flag, cheap to clone across threads.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Relaxed)
    }

    pub(crate) fn check(token: Option<&Self>) -> Result<()> {
        match token {
            Some(t) if t.is_cancelled() => Err(GeoError::Cancelled),
            _ => Ok(()),
        }
    }
}

/// Map `f` over `items`, keeping output slot `i` for input `i`.
///
/// The first error (or a cancellation) fails the whole batch; remaining items
/// are skipped.
pub(crate) fn map_ordered<T, R, F>(
    items: &[T],
    parallelism: Parallelism,
    cancel: Option<&CancellationToken>,
    f: F,
) -> Result<Vec<R>>
where
    T: Sync,
    R: Send,
    F: Fn(&T) -> Result<R> + Sync + Send,
{
    let task = |item: &T| {
        CancellationToken::check(cancel)?;
        f(item)
    };

    match parallelism {
        Parallelism::Sequential => items.iter().map(task).collect(),
        Parallelism::Threads {
            threads,
            chunk_size,
        } => {
            let pool = rayon::ThreadPoolBuilder::new().num_threads(threads).build()?;
            debug!(
                "Running {} items on {} threads (chunk size {})",
                items.len(),
                pool.current_num_threads(),
                chunk_size.max(1)
            );
            pool.install(|| {
                items
                    .par_iter()
                    .with_min_len(chunk_size.max(1))
                    .map(task)
                    .collect()
            })
        }
    }
}
