use std::sync::Arc;

use rayon::prelude::*;
use smc_core::SmcError;
use tracing::{debug, warn};

/// Scatter/gather channel between the coordinator and its workers.
///
/// Workers share no mutable state. Every call is a full barrier: it returns
/// once each worker has produced its block, with blocks in rank order.
pub trait Communicator: Send + Sync {
    /// Number of workers, the coordinator's own included.
    fn size(&self) -> usize;

    /// Hands every worker its own copy of `value`, indexed by rank.
    fn broadcast<T: Clone + Send>(&self, value: &T) -> Vec<T> {
        vec![value.clone(); self.size()]
    }

    /// Runs `work(rank, block)` for every block and gathers the results in
    /// block order. The first failing block aborts the call.
    fn scatter_gather<T, R, F>(&self, blocks: Vec<Vec<T>>, work: F) -> Result<Vec<Vec<R>>, SmcError>
    where
        T: Send,
        R: Send,
        F: Fn(usize, Vec<T>) -> Result<Vec<R>, SmcError> + Send + Sync;
}

/// In-process communicator with a single worker.
#[derive(Debug, Clone, Copy, Default)]
pub struct SingleRankComm;

impl Communicator for SingleRankComm {
    fn size(&self) -> usize {
        1
    }

    fn scatter_gather<T, R, F>(&self, blocks: Vec<Vec<T>>, work: F) -> Result<Vec<Vec<R>>, SmcError>
    where
        T: Send,
        R: Send,
        F: Fn(usize, Vec<T>) -> Result<Vec<R>, SmcError> + Send + Sync,
    {
        blocks
            .into_iter()
            .enumerate()
            .map(|(rank, block)| work(rank, block))
            .collect()
    }
}

/// Worker group backed by a dedicated rayon thread pool.
#[derive(Debug, Clone)]
pub struct ThreadGroup {
    pool: Arc<rayon::ThreadPool>,
}

impl ThreadGroup {
    /// Builds a pool of `threads` workers; zero uses rayon's default size.
    pub fn new(threads: usize) -> Result<Self, rayon::ThreadPoolBuildError> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .thread_name(|index| format!("smc-worker-{index}"))
            .build()?;
        Ok(Self {
            pool: Arc::new(pool),
        })
    }
}

impl Communicator for ThreadGroup {
    fn size(&self) -> usize {
        self.pool.current_num_threads()
    }

    fn scatter_gather<T, R, F>(&self, blocks: Vec<Vec<T>>, work: F) -> Result<Vec<Vec<R>>, SmcError>
    where
        T: Send,
        R: Send,
        F: Fn(usize, Vec<T>) -> Result<Vec<R>, SmcError> + Send + Sync,
    {
        self.pool.install(|| {
            blocks
                .into_par_iter()
                .enumerate()
                .map(|(rank, block)| work(rank, block))
                .collect()
        })
    }
}

/// Communicator selected once at startup.
#[derive(Debug, Clone)]
pub enum ProcessGroup {
    /// Mutation runs on the calling thread.
    Single(SingleRankComm),
    /// Mutation fans out over a thread pool.
    Threaded(ThreadGroup),
}

impl ProcessGroup {
    /// Picks the worker group for `requested` workers (zero lets the pool
    /// decide). Falls back to a single in-process worker when the pool
    /// cannot be built or would only hold one thread.
    pub fn discover(requested: usize) -> Self {
        if requested == 1 {
            return ProcessGroup::Single(SingleRankComm);
        }
        match ThreadGroup::new(requested) {
            Ok(group) if group.size() > 1 => {
                debug!(workers = group.size(), "using threaded worker group");
                ProcessGroup::Threaded(group)
            }
            Ok(_) => ProcessGroup::Single(SingleRankComm),
            Err(err) => {
                warn!(error = %err, "worker pool unavailable, mutating in process");
                ProcessGroup::Single(SingleRankComm)
            }
        }
    }
}

impl Communicator for ProcessGroup {
    fn size(&self) -> usize {
        match self {
            ProcessGroup::Single(comm) => comm.size(),
            ProcessGroup::Threaded(comm) => comm.size(),
        }
    }

    fn scatter_gather<T, R, F>(&self, blocks: Vec<Vec<T>>, work: F) -> Result<Vec<Vec<R>>, SmcError>
    where
        T: Send,
        R: Send,
        F: Fn(usize, Vec<T>) -> Result<Vec<R>, SmcError> + Send + Sync,
    {
        match self {
            ProcessGroup::Single(comm) => comm.scatter_gather(blocks, work),
            ProcessGroup::Threaded(comm) => comm.scatter_gather(blocks, work),
        }
    }
}

/// Splits `items` into `blocks` contiguous blocks whose sizes differ by at
/// most one, the larger blocks first. Blocks past the item count are empty.
pub fn partition<T>(items: Vec<T>, blocks: usize) -> Vec<Vec<T>> {
    let blocks = blocks.max(1);
    let base = items.len() / blocks;
    let remainder = items.len() % blocks;
    let mut iter = items.into_iter();
    (0..blocks)
        .map(|rank| {
            let len = base + usize::from(rank < remainder);
            iter.by_ref().take(len).collect()
        })
        .collect()
}
