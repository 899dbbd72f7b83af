//! A gen-kill dataflow framework over [`mir`] bodies, plus the analyses the
//! borrow checker needs: move paths, the borrow set, in-scope borrows and
//! maybe-uninitialized places.

pub mod borrow_set;
pub mod drop_flag_effects;
pub mod framework;
pub mod impls;
pub mod move_paths;
pub mod places_conflict;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

pub use crate::framework::{
    Analysis, AnalysisDomain, BitSet, Engine, Forward, GenKill, GenKillAnalysis, Idx,
    JoinSemiLattice, Results, ResultsCursor, ResultsVisitor,
};

/// A hash map that iterates in insertion order; indices into it are stable.
pub type FxIndexMap<K, V> =
    indexmap::IndexMap<K, V, std::hash::BuildHasherDefault<rustc_hash::FxHasher>>;

/// The analysis was interrupted through its [`CancellationToken`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("dataflow analysis was cancelled")]
pub struct Cancelled;

/// Cooperative cancellation flag, checked between per-block work units.
/// Cloning shares the flag.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> CancellationToken {
        CancellationToken::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Relaxed)
    }

    pub fn check(&self) -> Result<(), Cancelled> {
        if self.is_cancelled() {
            Err(Cancelled)
        } else {
            Ok(())
        }
    }
}
