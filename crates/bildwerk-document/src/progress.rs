// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Progress events and cancellation shared by the batch and extraction runners.

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Something that happened during a run. Observers only read these; nothing
/// a runner does depends on who is listening.
#[derive(Debug, Clone, PartialEq)]
pub enum ProgressEvent {
    DocumentStarted {
        path: PathBuf,
        /// 0-based position in the batch.
        index: usize,
        total: usize,
    },
    RuleApplied {
        path: PathBuf,
        rule_index: usize,
        /// 1-based page the image went to.
        page: usize,
    },
    DocumentFinished {
        path: PathBuf,
        succeeded: bool,
    },
    ImageExtracted {
        path: PathBuf,
        /// 1-based source page.
        page: usize,
    },
}

/// Receives progress events. Any `Fn(&ProgressEvent)` closure is an observer.
pub trait ProgressObserver: Sync {
    fn on_event(&self, event: &ProgressEvent);
}

impl<F> ProgressObserver for F
where
    F: Fn(&ProgressEvent) + Sync,
{
    fn on_event(&self, event: &ProgressEvent) {
        self(event)
    }
}

/// Observer that ignores everything.
pub struct Silent;

impl ProgressObserver for Silent {
    fn on_event(&self, _event: &ProgressEvent) {}
}

/// Cancellation request shared between a runner and whoever controls it.
/// Runners only look at it between documents.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[test]
    fn closures_observe_events() {
        let seen = Mutex::new(Vec::new());
        let observer = |event: &ProgressEvent| seen.lock().unwrap().push(event.clone());
        observer.on_event(&ProgressEvent::ImageExtracted {
            path: PathBuf::from("a.pdf"),
            page: 2,
        });
        assert_eq!(seen.lock().unwrap().len(), 1);
    }

    #[test]
    fn cancel_is_shared_between_clones() {
        let flag = CancelFlag::new();
        let handle = flag.clone();
        assert!(!flag.is_cancelled());
        handle.cancel();
        assert!(flag.is_cancelled());
    }
}
