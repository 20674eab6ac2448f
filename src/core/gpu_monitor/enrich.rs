//! OS-level process enrichment.
//!
//! Looks up owner, CPU load and command line for compute processes. Lookups
//! are best effort: a process that exited or cannot be inspected is reported
//! as [`Enrichment::Unknown`] and the frame carries on.

use std::thread;

use thiserror::Error;

use super::metrics::{Enrichment, ProcessInfo, UnknownReason};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LookupError {
    #[error("process {0} no longer exists")]
    Vanished(u32),

    #[error("permission denied inspecting process {0}")]
    PermissionDenied(u32),

    #[error("lookup of process {pid} failed: {reason}")]
    Failed { pid: u32, reason: String },
}

impl LookupError {
    pub fn reason(&self) -> UnknownReason {
        match self {
            LookupError::Vanished(_) => UnknownReason::Vanished,
            LookupError::PermissionDenied(_) => UnknownReason::PermissionDenied,
            LookupError::Failed { .. } => UnknownReason::LookupFailed,
        }
    }
}

/// Source of OS metadata for a PID.
///
/// `lookup` may block for the CPU sampling window and is called from several
/// worker threads at once.
pub trait ProcessInfoSource: Sync {
    /// Called once per frame before any lookup.
    fn begin_cycle(&self) {}

    fn lookup(&self, pid: u32) -> Result<ProcessInfo, LookupError>;
}

pub fn enrich(source: &dyn ProcessInfoSource, pid: u32) -> Enrichment {
    match source.lookup(pid) {
        Ok(info) => Enrichment::Known(info),
        Err(e) => {
            log::debug!("{}", e);
            Enrichment::Unknown { reason: e.reason() }
        }
    }
}

/// Enrich `pids` on at most `workers` threads. Results keep the order of `pids`.
pub fn enrich_all(source: &dyn ProcessInfoSource, pids: &[u32], workers: usize) -> Vec<Enrichment> {
    if pids.is_empty() {
        return Vec::new();
    }

    let workers = workers.clamp(1, pids.len());
    if workers == 1 {
        return pids.iter().map(|&pid| enrich(source, pid)).collect();
    }

    let chunk_size = pids.len().div_ceil(workers);
    thread::scope(|scope| {
        let handles: Vec<_> = pids
            .chunks(chunk_size)
            .map(|chunk| {
                let handle = scope.spawn(move || {
                    chunk
                        .iter()
                        .map(|&pid| enrich(source, pid))
                        .collect::<Vec<_>>()
                });
                (chunk, handle)
            })
            .collect();

        handles
            .into_iter()
            .flat_map(|(chunk, handle)| {
                handle.join().unwrap_or_else(|_| {
                    log::error!("Process enrichment worker panicked");
                    vec![
                        Enrichment::Unknown {
                            reason: UnknownReason::LookupFailed
                        };
                        chunk.len()
                    ]
                })
            })
            .collect()
    })
}
