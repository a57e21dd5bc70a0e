//! Background decode and export thread.
//!
//! Jobs carry a generation number. When several jobs of the same kind are
//! queued by the time the thread looks, only the newest runs (decodes for
//! the current track and for the next track count as different kinds); the engine
//! additionally discards any result whose generation is no longer the
//! latest it issued. Either way a superseded request never reaches the
//! caller.

use std::path::PathBuf;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, TryRecvError, unbounded};
use tonearm_config::LoudnessConfig;

use crate::engine::PreparedTrack;
use crate::error::{EngineError, Result};
use crate::offline::{OfflineJob, export_wav};

/// Which slot a decoded track goes into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum DecodeTarget {
    Current,
    Next,
}

/// Where encoded audio comes from.
pub(crate) enum DecodeSource {
    Bytes {
        bytes: Vec<u8>,
        extension: Option<String>,
    },
    File(PathBuf),
}

/// Work for the background thread.
pub(crate) enum Job {
    Decode {
        target: DecodeTarget,
        generation: u64,
        source: DecodeSource,
        loudness: LoudnessConfig,
    },
    Export {
        generation: u64,
        job: Box<OfflineJob>,
    },
}

/// Finished work.
pub(crate) enum JobResult {
    Decoded {
        target: DecodeTarget,
        generation: u64,
        result: Result<PreparedTrack>,
    },
    Exported {
        generation: u64,
        result: Result<Vec<u8>>,
    },
}

/// Handle to the worker thread. Dropping it joins the thread.
pub(crate) struct Worker {
    tx: Option<Sender<Job>>,
    rx: Receiver<JobResult>,
    handle: Option<JoinHandle<()>>,
}

impl Worker {
    pub(crate) fn spawn() -> Result<Self> {
        let (job_tx, job_rx) = unbounded::<Job>();
        let (result_tx, result_rx) = unbounded::<JobResult>();
        let handle = thread::Builder::new()
            .name("tonearm-worker".to_string())
            .spawn(move || worker_loop(&job_rx, &result_tx))
            .map_err(|e| EngineError::GraphInit(format!("worker thread: {e}")))?;
        Ok(Self {
            tx: Some(job_tx),
            rx: result_rx,
            handle: Some(handle),
        })
    }

    pub(crate) fn submit(&self, job: Job) {
        if let Some(tx) = &self.tx
            && tx.send(job).is_err()
        {
            tracing::error!("worker thread has exited; job dropped");
        }
    }

    pub(crate) fn try_recv(&self) -> Option<JobResult> {
        match self.rx.try_recv() {
            Ok(result) => Some(result),
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => {
                tracing::error!("worker thread disconnected");
                None
            }
        }
    }

    pub(crate) fn recv_timeout(&self, timeout: Duration) -> Option<JobResult> {
        match self.rx.recv_timeout(timeout) {
            Ok(result) => Some(result),
            Err(RecvTimeoutError::Timeout | RecvTimeoutError::Disconnected) => None,
        }
    }
}

impl Drop for Worker {
    fn drop(&mut self) {
        self.tx.take();
        if let Some(handle) = self.handle.take()
            && handle.join().is_err()
        {
            tracing::error!("worker thread panicked");
        }
    }
}

fn worker_loop(jobs: &Receiver<Job>, results: &Sender<JobResult>) {
    tracing::debug!("worker thread started");
    while let Ok(first) = jobs.recv() {
        let mut current = None;
        let mut next = None;
        let mut export = None;
        for job in std::iter::once(first).chain(jobs.try_iter()) {
            match job {
                Job::Decode {
                    target: DecodeTarget::Current,
                    ..
                } => current = Some(job),
                Job::Decode {
                    target: DecodeTarget::Next,
                    ..
                } => next = Some(job),
                Job::Export { .. } => export = Some(job),
            }
        }
        for job in current.into_iter().chain(next).chain(export) {
            if results.send(run(job)).is_err() {
                return;
            }
        }
    }
    tracing::debug!("worker thread shutting down");
}

fn run(job: Job) -> JobResult {
    match job {
        Job::Decode {
            target,
            generation,
            source,
            loudness,
        } => {
            let decoded = match source {
                DecodeSource::Bytes { bytes, extension } => {
                    tonearm_io::decode(&bytes, extension.as_deref())
                }
                DecodeSource::File(path) => tonearm_io::decode_file(&path),
            };
            let result = decoded
                .map(|audio| PreparedTrack::new(audio.into_shared(), &loudness))
                .map_err(EngineError::Decode);
            JobResult::Decoded {
                target,
                generation,
                result,
            }
        }
        Job::Export { generation, job } => JobResult::Exported {
            generation,
            result: export_wav(&job, |_| {}),
        },
    }
}
