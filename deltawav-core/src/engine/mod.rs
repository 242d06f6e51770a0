//! `Session`: top-level pipeline controller.
//!
//! ## Flow
//!
//! ```text
//! Session::new(PipelineConfig)
//!     └─► run_to_path(source, path)
//!             ├─► assembler::assemble   → Assembly { pcm, report }
//!             └─► wav::encode_to_path   → <path> (atomic rename)
//! ```
//!
//! Assembly runs to completion before encoding starts. The `PcmBuffer` is
//! moved out of the assembly into the encoder; nothing else holds it.
//!
//! ## Threading
//!
//! Everything here is blocking. `run_to_path_async` moves the whole run onto
//! `tokio::task::spawn_blocking` so async callers keep their executor free.
//! The `CancelToken` can be cloned onto any thread to abort the pull loop.

pub mod assembler;

pub use assembler::{assemble, AssemblerConfig, Assembly, AssemblyReport, DecodePolicy};

use std::io::{Seek, Write};
use std::path::{Path, PathBuf};
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use tracing::{info, warn};

use crate::{
    audio::AudioFormat,
    error::{DeltawavError, Result},
    source::EventSource,
    wav,
};

/// Shared cancellation flag. Clones observe the same flag.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
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

/// Configuration for a `Session`.
#[derive(Debug, Clone, Default)]
pub struct PipelineConfig {
    pub assembler: AssemblerConfig,
    pub format: AudioFormat,
}

/// Summary of a successful run.
#[derive(Debug, Clone)]
pub struct PipelineOutcome {
    pub report: AssemblyReport,
    /// PCM bytes written into the WAV data chunk.
    pub pcm_bytes: usize,
    pub duration_secs: f64,
}

/// The pipeline handle: one config, one cancel token, any number of runs.
#[derive(Debug, Clone, Default)]
pub struct Session {
    config: PipelineConfig,
    cancel: CancelToken,
}

impl Session {
    pub fn new(config: PipelineConfig) -> Self {
        Self {
            config,
            cancel: CancelToken::new(),
        }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// A token that aborts any run of this session when cancelled.
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Run only the assembly stage.
    pub fn assemble<S: EventSource + ?Sized>(&self, source: &mut S) -> Result<Assembly> {
        assemble(source, &self.config.assembler, &self.cancel)
    }

    /// Assemble from `source` and write the WAV into `sink`.
    ///
    /// The sink is consumed and dropped on every exit path.
    pub fn run_to_writer<S, W>(&self, source: &mut S, sink: W) -> Result<PipelineOutcome>
    where
        S: EventSource + ?Sized,
        W: Write + Seek,
    {
        let Assembly { pcm, report } = self.assemble(source)?;
        wav::encode(&pcm, &self.config.format, sink)?;
        Ok(self.outcome(report, pcm.len()))
    }

    /// Assemble from `source` and atomically write the WAV to `path`.
    ///
    /// No file is created if assembly fails. If encoding fails the partial
    /// file is removed and any existing file at `path` is left untouched.
    pub fn run_to_path<S>(&self, source: &mut S, path: impl AsRef<Path>) -> Result<PipelineOutcome>
    where
        S: EventSource + ?Sized,
    {
        let path = path.as_ref();
        info!(path = %path.display(), "pipeline started");

        let Assembly { pcm, report } = self.assemble(source)?;
        wav::encode_to_path(&pcm, &self.config.format, path)?;

        let outcome = self.outcome(report, pcm.len());
        if outcome.report.is_lossless() {
            info!(
                path = %path.display(),
                bytes = outcome.pcm_bytes,
                duration_secs = outcome.duration_secs,
                "WAV written"
            );
        } else {
            warn!(
                path = %path.display(),
                bytes = outcome.pcm_bytes,
                skipped = ?outcome.report.skipped_events,
                "WAV written with skipped fragments"
            );
        }
        Ok(outcome)
    }

    /// `run_to_path` on the blocking thread pool.
    pub async fn run_to_path_async<S>(&self, mut source: S, path: PathBuf) -> Result<PipelineOutcome>
    where
        S: EventSource + 'static,
    {
        let session = self.clone();
        tokio::task::spawn_blocking(move || session.run_to_path(&mut source, &path))
            .await
            .map_err(|e| DeltawavError::TaskFailed(e.to_string()))?
    }

    fn outcome(&self, report: AssemblyReport, pcm_bytes: usize) -> PipelineOutcome {
        PipelineOutcome {
            report,
            pcm_bytes,
            duration_secs: self.config.format.duration_secs(pcm_bytes),
        }
    }
}
