//! Harvest coordinator - main run orchestration logic
//!
//! This module drives one run through its phases:
//! - Discovering item URLs
//! - Extracting records, with checkpoints every N records
//! - Finalizing (structured and tabular artifacts)
//! - Interrupted / Failed terminal paths that flush partial progress

use crate::config::{Config, DelayRange};
use crate::crawler::discovery::Discoverer;
use crate::crawler::extractor::Extractor;
use crate::crawler::fetcher::Fetcher;
use crate::crawler::pacing::{Sleeper, TokioSleeper};
use crate::output::{ArtifactNamer, FilePersistence, Persistence};
use crate::record::ItemRecord;
use crate::state::RunPhase;
use crate::{Result, SillageError};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Summary of a finished run
#[derive(Debug, Clone)]
pub struct RunReport {
    /// Terminal phase the run ended in
    pub outcome: RunPhase,

    /// Number of item URLs discovered
    pub discovered: usize,

    /// Number of records extracted
    pub records: usize,

    /// Number of discovered URLs that produced no record
    pub skipped: usize,

    /// Artifacts written, in order
    pub artifacts: Vec<PathBuf>,
}

/// Main harvest coordinator
///
/// Owns the result collection for the duration of one run; nothing else
/// appends to it.
pub struct Coordinator<P: Persistence> {
    discoverer: Discoverer,
    extractor: Extractor,
    persistence: P,
    namer: ArtifactNamer,
    sleeper: Arc<dyn Sleeper>,
    cancel: CancellationToken,
    keys: Vec<String>,
    checkpoint_interval: usize,
    between_items: DelayRange,
    phase: RunPhase,
    records: Vec<ItemRecord>,
    artifacts: Vec<PathBuf>,
    discovered: usize,
    skipped: usize,
}

impl Coordinator<FilePersistence> {
    /// Creates a coordinator writing artifacts to the configured directory
    /// and sleeping on the tokio timer
    pub fn from_config(config: &Config, cancel: CancellationToken) -> Result<Self> {
        Self::new(config, FilePersistence::new(), Arc::new(TokioSleeper), cancel)
    }
}

impl<P: Persistence> Coordinator<P> {
    /// Creates a new coordinator
    ///
    /// # Arguments
    ///
    /// * `config` - The harvester configuration
    /// * `persistence` - Sink for checkpoint and final artifacts
    /// * `sleeper` - Used for every wait the run takes
    /// * `cancel` - Tripped externally to interrupt the run
    pub fn new(
        config: &Config,
        persistence: P,
        sleeper: Arc<dyn Sleeper>,
        cancel: CancellationToken,
    ) -> Result<Self> {
        let fetcher = Arc::new(
            Fetcher::from_config(config, Arc::clone(&sleeper))?.with_cancel(cancel.clone()),
        );
        let discoverer = Discoverer::new(Arc::clone(&fetcher), config, Arc::clone(&sleeper))?;
        let extractor = Extractor::new(fetcher, config);
        let namer = ArtifactNamer::now(&config.output.directory, &config.output.artifact_stem);

        Ok(Self {
            discoverer,
            extractor,
            persistence,
            namer,
            sleeper,
            cancel,
            keys: config.discovery.keys.clone(),
            checkpoint_interval: config.output.checkpoint_interval,
            between_items: config.delays.between_items,
            phase: RunPhase::Discovering,
            records: Vec::new(),
            artifacts: Vec::new(),
            discovered: 0,
            skipped: 0,
        })
    }

    /// Artifact names used by this run
    pub fn namer(&self) -> &ArtifactNamer {
        &self.namer
    }

    /// Runs the harvest to a terminal phase
    ///
    /// Never fails: per-item faults are skipped, and run-level faults end in
    /// `Failed` after a best-effort write of whatever was collected.
    pub async fn run(mut self) -> RunReport {
        tracing::info!("Starting harvest run {}", self.namer.stamp());

        if let Err(e) = self.drive().await {
            self.fail(&e);
        }

        tracing::info!(
            "Run {} ended {}: {} records from {} discovered URLs ({} skipped)",
            self.namer.stamp(),
            self.phase,
            self.records.len(),
            self.discovered,
            self.skipped
        );

        RunReport {
            outcome: self.phase,
            discovered: self.discovered,
            records: self.records.len(),
            skipped: self.skipped,
            artifacts: self.artifacts,
        }
    }

    async fn drive(&mut self) -> Result<()> {
        let urls = self.discoverer.discover_all(&self.keys, &self.cancel).await;
        self.discovered = urls.len();
        tracing::info!("Total item URLs discovered: {}", urls.len());

        if self.cancel.is_cancelled() {
            return self.interrupt();
        }

        self.enter(RunPhase::Extracting)?;

        for (index, url) in urls.iter().enumerate() {
            if self.cancel.is_cancelled() {
                return self.interrupt();
            }

            tracing::info!("Processing item {} of {}: {}", index + 1, urls.len(), url);

            match self.extractor.extract(url).await {
                Ok(Some(record)) => {
                    self.records.push(record);
                    self.checkpoint_if_due();
                    self.pause_between_items().await;
                }
                Ok(None) if self.cancel.is_cancelled() => {}
                Ok(None) => {
                    self.skipped += 1;
                }
                Err(e) => {
                    self.skipped += 1;
                    tracing::error!("Error processing {}: {}", url, e);
                }
            }
        }

        if self.cancel.is_cancelled() {
            return self.interrupt();
        }

        self.enter(RunPhase::Finalizing)?;
        self.finalize()?;
        self.enter(RunPhase::Completed)
    }

    fn enter(&mut self, next: RunPhase) -> Result<()> {
        self.phase = self.phase.transition(next)?;
        tracing::debug!("Run phase: {}", self.phase);
        Ok(())
    }

    /// Writes a checkpoint when the record count is a multiple of the interval
    ///
    /// A failed checkpoint is logged; the run continues.
    fn checkpoint_if_due(&mut self) {
        let count = self.records.len();
        if count == 0 || count % self.checkpoint_interval != 0 {
            return;
        }

        let path = self.namer.checkpoint(count);
        match self.persistence.write_structured(&self.records, &path) {
            Ok(()) => {
                tracing::info!("Checkpoint saved: {}", path.display());
                self.artifacts.push(path);
            }
            Err(e) => tracing::error!("Checkpoint {} failed: {}", path.display(), e),
        }
    }

    /// Politeness delay after an extracted item; returns early on cancellation
    async fn pause_between_items(&self) {
        let wait = self.between_items.sample();
        if wait == Duration::ZERO {
            return;
        }
        tokio::select! {
            _ = self.sleeper.sleep(wait) => {}
            _ = self.cancel.cancelled() => {}
        }
    }

    fn finalize(&mut self) -> Result<()> {
        let structured = self.namer.final_structured();
        self.persistence.write_structured(&self.records, &structured)?;
        self.artifacts.push(structured);

        let tabular = self.namer.final_tabular();
        self.persistence.write_tabular(&self.records, &tabular)?;
        self.artifacts.push(tabular);

        tracing::info!(
            "Harvest completed, {} records saved",
            self.records.len()
        );
        Ok(())
    }

    /// Moves to `Interrupted` and flushes the collection so far
    fn interrupt(&mut self) -> Result<()> {
        self.enter(RunPhase::Interrupted)?;
        tracing::warn!(
            "Interruption detected, saving {} records",
            self.records.len()
        );

        let path = self.namer.interrupted();
        match self.persistence.write_structured(&self.records, &path) {
            Ok(()) => self.artifacts.push(path),
            Err(e) => tracing::error!("Could not save interrupted run to {}: {}", path.display(), e),
        }
        Ok(())
    }

    /// Moves to `Failed` and, if anything was collected, writes the error artifact
    fn fail(&mut self, error: &SillageError) {
        tracing::error!("Run failed in phase {}: {}", self.phase, error);

        if self.phase.can_transition_to(RunPhase::Failed) {
            self.phase = RunPhase::Failed;
        }

        if self.records.is_empty() {
            return;
        }

        let path = self.namer.error();
        match self.persistence.write_structured(&self.records, &path) {
            Ok(()) => self.artifacts.push(path),
            Err(e) => tracing::error!("Could not save error artifact {}: {}", path.display(), e),
        }
    }
}
