//! Cycle scheduler over the unprocessed-note queue.
//!
//! # Responsibility
//! - Perform at most one unit of work per [`Scheduler::cycle`] call.
//! - Offer the looping policies callers choose from: drain, fixed
//!   iteration count and fixed-delay polling.
//!
//! # Invariants
//! - Unprocessed notes are served before reprocess candidates, oldest first.
//! - A failed unit of work is recorded as the note's `processing_error`
//!   and the note is marked processed; it is never retried automatically.
//! - A reprocess candidate never keeps its flag after its cycle, so a drain
//!   always terminates.
//! - Instances are not coordinated: two schedulers on one store can pick
//!   the same note.

use crate::config::ProcessorSettings;
use crate::error::{ProcessError, ProcessResult};
use crate::llm::ToolGateway;
use crate::model::RecordId;
use crate::repo::Store;
use crate::service::processor::{NoteProcessor, ProcessReport};
use log::{error, info, warn};
use std::time::Duration;

/// Result of one [`Scheduler::cycle`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CycleOutcome {
    /// Nothing was waiting.
    Idle,
    Processed(ProcessReport),
    Reprocessed(ProcessReport),
    /// The unit of work failed; the message is stored on the note.
    Failed { note_id: RecordId, error: String },
}

impl CycleOutcome {
    pub fn did_work(&self) -> bool {
        !matches!(self, Self::Idle)
    }
}

pub struct Scheduler<'a, S: Store + ?Sized, G: ToolGateway + ?Sized> {
    store: &'a S,
    processor: NoteProcessor<'a, S, G>,
    settings: ProcessorSettings,
}

impl<'a, S: Store + ?Sized, G: ToolGateway + ?Sized> Scheduler<'a, S, G> {
    pub fn new(store: &'a S, gateway: &'a G, settings: ProcessorSettings) -> Self {
        Self {
            store,
            processor: NoteProcessor::new(store, gateway, settings),
            settings,
        }
    }

    /// Runs one unit of work.
    ///
    /// # Errors
    /// Only storage failures that prevent recording the outcome.
    pub fn cycle(&self) -> ProcessResult<CycleOutcome> {
        if let Some(note) = self.store.next_unprocessed_note()? {
            let note_id = note.id;
            return match self.processor.process(note) {
                Ok(report) => Ok(CycleOutcome::Processed(report)),
                Err(err) => self.record_failure(note_id, err),
            };
        }

        if !self.settings.reprocess {
            return Ok(CycleOutcome::Idle);
        }
        let Some(annotation) = self.store.next_reprocess_candidate()? else {
            return Ok(CycleOutcome::Idle);
        };
        let annotation_id = annotation.id;
        let note_id = annotation.note_id;
        let outcome = match self.processor.reprocess(annotation) {
            Ok(report) => CycleOutcome::Reprocessed(report),
            Err(err) => self.record_failure(note_id, err)?,
        };
        self.clear_stale_flag(annotation_id)?;
        Ok(outcome)
    }

    /// Cycles until idle or `max_units` units of work; returns units done.
    pub fn drain(&self, max_units: Option<usize>) -> ProcessResult<usize> {
        let mut done = 0;
        while max_units.map_or(true, |max| done < max) {
            if !self.cycle()?.did_work() {
                break;
            }
            done += 1;
        }
        info!("event=scheduler_drain module=scheduler status=ok units={done}");
        Ok(done)
    }

    /// Calls `cycle` exactly `iterations` times; returns units of work done.
    pub fn run_iterations(&self, iterations: usize) -> ProcessResult<usize> {
        let mut done = 0;
        for _ in 0..iterations {
            if self.cycle()?.did_work() {
                done += 1;
            }
        }
        Ok(done)
    }

    /// Polls forever, sleeping `interval` whenever a cycle finds no work,
    /// until `should_stop` returns true.
    pub fn run_polling<F>(&self, interval: Duration, mut should_stop: F) -> ProcessResult<usize>
    where
        F: FnMut() -> bool,
    {
        let mut done = 0;
        while !should_stop() {
            if self.cycle()?.did_work() {
                done += 1;
            } else {
                std::thread::sleep(interval);
            }
        }
        Ok(done)
    }

    fn record_failure(&self, note_id: RecordId, err: ProcessError) -> ProcessResult<CycleOutcome> {
        error!(
            "event=cycle_failure module=scheduler status=error note_id={} code={}",
            note_id,
            err.code()
        );
        let message = err.to_string();
        let Some(mut note) = self.store.get_note(note_id)? else {
            return Err(err);
        };
        note.record_error(&message);
        note.processed = true;
        self.store.save_note(&note)?;
        Ok(CycleOutcome::Failed {
            note_id,
            error: message,
        })
    }

    fn clear_stale_flag(&self, annotation_id: RecordId) -> ProcessResult<()> {
        if let Some(mut annotation) = self.store.get_annotation(annotation_id)? {
            if annotation.reprocess {
                warn!(
                    "event=reprocess_clear module=scheduler status=skip annotation_id={} reason=not_regenerated",
                    annotation.id
                );
                annotation.reprocess = false;
                self.store.save_annotation(&annotation)?;
            }
        }
        Ok(())
    }
}
