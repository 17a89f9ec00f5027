// EveTranslator - app/pipeline.rs
//
// The shared message pipeline and the worker thread that runs it.
//
// Every session sends its line batches to one worker, so at most one line is
// parsed, classified and translated at a time. Sessions never wait on the
// worker: they only push onto an unbounded mpsc channel. Within one session
// the channel preserves file order.
//
// Per line: parse -> tokenize links -> classify -> translate or pass
// through -> restore links -> AppEvent::MessageReady. A rejected line is
// dropped silently; nothing that happens to one line affects the next.

use crate::app::translator::TranslationService;
use crate::core::detector::{LanguageDetector, Verdict};
use crate::core::model::{AppEvent, PipelineConfig, SessionKind};
use crate::core::{parser, tokenizer};
use crate::util::constants::{DEBUG_MAX_LINE_PREVIEW, DISPLAY_TIMESTAMP_FORMAT};
use std::panic::{self, AssertUnwindSafe};
use std::sync::mpsc;
use std::thread::JoinHandle;

/// Work accepted by the pipeline worker.
#[derive(Debug)]
pub enum WorkItem {
    /// New transcript lines from one session, in file order.
    Lines {
        session: SessionKind,
        lines: Vec<String>,
    },
    /// Replace the language settings and possibly the provider.
    Reconfigure(PipelineConfig),
    /// Finish queued work and exit.
    Shutdown,
}

// =============================================================================
// Pipeline
// =============================================================================

/// Parser, tokenizer, detector and translator bundled for one worker.
pub struct MessagePipeline {
    detector: LanguageDetector,
    translator: TranslationService,
    config: PipelineConfig,
}

impl MessagePipeline {
    pub fn new(
        detector: LanguageDetector,
        translator: TranslationService,
        config: PipelineConfig,
    ) -> Self {
        Self {
            detector,
            translator,
            config,
        }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn reconfigure(&mut self, config: PipelineConfig) {
        tracing::info!(
            target_language = %config.target_language,
            ignored = config.ignored_languages.len(),
            "Pipeline reconfigured"
        );
        self.translator.set_config(config.clone());
        self.config = config;
    }

    /// Run one transcript line through the pipeline.
    ///
    /// Returns `None` for lines that are not chat messages.
    pub fn process_line(&self, session: SessionKind, line: &str) -> Option<AppEvent> {
        let msg = parser::parse_line(line, 0)?;
        let tokenized = tokenizer::tokenize(&msg.message);
        let timestamp = msg.timestamp.format(DISPLAY_TIMESTAMP_FORMAT).to_string();

        let verdict = self
            .detector
            .should_translate(&tokenized.cleaned, &self.config.ignored_languages);

        let language = match verdict {
            Verdict::Translate { language } => language,
            Verdict::Skip(reason) => {
                tracing::trace!(session = %session, reason = reason.as_str(), "Message passed through");
                return Some(AppEvent::MessageReady {
                    session,
                    text: tokenized.restore(&tokenized.cleaned),
                    sender: msg.sender,
                    timestamp,
                    original: String::new(),
                    is_translated: false,
                });
            }
        };

        let outcome = self.translator.translate_message(
            &tokenized.cleaned,
            &self.config.target_language,
            Some(&language),
        );
        tracing::debug!(
            session = %session,
            provider = outcome.provider,
            success = outcome.success,
            source = %language,
            input = %preview(&tokenized.cleaned),
            output = %preview(&outcome.text),
            "Message translated"
        );

        Some(AppEvent::MessageReady {
            session,
            text: tokenized.restore(&outcome.text),
            sender: msg.sender,
            timestamp,
            original: tokenized.restore(&tokenized.cleaned),
            is_translated: true,
        })
    }
}

/// Char-safe truncation for debug logging.
fn preview(text: &str) -> String {
    if text.chars().count() <= DEBUG_MAX_LINE_PREVIEW {
        return text.to_string();
    }
    let cut: String = text.chars().take(DEBUG_MAX_LINE_PREVIEW).collect();
    format!("{cut}...")
}

// =============================================================================
// Worker thread
// =============================================================================

/// Handle to the background pipeline thread.
///
/// Dropping the handle shuts the worker down after it drains queued work.
pub struct PipelineWorker {
    tx: mpsc::Sender<WorkItem>,
    handle: Option<JoinHandle<()>>,
}

impl PipelineWorker {
    /// Start the worker. Results go to `events`.
    pub fn spawn(pipeline: MessagePipeline, events: mpsc::Sender<AppEvent>) -> Self {
        let (tx, rx) = mpsc::channel();
        let handle = std::thread::Builder::new()
            .name("pipeline".to_string())
            .spawn(move || run_worker(pipeline, rx, events));

        let handle = match handle {
            Ok(h) => Some(h),
            Err(e) => {
                tracing::error!(error = %e, "Cannot start pipeline thread; messages will be dropped");
                None
            }
        };
        tracing::debug!("Pipeline worker started");
        Self { tx, handle }
    }

    /// Sender for sessions and the manager.
    pub fn sender(&self) -> mpsc::Sender<WorkItem> {
        self.tx.clone()
    }

    /// Queue a shutdown and wait for the thread to exit.
    pub fn shutdown(&mut self) {
        let Some(handle) = self.handle.take() else {
            return;
        };
        let _ = self.tx.send(WorkItem::Shutdown);
        if handle.join().is_err() {
            tracing::error!("Pipeline thread panicked");
        }
        tracing::debug!("Pipeline worker stopped");
    }
}

impl Drop for PipelineWorker {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn run_worker(
    mut pipeline: MessagePipeline,
    rx: mpsc::Receiver<WorkItem>,
    events: mpsc::Sender<AppEvent>,
) {
    for item in rx {
        match item {
            WorkItem::Lines { session, lines } => {
                tracing::trace!(session = %session, count = lines.len(), "Processing batch");
                for line in &lines {
                    // A panic is contained to its own line; the worker and
                    // the rest of the batch carry on.
                    let outcome =
                        panic::catch_unwind(AssertUnwindSafe(|| pipeline.process_line(session, line)));
                    let event = match outcome {
                        Ok(Some(event)) => event,
                        Ok(None) => continue,
                        Err(_) => {
                            tracing::error!(
                                session = %session,
                                line = %preview(line),
                                "Pipeline panicked on line; skipped"
                            );
                            continue;
                        }
                    };
                    if events.send(event).is_err() {
                        tracing::debug!("Event receiver dropped; pipeline exiting");
                        return;
                    }
                }
            }
            WorkItem::Reconfigure(config) => pipeline.reconfigure(config),
            WorkItem::Shutdown => return,
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
