//! Streaming log tail of a running Livy batch
//!
//! [`JobLogTailer`] polls the full batch log, hands new lines to a
//! [`TailConsumer`], and stops once the line count stays flat across a poll
//! while Livy reports `success`, `error` or `dead`. A flat line count is only a
//! hint that the job is done producing output: a slow job between two polls
//! looks the same, and the state check is the only guard.

use crate::error::Result;
use crate::livy::backoff::Backoff;
use crate::livy::client::LivyApi;
use crate::livy::consumer::TailConsumer;
use crate::logging::Logger;
use regex::Regex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, LazyLock};

pub const APPLICATION_REPORT_PATTERN: &str = r"Application report for ([^ ]*) \(state: ACCEPTED\)";

static APPLICATION_REPORT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(APPLICATION_REPORT_PATTERN).expect("application report pattern is valid")
});

/// First YARN application id announced in `text`
pub fn find_application_id(text: &str) -> Option<String> {
    APPLICATION_REPORT
        .captures(text)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

/// Cooperative kill flag shared between the tailer and whoever may cancel it
#[derive(Debug, Clone, Default)]
pub struct KillSwitch(Arc<AtomicBool>);

impl KillSwitch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn kill(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_killed(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TailState {
    Polling,
    Terminal,
    Killed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TailOutcome {
    Succeeded,
    Failed,
    Killed,
}

/// Per-job tailing progress
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TailProgress {
    /// Lines already handed to the consumer
    pub next_line_index: usize,
    /// Line count reported by the last poll
    pub total_lines_available: usize,
    pub application_id: Option<String>,
    /// Polls started, each a log fetch followed by a state fetch
    pub polls: u32,
}

pub struct JobLogTailer<A: LivyApi> {
    api: A,
    batch_id: i64,
    kill: KillSwitch,
    output: Logger,
    state: TailState,
    progress: TailProgress,
    backoff: Backoff,
    outcome: Option<TailOutcome>,
}

impl<A: LivyApi> JobLogTailer<A> {
    pub fn new(api: A, batch_id: i64, kill: KillSwitch, output: Logger) -> Self {
        Self {
            api,
            batch_id,
            kill,
            output,
            state: TailState::Polling,
            progress: TailProgress::default(),
            backoff: Backoff::new(),
            outcome: None,
        }
    }

    pub fn state(&self) -> TailState {
        self.state
    }

    pub fn progress(&self) -> &TailProgress {
        &self.progress
    }

    /// Tail the batch until it ends or is killed. Calling again after that
    /// returns the same outcome without polling.
    ///
    /// Any fetch failure ends the tail. It is reported as `Killed` when the kill
    /// switch was already tripped, and returned as an error naming the batch
    /// otherwise.
    pub async fn run<C>(&mut self, consumer: &mut C) -> Result<TailOutcome>
    where
        C: TailConsumer + ?Sized,
    {
        if let Some(outcome) = self.outcome {
            return Ok(outcome);
        }

        match self.poll(consumer).await {
            Ok(outcome) => {
                self.outcome = Some(outcome);
                Ok(outcome)
            }
            Err(e) if self.kill.is_killed() => {
                self.output
                    .verbose(&format!("Ignoring error after kill of batch {}: {}", self.batch_id, e));
                let outcome = self.killed();
                self.outcome = Some(outcome);
                Ok(outcome)
            }
            Err(e) => {
                self.output.error(&format!(
                    "Stopped tailing batch {} after {} lines: {}",
                    self.batch_id, self.progress.next_line_index, e
                ));
                Err(e.with_context(&format!("tailing batch {}", self.batch_id)))
            }
        }
    }

    async fn poll<C>(&mut self, consumer: &mut C) -> Result<TailOutcome>
    where
        C: TailConsumer + ?Sized,
    {
        loop {
            if self.kill.is_killed() {
                return Ok(self.killed());
            }

            self.progress.polls += 1;
            let previous_total = self.progress.total_lines_available;
            self.fetch_and_emit(consumer).await?;

            if self.kill.is_killed() {
                return Ok(self.killed());
            }
            let status = self.api.fetch_state(self.batch_id).await?;

            self.output.debug(&format!(
                "Batch {} is {} with {} log lines",
                self.batch_id, status.state, self.progress.total_lines_available
            ));

            if self.progress.total_lines_available == previous_total {
                if let Some(succeeded) = status.terminal_outcome() {
                    if self.kill.is_killed() {
                        return Ok(self.killed());
                    }
                    // Lines may land between the last fetch and the state change.
                    self.fetch_and_emit(consumer).await?;
                    consumer.job_terminal(succeeded);
                    self.state = TailState::Terminal;
                    self.output.verbose(&format!(
                        "Batch {} reached {} after {} polls",
                        self.batch_id,
                        status.state,
                        self.progress.polls
                    ));
                    return Ok(if succeeded {
                        TailOutcome::Succeeded
                    } else {
                        TailOutcome::Failed
                    });
                }
            }

            tokio::time::sleep(self.backoff.next_interval()).await;
        }
    }

    async fn fetch_and_emit<C>(&mut self, consumer: &mut C) -> Result<()>
    where
        C: TailConsumer + ?Sized,
    {
        let log = self.api.fetch_log(self.batch_id).await?;
        let total = log.total;

        let start = self.progress.next_line_index.min(log.log.len());
        let end = total.min(log.log.len());
        if start < end {
            for line in &log.log[start..end] {
                if !line.trim().is_empty() {
                    consumer.log_line(line);
                }
            }
        }

        self.progress.next_line_index = self.progress.next_line_index.max(total);
        self.progress.total_lines_available = total;

        if self.progress.application_id.is_none() {
            if let Some(application_id) = find_application_id(&log.log.join("\n")) {
                consumer.application_id_discovered(&application_id);
                self.progress.application_id = Some(application_id);
            }
        }

        Ok(())
    }

    fn killed(&mut self) -> TailOutcome {
        self.state = TailState::Killed;
        self.output
            .warning(&format!("Stopped tailing batch {}: killed", self.batch_id));
        TailOutcome::Killed
    }
}
