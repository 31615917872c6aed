//! Receivers of job log tailing events

use crate::logging::Logger;
use tokio::sync::mpsc::UnboundedSender;

/// Callbacks fired by the tailer, in log order.
///
/// `job_terminal` comes after every line of the poll that ended the job.
pub trait TailConsumer: Send {
    fn log_line(&mut self, line: &str);

    fn application_id_discovered(&mut self, application_id: &str);

    fn job_terminal(&mut self, succeeded: bool);
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TailEvent {
    LogLine(String),
    ApplicationId(String),
    Terminal { succeeded: bool },
}

/// Collects events in memory
impl TailConsumer for Vec<TailEvent> {
    fn log_line(&mut self, line: &str) {
        self.push(TailEvent::LogLine(line.to_string()));
    }

    fn application_id_discovered(&mut self, application_id: &str) {
        self.push(TailEvent::ApplicationId(application_id.to_string()));
    }

    fn job_terminal(&mut self, succeeded: bool) {
        self.push(TailEvent::Terminal { succeeded });
    }
}

/// Forwards events to another task. A dropped receiver silently discards them.
impl TailConsumer for UnboundedSender<TailEvent> {
    fn log_line(&mut self, line: &str) {
        let _ = self.send(TailEvent::LogLine(line.to_string()));
    }

    fn application_id_discovered(&mut self, application_id: &str) {
        let _ = self.send(TailEvent::ApplicationId(application_id.to_string()));
    }

    fn job_terminal(&mut self, succeeded: bool) {
        let _ = self.send(TailEvent::Terminal { succeeded });
    }
}

/// Prints the job log to the console with begin/end banners
pub struct ConsoleConsumer {
    output: Logger,
    batch_id: i64,
    started: bool,
}

impl ConsoleConsumer {
    pub fn new(output: Logger, batch_id: i64) -> Self {
        Self {
            output,
            batch_id,
            started: false,
        }
    }

    fn begin(&mut self) {
        if !self.started {
            self.started = true;
            self.output
                .section(&format!("Begin printing out log of batch {}", self.batch_id));
        }
    }
}

impl TailConsumer for ConsoleConsumer {
    fn log_line(&mut self, line: &str) {
        self.begin();
        self.output.output(line);
    }

    fn application_id_discovered(&mut self, application_id: &str) {
        self.begin();
        self.output
            .info(&format!("Application id is {}", application_id));
    }

    fn job_terminal(&mut self, succeeded: bool) {
        self.begin();
        self.output
            .section(&format!("Finish printing out log of batch {}", self.batch_id));
        if succeeded {
            self.output
                .success(&format!("Spark batch {} succeeded", self.batch_id));
        } else {
            self.output
                .error(&format!("Spark batch {} failed", self.batch_id));
        }
    }
}
