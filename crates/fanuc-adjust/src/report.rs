//! Message reporting for callers that display progress to a user.
//!
//! The adjuster never prints. It hands each message to a [`MessageSink`];
//! callers without a sink pass `None` and nothing is reported.

use std::cell::RefCell;

use serde::Serialize;

/// Severity attached to each reported message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Progress information.
    Info,
    /// A file was skipped.
    Warning,
    /// A file or the configuration failed.
    Error,
}

/// Receiver for user-facing messages.
///
/// Implementations must not block the caller for long.
pub trait MessageSink {
    /// Records one message.
    fn add_message(&self, text: &str, severity: Severity);
}

pub(crate) fn report(sink: Option<&dyn MessageSink>, text: &str, severity: Severity) {
    if let Some(sink) = sink {
        sink.add_message(text, severity);
    }
}

/// Sink that forwards messages to the `log` facade.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

impl MessageSink for LogSink {
    fn add_message(&self, text: &str, severity: Severity) {
        match severity {
            Severity::Info => log::info!("{text}"),
            Severity::Warning => log::warn!("{text}"),
            Severity::Error => log::error!("{text}"),
        }
    }
}

/// A message captured by [`MessageLog`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Message {
    /// Message severity.
    pub severity: Severity,
    /// Message text.
    pub text: String,
}

/// Sink that keeps every message in memory, in arrival order.
#[derive(Debug, Default)]
pub struct MessageLog {
    messages: RefCell<Vec<Message>>,
}

impl MessageLog {
    /// Creates an empty log.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy of the messages recorded so far.
    pub fn messages(&self) -> Vec<Message> {
        self.messages.borrow().clone()
    }

    /// Number of recorded messages with the given severity.
    pub fn count(&self, severity: Severity) -> usize {
        self.messages
            .borrow()
            .iter()
            .filter(|message| message.severity == severity)
            .count()
    }

    /// Consumes the log and returns its messages.
    pub fn into_messages(self) -> Vec<Message> {
        self.messages.into_inner()
    }
}

impl MessageSink for MessageLog {
    fn add_message(&self, text: &str, severity: Severity) {
        self.messages.borrow_mut().push(Message {
            severity,
            text: text.to_string(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn message_log_keeps_order_and_severity() {
        let log = MessageLog::new();
        log.add_message("first", Severity::Info);
        log.add_message("second", Severity::Warning);
        log.add_message("third", Severity::Error);

        assert_eq!(log.count(Severity::Warning), 1);
        let messages = log.into_messages();
        let texts: Vec<&str> = messages.iter().map(|m| m.text.as_str()).collect();
        assert_eq!(texts, vec!["first", "second", "third"]);
    }

    #[test]
    fn report_without_sink_is_a_no_op() {
        report(None, "nobody listens", Severity::Error);
    }

    #[test]
    fn report_forwards_to_sink() {
        let log = MessageLog::new();
        report(Some(&log), "hello", Severity::Info);
        assert_eq!(
            log.messages(),
            vec![Message {
                severity: Severity::Info,
                text: "hello".to_string(),
            }]
        );
    }

    #[test]
    fn log_sink_accepts_every_severity() {
        let sink = LogSink;
        sink.add_message("info", Severity::Info);
        sink.add_message("warning", Severity::Warning);
        sink.add_message("error", Severity::Error);
    }
}
