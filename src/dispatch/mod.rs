//! Result dispatch module
//!
//! Fans each recognition event out to every registered sink whose target
//! matches the event kind. Sinks span unrelated failure domains (terminal,
//! local disk, remote network), so delivery is deliberately best-effort: a
//! failing sink is logged and skipped, and `dispatch` reports success as soon
//! as at least one sink accepted the event.

pub mod console;
pub mod file;
pub mod remote;

use crate::error::SinkError;
use chrono::{DateTime, Local};

/// Kind of text a recognition event carries
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    /// In-progress hypothesis; each Partial replaces the previous one
    Partial,
    /// A completed utterance
    Final,
    /// Trailing transcript flushed when listening stops
    Complete,
}

impl EventKind {
    pub fn as_str(self) -> &'static str {
        match self {
            EventKind::Partial => "partial",
            EventKind::Final => "final",
            EventKind::Complete => "complete",
        }
    }
}

/// One recognized span of text, produced once by the decoder and consumed
/// once by the dispatcher.
#[derive(Debug, Clone)]
pub struct RecognitionEvent {
    pub kind: EventKind,
    pub text: String,
    pub timestamp: DateTime<Local>,
}

impl RecognitionEvent {
    pub fn new(kind: EventKind, text: impl Into<String>) -> Self {
        Self {
            kind,
            text: text.into(),
            timestamp: Local::now(),
        }
    }
}

/// Which event kinds a sink subscribes to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SinkTarget {
    Partial,
    Final,
    Complete,
    All,
}

impl SinkTarget {
    pub fn matches(self, kind: EventKind) -> bool {
        match self {
            SinkTarget::All => true,
            SinkTarget::Partial => kind == EventKind::Partial,
            SinkTarget::Final => kind == EventKind::Final,
            SinkTarget::Complete => kind == EventKind::Complete,
        }
    }

    /// Parse the config spelling (`partial|final|complete|all`).
    pub fn from_config(s: &str) -> Option<SinkTarget> {
        match s.to_lowercase().as_str() {
            "partial" => Some(SinkTarget::Partial),
            "final" => Some(SinkTarget::Final),
            "complete" => Some(SinkTarget::Complete),
            "all" => Some(SinkTarget::All),
            _ => None,
        }
    }
}

/// A destination for recognized text
pub trait Sink: Send + Sync {
    /// Human-readable name for logging
    fn name(&self) -> &'static str;

    /// Deliver one event's text. Failures are isolated by the dispatcher.
    fn send(&self, text: &str, event: &RecognitionEvent) -> Result<(), SinkError>;
}

/// Fan-out dispatcher over registered sinks
#[derive(Default)]
pub struct ResultDispatcher {
    sinks: Vec<(SinkTarget, Box<dyn Sink>)>,
}

impl ResultDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, target: SinkTarget, sink: Box<dyn Sink>) {
        tracing::debug!("Registered sink '{}' for {:?} events", sink.name(), target);
        self.sinks.push((target, sink));
    }

    pub fn sink_count(&self) -> usize {
        self.sinks.len()
    }

    /// Deliver `event` to every matching sink, isolating per-sink failures.
    /// Returns true if at least one sink succeeded.
    pub fn dispatch(&self, event: &RecognitionEvent) -> bool {
        let mut any_ok = false;
        for (target, sink) in &self.sinks {
            if !target.matches(event.kind) {
                continue;
            }
            match sink.send(&event.text, event) {
                Ok(()) => any_ok = true,
                Err(e) => {
                    tracing::warn!(
                        "Sink '{}' failed on {} event: {}",
                        sink.name(),
                        event.kind.as_str(),
                        e
                    );
                }
            }
        }
        any_ok
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::sync::{Arc, Mutex};

    /// Recording sink with a scripted pass/fail behavior
    pub struct ScriptedSink {
        pub name: &'static str,
        pub fail: bool,
        pub received: Arc<Mutex<Vec<(EventKind, String)>>>,
    }

    impl ScriptedSink {
        pub fn new(name: &'static str, fail: bool) -> (Self, Arc<Mutex<Vec<(EventKind, String)>>>) {
            let received = Arc::new(Mutex::new(Vec::new()));
            (
                Self {
                    name,
                    fail,
                    received: received.clone(),
                },
                received,
            )
        }
    }

    impl Sink for ScriptedSink {
        fn name(&self) -> &'static str {
            self.name
        }

        fn send(&self, text: &str, event: &RecognitionEvent) -> Result<(), SinkError> {
            if self.fail {
                return Err(SinkError::Unavailable("scripted failure".to_string()));
            }
            self.received
                .lock()
                .unwrap()
                .push((event.kind, text.to_string()));
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testing::ScriptedSink;
    use super::*;

    #[test]
    fn target_matching() {
        assert!(SinkTarget::All.matches(EventKind::Partial));
        assert!(SinkTarget::All.matches(EventKind::Complete));
        assert!(SinkTarget::Final.matches(EventKind::Final));
        assert!(!SinkTarget::Final.matches(EventKind::Partial));
        assert!(!SinkTarget::Partial.matches(EventKind::Complete));
    }

    #[test]
    fn target_from_config() {
        assert_eq!(SinkTarget::from_config("final"), Some(SinkTarget::Final));
        assert_eq!(SinkTarget::from_config("ALL"), Some(SinkTarget::All));
        assert_eq!(SinkTarget::from_config("sometimes"), None);
    }

    #[test]
    fn one_failing_sink_does_not_block_the_rest() {
        let mut dispatcher = ResultDispatcher::new();
        let (bad, bad_rx) = ScriptedSink::new("bad", true);
        let (good, good_rx) = ScriptedSink::new("good", false);
        dispatcher.register(SinkTarget::All, Box::new(bad));
        dispatcher.register(SinkTarget::All, Box::new(good));

        let event = RecognitionEvent::new(EventKind::Final, "open the window");
        assert!(dispatcher.dispatch(&event));

        assert!(bad_rx.lock().unwrap().is_empty());
        let delivered = good_rx.lock().unwrap();
        assert_eq!(delivered.len(), 1);
        assert_eq!(delivered[0].1, "open the window");
    }

    #[test]
    fn dispatch_fails_only_when_every_sink_fails() {
        let mut dispatcher = ResultDispatcher::new();
        let (a, _) = ScriptedSink::new("a", true);
        let (b, _) = ScriptedSink::new("b", true);
        dispatcher.register(SinkTarget::All, Box::new(a));
        dispatcher.register(SinkTarget::All, Box::new(b));

        let event = RecognitionEvent::new(EventKind::Final, "anything");
        assert!(!dispatcher.dispatch(&event));
    }

    #[test]
    fn events_only_reach_matching_targets() {
        let mut dispatcher = ResultDispatcher::new();
        let (final_only, final_rx) = ScriptedSink::new("final-only", false);
        let (partial_only, partial_rx) = ScriptedSink::new("partial-only", false);
        dispatcher.register(SinkTarget::Final, Box::new(final_only));
        dispatcher.register(SinkTarget::Partial, Box::new(partial_only));

        dispatcher.dispatch(&RecognitionEvent::new(EventKind::Final, "done"));
        dispatcher.dispatch(&RecognitionEvent::new(EventKind::Partial, "do"));

        assert_eq!(final_rx.lock().unwrap().len(), 1);
        assert_eq!(partial_rx.lock().unwrap().len(), 1);
        assert_eq!(final_rx.lock().unwrap()[0].0, EventKind::Final);
        assert_eq!(partial_rx.lock().unwrap()[0].0, EventKind::Partial);
    }

    #[test]
    fn dispatch_with_no_sinks_reports_failure() {
        let dispatcher = ResultDispatcher::new();
        assert!(!dispatcher.dispatch(&RecognitionEvent::new(EventKind::Final, "x")));
    }
}
