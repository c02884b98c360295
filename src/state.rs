//! Engine state machine
//!
//! The listening lifecycle is:
//! Uninitialized → Ready → Listening → Stopping → Ready (repeatable)
//! with Closed as the terminal, one-way state reached from anywhere via
//! cleanup. The state lives behind a single mutex in the engine and is
//! written only by transition operations.

/// Lifecycle state of the recognition engine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    /// Constructed but model/device not yet opened
    Uninitialized,
    /// Model loaded, capture stream pre-opened but paused
    Ready,
    /// Capture task running, decoder consuming samples
    Listening,
    /// Stop requested, waiting for the capture task to drain
    Stopping,
    /// Resources released; no operation is valid anymore
    Closed,
}

impl EngineState {
    /// Whether `next` is a legal transition from this state.
    ///
    /// Cleanup is always legal, so every state may move to Closed.
    pub fn can_transition_to(self, next: EngineState) -> bool {
        use EngineState::*;
        match (self, next) {
            (_, Closed) => !matches!(self, Closed),
            (Uninitialized, Ready) => true,
            (Ready, Listening) => true,
            (Listening, Stopping) => true,
            (Stopping, Ready) => true,
            _ => false,
        }
    }

    pub fn is_listening(self) -> bool {
        matches!(self, EngineState::Listening)
    }

    pub fn is_closed(self) -> bool {
        matches!(self, EngineState::Closed)
    }
}

impl std::fmt::Display for EngineState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            EngineState::Uninitialized => "uninitialized",
            EngineState::Ready => "ready",
            EngineState::Listening => "listening",
            EngineState::Stopping => "stopping",
            EngineState::Closed => "closed",
        };
        write!(f, "{}", name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use EngineState::*;

    #[test]
    fn listening_cycle_is_repeatable() {
        assert!(Uninitialized.can_transition_to(Ready));
        assert!(Ready.can_transition_to(Listening));
        assert!(Listening.can_transition_to(Stopping));
        assert!(Stopping.can_transition_to(Ready));
        // and around again
        assert!(Ready.can_transition_to(Listening));
    }

    #[test]
    fn closed_is_terminal() {
        for state in [Uninitialized, Ready, Listening, Stopping] {
            assert!(state.can_transition_to(Closed));
        }
        for state in [Uninitialized, Ready, Listening, Stopping, Closed] {
            assert!(!Closed.can_transition_to(state));
        }
    }

    #[test]
    fn no_skipping_states() {
        assert!(!Ready.can_transition_to(Stopping));
        assert!(!Listening.can_transition_to(Ready));
        assert!(!Stopping.can_transition_to(Listening));
        assert!(!Uninitialized.can_transition_to(Listening));
    }

    #[test]
    fn display_names() {
        assert_eq!(Listening.to_string(), "listening");
        assert_eq!(Closed.to_string(), "closed");
    }
}
