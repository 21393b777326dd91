use std::sync::atomic::{AtomicBool, Ordering};

/// Best-effort connected flag for one appender.
///
/// Flips to connected when a transport connect (or datagram send) succeeds and
/// back on any transport error. Readers only use it to decide whether a drain
/// is worth attempting.
#[derive(Debug, Default)]
pub struct ConnectionState {
    connected: AtomicBool,
}

impl ConnectionState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Acquire)
    }

    pub fn mark_connected(&self) {
        self.connected.store(true, Ordering::Release);
    }

    pub fn mark_disconnected(&self) {
        self.connected.store(false, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transitions() {
        let state = ConnectionState::new();
        assert!(!state.is_connected());

        state.mark_connected();
        assert!(state.is_connected());

        state.mark_disconnected();
        assert!(!state.is_connected());
    }
}
