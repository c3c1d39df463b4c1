//! Reader session states.

use std::fmt;

/// Where a reader session is in its lifecycle.
///
/// The success path runs `Disconnected` through `Monitoring` in declaration
/// order, then `Closing` back to `Disconnected`. Any handshake failure ends
/// in `Failed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SessionState {
    #[default]
    Disconnected,
    Connecting,
    AwaitingConnectionNotice,
    Scrubbing,
    QueryingCapabilities,
    Configuring,
    Arming,
    Enabling,
    Starting,
    Monitoring,
    Closing,
    Failed,
}

impl SessionState {
    /// States visited by a successful handshake, in order.
    pub const HANDSHAKE: [SessionState; 9] = [
        SessionState::Connecting,
        SessionState::AwaitingConnectionNotice,
        SessionState::Scrubbing,
        SessionState::QueryingCapabilities,
        SessionState::Configuring,
        SessionState::Arming,
        SessionState::Enabling,
        SessionState::Starting,
        SessionState::Monitoring,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            SessionState::Disconnected => "disconnected",
            SessionState::Connecting => "connecting",
            SessionState::AwaitingConnectionNotice => "awaiting-connection-notice",
            SessionState::Scrubbing => "scrubbing",
            SessionState::QueryingCapabilities => "querying-capabilities",
            SessionState::Configuring => "configuring",
            SessionState::Arming => "arming",
            SessionState::Enabling => "enabling",
            SessionState::Starting => "starting",
            SessionState::Monitoring => "monitoring",
            SessionState::Closing => "closing",
            SessionState::Failed => "failed",
        }
    }

    /// Whether the session is between connect and monitoring.
    pub fn is_handshake(self) -> bool {
        matches!(
            self,
            SessionState::Connecting
                | SessionState::AwaitingConnectionNotice
                | SessionState::Scrubbing
                | SessionState::QueryingCapabilities
                | SessionState::Configuring
                | SessionState::Arming
                | SessionState::Enabling
                | SessionState::Starting
        )
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_handshake_order_ends_in_monitoring() {
        assert_eq!(SessionState::HANDSHAKE.last(), Some(&SessionState::Monitoring));
        assert!(
            SessionState::HANDSHAKE
                .iter()
                .copied()
                .take(SessionState::HANDSHAKE.len() - 1)
                .all(SessionState::is_handshake)
        );
        assert!(!SessionState::Monitoring.is_handshake());
        assert!(!SessionState::Failed.is_handshake());
    }

    #[test]
    fn test_display_names_are_unique() {
        let mut names: Vec<&str> = SessionState::HANDSHAKE.iter().copied().map(SessionState::as_str).collect();
        names.extend(["disconnected", "closing", "failed"]);
        let count = names.len();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), count);
    }
}
