use relay_core::SubscriptionTarget;

/// System-wide subscription state
/// Domain concept representing the reconfiguration state machine
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    /// No upstream session is running (initial, or after a failed start or fault)
    NoSession,
    /// A session is running for this target
    Active(SubscriptionTarget),
    /// The previous session is being torn down and the next one started
    Reconfiguring,
}

impl SessionState {
    /// Check if an upstream session is producing deltas
    pub fn is_active(&self) -> bool {
        matches!(self, SessionState::Active(_))
    }

    /// The target of the running session, if any
    pub fn active_target(&self) -> Option<&SubscriptionTarget> {
        match self {
            SessionState::Active(target) => Some(target),
            _ => None,
        }
    }

    /// Short label used in logs and the status endpoint
    pub fn label(&self) -> &'static str {
        match self {
            SessionState::NoSession => "no_session",
            SessionState::Active(_) => "active",
            SessionState::Reconfiguring => "reconfiguring",
        }
    }
}
