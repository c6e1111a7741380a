/// Acquisition state machine.
///
/// State transitions:
/// ```text
/// idle → opening → opened → session_creating → streaming
///   └──────┴─────────┴────────────┴───────────────┴──→ closed (release)
/// ```
///
/// Disconnection is orthogonal and tracked by the `DisconnectSignal`, not here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AcquisitionState {
    Idle,
    Opening,
    Opened,
    SessionCreating,
    Streaming,
    Closed,
}

impl AcquisitionState {
    pub fn is_closed(&self) -> bool {
        matches!(self, Self::Closed)
    }
}

impl std::fmt::Display for AcquisitionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::Opening => "opening",
            Self::Opened => "opened",
            Self::SessionCreating => "session_creating",
            Self::Streaming => "streaming",
            Self::Closed => "closed",
        };
        f.write_str(name)
    }
}
