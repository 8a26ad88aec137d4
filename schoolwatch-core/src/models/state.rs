/// Media capture state machine.
///
/// State transitions:
/// ```text
/// idle → requesting_device → recording → stopped
///   ↑            │                            │
///   └── denied ──┘          discard ──────────┘
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaptureState {
    Idle,
    RequestingDevice,
    Recording { elapsed_secs: u64 },
    Stopped { elapsed_secs: u64 },
}

impl CaptureState {
    pub fn is_idle(&self) -> bool {
        matches!(self, Self::Idle)
    }

    pub fn is_recording(&self) -> bool {
        matches!(self, Self::Recording { .. })
    }

    pub fn is_stopped(&self) -> bool {
        matches!(self, Self::Stopped { .. })
    }

    /// Returns the elapsed seconds if in a state that tracks it.
    pub fn elapsed_secs(&self) -> Option<u64> {
        match self {
            Self::Recording { elapsed_secs } | Self::Stopped { elapsed_secs } => {
                Some(*elapsed_secs)
            }
            _ => None,
        }
    }
}
