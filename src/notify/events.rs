//! Signals the stack emits to its host.

/// Why a popup left the screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DismissReason {
    /// Closed by the host or the user's close button.
    Closed,
    Timeout,
    Clicked,
    Acknowledged,
    /// Pushed out by a newer popup while the stack was full.
    Evicted,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PopupEvent {
    /// The host should bring its main surface forward and mark the
    /// notification read.
    Clicked { id: String },
    Acknowledged { id: String },
    /// The host should mark the notification read, best effort.
    Dismissed { id: String, reason: DismissReason },
}

impl PopupEvent {
    pub fn id(&self) -> &str {
        match self {
            Self::Clicked { id } | Self::Acknowledged { id } | Self::Dismissed { id, .. } => id,
        }
    }
}
