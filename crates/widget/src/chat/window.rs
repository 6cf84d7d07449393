use crate::viewport::LayoutClass;

/// Visibility and layout mode of the widget window.
///
/// One tagged variant replaces independent open/minimized/fullscreen flags, so
/// combinations such as "minimized and fullscreen" cannot be represented.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum WindowState {
    #[default]
    Closed,
    Open,
    Minimized,
    Fullscreen,
}

/// Input events for the window state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WindowEvent {
    /// Floating launcher or header close button.
    Toggle,
    Minimize,
    /// Click on the minimized header.
    Restore,
    ToggleFullscreen,
    /// Forced by the viewport falling below the fullscreen breakpoint.
    ViewportNarrowed,
}

/// Rejection reason for events that are not defined in the current state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowTransitionRejection {
    /// `Toggle` while minimized; the header must be restored first.
    MustRestoreFirst,
    /// Fullscreen requested while the layout does not allow it.
    FullscreenUnavailable { layout: LayoutClass },
    /// Event requires an open window.
    NotOpen {
        state: WindowState,
        event: WindowEvent,
    },
}

pub type WindowTransitionResult = Result<WindowState, WindowTransitionRejection>;

impl WindowState {
    /// True when the message thread is visible to the viewer.
    pub fn shows_thread(self) -> bool {
        matches!(self, Self::Open | Self::Fullscreen)
    }

    pub fn is_closed(self) -> bool {
        self == Self::Closed
    }

    /// Applies one event deterministically.
    ///
    /// `Minimized` and `Fullscreen` are entered only from `Open`. `ViewportNarrowed`
    /// is accepted from any state and only changes `Fullscreen`.
    pub fn apply(self, event: WindowEvent, layout: LayoutClass) -> WindowTransitionResult {
        match event {
            WindowEvent::Toggle => self.apply_toggle(),
            WindowEvent::Minimize => match self {
                Self::Open => Ok(Self::Minimized),
                Self::Closed | Self::Minimized | Self::Fullscreen => {
                    Err(WindowTransitionRejection::NotOpen { state: self, event })
                }
            },
            WindowEvent::Restore => match self {
                Self::Minimized => Ok(Self::Open),
                Self::Closed | Self::Open | Self::Fullscreen => {
                    Err(WindowTransitionRejection::NotOpen { state: self, event })
                }
            },
            WindowEvent::ToggleFullscreen => self.apply_toggle_fullscreen(layout),
            WindowEvent::ViewportNarrowed => match self {
                Self::Fullscreen => Ok(Self::Open),
                Self::Closed | Self::Open | Self::Minimized => Ok(self),
            },
        }
    }

    fn apply_toggle(self) -> WindowTransitionResult {
        match self {
            Self::Closed => Ok(Self::Open),
            Self::Open | Self::Fullscreen => Ok(Self::Closed),
            Self::Minimized => Err(WindowTransitionRejection::MustRestoreFirst),
        }
    }

    fn apply_toggle_fullscreen(self, layout: LayoutClass) -> WindowTransitionResult {
        match self {
            Self::Open if layout.allows_fullscreen() => Ok(Self::Fullscreen),
            Self::Open => Err(WindowTransitionRejection::FullscreenUnavailable { layout }),
            Self::Fullscreen => Ok(Self::Open),
            Self::Closed | Self::Minimized => Err(WindowTransitionRejection::NotOpen {
                state: self,
                event: WindowEvent::ToggleFullscreen,
            }),
        }
    }
}
