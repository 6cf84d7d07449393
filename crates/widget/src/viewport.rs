//! Viewport observation shared by every widget mounted in the process.
//!
//! The host reports width changes once to a [`ViewportObserver`]; each mounted widget
//! holds a [`ViewportSubscription`] for as long as it is mounted. Dropping the
//! subscription is the unmount, so no listener outlives its widget.

use std::sync::{Arc, OnceLock};

use tokio::sync::watch;

pub const DEFAULT_MOBILE_MAX_WIDTH: u32 = 640;
pub const DEFAULT_FULLSCREEN_MIN_WIDTH: u32 = 768;
/// Width assumed before the host reports anything.
pub const DEFAULT_VIEWPORT_WIDTH: u32 = 1024;

/// Layout class derived from the viewport width.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LayoutClass {
    /// Full-width thread anchored to the bottom edge; no fullscreen control.
    Mobile,
    /// Docked window, still too narrow for fullscreen.
    Tablet,
    Desktop,
}

impl LayoutClass {
    pub fn allows_fullscreen(self) -> bool {
        self == Self::Desktop
    }

    pub fn is_mobile(self) -> bool {
        self == Self::Mobile
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Breakpoints {
    pub mobile_max_width: u32,
    pub fullscreen_min_width: u32,
}

impl Breakpoints {
    pub fn new(mobile_max_width: u32, fullscreen_min_width: u32) -> Self {
        Self {
            mobile_max_width,
            // Fullscreen must never be available on a mobile layout.
            fullscreen_min_width: fullscreen_min_width.max(mobile_max_width),
        }
    }

    pub fn classify(&self, width: u32) -> LayoutClass {
        if width < self.mobile_max_width {
            LayoutClass::Mobile
        } else if width < self.fullscreen_min_width {
            LayoutClass::Tablet
        } else {
            LayoutClass::Desktop
        }
    }
}

impl Default for Breakpoints {
    fn default() -> Self {
        Self::new(DEFAULT_MOBILE_MAX_WIDTH, DEFAULT_FULLSCREEN_MIN_WIDTH)
    }
}

/// Source of viewport widths, fed by the host's resize events.
#[derive(Debug, Clone)]
pub struct ViewportObserver {
    width: Arc<watch::Sender<u32>>,
}

impl ViewportObserver {
    pub fn new(initial_width: u32) -> Self {
        let (width, _) = watch::channel(initial_width);
        Self {
            width: Arc::new(width),
        }
    }

    /// Records a new width; listeners wake only when it actually changed.
    pub fn report(&self, width: u32) {
        self.width.send_if_modified(|current| {
            if *current == width {
                return false;
            }
            *current = width;
            true
        });
    }

    pub fn width(&self) -> u32 {
        *self.width.borrow()
    }

    pub fn start(&self) -> ViewportSubscription {
        ViewportSubscription {
            receiver: self.width.subscribe(),
        }
    }

    /// Number of live subscriptions, i.e. currently mounted widgets.
    pub fn listener_count(&self) -> usize {
        self.width.receiver_count()
    }
}

impl Default for ViewportObserver {
    fn default() -> Self {
        Self::new(DEFAULT_VIEWPORT_WIDTH)
    }
}

static SHARED_VIEWPORT: OnceLock<ViewportObserver> = OnceLock::new();

/// Process-wide observer for hosts that embed a single page viewport.
pub fn shared_viewport_observer() -> ViewportObserver {
    SHARED_VIEWPORT.get_or_init(ViewportObserver::default).clone()
}

#[derive(Debug)]
pub struct ViewportSubscription {
    receiver: watch::Receiver<u32>,
}

impl ViewportSubscription {
    pub fn width(&self) -> u32 {
        *self.receiver.borrow()
    }

    /// Waits for the next width change. Returns `None` once the observer is gone.
    pub async fn changed(&mut self) -> Option<u32> {
        self.receiver.changed().await.ok()?;
        Some(*self.receiver.borrow_and_update())
    }

    pub fn stop(self) {}
}
