/// Distance from the tail, in pixels, that still counts as pinned to the latest message.
pub const DEFAULT_PIN_THRESHOLD: f32 = 10.0;

/// Scroll geometry reported by the presentation layer.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ScrollMetrics {
    /// Distance scrolled from the top of the thread.
    pub offset: f32,
    pub content_height: f32,
    pub viewport_height: f32,
}

impl ScrollMetrics {
    pub fn new(offset: f32, content_height: f32, viewport_height: f32) -> Self {
        Self {
            offset,
            content_height,
            viewport_height,
        }
    }

    /// Remaining distance between the bottom of the viewport and the thread end.
    pub fn distance_to_end(&self) -> f32 {
        (self.content_height - self.offset - self.viewport_height).max(0.0)
    }
}

/// Tracks whether the viewer follows the newest message, independent from message content.
#[derive(Debug, Clone, PartialEq)]
pub struct ScrollTracker {
    pin_threshold: f32,
    pinned_to_latest: bool,
    pending_scroll_to_latest: bool,
    unseen_below: bool,
    last_metrics: ScrollMetrics,
}

impl ScrollTracker {
    pub fn new(pin_threshold: f32) -> Self {
        Self {
            pin_threshold: pin_threshold.max(0.0),
            pinned_to_latest: true,
            pending_scroll_to_latest: false,
            unseen_below: false,
            last_metrics: ScrollMetrics::default(),
        }
    }

    pub fn is_pinned_to_latest(&self) -> bool {
        self.pinned_to_latest
    }

    /// True when messages arrived below a viewer who scrolled up to read history.
    pub fn has_unseen_below(&self) -> bool {
        self.unseen_below
    }

    pub fn has_pending_scroll(&self) -> bool {
        self.pending_scroll_to_latest
    }

    pub fn last_metrics(&self) -> ScrollMetrics {
        self.last_metrics
    }

    /// Called on Closed to Open: always land on the newest message.
    pub fn reset(&mut self) {
        self.pinned_to_latest = true;
        self.unseen_below = false;
        self.pending_scroll_to_latest = true;
    }

    /// Called when the viewer submits or the window changes size class.
    pub fn request_scroll_to_latest(&mut self) {
        self.pinned_to_latest = true;
        self.pending_scroll_to_latest = true;
    }

    /// Decides what a newly appended message does to the view.
    ///
    /// Uses the pinned state from before the append, so a viewer reading history
    /// is never pulled down; they get the unseen-content affordance instead.
    pub fn message_appended(&mut self) {
        if self.pinned_to_latest {
            self.pending_scroll_to_latest = true;
        } else {
            self.unseen_below = true;
        }
    }

    pub fn scrolled(&mut self, metrics: ScrollMetrics) {
        self.last_metrics = metrics;
        self.pinned_to_latest = metrics.distance_to_end() < self.pin_threshold;
        if self.pinned_to_latest {
            self.unseen_below = false;
        } else {
            // The viewer scrolled away before the requested scroll was performed.
            self.pending_scroll_to_latest = false;
        }
    }

    /// Consumes the pending auto-advance. The caller scrolls to the end when this
    /// returns true.
    pub fn take_pending_scroll(&mut self) -> bool {
        let should_scroll = self.pending_scroll_to_latest;
        if should_scroll {
            self.pinned_to_latest = true;
            self.unseen_below = false;
        }
        self.pending_scroll_to_latest = false;
        should_scroll
    }

    /// Explicit "jump to latest" from the unseen-content affordance.
    pub fn jump_to_latest(&mut self) {
        self.request_scroll_to_latest();
        self.unseen_below = false;
    }
}

impl Default for ScrollTracker {
    fn default() -> Self {
        Self::new(DEFAULT_PIN_THRESHOLD)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scrolled_up() -> ScrollMetrics {
        ScrollMetrics::new(100.0, 1_000.0, 400.0)
    }

    fn at_tail() -> ScrollMetrics {
        ScrollMetrics::new(595.0, 1_000.0, 400.0)
    }

    #[test]
    fn pinned_viewer_follows_new_messages() {
        let mut tracker = ScrollTracker::default();
        tracker.scrolled(at_tail());
        assert!(tracker.is_pinned_to_latest());

        tracker.message_appended();
        assert!(tracker.take_pending_scroll());
        assert!(!tracker.has_unseen_below());
        assert!(!tracker.take_pending_scroll());
    }

    #[test]
    fn reading_history_is_not_interrupted() {
        let mut tracker = ScrollTracker::default();
        tracker.scrolled(scrolled_up());
        assert!(!tracker.is_pinned_to_latest());

        tracker.message_appended();
        assert!(!tracker.take_pending_scroll());
        assert!(tracker.has_unseen_below());

        tracker.scrolled(at_tail());
        assert!(!tracker.has_unseen_below());
    }

    #[test]
    fn submit_and_reopen_force_scroll_even_when_reading_history() {
        let mut tracker = ScrollTracker::default();
        tracker.scrolled(scrolled_up());
        tracker.request_scroll_to_latest();
        tracker.message_appended();
        assert!(tracker.take_pending_scroll());

        tracker.scrolled(scrolled_up());
        tracker.message_appended();
        tracker.reset();
        assert!(!tracker.has_unseen_below());
        assert!(tracker.take_pending_scroll());
        assert!(tracker.is_pinned_to_latest());
    }

    #[test]
    fn scrolling_up_cancels_a_scroll_not_yet_performed() {
        let mut tracker = ScrollTracker::default();
        tracker.reset();
        tracker.scrolled(scrolled_up());
        assert!(!tracker.has_pending_scroll());

        tracker.message_appended();
        assert!(!tracker.take_pending_scroll());
        assert!(tracker.has_unseen_below());
    }

    #[test]
    fn threshold_is_exclusive() {
        let mut tracker = ScrollTracker::new(10.0);
        tracker.scrolled(ScrollMetrics::new(590.0, 1_000.0, 400.0));
        assert!(!tracker.is_pinned_to_latest());

        tracker.scrolled(ScrollMetrics::new(590.5, 1_000.0, 400.0));
        assert!(tracker.is_pinned_to_latest());
    }

    #[test]
    fn short_thread_counts_as_pinned() {
        let mut tracker = ScrollTracker::default();
        tracker.scrolled(ScrollMetrics::new(0.0, 200.0, 400.0));
        assert!(tracker.is_pinned_to_latest());
    }
}
