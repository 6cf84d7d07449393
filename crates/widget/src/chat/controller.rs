use std::sync::Arc;
use std::time::Duration;

use lumen_transport::{AssistantTransport, Liveness, ReplySource};

use crate::chat::events::{ExchangeId, ExchangeSettled, PendingExchange, Submit};
use crate::chat::message::{Message, MessageId, Sender};
use crate::chat::scroll_tracker::{DEFAULT_PIN_THRESHOLD, ScrollMetrics, ScrollTracker};
use crate::chat::timeline::Timeline;
use crate::chat::window::{WindowEvent, WindowState, WindowTransitionResult};
use crate::viewport::{Breakpoints, DEFAULT_VIEWPORT_WIDTH, LayoutClass};

pub const DEFAULT_COMPOSING_DELAY: Duration = Duration::from_millis(1_500);
pub const DEFAULT_GREETING: &str = "Hi there! Thanks for visiting. How can I help you today?";
pub const CONNECTED_PLACEHOLDER: &str = "Ask me anything...";
pub const DEGRADED_PLACEHOLDER: &str = "Type a message...";
pub const DEGRADED_BANNER: &str =
    "AI features temporarily unavailable. Basic chat responses active.";

/// Assistant reachability as shown by the header indicator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ConnectionStatus {
    #[default]
    Connecting,
    Connected,
    Degraded,
}

impl From<Liveness> for ConnectionStatus {
    fn from(value: Liveness) -> Self {
        match value {
            Liveness::Connected => Self::Connected,
            Liveness::Degraded => Self::Degraded,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ControllerOptions {
    pub greeting: Option<String>,
    pub composing_delay: Duration,
    pub breakpoints: Breakpoints,
    pub pin_threshold: f32,
    pub viewport_width: u32,
}

impl Default for ControllerOptions {
    fn default() -> Self {
        Self {
            greeting: Some(DEFAULT_GREETING.to_string()),
            composing_delay: DEFAULT_COMPOSING_DELAY,
            breakpoints: Breakpoints::default(),
            pin_threshold: DEFAULT_PIN_THRESHOLD,
            viewport_width: DEFAULT_VIEWPORT_WIDTH,
        }
    }
}

/// Everything the presentation layer needs to draw one frame.
#[derive(Debug, Clone, PartialEq)]
pub struct WidgetSnapshot {
    pub messages: Vec<Message>,
    pub window: WindowState,
    pub layout: LayoutClass,
    pub connection: ConnectionStatus,
    pub unread_count: usize,
    pub composing: bool,
    pub input_enabled: bool,
    pub placeholder: &'static str,
    pub status_banner: Option<&'static str>,
    pub fullscreen_available: bool,
    pub pinned_to_latest: bool,
    pub unseen_below: bool,
    pub pending_scroll: bool,
}

/// Owns the timeline and window state of one mounted widget.
///
/// Every mutation goes through this type, and every projection (unread count,
/// placeholder, snapshot) is recomputed from current state on demand.
pub struct ConversationController {
    transport: Arc<dyn AssistantTransport>,
    timeline: Timeline,
    window: WindowState,
    scroll: ScrollTracker,
    breakpoints: Breakpoints,
    viewport_width: u32,
    layout: LayoutClass,
    connection: ConnectionStatus,
    probe_started: bool,
    composing: Option<ExchangeId>,
    next_exchange_id: u64,
    composing_delay: Duration,
}

impl ConversationController {
    pub fn new(transport: Arc<dyn AssistantTransport>, options: ControllerOptions) -> Self {
        let mut timeline = Timeline::new();
        if let Some(greeting) = options.greeting.filter(|text| !text.trim().is_empty()) {
            timeline.append(Sender::Assistant, greeting, true);
        }

        Self {
            transport,
            timeline,
            window: WindowState::Closed,
            scroll: ScrollTracker::new(options.pin_threshold),
            breakpoints: options.breakpoints,
            viewport_width: options.viewport_width,
            layout: options.breakpoints.classify(options.viewport_width),
            connection: ConnectionStatus::Connecting,
            probe_started: false,
            composing: None,
            next_exchange_id: 1,
            composing_delay: options.composing_delay,
        }
    }

    pub fn transport(&self) -> Arc<dyn AssistantTransport> {
        self.transport.clone()
    }

    pub fn composing_delay(&self) -> Duration {
        self.composing_delay
    }

    /// Claims the one startup probe. Returns false if it was already claimed.
    pub fn begin_probe(&mut self) -> bool {
        if self.probe_started {
            return false;
        }
        self.probe_started = true;
        true
    }

    pub fn apply_liveness(&mut self, liveness: Liveness) {
        self.connection = liveness.into();
        tracing::info!(
            "assistant transport '{}' probed as {:?}",
            self.transport.id(),
            self.connection
        );
    }

    /// Runs the startup probe once; later calls return the current status.
    pub async fn probe_liveness(&mut self) -> ConnectionStatus {
        if self.begin_probe() {
            let liveness = self.transport.probe_liveness().await;
            self.apply_liveness(liveness);
        }
        self.connection
    }

    /// Validates and records a submission, then enters the composing period.
    ///
    /// Returns `None` for blank input or while a previous exchange is still composing;
    /// neither case touches the timeline.
    pub fn begin_submit(&mut self, submit: Submit) -> Option<PendingExchange> {
        if submit.is_blank() {
            tracing::debug!("ignored blank submit");
            return None;
        }
        if let Some(active) = self.composing {
            tracing::debug!("ignored submit while exchange {:?} is composing", active);
            return None;
        }

        // Submitting always brings the viewer to their own message.
        self.scroll.request_scroll_to_latest();
        let user_message_id = self
            .timeline
            .append(Sender::User, submit.content.clone(), false)
            .id();
        self.scroll.message_appended();

        let id = ExchangeId::new(self.next_exchange_id);
        self.next_exchange_id = self.next_exchange_id.saturating_add(1);
        self.composing = Some(id);

        Some(PendingExchange {
            id,
            user_message_id,
            text: submit.content,
        })
    }

    /// Appends the settled reply and clears the composing indicator.
    ///
    /// The reply is applied even if the window closed in the meantime; it then counts
    /// as unread.
    pub fn settle(&mut self, settled: ExchangeSettled) -> MessageId {
        if settled.reply.source == ReplySource::Fallback {
            self.connection = ConnectionStatus::Degraded;
        }
        if self.composing == Some(settled.id) {
            self.composing = None;
        }
        self.deliver_assistant_message(settled.reply.text)
    }

    /// Appends an assistant message outside the submit flow.
    pub fn deliver_assistant_message(&mut self, text: impl Into<String>) -> MessageId {
        let read = self.window.shows_thread();
        let id = self.timeline.append(Sender::Assistant, text, read).id();
        self.scroll.message_appended();
        id
    }

    /// Submits and waits for the reply in one step.
    pub async fn submit(&mut self, text: impl Into<String>) -> Option<MessageId> {
        let pending = self.begin_submit(Submit::new(text))?;
        let settled = run_exchange(self.transport.clone(), pending, self.composing_delay).await;
        Some(self.settle(settled))
    }

    pub fn dispatch(&mut self, event: WindowEvent) -> WindowTransitionResult {
        let from = self.window;
        let to = match from.apply(event, self.layout) {
            Ok(to) => to,
            Err(rejection) => {
                tracing::debug!("rejected window event {:?} in {:?}: {:?}", event, from, rejection);
                return Err(rejection);
            }
        };

        self.window = to;
        match (from, to) {
            (WindowState::Closed, WindowState::Open) => {
                self.scroll.reset();
                self.timeline.mark_all_read();
            }
            (WindowState::Minimized, WindowState::Open) => {
                self.timeline.mark_all_read();
            }
            (WindowState::Open, WindowState::Fullscreen)
            | (WindowState::Fullscreen, WindowState::Open) => {
                self.scroll.request_scroll_to_latest();
            }
            _ => {}
        }
        Ok(to)
    }

    pub fn toggle(&mut self) -> WindowTransitionResult {
        self.dispatch(WindowEvent::Toggle)
    }

    pub fn minimize(&mut self) -> WindowTransitionResult {
        self.dispatch(WindowEvent::Minimize)
    }

    pub fn restore(&mut self) -> WindowTransitionResult {
        self.dispatch(WindowEvent::Restore)
    }

    pub fn toggle_fullscreen(&mut self) -> WindowTransitionResult {
        self.dispatch(WindowEvent::ToggleFullscreen)
    }

    /// Recomputes the layout class and cancels fullscreen if it is no longer allowed.
    pub fn viewport_resized(&mut self, width: u32) -> LayoutClass {
        self.viewport_width = width;
        self.layout = self.breakpoints.classify(width);
        if self.window == WindowState::Fullscreen && !self.layout.allows_fullscreen() {
            match self.dispatch(WindowEvent::ViewportNarrowed) {
                Ok(to) => tracing::debug!("viewport narrowed to {}px, window is now {:?}", width, to),
                Err(rejection) => {
                    tracing::warn!("viewport narrowing left fullscreen in place: {:?}", rejection)
                }
            }
        }
        self.layout
    }

    pub fn scrolled(&mut self, metrics: ScrollMetrics) {
        self.scroll.scrolled(metrics);
    }

    pub fn take_pending_scroll(&mut self) -> bool {
        self.scroll.take_pending_scroll()
    }

    pub fn jump_to_latest(&mut self) {
        self.scroll.jump_to_latest();
    }

    pub fn timeline(&self) -> &Timeline {
        &self.timeline
    }

    pub fn window_state(&self) -> WindowState {
        self.window
    }

    pub fn layout(&self) -> LayoutClass {
        self.layout
    }

    pub fn viewport_width(&self) -> u32 {
        self.viewport_width
    }

    pub fn scroll(&self) -> &ScrollTracker {
        &self.scroll
    }

    pub fn connection_status(&self) -> ConnectionStatus {
        self.connection
    }

    pub fn unread_count(&self) -> usize {
        self.timeline.unread_assistant_count()
    }

    pub fn is_composing(&self) -> bool {
        self.composing.is_some()
    }

    pub fn input_enabled(&self) -> bool {
        !self.is_composing()
    }

    pub fn placeholder(&self) -> &'static str {
        match self.connection {
            ConnectionStatus::Connected => CONNECTED_PLACEHOLDER,
            ConnectionStatus::Connecting | ConnectionStatus::Degraded => DEGRADED_PLACEHOLDER,
        }
    }

    pub fn status_banner(&self) -> Option<&'static str> {
        (self.connection == ConnectionStatus::Degraded).then_some(DEGRADED_BANNER)
    }

    pub fn fullscreen_available(&self) -> bool {
        self.layout.allows_fullscreen() && self.window.shows_thread()
    }

    pub fn snapshot(&self) -> WidgetSnapshot {
        WidgetSnapshot {
            messages: self.timeline.messages().to_vec(),
            window: self.window,
            layout: self.layout,
            connection: self.connection,
            unread_count: self.unread_count(),
            composing: self.is_composing(),
            input_enabled: self.input_enabled(),
            placeholder: self.placeholder(),
            status_banner: self.status_banner(),
            fullscreen_available: self.fullscreen_available(),
            pinned_to_latest: self.scroll.is_pinned_to_latest(),
            unseen_below: self.scroll.has_unseen_below(),
            pending_scroll: self.scroll.has_pending_scroll(),
        }
    }
}

/// Sends the pending text and holds the reply until the composing delay has passed.
///
/// The delay runs alongside the request, so the indicator shows for at least
/// `composing_delay` and never longer than the slower of the two.
pub async fn run_exchange(
    transport: Arc<dyn AssistantTransport>,
    pending: PendingExchange,
    composing_delay: Duration,
) -> ExchangeSettled {
    let (reply, ()) = futures::join!(
        transport.exchange(&pending.text),
        tokio::time::sleep(composing_delay)
    );
    pending.settle(reply)
}
