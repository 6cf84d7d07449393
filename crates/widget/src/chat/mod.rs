/// Conversation owner and snapshot projection.
pub mod controller;
/// Event contracts between the controller and its runtime.
pub mod events;
/// Timeline entries and their read state.
pub mod message;
pub mod scroll_tracker;
pub mod timeline;
/// Window lifecycle state machine.
pub mod window;

pub use controller::{
    CONNECTED_PLACEHOLDER, ConnectionStatus, ControllerOptions, ConversationController,
    DEFAULT_COMPOSING_DELAY, DEFAULT_GREETING, DEGRADED_BANNER, DEGRADED_PLACEHOLDER,
    WidgetSnapshot, run_exchange,
};
pub use events::{ExchangeId, ExchangeSettled, PendingExchange, Submit};
pub use message::{Message, MessageId, Sender};
pub use scroll_tracker::{DEFAULT_PIN_THRESHOLD, ScrollMetrics, ScrollTracker};
pub use timeline::Timeline;
pub use window::{WindowEvent, WindowState, WindowTransitionRejection, WindowTransitionResult};
