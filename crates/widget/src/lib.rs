#![deny(unsafe_code)]

//! Headless core of an embeddable assistant chat widget.
//!
//! The host page mounts a [`ConversationController`] through [`mount`] and draws
//! whatever [`WidgetSnapshot`] the returned [`WidgetHandle`] publishes.

/// Conversation state, window lifecycle and scroll following.
pub mod chat;
/// Single-task event loop for a mounted widget.
pub mod runtime;
/// Mount-time configuration.
pub mod settings;
pub mod viewport;

pub use chat::{
    ConnectionStatus, ControllerOptions, ConversationController, Message, MessageId, Sender,
    WidgetSnapshot, WindowEvent, WindowState,
};
pub use lumen_transport as transport;
pub use runtime::{
    RuntimeError, RuntimeResult, WidgetCommand, WidgetHandle, mount, mount_with_settings,
};
pub use settings::{SettingsStore, WidgetSettings};
pub use viewport::{
    Breakpoints, LayoutClass, ViewportObserver, ViewportSubscription, shared_viewport_observer,
};
