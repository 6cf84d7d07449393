//! Event loop that owns a mounted widget.
//!
//! One task per widget applies visitor commands, viewport changes and settled
//! transport calls strictly in arrival order. Transport futures are polled on the
//! same task, so state is never touched concurrently.

use futures::StreamExt;
use futures::stream::FuturesUnordered;
use lumen_transport::{BoxFuture, Liveness, TransportError, create_transport};
use snafu::{ResultExt, Snafu};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

use crate::chat::controller::{ConversationController, WidgetSnapshot, run_exchange};
use crate::chat::events::{ExchangeSettled, Submit};
use crate::chat::scroll_tracker::ScrollMetrics;
use crate::chat::window::WindowEvent;
use crate::settings::WidgetSettings;
use crate::viewport::{ViewportObserver, ViewportSubscription};

/// Visitor and host input accepted by a mounted widget.
#[derive(Debug, Clone, PartialEq)]
pub enum WidgetCommand {
    Window(WindowEvent),
    Submit(Submit),
    Scrolled(ScrollMetrics),
    /// The presentation layer performed the pending auto-scroll.
    ScrollPerformed,
    JumpToLatest,
    /// Out-of-band assistant message, e.g. a proactive nudge from the host page.
    DeliverAssistantMessage(String),
    Unmount,
}

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum RuntimeError {
    #[snafu(display("failed to create assistant transport on `{stage}`: {source}"))]
    CreateTransport {
        stage: &'static str,
        source: TransportError,
    },
    #[snafu(display("widget is no longer mounted on `{stage}`"))]
    Unmounted { stage: &'static str },
    #[snafu(display("widget task failed on `{stage}`: {source}"))]
    Join {
        stage: &'static str,
        source: tokio::task::JoinError,
    },
}

pub type RuntimeResult<T> = Result<T, RuntimeError>;

enum Settlement {
    Probe(Liveness),
    Exchange(ExchangeSettled),
}

/// Handle held by the host page for one mounted widget.
///
/// Dropping the handle without [`WidgetHandle::unmount`] still stops the loop once
/// the command channel closes.
pub struct WidgetHandle {
    commands: mpsc::UnboundedSender<WidgetCommand>,
    snapshots: watch::Receiver<WidgetSnapshot>,
    task: JoinHandle<ConversationController>,
}

/// Mounts the widget on the current tokio runtime and starts its startup probe.
pub fn mount(controller: ConversationController, viewport: &ViewportObserver) -> WidgetHandle {
    let (commands, command_rx) = mpsc::unbounded_channel();
    let (snapshot_tx, snapshots) = watch::channel(controller.snapshot());
    let subscription = viewport.start();

    tracing::info!(
        "mounting widget with transport '{}'",
        controller.transport().name()
    );
    let task = tokio::spawn(run_widget(controller, command_rx, snapshot_tx, subscription));

    WidgetHandle {
        commands,
        snapshots,
        task,
    }
}

/// Builds the transport and controller described by `settings`, then mounts them.
pub fn mount_with_settings(
    settings: &WidgetSettings,
    viewport: &ViewportObserver,
) -> RuntimeResult<WidgetHandle> {
    let transport = create_transport(settings.to_transport_config()).context(
        CreateTransportSnafu {
            stage: "mount-create-transport",
        },
    )?;
    let controller =
        ConversationController::new(transport, settings.controller_options(viewport.width()));
    Ok(mount(controller, viewport))
}

impl WidgetHandle {
    pub fn send(&self, command: WidgetCommand) -> RuntimeResult<()> {
        self.commands.send(command).map_err(|_| RuntimeError::Unmounted {
            stage: "send-widget-command",
        })
    }

    pub fn toggle(&self) -> RuntimeResult<()> {
        self.send(WidgetCommand::Window(WindowEvent::Toggle))
    }

    pub fn minimize(&self) -> RuntimeResult<()> {
        self.send(WidgetCommand::Window(WindowEvent::Minimize))
    }

    pub fn restore(&self) -> RuntimeResult<()> {
        self.send(WidgetCommand::Window(WindowEvent::Restore))
    }

    pub fn toggle_fullscreen(&self) -> RuntimeResult<()> {
        self.send(WidgetCommand::Window(WindowEvent::ToggleFullscreen))
    }

    pub fn submit(&self, text: impl Into<String>) -> RuntimeResult<()> {
        self.send(WidgetCommand::Submit(Submit::new(text)))
    }

    pub fn scrolled(&self, metrics: ScrollMetrics) -> RuntimeResult<()> {
        self.send(WidgetCommand::Scrolled(metrics))
    }

    pub fn snapshot(&self) -> WidgetSnapshot {
        self.snapshots.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<WidgetSnapshot> {
        self.snapshots.clone()
    }

    /// Waits until a published snapshot satisfies `predicate`.
    pub async fn wait_for(
        &mut self,
        predicate: impl FnMut(&WidgetSnapshot) -> bool,
    ) -> RuntimeResult<WidgetSnapshot> {
        let snapshot = self
            .snapshots
            .wait_for(predicate)
            .await
            .map_err(|_| RuntimeError::Unmounted {
                stage: "wait-for-snapshot",
            })?;
        Ok(snapshot.clone())
    }

    /// Stops the loop, releases the viewport listener and hands back the final state.
    pub async fn unmount(self) -> RuntimeResult<ConversationController> {
        // The loop may already have stopped; the join below reports the outcome.
        let _ = self.commands.send(WidgetCommand::Unmount);
        self.task.await.context(JoinSnafu {
            stage: "join-widget-task",
        })
    }
}

async fn run_widget(
    mut controller: ConversationController,
    mut commands: mpsc::UnboundedReceiver<WidgetCommand>,
    snapshots: watch::Sender<WidgetSnapshot>,
    mut viewport: ViewportSubscription,
) -> ConversationController {
    let mut in_flight: FuturesUnordered<BoxFuture<'static, Settlement>> = FuturesUnordered::new();
    let mut viewport_live = true;

    controller.viewport_resized(viewport.width());
    if controller.begin_probe() {
        let transport = controller.transport();
        in_flight.push(Box::pin(async move {
            Settlement::Probe(transport.probe_liveness().await)
        }));
    }
    snapshots.send_replace(controller.snapshot());

    loop {
        tokio::select! {
            command = commands.recv() => {
                let Some(command) = command else {
                    break;
                };
                if !apply_command(&mut controller, command, &mut in_flight) {
                    break;
                }
            }
            width = viewport.changed(), if viewport_live => match width {
                Some(width) => {
                    controller.viewport_resized(width);
                }
                None => viewport_live = false,
            },
            Some(settlement) = in_flight.next(), if !in_flight.is_empty() => match settlement {
                Settlement::Probe(liveness) => controller.apply_liveness(liveness),
                Settlement::Exchange(settled) => {
                    controller.settle(settled);
                }
            },
        }

        snapshots.send_replace(controller.snapshot());
    }

    viewport.stop();
    tracing::info!(
        "widget unmounted with {} messages and {} exchanges in flight",
        controller.timeline().len(),
        in_flight.len()
    );
    controller
}

/// Applies one command. Returns false when the loop should stop.
fn apply_command(
    controller: &mut ConversationController,
    command: WidgetCommand,
    in_flight: &mut FuturesUnordered<BoxFuture<'static, Settlement>>,
) -> bool {
    match command {
        WidgetCommand::Window(event) => {
            // A rejected event leaves state unchanged; the controller already logged it.
            let _ = controller.dispatch(event);
        }
        WidgetCommand::Submit(submit) => {
            if let Some(pending) = controller.begin_submit(submit) {
                let transport = controller.transport();
                let delay = controller.composing_delay();
                in_flight.push(Box::pin(async move {
                    Settlement::Exchange(run_exchange(transport, pending, delay).await)
                }));
            }
        }
        WidgetCommand::Scrolled(metrics) => controller.scrolled(metrics),
        WidgetCommand::ScrollPerformed => {
            controller.take_pending_scroll();
        }
        WidgetCommand::JumpToLatest => controller.jump_to_latest(),
        WidgetCommand::DeliverAssistantMessage(text) => {
            controller.deliver_assistant_message(text);
        }
        WidgetCommand::Unmount => return false,
    }
    true
}
