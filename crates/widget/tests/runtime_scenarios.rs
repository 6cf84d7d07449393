use std::sync::Arc;
use std::time::Duration;

use lumen::chat::{ConnectionStatus, DEGRADED_BANNER, ScrollMetrics};
use lumen::transport::{
    AssistantReply, AssistantTransport, BoxFuture, Liveness, TransportMode,
};
use lumen::{
    ControllerOptions, ConversationController, LayoutClass, Sender, ViewportObserver,
    WidgetCommand, WidgetSettings, WindowState, mount, mount_with_settings,
};
use tokio::sync::Notify;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Replies only after the test opens the gate.
struct GatedTransport {
    gate: Arc<Notify>,
}

impl AssistantTransport for GatedTransport {
    fn id(&self) -> &str {
        "gated"
    }

    fn name(&self) -> &str {
        "Gated"
    }

    fn probe_liveness<'a>(&'a self) -> BoxFuture<'a, Liveness> {
        Box::pin(async { Liveness::Connected })
    }

    fn exchange<'a>(&'a self, text: &'a str) -> BoxFuture<'a, AssistantReply> {
        Box::pin(async move {
            self.gate.notified().await;
            AssistantReply::service(format!("echo: {text}"))
        })
    }
}

fn quiet_options() -> ControllerOptions {
    ControllerOptions {
        greeting: None,
        composing_delay: Duration::from_millis(100),
        ..ControllerOptions::default()
    }
}

#[tokio::test(start_paused = true)]
async fn reply_arriving_after_close_is_unread_until_reopen() {
    let gate = Arc::new(Notify::new());
    let controller = ConversationController::new(
        Arc::new(GatedTransport { gate: gate.clone() }),
        quiet_options(),
    );
    let viewport = ViewportObserver::default();
    let mut handle = mount(controller, &viewport);

    handle.toggle().expect("widget is mounted");
    handle.submit("hello").expect("widget is mounted");
    let composing = handle
        .wait_for(|snapshot| snapshot.composing)
        .await
        .expect("submit is accepted");
    assert_eq!(composing.messages.len(), 1);
    assert!(!composing.input_enabled);

    handle.toggle().expect("widget is mounted");
    handle
        .wait_for(|snapshot| snapshot.window == WindowState::Closed)
        .await
        .expect("widget closes while composing");
    gate.notify_one();

    let settled = handle
        .wait_for(|snapshot| !snapshot.composing)
        .await
        .expect("exchange settles");
    assert_eq!(settled.messages.len(), 2);
    assert_eq!(settled.messages[1].sender(), Sender::Assistant);
    assert_eq!(settled.messages[1].text(), "echo: hello");
    assert_eq!(settled.unread_count, 1);

    handle.toggle().expect("widget is mounted");
    let reopened = handle
        .wait_for(|snapshot| snapshot.window == WindowState::Open)
        .await
        .expect("widget reopens");
    assert_eq!(reopened.unread_count, 0);
    assert!(reopened.pending_scroll);

    handle.unmount().await.expect("widget stops cleanly");
}

#[tokio::test(start_paused = true)]
async fn commands_are_applied_in_arrival_order() {
    let controller = ConversationController::new(
        Arc::new(lumen::transport::KeywordTransport::with_default_rules("email")),
        quiet_options(),
    );
    let viewport = ViewportObserver::default();
    let mut handle = mount(controller, &viewport);

    handle.toggle().expect("open");
    handle.submit("hello").expect("submit");
    handle.submit("second while composing").expect("submit");
    handle.minimize().expect("minimize");

    let settled = handle
        .wait_for(|snapshot| snapshot.messages.len() == 2 && !snapshot.composing)
        .await
        .expect("exchange settles");
    assert_eq!(settled.window, WindowState::Minimized);
    assert_eq!(settled.messages[0].text(), "hello");
    assert_eq!(settled.unread_count, 1);

    handle
        .send(WidgetCommand::Window(lumen::WindowEvent::Toggle))
        .expect("widget is mounted");
    handle.restore().expect("restore");
    let restored = handle
        .wait_for(|snapshot| snapshot.window == WindowState::Open)
        .await
        .expect("restore is applied");
    assert_eq!(restored.unread_count, 0);

    let controller = handle.unmount().await.expect("widget stops cleanly");
    assert_eq!(controller.timeline().len(), 2);
}

#[tokio::test(start_paused = true)]
async fn blank_submits_between_real_ones_never_reach_the_timeline() {
    let controller = ConversationController::new(
        Arc::new(lumen::transport::KeywordTransport::with_default_rules("email")),
        quiet_options(),
    );
    let viewport = ViewportObserver::default();
    let mut handle = mount(controller, &viewport);

    handle.toggle().expect("open");
    handle.submit("   ").expect("submit");
    handle.submit("").expect("submit");
    handle.submit("hello").expect("submit");

    let settled = handle
        .wait_for(|snapshot| {
            !snapshot.composing
                && snapshot
                    .messages
                    .last()
                    .is_some_and(|message| message.sender() == Sender::Assistant)
        })
        .await
        .expect("exchange settles");
    assert_eq!(settled.messages.len(), 2);
    assert_eq!(settled.messages[0].sender(), Sender::User);
    assert_eq!(settled.messages[0].text(), "hello");

    handle.unmount().await.expect("widget stops cleanly");
}

#[tokio::test(start_paused = true)]
async fn viewport_narrowing_exits_fullscreen_and_unmount_releases_listener() {
    let viewport = ViewportObserver::new(1_280);
    let controller = ConversationController::new(
        Arc::new(GatedTransport {
            gate: Arc::new(Notify::new()),
        }),
        ControllerOptions {
            viewport_width: viewport.width(),
            ..quiet_options()
        },
    );
    let mut handle = mount(controller, &viewport);
    assert_eq!(viewport.listener_count(), 1);

    handle.toggle().expect("open");
    handle.toggle_fullscreen().expect("fullscreen");
    let fullscreen = handle
        .wait_for(|snapshot| snapshot.window == WindowState::Fullscreen)
        .await
        .expect("desktop allows fullscreen");
    assert_eq!(fullscreen.layout, LayoutClass::Desktop);

    viewport.report(700);
    let narrowed = handle
        .wait_for(|snapshot| snapshot.layout == LayoutClass::Tablet)
        .await
        .expect("resize is observed");
    assert_eq!(narrowed.window, WindowState::Open);
    assert!(!narrowed.fullscreen_available);

    handle.unmount().await.expect("widget stops cleanly");
    assert_eq!(viewport.listener_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn reading_history_gets_unseen_affordance() {
    let controller = ConversationController::new(
        Arc::new(lumen::transport::KeywordTransport::with_default_rules("email")),
        quiet_options(),
    );
    let viewport = ViewportObserver::default();
    let mut handle = mount(controller, &viewport);

    handle.toggle().expect("open");
    handle
        .send(WidgetCommand::ScrollPerformed)
        .expect("widget is mounted");
    handle
        .scrolled(ScrollMetrics::new(0.0, 2_000.0, 400.0))
        .expect("widget is mounted");
    handle
        .send(WidgetCommand::DeliverAssistantMessage("a nudge".to_string()))
        .expect("widget is mounted");

    let snapshot = handle
        .wait_for(|snapshot| snapshot.messages.len() == 1)
        .await
        .expect("nudge delivered");
    assert!(snapshot.unseen_below);
    assert!(!snapshot.pending_scroll);
    assert_eq!(snapshot.unread_count, 0);

    handle
        .send(WidgetCommand::JumpToLatest)
        .expect("widget is mounted");
    let jumped = handle
        .wait_for(|snapshot| !snapshot.unseen_below)
        .await
        .expect("jump applied");
    assert!(jumped.pending_scroll);

    handle.unmount().await.expect("widget stops cleanly");
}

#[tokio::test]
async fn degraded_probe_does_not_block_successful_exchange() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/health"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/chat"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(serde_json::json!({ "response": "I build things." })),
        )
        .mount(&server)
        .await;

    let settings = WidgetSettings {
        backend_url: server.uri(),
        transport_mode: TransportMode::Http,
        composing_delay_ms: 10,
        greeting: None,
        ..WidgetSettings::default()
    };
    let viewport = ViewportObserver::default();
    let mut handle = mount_with_settings(&settings, &viewport).expect("settings are valid");

    let probed = handle
        .wait_for(|snapshot| snapshot.connection != ConnectionStatus::Connecting)
        .await
        .expect("probe settles");
    assert_eq!(probed.connection, ConnectionStatus::Degraded);
    assert_eq!(probed.status_banner, Some(DEGRADED_BANNER));

    handle.toggle().expect("open");
    handle.submit("what do you do?").expect("submit");
    let settled = handle
        .wait_for(|snapshot| snapshot.messages.len() == 2 && !snapshot.composing)
        .await
        .expect("exchange settles");
    assert_eq!(settled.messages[1].text(), "I build things.");
    assert_eq!(settled.connection, ConnectionStatus::Degraded);

    handle.unmount().await.expect("widget stops cleanly");
}

#[tokio::test]
async fn invalid_backend_scheme_fails_to_mount() {
    let settings = WidgetSettings {
        backend_url: "ftp://example.com".to_string(),
        ..WidgetSettings::default()
    };
    let viewport = ViewportObserver::default();

    assert!(mount_with_settings(&settings, &viewport).is_err());
    assert_eq!(viewport.listener_count(), 0);
}
