use std::env;
use std::time::Duration;

use snafu::{OptionExt, ResultExt, Snafu};
use tracing_subscriber::EnvFilter;

use lumen::chat::{ConnectionStatus, DEGRADED_BANNER, WindowState};
use lumen::transport::{TransportMode, fallback_text};
use lumen::{
    LayoutClass, RuntimeError, Sender, ViewportObserver, WidgetHandle, WidgetSettings,
    WidgetSnapshot, mount_with_settings,
};

/// Discard port; nothing listens there, so HTTP scenarios exercise the failure paths.
const UNREACHABLE_BACKEND: &str = "http://127.0.0.1:9";
const SCENARIO_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone)]
struct RunnerArgs {
    scenario: Scenario,
    backend: Option<String>,
}

#[derive(Debug, Clone, Copy)]
enum Scenario {
    OpenSubmitCloseUnread,
    BlankSubmit,
    FallbackOnFailure,
    DegradedProbe,
    FullscreenMobile,
    All,
}

impl Scenario {
    fn parse(raw: &str) -> Option<Self> {
        match raw {
            "open_submit_close_unread" => Some(Self::OpenSubmitCloseUnread),
            "blank_submit" => Some(Self::BlankSubmit),
            "fallback_on_failure" => Some(Self::FallbackOnFailure),
            "degraded_probe" => Some(Self::DegradedProbe),
            "fullscreen_mobile" => Some(Self::FullscreenMobile),
            "all" => Some(Self::All),
            _ => None,
        }
    }

    fn name(&self) -> &'static str {
        match self {
            Self::OpenSubmitCloseUnread => "open_submit_close_unread",
            Self::BlankSubmit => "blank_submit",
            Self::FallbackOnFailure => "fallback_on_failure",
            Self::DegradedProbe => "degraded_probe",
            Self::FullscreenMobile => "fullscreen_mobile",
            Self::All => "all",
        }
    }
}

#[derive(Debug, Snafu)]
enum RunnerError {
    #[snafu(display("missing required --scenario argument"))]
    MissingScenario { stage: &'static str },
    #[snafu(display("missing value for argument '{arg}'"))]
    MissingArgumentValue {
        stage: &'static str,
        arg: &'static str,
    },
    #[snafu(display("unknown scenario '{raw}'"))]
    UnknownScenario { stage: &'static str, raw: String },
    #[snafu(display("unknown argument '{raw}'"))]
    UnknownArgument { stage: &'static str, raw: String },
    #[snafu(display("widget runtime failed: {source}"))]
    Runtime {
        stage: &'static str,
        source: RuntimeError,
    },
    #[snafu(display("scenario '{scenario}' timed out waiting for the widget"))]
    TimedOut {
        stage: &'static str,
        scenario: &'static str,
    },
    #[snafu(display("scenario '{scenario}' failed: {reason}"))]
    ScenarioFailed {
        stage: &'static str,
        scenario: &'static str,
        reason: String,
    },
}

type RunnerResult<T> = Result<T, RunnerError>;

#[tokio::main(flavor = "current_thread")]
async fn main() {
    // Logs go to stderr so stdout stays a clean key=value report.
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    if let Err(error) = run().await {
        println!("runner_ok=false");
        eprintln!("runner_error={error}");
        std::process::exit(1);
    }
}

async fn run() -> RunnerResult<()> {
    let args = parse_args(env::args().skip(1))?;
    println!("scenario={}", args.scenario.name());
    let backend = args.backend.as_deref().unwrap_or(UNREACHABLE_BACKEND);
    println!("backend={backend}");

    match args.scenario {
        Scenario::OpenSubmitCloseUnread => run_open_submit_close_unread().await?,
        Scenario::BlankSubmit => run_blank_submit().await?,
        Scenario::FallbackOnFailure => run_fallback_on_failure(backend).await?,
        Scenario::DegradedProbe => run_degraded_probe(backend).await?,
        Scenario::FullscreenMobile => run_fullscreen_mobile().await?,
        Scenario::All => {
            run_open_submit_close_unread().await?;
            run_blank_submit().await?;
            run_fallback_on_failure(backend).await?;
            run_degraded_probe(backend).await?;
            run_fullscreen_mobile().await?;
        }
    }

    println!("runner_ok=true");
    Ok(())
}

fn parse_args(args: impl IntoIterator<Item = String>) -> RunnerResult<RunnerArgs> {
    let mut scenario = None;
    let mut backend = None;
    let mut pending = args.into_iter();

    while let Some(argument) = pending.next() {
        match argument.as_str() {
            "--scenario" => {
                let value = pending.next().context(MissingArgumentValueSnafu {
                    stage: "parse-args-scenario-value",
                    arg: "--scenario",
                })?;

                let parsed = Scenario::parse(&value).context(UnknownScenarioSnafu {
                    stage: "parse-args-scenario",
                    raw: value,
                })?;
                scenario = Some(parsed);
            }
            "--backend" => {
                let value = pending.next().context(MissingArgumentValueSnafu {
                    stage: "parse-args-backend-value",
                    arg: "--backend",
                })?;
                backend = Some(value);
            }
            _ => {
                return UnknownArgumentSnafu {
                    stage: "parse-args",
                    raw: argument,
                }
                .fail();
            }
        }
    }

    Ok(RunnerArgs {
        scenario: scenario.context(MissingScenarioSnafu {
            stage: "parse-args-scenario-required",
        })?,
        backend,
    })
}

fn keyword_settings() -> WidgetSettings {
    WidgetSettings {
        transport_mode: TransportMode::Keyword,
        composing_delay_ms: 50,
        ..WidgetSettings::default()
    }
}

fn http_settings(backend: &str) -> WidgetSettings {
    WidgetSettings {
        backend_url: backend.to_string(),
        transport_mode: TransportMode::Http,
        composing_delay_ms: 50,
        request_timeout_ms: 2_000,
        probe_timeout_ms: 1_000,
        ..WidgetSettings::default()
    }
    .normalized()
}

fn mount_for(
    settings: &WidgetSettings,
    viewport: &ViewportObserver,
    stage: &'static str,
) -> RunnerResult<WidgetHandle> {
    mount_with_settings(settings, viewport).context(RuntimeSnafu { stage })
}

async fn wait_until(
    handle: &mut WidgetHandle,
    scenario: &'static str,
    predicate: impl FnMut(&WidgetSnapshot) -> bool,
) -> RunnerResult<WidgetSnapshot> {
    tokio::time::timeout(SCENARIO_TIMEOUT, handle.wait_for(predicate))
        .await
        .ok()
        .context(TimedOutSnafu {
            stage: "wait-for-snapshot",
            scenario,
        })?
        .context(RuntimeSnafu {
            stage: "wait-for-snapshot",
        })
}

fn require(scenario: &'static str, holds: bool, reason: &str) -> RunnerResult<()> {
    if holds {
        return Ok(());
    }
    ScenarioFailedSnafu {
        stage: "scenario-check",
        scenario,
        reason: reason.to_string(),
    }
    .fail()
}

async fn unmount(handle: WidgetHandle, viewport: &ViewportObserver) -> RunnerResult<()> {
    handle.unmount().await.context(RuntimeSnafu {
        stage: "unmount-widget",
    })?;
    println!("viewport_listeners_after_unmount={}", viewport.listener_count());
    Ok(())
}

async fn run_open_submit_close_unread() -> RunnerResult<()> {
    const SCENARIO: &str = "open_submit_close_unread";
    let viewport = ViewportObserver::default();
    let mut handle = mount_for(&keyword_settings(), &viewport, "mount-keyword-widget")?;

    handle.toggle().context(RuntimeSnafu { stage: "open" })?;
    handle
        .submit("tell me about your projects")
        .context(RuntimeSnafu { stage: "submit" })?;
    handle.toggle().context(RuntimeSnafu { stage: "close" })?;

    let settled = wait_until(&mut handle, SCENARIO, |snapshot| {
        !snapshot.composing && snapshot.messages.len() == 3
    })
    .await?;
    println!("window_closed={}", settled.window == WindowState::Closed);
    println!("unread_count={}", settled.unread_count);
    require(SCENARIO, settled.unread_count == 1, "late reply was not unread")?;

    handle.toggle().context(RuntimeSnafu { stage: "reopen" })?;
    let reopened = wait_until(&mut handle, SCENARIO, |snapshot| {
        snapshot.window == WindowState::Open
    })
    .await?;
    println!("unread_after_reopen={}", reopened.unread_count);
    require(SCENARIO, reopened.unread_count == 0, "reopen did not mark read")?;

    unmount(handle, &viewport).await
}

async fn run_blank_submit() -> RunnerResult<()> {
    const SCENARIO: &str = "blank_submit";
    const MARKER: &str = "hello after blanks";
    let viewport = ViewportObserver::default();
    let mut handle = mount_for(&keyword_settings(), &viewport, "mount-keyword-widget")?;
    let before = handle.snapshot().messages.len();

    handle.toggle().context(RuntimeSnafu { stage: "open" })?;
    handle
        .submit("   ")
        .context(RuntimeSnafu { stage: "submit-blank" })?;
    handle
        .submit("")
        .context(RuntimeSnafu { stage: "submit-empty" })?;
    // Commands apply in order, so the settled marker proves the blanks were handled.
    handle
        .submit(MARKER)
        .context(RuntimeSnafu { stage: "submit-marker" })?;
    let snapshot = wait_until(&mut handle, SCENARIO, |snapshot| {
        !snapshot.composing
            && snapshot
                .messages
                .last()
                .is_some_and(|message| message.sender() == Sender::Assistant)
            && snapshot.messages.iter().any(|message| message.text() == MARKER)
    })
    .await?;

    let ignored = snapshot.messages.len() == before + 2
        && snapshot.messages[before].text() == MARKER;
    println!("blank_submit_ignored={ignored}");
    require(SCENARIO, ignored, "blank submit reached the timeline")?;
    unmount(handle, &viewport).await
}

async fn run_fallback_on_failure(backend: &str) -> RunnerResult<()> {
    const SCENARIO: &str = "fallback_on_failure";
    let settings = http_settings(backend);
    let viewport = ViewportObserver::default();
    let mut handle = mount_for(&settings, &viewport, "mount-http-widget")?;

    handle.toggle().context(RuntimeSnafu { stage: "open" })?;
    handle
        .submit("hello")
        .context(RuntimeSnafu { stage: "submit" })?;
    let settled = wait_until(&mut handle, SCENARIO, |snapshot| {
        !snapshot.composing && snapshot.messages.len() == 3
    })
    .await?;

    let expected = fallback_text(&settings.fallback_contact);
    let reply = settled
        .messages
        .last()
        .map(|message| message.text().to_string())
        .unwrap_or_default();
    println!("fallback_reply={}", reply == expected);
    println!("connection={:?}", settled.connection);
    require(SCENARIO, reply == expected, "reply was not the fallback text")?;
    require(
        SCENARIO,
        settled.connection == ConnectionStatus::Degraded,
        "fallback did not degrade the status",
    )?;
    unmount(handle, &viewport).await
}

async fn run_degraded_probe(backend: &str) -> RunnerResult<()> {
    const SCENARIO: &str = "degraded_probe";
    let viewport = ViewportObserver::default();
    let mut handle = mount_for(&http_settings(backend), &viewport, "mount-http-widget")?;

    let probed = wait_until(&mut handle, SCENARIO, |snapshot| {
        snapshot.connection != ConnectionStatus::Connecting
    })
    .await?;
    println!("connection={:?}", probed.connection);
    println!("status_banner={}", probed.status_banner.is_some());
    require(
        SCENARIO,
        probed.status_banner == Some(DEGRADED_BANNER)
            || probed.connection == ConnectionStatus::Connected,
        "degraded status without banner",
    )?;
    unmount(handle, &viewport).await
}

async fn run_fullscreen_mobile() -> RunnerResult<()> {
    const SCENARIO: &str = "fullscreen_mobile";
    let viewport = ViewportObserver::new(1_280);
    let mut handle = mount_for(&keyword_settings(), &viewport, "mount-keyword-widget")?;

    handle.toggle().context(RuntimeSnafu { stage: "open" })?;
    handle
        .toggle_fullscreen()
        .context(RuntimeSnafu { stage: "enter-fullscreen" })?;
    wait_until(&mut handle, SCENARIO, |snapshot| {
        snapshot.window == WindowState::Fullscreen
    })
    .await?;
    println!("fullscreen_on_desktop=true");

    viewport.report(500);
    let narrowed = wait_until(&mut handle, SCENARIO, |snapshot| {
        snapshot.layout == LayoutClass::Mobile
    })
    .await?;
    println!("window_after_narrowing={:?}", narrowed.window);
    require(
        SCENARIO,
        narrowed.window == WindowState::Open && !narrowed.fullscreen_available,
        "narrowing did not leave fullscreen",
    )?;
    unmount(handle, &viewport).await
}
