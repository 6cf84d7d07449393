use std::path::{Path, PathBuf};
use std::time::Duration;

use figment::{
    Figment,
    providers::{Env, Format, Json, Serialized},
};
use lumen_transport::{
    DEFAULT_BASE_URL, DEFAULT_FALLBACK_CONTACT, DEFAULT_PROBE_TIMEOUT, DEFAULT_REQUEST_TIMEOUT,
    TransportConfig, TransportMode,
};
use serde::{Deserialize, Serialize};
use snafu::{ResultExt, Snafu};

use crate::chat::controller::{ControllerOptions, DEFAULT_COMPOSING_DELAY, DEFAULT_GREETING};
use crate::viewport::{Breakpoints, DEFAULT_FULLSCREEN_MIN_WIDTH, DEFAULT_MOBILE_MAX_WIDTH};

pub const SETTINGS_DIRECTORY_NAME: &str = "lumen";
pub const SETTINGS_FILE_NAME: &str = "settings.json";
/// Environment variables with this prefix override the settings file, e.g. `LUMEN_BACKEND_URL`.
pub const ENV_PREFIX: &str = "LUMEN_";
pub const DEFAULT_PIN_THRESHOLD_PX: u32 = 10;

/// Keys read verbatim from the environment instead of being parsed as values.
const TEXT_KEYS: &[&str] = &["backend_url", "session_id", "greeting", "fallback_contact"];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WidgetSettings {
    #[serde(default = "default_backend_url")]
    pub backend_url: String,
    #[serde(default)]
    pub transport_mode: TransportMode,
    /// Conversation key forwarded to the assistant service; empty sends none.
    #[serde(default)]
    pub session_id: String,
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
    #[serde(default = "default_probe_timeout_ms")]
    pub probe_timeout_ms: u64,
    #[serde(default = "default_composing_delay_ms")]
    pub composing_delay_ms: u64,
    #[serde(default = "default_mobile_max_width")]
    pub mobile_max_width: u32,
    #[serde(default = "default_fullscreen_min_width")]
    pub fullscreen_min_width: u32,
    #[serde(default = "default_pin_threshold_px")]
    pub pin_threshold_px: u32,
    #[serde(default = "default_greeting")]
    pub greeting: Option<String>,
    #[serde(default = "default_fallback_contact")]
    pub fallback_contact: String,
}

impl Default for WidgetSettings {
    fn default() -> Self {
        Self {
            backend_url: default_backend_url(),
            transport_mode: TransportMode::default(),
            session_id: String::new(),
            request_timeout_ms: default_request_timeout_ms(),
            probe_timeout_ms: default_probe_timeout_ms(),
            composing_delay_ms: default_composing_delay_ms(),
            mobile_max_width: default_mobile_max_width(),
            fullscreen_min_width: default_fullscreen_min_width(),
            pin_threshold_px: default_pin_threshold_px(),
            greeting: default_greeting(),
            fallback_contact: default_fallback_contact(),
        }
    }
}

impl WidgetSettings {
    pub fn normalized(mut self) -> Self {
        self.backend_url = non_blank_or(&self.backend_url, default_backend_url);
        self.session_id = self.session_id.trim().to_string();
        self.fallback_contact = non_blank_or(&self.fallback_contact, default_fallback_contact);
        self.greeting = self
            .greeting
            .map(|greeting| greeting.trim().to_string())
            .filter(|greeting| !greeting.is_empty());

        // A zero timeout would turn every exchange into a fallback.
        if self.request_timeout_ms == 0 {
            self.request_timeout_ms = default_request_timeout_ms();
        }
        if self.probe_timeout_ms == 0 {
            self.probe_timeout_ms = default_probe_timeout_ms();
        }

        self
    }

    pub fn breakpoints(&self) -> Breakpoints {
        Breakpoints::new(self.mobile_max_width, self.fullscreen_min_width)
    }

    pub fn to_transport_config(&self) -> TransportConfig {
        TransportConfig::new(self.transport_mode, &self.backend_url)
            .with_session_id(&self.session_id)
            .with_request_timeout(Duration::from_millis(self.request_timeout_ms))
            .with_probe_timeout(Duration::from_millis(self.probe_timeout_ms))
            .with_fallback_contact(&self.fallback_contact)
    }

    pub fn controller_options(&self, viewport_width: u32) -> ControllerOptions {
        ControllerOptions {
            greeting: self.greeting.clone(),
            composing_delay: Duration::from_millis(self.composing_delay_ms),
            breakpoints: self.breakpoints(),
            pin_threshold: self.pin_threshold_px as f32,
            viewport_width,
        }
    }
}

/// Read-only settings resolved at mount time: defaults, then the JSON file, then env.
pub struct SettingsStore {
    settings: WidgetSettings,
    config_path: PathBuf,
}

impl SettingsStore {
    pub fn default_config_dir() -> PathBuf {
        dirs::config_dir()
            .map(|path| path.join(SETTINGS_DIRECTORY_NAME))
            .unwrap_or_else(|| PathBuf::from(".lumen"))
    }

    pub fn default_config_path() -> PathBuf {
        Self::default_config_dir().join(SETTINGS_FILE_NAME)
    }

    pub fn new(config_path: PathBuf) -> Self {
        let settings = Self::load_or_default(&config_path);
        Self {
            settings,
            config_path,
        }
    }

    pub fn load() -> Self {
        Self::new(Self::default_config_path())
    }

    pub fn settings(&self) -> &WidgetSettings {
        &self.settings
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    pub fn try_load(path: &Path) -> SettingsResult<WidgetSettings> {
        let settings = Self::figment(path)
            .extract::<WidgetSettings>()
            .context(ExtractSnafu {
                stage: "extract-widget-settings",
                path: path.to_path_buf(),
            })?;
        Ok(settings.normalized())
    }

    fn figment(path: &Path) -> Figment {
        // Missing files are skipped by the JSON provider, so env overrides still apply.
        let env = Env::prefixed(ENV_PREFIX);
        let mut figment = Figment::from(Serialized::defaults(WidgetSettings::default()))
            .merge(Json::file(path))
            .merge(env.clone().ignore(TEXT_KEYS));

        // `Env` parses values, so `LUMEN_SESSION_ID=12345` would arrive as an integer.
        for (key, value) in env.only(TEXT_KEYS).iter() {
            figment = figment.merge(Serialized::default(key.as_str(), value));
        }
        figment
    }

    fn load_or_default(path: &Path) -> WidgetSettings {
        if !path.exists() {
            tracing::info!("settings file not found at {:?}, using defaults and environment", path);
        }

        match Self::try_load(path) {
            Ok(settings) => settings,
            Err(error) => {
                tracing::warn!("{}. using defaults", error);
                WidgetSettings::default()
            }
        }
    }
}

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum SettingsError {
    #[snafu(display("failed to read widget settings from {path:?} on `{stage}`: {source}"))]
    Extract {
        stage: &'static str,
        path: PathBuf,
        source: figment::Error,
    },
}

pub type SettingsResult<T> = Result<T, SettingsError>;

fn non_blank_or(value: &str, default: fn() -> String) -> String {
    let value = value.trim();
    if value.is_empty() {
        default()
    } else {
        value.to_string()
    }
}

fn default_backend_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_request_timeout_ms() -> u64 {
    DEFAULT_REQUEST_TIMEOUT.as_millis() as u64
}

fn default_probe_timeout_ms() -> u64 {
    DEFAULT_PROBE_TIMEOUT.as_millis() as u64
}

fn default_composing_delay_ms() -> u64 {
    DEFAULT_COMPOSING_DELAY.as_millis() as u64
}

fn default_mobile_max_width() -> u32 {
    DEFAULT_MOBILE_MAX_WIDTH
}

fn default_fullscreen_min_width() -> u32 {
    DEFAULT_FULLSCREEN_MIN_WIDTH
}

fn default_pin_threshold_px() -> u32 {
    DEFAULT_PIN_THRESHOLD_PX
}

fn default_greeting() -> Option<String> {
    Some(DEFAULT_GREETING.to_string())
}

fn default_fallback_contact() -> String {
    DEFAULT_FALLBACK_CONTACT.to_string()
}
