pub mod state;

pub use state::{
    ENV_PREFIX, SETTINGS_DIRECTORY_NAME, SETTINGS_FILE_NAME, SettingsError, SettingsResult,
    SettingsStore, WidgetSettings,
};
