//! Console configuration.
//!
//! Read from environment variables with hard defaults, so an embedding
//! application can tune behavior without a config file.

use tracing::info;

/// Environment variable: comma-separated list of accepted image formats.
pub const ENV_ACCEPTED_FORMATS: &str = "CONSOLE_ACCEPTED_FORMATS";
/// Environment variable: show the indicative visibility range in panels.
pub const ENV_DISPLAY_VISIBILITY_RANGE: &str = "CONSOLE_DISPLAY_VISIBILITY_RANGE";
/// Environment variable: the shell should confirm before removing a layer.
pub const ENV_CONFIRM_LAYER_REMOVAL: &str = "CONSOLE_CONFIRM_LAYER_REMOVAL";

/// Tunable console behavior.
#[derive(Debug, Clone)]
pub struct ConsoleConfig {
    /// Allow-list applied to capability-advertised output formats when
    /// building the format submenu.
    pub accepted_image_formats: Vec<String>,
    /// Whether panels carry the "1:MAXSCALE to 1:MINSCALE" line.
    pub display_visibility_range: bool,
    /// Advisory flag for the embedding shell: ask before layer removal.
    pub confirm_layer_removal: bool,
}

impl Default for ConsoleConfig {
    fn default() -> Self {
        Self {
            accepted_image_formats: vec![
                "image/png".to_string(),
                "image/jpeg".to_string(),
                "image/gif".to_string(),
                "image/png8".to_string(),
            ],
            display_visibility_range: true,
            confirm_layer_removal: false,
        }
    }
}

impl ConsoleConfig {
    /// Build a config from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let accepted_image_formats = std::env::var(ENV_ACCEPTED_FORMATS)
            .ok()
            .map(|v| parse_format_list(&v))
            .filter(|formats| !formats.is_empty())
            .unwrap_or(defaults.accepted_image_formats);

        let display_visibility_range = std::env::var(ENV_DISPLAY_VISIBILITY_RANGE)
            .ok()
            .and_then(|v| parse_flag(&v))
            .unwrap_or(defaults.display_visibility_range);

        let confirm_layer_removal = std::env::var(ENV_CONFIRM_LAYER_REMOVAL)
            .ok()
            .and_then(|v| parse_flag(&v))
            .unwrap_or(defaults.confirm_layer_removal);

        let config = Self {
            accepted_image_formats,
            display_visibility_range,
            confirm_layer_removal,
        };
        info!(
            accepted_formats = config.accepted_image_formats.len(),
            display_visibility_range = config.display_visibility_range,
            "Console config loaded"
        );
        config
    }

    pub fn accepts_format(&self, format: &str) -> bool {
        self.accepted_image_formats.iter().any(|f| f == format)
    }
}

/// Parse a comma-separated format list, trimming blanks.
fn parse_format_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Parse a boolean flag value: true/false, 1/0, yes/no.
fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" => Some(true),
        "false" | "0" | "no" => Some(false),
        _ => None,
    }
}
