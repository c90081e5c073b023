//! Maps the `[logging]` config section and CLI flags onto telemetry settings.

use warden_config::LoggingSection;
use warden_telemetry::{LogConfig, LogFormat};

/// Build the log configuration. Flags win over the file; an unknown format
/// falls back to compact.
pub(crate) fn to_log_config(
    section: Option<&LoggingSection>,
    level: Option<&str>,
    format: Option<&str>,
) -> LogConfig {
    let defaults = LoggingSection::default();
    let section = section.unwrap_or(&defaults);

    let level = level.unwrap_or(&section.level);
    let format = format
        .unwrap_or(&section.format)
        .parse::<LogFormat>()
        .unwrap_or(LogFormat::Compact);

    LogConfig::new(level)
        .with_format(format)
        .with_directives(section.directives.iter().cloned())
}
