use crate::config::Platform;
use crate::execute::{AnalyticsReporter, CollaboratorError, CommandOrigin};
use simplelog::{ColorChoice, ConfigBuilder, LevelFilter, TermLogger, TerminalMode};
use std::io::Write;
use std::path::PathBuf;

/// Environment variable holding the log level (`error` .. `trace`).
pub const LOG_LEVEL_ENV: &str = "KUBE_CHATOPS_LOG";

/// Parse a level name, falling back to `info`.
pub fn level_from_str(level: Option<&str>) -> LevelFilter {
    level
        .and_then(|l| l.trim().parse().ok())
        .unwrap_or(LevelFilter::Info)
}

/// Send `log` records to stderr; stdout carries the reply.
pub fn init(level: LevelFilter) {
    let config = ConfigBuilder::new()
        .set_time_level(LevelFilter::Off)
        .set_target_level(LevelFilter::Debug)
        .build();
    // A logger already set (tests, embedding) is fine.
    let _ = TermLogger::init(level, config, TerminalMode::Stderr, ColorChoice::Auto);
}

/// Appends one line per reported command to
/// ~/.local/share/kube-chatops/commands.log.
///
/// Best-effort: a missing HOME or unwritable file only loses the line.
#[derive(Debug, Clone)]
pub struct CommandLogReporter {
    path: Option<PathBuf>,
}

impl CommandLogReporter {
    pub fn new() -> Self {
        let path = std::env::var_os("HOME").map(|home| {
            std::path::Path::new(&home)
                .join(".local/share/kube-chatops")
                .join("commands.log")
        });
        Self { path }
    }

    pub fn with_path(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Some(path.into()),
        }
    }
}

impl Default for CommandLogReporter {
    fn default() -> Self {
        Self::new()
    }
}

impl AnalyticsReporter for CommandLogReporter {
    fn report_command(
        &self,
        platform: Platform,
        command: &str,
        origin: CommandOrigin,
        with_filter: bool,
    ) -> Result<(), CollaboratorError> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        if let Some(dir) = path.parent() {
            std::fs::create_dir_all(dir)?;
        }
        let mut file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)?;

        let cmd_oneline: String = command.replace(['\n', '\t'], " ").chars().take(200).collect();
        let ts = timestamp_now();
        writeln!(
            file,
            "{ts}\t{platform}\t{origin}\t{filter}\t{cmd_oneline}",
            platform = platform.as_str(),
            origin = origin.as_str(),
            filter = if with_filter { "filter" } else { "-" },
        )?;
        Ok(())
    }
}

/// Simple UTC timestamp without external deps.
fn timestamp_now() -> String {
    let dur = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default();
    format_timestamp(dur.as_secs())
}

fn format_timestamp(secs: u64) -> String {
    let days = secs / 86400;
    let rem = secs % 86400;
    let h = rem / 3600;
    let m = (rem % 3600) / 60;
    let s = rem % 60;
    let (year, month, day) = epoch_days_to_date(days);
    format!("{year:04}-{month:02}-{day:02}T{h:02}:{m:02}:{s:02}Z")
}

/// Convert days since Unix epoch to (year, month, day).
fn epoch_days_to_date(days: u64) -> (u64, u64, u64) {
    // Civil calendar from days algorithm (Howard Hinnant)
    let z = days + 719468;
    let era = z / 146097;
    let doe = z - era * 146097;
    let yoe = (doe - doe / 1460 + doe / 36524 - doe / 146096) / 365;
    let y = yoe + era * 400;
    let doy = doe - (365 * yoe + yoe / 4 - yoe / 100);
    let mp = (5 * doy + 2) / 153;
    let d = doy - (153 * mp + 2) / 5 + 1;
    let m = if mp < 10 { mp + 3 } else { mp - 9 };
    let y = if m <= 2 { y + 1 } else { y };
    (y, m, d)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timestamps() {
        assert_eq!(format_timestamp(0), "1970-01-01T00:00:00Z");
        assert_eq!(format_timestamp(951_782_400), "2000-02-29T00:00:00Z");
    }

    #[test]
    fn level_parsing() {
        assert_eq!(level_from_str(Some("debug")), LevelFilter::Debug);
        assert_eq!(level_from_str(Some("nonsense")), LevelFilter::Info);
        assert_eq!(level_from_str(None), LevelFilter::Info);
    }

    #[test]
    fn reporter_appends_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/commands.log");
        let reporter = CommandLogReporter::with_path(&path);
        reporter
            .report_command(Platform::Slack, "kubectl get pods", CommandOrigin::Typed, false)
            .unwrap();
        reporter
            .report_command(Platform::Teams, "ping", CommandOrigin::ButtonClick, true)
            .unwrap();

        let log = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = log.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].ends_with("\tslack\ttyped\t-\tkubectl get pods"));
        assert!(lines[1].ends_with("\tteams\tbutton-click\tfilter\tping"));
    }
}
