use anyhow::{bail, Context, Result};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

pub const DEFAULT_OUTPUT_FILE: &str = "vpn-nodes.json";
pub const DEFAULT_WHITEBOX_FILE: &str = "whitebox-sd-config.yml";
pub const DEFAULT_TIMEOUT_SECS: u64 = 15;

/// Resolved settings for a single sync run. Read-only once built.
#[derive(Clone, Debug)]
pub struct Config {
    pub api_url: String,
    pub api_token: String,
    pub output_file: PathBuf,
    pub whitebox_file: PathBuf,
    pub subscription_url: Option<String>,
    pub timeout: Duration,
}

/// Settings as they arrive from the command line and environment,
/// before defaults are applied.
#[derive(Clone, Debug, Default)]
pub struct RawConfig {
    pub api_url: Option<String>,
    pub api_token: Option<String>,
    pub output_file: Option<PathBuf>,
    pub whitebox_file: Option<PathBuf>,
    pub subscription_url: Option<String>,
    pub xray_checker_subscription_url: Option<String>,
    pub log_file: Option<PathBuf>,
    pub timeout_secs: Option<u64>,
}

impl Config {
    /// Apply defaults relative to `base_dir` (the directory holding the binary).
    pub fn resolve(raw: RawConfig, base_dir: &Path) -> Result<Self> {
        let api_url = non_empty(raw.api_url);
        let api_token = non_empty(raw.api_token);
        let (api_url, api_token) = match (api_url, api_token) {
            (Some(url), Some(token)) => (url, token),
            _ => bail!(
                "REMNAWAVE_API_URL and REMNAWAVE_API_TOKEN must be set (via .env file or environment variables)"
            ),
        };

        let output_file = raw
            .output_file
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| base_dir.join(DEFAULT_OUTPUT_FILE));

        let whitebox_file = raw
            .whitebox_file
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| base_dir.join(DEFAULT_WHITEBOX_FILE));

        let subscription_url =
            non_empty(raw.subscription_url).or_else(|| non_empty(raw.xray_checker_subscription_url));

        let timeout = Duration::from_secs(raw.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS));

        Ok(Config {
            api_url,
            api_token,
            output_file,
            whitebox_file,
            subscription_url,
            timeout,
        })
    }
}

impl RawConfig {
    /// Log path is needed for rotation before credentials are checked.
    pub fn log_file(&self, base_dir: &Path) -> PathBuf {
        self.log_file
            .clone()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| default_log_file(base_dir))
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

/// `<parent of base_dir>/logs/sync-nodes.log`, the path cron redirects into.
pub fn default_log_file(base_dir: &Path) -> PathBuf {
    base_dir
        .parent()
        .unwrap_or(base_dir)
        .join("logs")
        .join("sync-nodes.log")
}

/// Directory containing the running executable, falling back to the working directory.
pub fn base_dir() -> PathBuf {
    env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(Path::to_path_buf))
        .unwrap_or_else(|| PathBuf::from("."))
}

/// Load `key=value` pairs from `path` into the process environment.
///
/// Variables that are already set are left alone, so the real environment
/// always wins over the file. A missing file is not an error. Returns the
/// number of variables that were set.
pub fn load_env_file(path: &Path) -> Result<usize> {
    if !path.is_file() {
        return Ok(0);
    }

    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read env file {}", path.display()))?;

    let mut applied = 0;
    for (key, value) in content.lines().filter_map(parse_env_line) {
        if env::var_os(key).is_some() {
            continue;
        }
        env::set_var(key, value);
        applied += 1;
    }

    debug!("Loaded {} variables from {}", applied, path.display());
    Ok(applied)
}

/// Split one `.env` line at the first `=`.
///
/// Blank lines, `#` comments and lines without `=` yield `None`. Values are
/// taken literally apart from one pair of matching surrounding quotes.
pub fn parse_env_line(line: &str) -> Option<(&str, &str)> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return None;
    }

    let (key, value) = line.split_once('=')?;
    let key = key.trim();
    if key.is_empty() {
        return None;
    }

    Some((key, strip_matching_quotes(value.trim())))
}

fn strip_matching_quotes(value: &str) -> &str {
    let bytes = value.as_bytes();
    if bytes.len() >= 2 && bytes[0] == bytes[bytes.len() - 1] && matches!(bytes[0], b'"' | b'\'') {
        &value[1..value.len() - 1]
    } else {
        value
    }
}
