//! Config file loading and resolution of CLI > file > built-in settings.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, bail};
use yadloader_core::config::MAX_LIMIT;
use yadloader_core::transport::constants::DEFAULT_RETRY_WAIT_MAX;
use yadloader_core::{BackoffStrategy, ClientConfig, FailurePolicy, RetryPolicy, WalkLimits};

use crate::cli::{Args, BackoffArg};

/// Settings read from `config.toml`; every field is optional.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FileConfig {
    pub api_base: Option<String>,
    pub limit: Option<u32>,
    pub timeout_secs: Option<u64>,
    pub page_delay_ms: Option<u64>,
    pub max_retries: Option<u32>,
    pub retry_wait_ms: Option<u64>,
    pub backoff: Option<BackoffStrategy>,
    pub chunk_size: Option<u64>,
    pub max_depth: Option<usize>,
    pub max_files: Option<usize>,
    pub verify: Option<bool>,
    pub fail_fast: Option<bool>,
    /// Default download directory; `--json` still lists.
    pub output_dir: Option<PathBuf>,
}

impl FileConfig {
    /// Validates values against the same ranges the CLI accepts.
    pub fn validate(&self) -> Result<()> {
        if let Some(limit) = self.limit
            && !(1..=MAX_LIMIT).contains(&limit)
        {
            bail!("Invalid config value for `limit`: {limit}. Expected range: 1..={MAX_LIMIT}");
        }
        if let Some(timeout) = self.timeout_secs
            && !(1..=3600).contains(&timeout)
        {
            bail!("Invalid config value for `timeout_secs`: {timeout}. Expected range: 1..=3600");
        }
        if let Some(retries) = self.max_retries
            && retries > 10
        {
            bail!("Invalid config value for `max_retries`: {retries}. Expected range: 0..=10");
        }
        if self.chunk_size == Some(0) {
            bail!("Invalid config value for `chunk_size`: 0. Expected a positive byte count");
        }
        if let Some(api_base) = &self.api_base
            && !(api_base.starts_with("http://") || api_base.starts_with("https://"))
        {
            bail!("Invalid config value for `api_base`: {api_base}. Expected an http(s) URL");
        }
        Ok(())
    }
}

/// Everything the run needs after merging CLI flags, config file and defaults.
#[derive(Debug, Clone)]
pub struct ResolvedSettings {
    pub client: ClientConfig,
    pub output: Option<PathBuf>,
    pub failure_policy: FailurePolicy,
}

/// Merges settings with priority CLI flag > config file > built-in default.
pub fn resolve_settings(args: &Args, file: &FileConfig) -> Result<ResolvedSettings> {
    let defaults = ClientConfig::default();

    let page_delay = args
        .page_delay
        .or(file.page_delay_ms)
        .map_or(defaults.page_delay, Duration::from_millis);
    let retry_wait = args
        .retry_wait
        .or(file.retry_wait_ms)
        .map_or(page_delay, Duration::from_millis);
    let backoff = args
        .backoff
        .map(|b| match b {
            BackoffArg::Exponential => BackoffStrategy::Exponential,
            BackoffArg::Fixed => BackoffStrategy::Fixed,
        })
        .or(file.backoff)
        .unwrap_or_default();
    let max_retries = args
        .max_retries
        .or(file.max_retries)
        .unwrap_or(defaults.retry.max_retries());
    let chunk_size = match args.chunk_size.or(file.chunk_size) {
        Some(bytes) => usize::try_from(bytes).context("chunk_size does not fit in memory")?,
        None => defaults.chunk_size,
    };

    let client = ClientConfig {
        api_base: args
            .api_base
            .clone()
            .or_else(|| file.api_base.clone())
            .unwrap_or(defaults.api_base),
        limit: args.limit.or(file.limit).unwrap_or(defaults.limit),
        timeout: args
            .timeout
            .or(file.timeout_secs)
            .map_or(defaults.timeout, Duration::from_secs),
        page_delay,
        retry: RetryPolicy::new(
            max_retries,
            retry_wait,
            DEFAULT_RETRY_WAIT_MAX,
            backoff,
        ),
        chunk_size,
        limits: WalkLimits {
            max_depth: args.max_depth.or(file.max_depth),
            max_files: args.max_files.or(file.max_files),
        },
        verify_checksums: args.verify || file.verify.unwrap_or(false),
    };
    client.validate().context("Invalid settings")?;

    let output = if args.json {
        None
    } else {
        args.output.clone().or_else(|| file.output_dir.clone())
    };
    let failure_policy = if args.fail_fast || file.fail_fast.unwrap_or(false) {
        FailurePolicy::Abort
    } else {
        FailurePolicy::Continue
    };

    Ok(ResolvedSettings {
        client,
        output,
        failure_policy,
    })
}

/// Resolves the default config path.
///
/// Priority:
/// 1. `$XDG_CONFIG_HOME/yadloader/config.toml`
/// 2. `$HOME/.config/yadloader/config.toml`
#[must_use]
pub fn resolve_default_config_path() -> Option<PathBuf> {
    if let Some(xdg_config_home) = env_var_non_empty_os("XDG_CONFIG_HOME") {
        return Some(
            PathBuf::from(xdg_config_home)
                .join("yadloader")
                .join("config.toml"),
        );
    }

    let home = env_var_non_empty_os("HOME")?;
    Some(
        PathBuf::from(home)
            .join(".config")
            .join("yadloader")
            .join("config.toml"),
    )
}

fn env_var_non_empty_os(name: &str) -> Option<std::ffi::OsString> {
    let value = env::var_os(name)?;
    if value.is_empty() { None } else { Some(value) }
}

/// Loads the config file.
///
/// An explicit path must exist; the default path is optional.
pub fn load_file_config(explicit: Option<&Path>) -> Result<FileConfig> {
    if let Some(path) = explicit {
        return read_file_config(path);
    }
    match resolve_default_config_path() {
        Some(path) if path.exists() => read_file_config(&path),
        _ => Ok(FileConfig::default()),
    }
}

fn read_file_config(path: &Path) -> Result<FileConfig> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file '{}'", path.display()))?;
    parse_config_str(&raw)
        .with_context(|| format!("Failed to parse config file '{}'", path.display()))
}

fn parse_config_str(raw: &str) -> Result<FileConfig> {
    let mut cfg = FileConfig::default();
    for (line_index, raw_line) in raw.lines().enumerate() {
        let line_number = line_index + 1;
        let line = strip_inline_comment(raw_line).trim();
        if line.is_empty() {
            continue;
        }

        let Some((raw_key, raw_value)) = line.split_once('=') else {
            bail!("Invalid config syntax on line {line_number}: expected key = value");
        };

        let key = raw_key.trim();
        let value = raw_value.trim();
        let context = || format!("Invalid `{key}` value on line {line_number}");

        match key {
            "api_base" => cfg.api_base = Some(parse_string_literal(value).with_context(context)?),
            "limit" => cfg.limit = Some(parse_integer(value).with_context(context)?),
            "timeout_secs" => cfg.timeout_secs = Some(parse_integer(value).with_context(context)?),
            "page_delay_ms" => {
                cfg.page_delay_ms = Some(parse_integer(value).with_context(context)?);
            }
            "max_retries" => cfg.max_retries = Some(parse_integer(value).with_context(context)?),
            "retry_wait_ms" => {
                cfg.retry_wait_ms = Some(parse_integer(value).with_context(context)?);
            }
            "backoff" => {
                let label = parse_string_literal(value).with_context(context)?;
                let strategy = BackoffStrategy::from_label(&label)
                    .with_context(|| format!("Expected one of: exponential, fixed ({label})"))
                    .with_context(context)?;
                cfg.backoff = Some(strategy);
            }
            "chunk_size" => cfg.chunk_size = Some(parse_integer(value).with_context(context)?),
            "max_depth" => cfg.max_depth = Some(parse_integer(value).with_context(context)?),
            "max_files" => cfg.max_files = Some(parse_integer(value).with_context(context)?),
            "verify" => cfg.verify = Some(parse_boolean(value).with_context(context)?),
            "fail_fast" => cfg.fail_fast = Some(parse_boolean(value).with_context(context)?),
            "output_dir" => {
                let parsed = parse_string_literal(value).with_context(context)?;
                cfg.output_dir = Some(PathBuf::from(parsed));
            }
            unknown => {
                bail!("Unknown configuration key: '{unknown}' on line {line_number}");
            }
        }
    }
    cfg.validate()?;
    Ok(cfg)
}

fn strip_inline_comment(line: &str) -> &str {
    let mut in_string = false;
    for (index, ch) in line.char_indices() {
        match ch {
            '"' => in_string = !in_string,
            '#' if !in_string => return &line[..index],
            _ => {}
        }
    }
    line
}

fn parse_string_literal(raw_value: &str) -> Result<String> {
    if raw_value.len() < 2 || !raw_value.starts_with('"') || !raw_value.ends_with('"') {
        bail!("Expected double-quoted string");
    }
    Ok(raw_value[1..raw_value.len() - 1].to_string())
}

fn parse_integer<T>(raw_value: &str) -> Result<T>
where
    T: TryFrom<u64>,
{
    let token = raw_value.trim();
    if token.is_empty() {
        bail!("Expected integer value");
    }
    let value = token.parse::<i128>()?;
    if value < 0 {
        bail!("Expected non-negative integer");
    }
    let value =
        u64::try_from(value).map_err(|_| anyhow::anyhow!("Integer value out of range for u64"))?;
    T::try_from(value).map_err(|_| anyhow::anyhow!("Integer value {value} out of range"))
}

fn parse_boolean(raw_value: &str) -> Result<bool> {
    match raw_value.trim() {
        "true" => Ok(true),
        "false" => Ok(false),
        _ => bail!("Expected 'true' or 'false'"),
    }
}
