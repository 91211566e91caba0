use anyhow::{Context, Result, anyhow};
use damup::{ChunkFailurePolicy, ChunkSize, Timing, UploaderConfig};
use dotenvy::dotenv;
use keyring::Entry;
use serde::Deserialize;
use std::{fs, time::Duration};
use url::Url;

pub const KEYRING_SERVICE: &str = "damup-frontify-token";
pub const KEYRING_USER: &str = "Frontify";

#[derive(Debug, Deserialize, Default)]
struct ConfigFile {
    project_id: Option<String>,
    url: Option<Url>,
    folders_path: Option<Vec<String>>,
    chunk_size_mb: Option<u64>,
    settle_delay: Option<String>,
    poll_interval: Option<String>,
    ready_timeout_per_chunk: Option<String>,
    request_timeout: Option<String>,
    strict_chunks: Option<bool>,
}

#[derive(Debug, Deserialize, Default)]
struct ConfigEnv {
    token: Option<String>,
    project_id: Option<String>,
    url: Option<Url>,
    folders_path: Option<Vec<String>>,
    chunk_size_mb: Option<u64>,
    settle_delay: Option<String>,
    poll_interval: Option<String>,
    ready_timeout_per_chunk: Option<String>,
    request_timeout: Option<String>,
    strict_chunks: Option<bool>,
}

fn parse_duration(name: &str, value: Option<String>, default: Duration) -> Result<Duration> {
    match value {
        Some(value) => humantime::parse_duration(&value)
            .with_context(|| format!("Invalid duration for {}: {}", name, value)),
        None => Ok(default),
    }
}

fn merge_config(
    base: ConfigFile,
    override_config: ConfigEnv,
    read_token: impl FnOnce() -> Result<String>,
) -> Result<UploaderConfig> {
    let project_id = override_config
        .project_id
        .or(base.project_id)
        .ok_or(anyhow!("No Frontify project id provided"))?;

    let token = match override_config.token {
        Some(token) => token,
        None => read_token()?,
    };

    let defaults = Timing::default();
    let timing = Timing {
        settle_delay: parse_duration(
            "settle_delay",
            override_config.settle_delay.or(base.settle_delay),
            defaults.settle_delay,
        )?,
        poll_interval: parse_duration(
            "poll_interval",
            override_config.poll_interval.or(base.poll_interval),
            defaults.poll_interval,
        )?,
        ready_timeout_per_chunk: parse_duration(
            "ready_timeout_per_chunk",
            override_config
                .ready_timeout_per_chunk
                .or(base.ready_timeout_per_chunk),
            defaults.ready_timeout_per_chunk,
        )?,
        request_timeout: parse_duration(
            "request_timeout",
            override_config.request_timeout.or(base.request_timeout),
            defaults.request_timeout,
        )?,
    };

    let chunk_size = match override_config.chunk_size_mb.or(base.chunk_size_mb) {
        Some(megabytes) => ChunkSize::from_megabytes(megabytes)?,
        None => ChunkSize::default(),
    };

    let mut config = UploaderConfig::new(token, project_id)
        .with_folders_path(
            override_config
                .folders_path
                .or(base.folders_path)
                .unwrap_or_default(),
        )
        .with_chunk_size(chunk_size)
        .with_chunk_failures(
            if override_config
                .strict_chunks
                .or(base.strict_chunks)
                .unwrap_or(false)
            {
                ChunkFailurePolicy::Fail
            } else {
                ChunkFailurePolicy::Ignore
            },
        )
        .with_timing(timing);

    if let Some(url) = override_config.url.or(base.url) {
        config = config.with_frontify_url(url);
    }

    Ok(config)
}

fn token_from_keyring() -> Result<String> {
    let entry = Entry::new(KEYRING_SERVICE, KEYRING_USER)?;
    let token = entry
        .get_secret()
        .context("Frontify token not specified via environment variable nor present in OS keyring")?;
    Ok(String::from_utf8(token)?)
}

pub fn read_config() -> Result<UploaderConfig> {
    let _ = dotenv();
    let env_config = envy::prefixed("FRONTIFY_")
        .from_env::<ConfigEnv>()
        .unwrap_or_default();

    let project_dirs = directories::ProjectDirs::from("com", "frontify", "damup")
        .ok_or(anyhow!("Unable to determine home directory"))?;
    let config_file = project_dirs.config_dir().join("config.toml");
    let file_config = if let Ok(config) = fs::read_to_string(config_file) {
        toml::from_str(&config)?
    } else {
        ConfigFile::default()
    };

    merge_config(file_config, env_config, token_from_keyring)
}

pub fn set_token_keyring(token: String) -> Result<()> {
    let entry = Entry::new(KEYRING_SERVICE, KEYRING_USER)?;
    entry.set_secret(token.as_bytes())?;
    println!("Frontify token set for use with damup");
    Ok(())
}
