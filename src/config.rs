use std::{
    env, fs,
    path::{Path, PathBuf},
    str::FromStr,
    time::Duration,
};

use anyhow::{Context, Result};
use clap::{ArgAction, Parser};
use dirs::{cache_dir, config_dir};
use log::LevelFilter;
use serde::Deserialize;

use crate::i18n::Language;

pub const DEFAULT_URL: &str = "http://localhost:1337/api/v1/jsonrpc";
pub const DEFAULT_PAGE_SIZE: usize = 10;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub rpc: RpcConfig,
    pub page_size: usize,
    pub poll_interval: Duration,
    pub language: Language,
    pub log_level: LevelFilter,
    pub log_file: Option<PathBuf>,
}

#[derive(Debug, Clone)]
pub struct RpcConfig {
    pub url: String,
    pub secret_key: Option<String>,
    pub timeout: Duration,
    pub verify_ssl: bool,
    pub user_agent: String,
}

#[derive(Parser, Debug)]
#[command(author, version, about = "Porla daemon terminal UI", long_about = None)]
pub struct Cli {
    /// JSON-RPC endpoint of the daemon
    #[arg(long)]
    pub url: Option<String>,
    #[arg(long)]
    pub secret_key: Option<String>,
    /// Torrents per page until the terminal size is known
    #[arg(long)]
    pub page_size: Option<usize>,
    /// Request timeout in seconds
    #[arg(long)]
    pub timeout: Option<f64>,
    /// Seconds between list refreshes
    #[arg(long)]
    pub poll_interval: Option<f64>,
    #[arg(long, action = ArgAction::SetTrue)]
    pub insecure: bool,
    #[arg(long)]
    pub language: Option<String>,
    #[arg(long)]
    pub config: Option<PathBuf>,
    #[arg(long)]
    pub log_level: Option<String>,
    #[arg(long)]
    pub log_file: Option<PathBuf>,
}

#[derive(Debug, Default, Deserialize)]
struct FileConfig {
    url: Option<String>,
    secret_key: Option<String>,
    page_size: Option<usize>,
    timeout: Option<f64>,
    poll_interval: Option<f64>,
    verify_ssl: Option<bool>,
    user_agent: Option<String>,
    language: Option<String>,
    log_level: Option<String>,
    log_file: Option<PathBuf>,
}

pub fn build_config(cli: &Cli) -> Result<AppConfig> {
    let file = load_file_config(cli.config.as_deref())?.unwrap_or_default();

    let url = cli
        .url
        .clone()
        .or_else(|| env::var("OSPREY_URL").ok())
        .or_else(|| file.url.clone())
        .unwrap_or_else(|| DEFAULT_URL.to_string());

    let secret_key = cli
        .secret_key
        .clone()
        .or_else(|| env::var("OSPREY_SECRET_KEY").ok())
        .or_else(|| file.secret_key.clone())
        .filter(|key| !key.is_empty());

    let page_size = cli
        .page_size
        .or_else(|| env_var_parse("OSPREY_PAGE_SIZE"))
        .or(file.page_size)
        .unwrap_or(DEFAULT_PAGE_SIZE);

    if page_size == 0 {
        anyhow::bail!("page size must be positive");
    }

    let timeout_secs = cli
        .timeout
        .or_else(|| env_var_parse("OSPREY_TIMEOUT"))
        .or(file.timeout)
        .unwrap_or(10.0);

    if timeout_secs <= 0.0 {
        anyhow::bail!("timeout must be positive");
    }

    let poll_secs = cli
        .poll_interval
        .or_else(|| env_var_parse("OSPREY_POLL_INTERVAL"))
        .or(file.poll_interval)
        .unwrap_or(1.0);

    if poll_secs <= 0.0 {
        anyhow::bail!("poll interval must be positive");
    }

    let mut verify_ssl = file.verify_ssl.unwrap_or(true);
    if let Some(value) = env_bool("OSPREY_VERIFY_SSL") {
        verify_ssl = value;
    }
    if cli.insecure {
        verify_ssl = false;
    }

    let user_agent = file
        .user_agent
        .clone()
        .unwrap_or_else(|| format!("osprey/{}", env!("CARGO_PKG_VERSION")));

    let language = cli
        .language
        .clone()
        .or_else(|| env::var("OSPREY_LANGUAGE").ok())
        .or_else(|| file.language.clone())
        .map(|value| value.parse::<Language>())
        .transpose()?
        .unwrap_or_default();

    let log_level_str = cli
        .log_level
        .clone()
        .or_else(|| env::var("OSPREY_LOG_LEVEL").ok())
        .or_else(|| file.log_level.clone())
        .unwrap_or_else(|| "warn".to_string());
    let log_level = LevelFilter::from_str(&log_level_str).unwrap_or(LevelFilter::Warn);

    let log_file = cli
        .log_file
        .clone()
        .or_else(|| env::var_os("OSPREY_LOG_FILE").map(PathBuf::from))
        .or_else(|| file.log_file.clone())
        .or_else(|| cache_dir().map(|dir| dir.join("osprey").join("osprey.log")));

    Ok(AppConfig {
        rpc: RpcConfig {
            url,
            secret_key,
            timeout: Duration::from_secs_f64(timeout_secs),
            verify_ssl,
            user_agent,
        },
        page_size,
        poll_interval: Duration::from_secs_f64(poll_secs),
        language,
        log_level,
        log_file,
    })
}

fn load_file_config(path: Option<&Path>) -> Result<Option<FileConfig>> {
    if let Some(path) = path {
        return read_file_config(path);
    }

    if let Ok(env_path) = env::var("OSPREY_CONFIG") {
        return read_file_config(Path::new(&env_path));
    }

    if let Some(dir) = config_dir() {
        let modern_path = dir.join("osprey").join("config.toml");
        if let Some(cfg) = read_file_config(&modern_path)? {
            return Ok(Some(cfg));
        }

        let legacy_path = dir.join("osprey.toml");
        return read_file_config(&legacy_path);
    }

    Ok(None)
}

fn read_file_config(path: &Path) -> Result<Option<FileConfig>> {
    if !path.exists() {
        return Ok(None);
    }

    let contents = fs::read_to_string(path)
        .with_context(|| format!("failed to read config file {}", path.display()))?;
    let parsed: FileConfig = toml::from_str(&contents)
        .with_context(|| format!("failed to parse config file {}", path.display()))?;
    Ok(Some(parsed))
}

fn env_var_parse<T>(name: &str) -> Option<T>
where
    T: FromStr,
{
    env::var(name).ok().and_then(|value| value.parse().ok())
}

fn env_bool(name: &str) -> Option<bool> {
    env::var(name)
        .ok()
        .and_then(|value| match value.to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Some(true),
            "0" | "false" | "no" | "off" => Some(false),
            _ => None,
        })
}
