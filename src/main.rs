mod app;
mod config;
mod form;
mod i18n;
mod model;
mod pagination;
mod poll;
mod rpc;
mod tui;

use std::{
    fs::{self, OpenOptions},
    path::Path,
    process,
};

use anyhow::Result;
use clap::Parser;
use config::{build_config, Cli};
use env_logger::{Env, Target};
use log::LevelFilter;

fn main() {
    if let Err(err) = try_main() {
        eprintln!("error: {err:#}");
        process::exit(1);
    }
}

fn try_main() -> Result<()> {
    let cli = Cli::parse();
    let config = build_config(&cli)?;
    init_logging(config.log_level, config.log_file.as_deref());
    tui::run(config)
}

/// The terminal belongs to the UI, so records go to a file when one can be
/// opened and to stderr otherwise.
fn init_logging(level: LevelFilter, log_file: Option<&Path>) {
    let env = Env::default().default_filter_or(level.to_string());
    let mut builder = env_logger::Builder::from_env(env);
    builder.format_target(false);
    if let Some(file) = log_file.and_then(open_log_file) {
        builder.target(Target::Pipe(Box::new(file)));
    }
    let _ = builder.try_init();
}

fn open_log_file(path: &Path) -> Option<fs::File> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).ok()?;
    }
    OpenOptions::new().create(true).append(true).open(path).ok()
}
