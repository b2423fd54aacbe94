//! Configuration and CLI argument handling

use std::path::PathBuf;

use clap::Parser;

use crate::state::TimerSettings;

/// CLI argument parsing structure
#[derive(Debug, Parser)]
#[command(name = "office-stretch")]
#[command(about = "A break-reminder timer service with snooze and recovery")]
#[command(version)]
pub struct Config {
    /// Port to bind the server to
    #[arg(short, long, default_value = "20554")]
    pub port: u16,

    /// Host address to bind to
    #[arg(long, default_value = "127.0.0.1")]
    pub host: String,

    /// Break interval in minutes used until settings are saved
    #[arg(short, long, default_value = "45", value_parser = clap::value_parser!(u32).range(1..=120))]
    pub interval: u32,

    /// Directory holding settings, the recovery snapshot and usage records
    #[arg(long, default_value = ".office-stretch")]
    pub data_dir: PathBuf,

    /// Keep everything in memory; nothing survives a restart
    #[arg(long)]
    pub ephemeral: bool,

    /// Maximum timer starts and manual breaks per week (unlimited if unset)
    #[arg(long)]
    pub weekly_limit: Option<u32>,

    /// User the usage quota is counted against
    #[arg(long, default_value = "local")]
    pub user_id: String,

    /// Log break alerts instead of showing desktop notifications
    #[arg(long)]
    pub no_desktop_notifications: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,
}

impl Config {
    /// Parse configuration from command line arguments
    pub fn parse() -> Self {
        Parser::parse()
    }

    /// Get the server address as a formatted string
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Get the appropriate log level based on verbose flag
    pub fn log_level(&self) -> &'static str {
        if self.verbose { "debug" } else { "info" }
    }

    /// Settings used on first run
    pub fn default_settings(&self) -> TimerSettings {
        TimerSettings::with_interval(self.interval)
    }
}
