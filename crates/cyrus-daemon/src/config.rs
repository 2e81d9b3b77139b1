//! CLI + environment configuration for the daemon process (spec.md §6's
//! env/config field list), grounded on the teacher's `clap`-derived daemon
//! CLI (`astrid-cli::daemon_main`) — scaled down since this daemon has no
//! subcommands, just flags.

use std::path::PathBuf;

use clap::Parser;

/// Background agent-session orchestrator for an issue tracker.
#[derive(Parser, Debug)]
#[command(name = "cyrusd", author, version, about)]
pub struct Args {
    /// Root directory for state and attachments. Defaults to the platform
    /// config/data directory under the name "cyrus".
    #[arg(long, env = "CYRUS_HOME")]
    pub cyrus_home: Option<PathBuf>,

    /// Repository-set config file. Defaults to `<cyrusHome>/config.toml`.
    #[arg(long, env = "CYRUS_CONFIG_PATH")]
    pub config_path: Option<PathBuf>,

    /// Central proxy URL for the WebSocket transport. When absent, the
    /// direct HTTP webhook transport is used instead.
    #[arg(long, env = "CYRUS_PROXY_URL")]
    pub proxy_url: Option<String>,

    /// Tracker API base URL.
    #[arg(long, env = "CYRUS_BASE_URL", default_value = "https://api.tracker.example.com")]
    pub base_url: String,

    /// Host the direct-webhook HTTP server binds to.
    #[arg(long, env = "CYRUS_SERVER_HOST", default_value = "0.0.0.0")]
    pub server_host: String,

    /// Port the direct-webhook HTTP server binds to.
    #[arg(long, env = "CYRUS_SERVER_PORT", default_value_t = 3000)]
    pub server_port: u16,

    /// Force the direct HTTP transport even when a proxy URL is configured.
    #[arg(long, env = "CYRUS_USE_DIRECT_WEBHOOKS")]
    pub use_direct_webhooks: bool,

    /// The Tracker user id this process posts comments and activity as.
    #[arg(long, env = "CYRUS_BOT_USER_ID", default_value = "cyrus-bot")]
    pub bot_user_id: String,

    /// Assistant child-process program (e.g. a `claude` CLI binary).
    #[arg(long, env = "CYRUS_ASSISTANT_PROGRAM", default_value = "claude")]
    pub assistant_program: String,

    /// Classifier child-process program. Defaults to the Assistant program.
    #[arg(long, env = "CYRUS_CLASSIFIER_PROGRAM")]
    pub classifier_program: Option<String>,

    /// Run every Procedure in its `-controlled` variant, pausing each
    /// Subroutine for operator review.
    #[arg(long, env = "CYRUS_CONTROL_MODE")]
    pub control_mode: bool,

    /// Verbose (debug-level) logging.
    #[arg(short, long)]
    pub verbose: bool,
}

impl Args {
    #[must_use]
    pub fn cyrus_home(&self) -> PathBuf {
        self.cyrus_home.clone().unwrap_or_else(|| {
            directories::ProjectDirs::from("", "", "cyrus")
                .map(|dirs| dirs.data_dir().to_path_buf())
                .unwrap_or_else(|| PathBuf::from(".cyrus"))
        })
    }

    #[must_use]
    pub fn config_path(&self) -> PathBuf {
        self.config_path
            .clone()
            .or_else(cyrus_config::default_config_path)
            .unwrap_or_else(|| self.cyrus_home().join("config.toml"))
    }

    #[must_use]
    pub fn state_dir(&self) -> PathBuf {
        self.cyrus_home().join("state")
    }

    #[must_use]
    pub fn use_proxy(&self) -> bool {
        !self.use_direct_webhooks && self.proxy_url.is_some()
    }

    #[must_use]
    pub fn classifier_program(&self) -> String {
        self.classifier_program.clone().unwrap_or_else(|| self.assistant_program.clone())
    }
}
