//! CLI command handlers.

pub mod auth;
pub mod call;
pub mod health;
pub mod status;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context as _, Result};
use forge_client::{AuthEndpoints, ClientBuilder, ForgeClient, SessionClient};
use forge_config::{ForgeConfig, LoadedConfig};
use forge_session::{FileSession, TokenStore};

/// Shared context for all commands.
#[derive(Debug, Clone)]
pub struct Context {
    /// Merged configuration.
    pub config: ForgeConfig,
    /// Config files that were loaded.
    pub config_sources: Vec<PathBuf>,
    /// API base URL to connect to.
    pub server_url: String,
    /// Where the session is persisted.
    pub session_file: PathBuf,
    /// Output as JSON for scripting.
    pub json_output: bool,
    /// Verbose output enabled.
    pub verbose: bool,
}

impl Context {
    pub fn new(
        loaded: LoadedConfig,
        server: Option<String>,
        session_file: Option<PathBuf>,
        json_output: bool,
        verbose: bool,
    ) -> Result<Self> {
        let config_sources = loaded
            .loaded_from()
            .into_iter()
            .map(PathBuf::from)
            .collect();
        let config = loaded.config;

        let server_url = server.unwrap_or_else(|| config.api.base_url().to_string());
        let session_file = session_file
            .or_else(|| config.session.file_path())
            .context("Could not determine data directory; pass --session-file")?;

        Ok(Self {
            config,
            config_sources,
            server_url,
            session_file,
            json_output,
            verbose,
        })
    }

    /// Build the API client from config.
    pub fn client(&self) -> Result<ForgeClient> {
        client_builder(&self.config, &self.server_url)
            .build()
            .with_context(|| format!("Invalid API URL '{}'", self.server_url))
    }

    /// The persisted session's token store.
    pub fn store(&self) -> TokenStore {
        TokenStore::new(Arc::new(FileSession::new(&self.session_file)))
    }

    /// API client bound to the persisted session.
    pub fn session(&self) -> Result<SessionClient> {
        Ok(self.client()?.session(self.store()))
    }
}

/// Translate config into a client builder.
pub fn client_builder(config: &ForgeConfig, server_url: &str) -> ClientBuilder {
    let defaults = AuthEndpoints::default();
    let auth = &config.auth;
    let endpoints = AuthEndpoints {
        login: auth.login_path.clone().unwrap_or(defaults.login),
        refresh: auth.refresh_path.clone().unwrap_or(defaults.refresh),
        logout: auth.logout_path.clone().unwrap_or(defaults.logout),
        health: defaults.health,
    };

    let mut builder = ForgeClient::builder()
        .base_url(server_url)
        .timeout(config.api.timeout())
        .max_retries(config.api.max_retries())
        .retry_backoff(config.api.retry_backoff())
        .staleness_threshold(auth.staleness_threshold())
        .expiry_buffer(auth.expiry_buffer())
        .endpoints(endpoints);

    if let Some(agent) = &config.api.user_agent {
        builder = builder.user_agent(agent);
    }
    builder
}

/// Wrap a client error with the message meant for the person at the terminal.
pub fn user_error(e: forge_client::Error) -> anyhow::Error {
    let message = if e.requires_login() {
        format!("{} (run 'forge login')", e.user_message())
    } else {
        e.user_message()
    };
    anyhow::Error::new(e).context(message)
}
