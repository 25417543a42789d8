// ABOUTME: Password sources consulted once while building a server connection
// ABOUTME: Interactive no-echo prompt for the CLI, fixed value for tests and scripts

use anyhow::{Context, Result};
use dialoguer::Password;

/// Supplies a password when none was configured
pub trait CredentialSource {
    fn password(&self, user: &str, host: Option<&str>) -> Result<String>;
}

/// Reads the password from the terminal without echo
#[derive(Debug, Default, Clone, Copy)]
pub struct PromptCredentials;

impl CredentialSource for PromptCredentials {
    fn password(&self, user: &str, host: Option<&str>) -> Result<String> {
        Password::new()
            .with_prompt(format!(
                "Password for {}@{}",
                user,
                host.unwrap_or("localhost")
            ))
            .allow_empty_password(true)
            .interact()
            .context("Failed to read password from terminal")
    }
}

/// Always returns the same password
#[derive(Clone)]
pub struct StaticCredentials {
    password: String,
}

impl StaticCredentials {
    pub fn new(password: impl Into<String>) -> Self {
        Self {
            password: password.into(),
        }
    }
}

impl CredentialSource for StaticCredentials {
    fn password(&self, _user: &str, _host: Option<&str>) -> Result<String> {
        Ok(self.password.clone())
    }
}

impl std::fmt::Debug for StaticCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StaticCredentials").finish_non_exhaustive()
    }
}
