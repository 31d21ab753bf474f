use std::{net::SocketAddr, path::PathBuf, time::Duration};

use anyhow::{Context, Result};

const DEFAULT_OLLAMA_HOST: &str = "http://127.0.0.1:11434";
const DEFAULT_GEN_MODEL: &str = "llama3.2:1b-instruct-q3_K_L";
const DEFAULT_CODE_MODEL: &str = "qwen2.5-coder:0.5b-instruct";
const DEFAULT_MAIL_TO: &str = "arbitration@example.com";
const FALLBACK_FROM: &str = "no-reply@example.com";

/// Process-wide settings, read once at startup and shared read-only.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub bind_addr: SocketAddr,
    pub frontend_dist: PathBuf,
    pub max_upload_bytes: usize,
    pub allowed_origins: AllowedOrigins,
    pub inference: InferenceConfig,
    pub smtp: SmtpConfig,
}

#[derive(Debug, Clone)]
pub struct InferenceConfig {
    pub host: String,
    pub general_model: String,
    pub code_model: String,
    pub timeout: Duration,
}

#[derive(Clone)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub from: String,
    pub to: String,
    pub dry_run: bool,
    /// Per socket operation.
    pub timeout: Duration,
    /// Whole connect-to-quit session; large attachments need far more than `timeout`.
    pub session_timeout: Duration,
}

// Hand-written so the password never ends up in logs.
impl std::fmt::Debug for SmtpConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SmtpConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password_set", &!self.password.is_empty())
            .field("from", &self.from)
            .field("to", &self.to)
            .field("dry_run", &self.dry_run)
            .field("timeout", &self.timeout)
            .field("session_timeout", &self.session_timeout)
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AllowedOrigins {
    Any,
    List(Vec<String>),
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| dotenvy::var(key).ok())
    }

    /// Build a configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        let bind_addr: SocketAddr = var("BIND_ADDR", "0.0.0.0:8000")
            .trim()
            .parse()
            .context("BIND_ADDR must be a socket address like 0.0.0.0:8000")?;

        let max_upload_mb: usize = var("MAX_UPLOAD_MB", "25")
            .trim()
            .parse()
            .context("MAX_UPLOAD_MB must be a whole number of megabytes")?;

        let inference = InferenceConfig {
            host: var("OLLAMA_HOST", DEFAULT_OLLAMA_HOST)
                .trim()
                .trim_end_matches('/')
                .to_string(),
            general_model: var("OLLAMA_GEN_MODEL", DEFAULT_GEN_MODEL),
            code_model: var("OLLAMA_CODE_MODEL", DEFAULT_CODE_MODEL),
            timeout: parse_seconds("OLLAMA_TIMEOUT", &var("OLLAMA_TIMEOUT", "60"))?,
        };

        let username = var("SMTP_USER", "");
        let password: String = var("SMTP_PASS", "")
            .chars()
            .filter(|c| !c.is_whitespace())
            .collect();
        let from = lookup("SMTP_FROM")
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| {
                if username.is_empty() {
                    FALLBACK_FROM.to_string()
                } else {
                    username.clone()
                }
            });

        let smtp = SmtpConfig {
            host: var("SMTP_HOST", "smtp.gmail.com"),
            port: var("SMTP_PORT", "587")
                .trim()
                .parse()
                .context("SMTP_PORT must be a port number")?,
            username,
            password,
            from,
            to: var("MAIL_TO", DEFAULT_MAIL_TO),
            dry_run: is_truthy(&var("SMTP_DRY_RUN", "false")),
            timeout: parse_seconds("SMTP_TIMEOUT", &var("SMTP_TIMEOUT", "20"))?,
            session_timeout: parse_seconds(
                "SMTP_SESSION_TIMEOUT",
                &var("SMTP_SESSION_TIMEOUT", "600"),
            )?,
        };

        Ok(Self {
            bind_addr,
            frontend_dist: PathBuf::from(var("FRONTEND_DIST", "frontend/dist")),
            max_upload_bytes: max_upload_mb.saturating_mul(1024 * 1024),
            allowed_origins: AllowedOrigins::parse(&var("CORS_ORIGINS", "*")),
            inference,
            smtp,
        })
    }
}

impl AllowedOrigins {
    pub fn parse(raw: &str) -> Self {
        if raw.trim() == "*" {
            return Self::Any;
        }
        Self::List(
            raw.split(',')
                .map(str::trim)
                .filter(|o| !o.is_empty())
                .map(str::to_string)
                .collect(),
        )
    }
}

fn is_truthy(raw: &str) -> bool {
    matches!(raw.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes")
}

fn parse_seconds(key: &str, raw: &str) -> Result<Duration> {
    let secs: f64 = raw
        .trim()
        .parse()
        .with_context(|| format!("{key} must be a number of seconds"))?;
    Duration::try_from_secs_f64(secs).with_context(|| format!("{key} must be a positive duration"))
}
