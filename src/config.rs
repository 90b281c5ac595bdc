use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::services::scoring_service::ScoringMode;

/// Which data source backs NAV lookups.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderChoice {
    /// Open-end fund lookup with ETF fallback
    Multi,
    OpenFund,
    Etf,
    Mock,
}

impl FromStr for ProviderChoice {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "multi" => Ok(ProviderChoice::Multi),
            "openfund" => Ok(ProviderChoice::OpenFund),
            "etf" => Ok(ProviderChoice::Etf),
            "mock" => Ok(ProviderChoice::Mock),
            other => Err(format!(
                "Invalid NAV_PROVIDER: {}. Must be 'multi', 'openfund', 'etf' or 'mock'",
                other
            )),
        }
    }
}

/// Attempts and pacing for one NAV fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
}

impl RetryPolicy {
    /// Delay slept before attempt `attempt` (0-based). The first attempt is
    /// immediate; retry `i` waits `base × (0.8 + 0.3 i)`.
    pub fn delay_before(&self, attempt: u32) -> Duration {
        if attempt == 0 {
            Duration::ZERO
        } else {
            self.base_delay * (8 + 3 * attempt) / 10
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            base_delay: Duration::from_millis(1200),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub bind_addr: SocketAddr,
    pub provider: ProviderChoice,
    pub retry: RetryPolicy,
    pub http_timeout: Duration,
    pub scoring_mode: ScoringMode,
    pub export_dir: PathBuf,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 3000)),
            provider: ProviderChoice::Multi,
            retry: RetryPolicy::default(),
            http_timeout: Duration::from_secs(15),
            scoring_mode: ScoringMode::Base,
            export_dir: PathBuf::from("exports"),
        }
    }
}

fn env_or<T: FromStr>(key: &str, default: T) -> Result<T, String>
where
    T::Err: std::fmt::Display,
{
    match std::env::var(key) {
        Ok(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse()
            .map_err(|e| format!("Invalid {}='{}': {}", key, raw, e)),
        _ => Ok(default),
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self, String> {
        let defaults = Self::default();

        Ok(Self {
            bind_addr: env_or("BIND_ADDR", defaults.bind_addr)?,
            provider: env_or("NAV_PROVIDER", defaults.provider)?,
            retry: RetryPolicy {
                max_attempts: env_or("NAV_FETCH_MAX_ATTEMPTS", defaults.retry.max_attempts)?,
                base_delay: Duration::from_millis(env_or(
                    "NAV_FETCH_BASE_DELAY_MS",
                    defaults.retry.base_delay.as_millis() as u64,
                )?),
            },
            http_timeout: Duration::from_secs(env_or("HTTP_TIMEOUT_SECS", defaults.http_timeout.as_secs())?),
            scoring_mode: env_or("SCORING_MODE", defaults.scoring_mode)?,
            export_dir: std::env::var("EXPORT_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.export_dir),
        })
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.retry.max_attempts == 0 {
            return Err("NAV_FETCH_MAX_ATTEMPTS must be at least 1".to_string());
        }
        if self.http_timeout.is_zero() {
            return Err("HTTP_TIMEOUT_SECS must be greater than 0".to_string());
        }
        Ok(())
    }
}
