use std::net::IpAddr;
use std::time::Duration;

use ipnet::IpNet;

pub const DEFAULT_MAIL_FROM: &str = "Restaurant Subscriptions <onboarding@resend.dev>";

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: Option<String>,
    pub jwt_secret: String,
    pub host: IpAddr,
    pub port: u16,
    pub max_body_size: usize,
    pub trusted_proxies: Vec<IpNet>,
    pub log_level: String,
    pub repository_timeout: Duration,
    pub mail_timeout: Duration,
    pub notify_concurrency: usize,
    pub check_rate_limit: u32,
    pub mail_from: String,
    pub mail: Option<MailTransportConfig>,
}

#[derive(Debug, Clone)]
pub enum MailTransportConfig {
    Smtp(SmtpConfig),
    Resend(ResendConfig),
}

#[derive(Debug, Clone)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub pass: String,
}

#[derive(Debug, Clone)]
pub struct ResendConfig {
    pub api_key: String,
    pub base_url: String,
}

impl Config {
    pub fn from_env() -> Result<Self, String> {
        let database_url = std::env::var("DATABASE_URL")
            .ok()
            .filter(|s| !s.trim().is_empty());
        let jwt_secret = env_required("SUBDESK_JWT_SECRET")?;

        let host: IpAddr = env_or("SUBDESK_HOST", "0.0.0.0")
            .parse()
            .map_err(|e| format!("Invalid SUBDESK_HOST: {e}"))?;

        let port: u16 = env_or("SUBDESK_PORT", "3000")
            .parse()
            .map_err(|e| format!("Invalid SUBDESK_PORT: {e}"))?;

        let max_body_size: usize = env_or("SUBDESK_MAX_BODY_SIZE", "65536")
            .parse()
            .map_err(|e| format!("Invalid SUBDESK_MAX_BODY_SIZE: {e}"))?;

        let trusted_proxies: Vec<IpNet> = env_or("SUBDESK_TRUSTED_PROXIES", "")
            .split(',')
            .filter(|s| !s.trim().is_empty())
            .map(|s| {
                s.trim()
                    .parse()
                    .map_err(|e| format!("Invalid SUBDESK_TRUSTED_PROXIES entry '{s}': {e}"))
            })
            .collect::<Result<Vec<_>, _>>()?;

        let log_level = env_or("SUBDESK_LOG_LEVEL", "info");

        let repository_timeout = env_secs("SUBDESK_REPOSITORY_TIMEOUT_SECS", 5)?;
        let mail_timeout = env_secs("SUBDESK_MAIL_TIMEOUT_SECS", 15)?;

        let notify_concurrency: usize = env_or("SUBDESK_NOTIFY_CONCURRENCY", "4")
            .parse()
            .map_err(|e| format!("Invalid SUBDESK_NOTIFY_CONCURRENCY: {e}"))?;
        if notify_concurrency == 0 {
            return Err("SUBDESK_NOTIFY_CONCURRENCY must be at least 1".to_string());
        }

        let check_rate_limit: u32 = env_or("SUBDESK_CHECK_RATE_LIMIT", "60")
            .parse()
            .map_err(|e| format!("Invalid SUBDESK_CHECK_RATE_LIMIT: {e}"))?;

        let mail_from = env_or("SUBDESK_MAIL_FROM", DEFAULT_MAIL_FROM);

        // Resend wins when both transports are configured.
        let mail = if let Ok(api_key) = std::env::var("RESEND_API_KEY") {
            Some(MailTransportConfig::Resend(ResendConfig {
                api_key,
                base_url: env_or("RESEND_BASE_URL", "https://api.resend.com"),
            }))
        } else {
            match (
                std::env::var("SUBDESK_SMTP_HOST").ok(),
                std::env::var("SUBDESK_SMTP_PORT").ok(),
                std::env::var("SUBDESK_SMTP_USER").ok(),
                std::env::var("SUBDESK_SMTP_PASS").ok(),
            ) {
                (Some(host), Some(port), Some(user), Some(pass)) => {
                    Some(MailTransportConfig::Smtp(SmtpConfig {
                        host,
                        port: port
                            .parse()
                            .map_err(|e| format!("Invalid SUBDESK_SMTP_PORT: {e}"))?,
                        user,
                        pass,
                    }))
                }
                _ => None,
            }
        };

        Ok(Config {
            database_url,
            jwt_secret,
            host,
            port,
            max_body_size,
            trusted_proxies,
            log_level,
            repository_timeout,
            mail_timeout,
            notify_concurrency,
            check_rate_limit,
            mail_from,
            mail,
        })
    }
}

fn env_required(key: &str) -> Result<String, String> {
    std::env::var(key).map_err(|_| format!("Missing required environment variable: {key}"))
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_secs(key: &str, default: u64) -> Result<Duration, String> {
    let secs: u64 = env_or(key, &default.to_string())
        .parse()
        .map_err(|e| format!("Invalid {key}: {e}"))?;
    Ok(Duration::from_secs(secs))
}
