use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

use catraca_core::config::Config;
use catraca_domain::event_day::{CalendarError, EventCalendar};

use crate::infra::mail::MailAccount;

/// Backoffice service configuration loaded from environment variables.
///
/// Each field reads the upper-cased env var of the same name (`smtp_host` → `SMTP_HOST`).
#[derive(Deserialize)]
pub struct BackofficeConfig {
    /// PostgreSQL connection URL.
    pub database_url: String,
    /// Redis URL. When set, the dispatch lease is held in Redis instead of in-process.
    #[serde(default)]
    pub redis_url: Option<String>,
    /// TCP port for the HTTP server (default 3120).
    #[serde(default = "default_backoffice_port")]
    pub backoffice_port: u16,
    /// HMAC key for credential signatures.
    pub credential_secret: String,
    pub event_name: String,
    /// Comma-separated `YYYY-MM-DD` event days.
    pub event_days: Vec<String>,
    pub smtp_host: String,
    #[serde(default = "default_smtp_port")]
    pub smtp_port: u16,
    /// Comma-separated `address:password` sender mailboxes.
    pub mail_accounts: Vec<String>,
    /// Sends per mailbox per UTC day (default 500).
    #[serde(default = "default_mail_daily_quota")]
    pub mail_daily_quota: u32,
    #[serde(default = "default_mail_timeout_secs")]
    pub mail_timeout_secs: u64,
    pub payment_gateway_url: String,
    pub payment_gateway_token: String,
    #[serde(default = "default_payment_timeout_secs")]
    pub payment_timeout_secs: u64,
    #[serde(default = "default_dispatch_interval_secs")]
    pub dispatch_interval_secs: u64,
    #[serde(default = "default_resync_interval_secs")]
    pub resync_interval_secs: u64,
    #[serde(default = "default_dispatch_lease_ttl_secs")]
    pub dispatch_lease_ttl_secs: u64,
    /// Where transient ticket files are written; the system temp dir when unset.
    #[serde(default)]
    pub ticket_dir: Option<PathBuf>,
}

impl Config for BackofficeConfig {}

fn default_backoffice_port() -> u16 {
    3120
}

fn default_smtp_port() -> u16 {
    587
}

fn default_mail_daily_quota() -> u32 {
    500
}

fn default_mail_timeout_secs() -> u64 {
    30
}

fn default_payment_timeout_secs() -> u64 {
    10
}

fn default_dispatch_interval_secs() -> u64 {
    300
}

fn default_resync_interval_secs() -> u64 {
    600
}

fn default_dispatch_lease_ttl_secs() -> u64 {
    900
}

#[derive(Debug, PartialEq, Eq, thiserror::Error)]
#[error("MAIL_ACCOUNTS entry {0:?} is not of the form address:password")]
pub struct InvalidMailAccount(pub String);

impl BackofficeConfig {
    pub fn calendar(&self) -> Result<EventCalendar, CalendarError> {
        EventCalendar::parse(self.event_name.clone(), &self.event_days)
    }

    pub fn mail_accounts(&self) -> Result<Vec<MailAccount>, InvalidMailAccount> {
        self.mail_accounts
            .iter()
            .map(|entry| {
                let (address, password) = entry
                    .trim()
                    .split_once(':')
                    .filter(|(a, p)| !a.is_empty() && !p.is_empty())
                    .ok_or_else(|| {
                        let address = entry.split(':').next().unwrap_or_default();
                        InvalidMailAccount(address.to_owned())
                    })?;
                Ok(MailAccount {
                    address: address.to_owned(),
                    password: password.to_owned(),
                })
            })
            .collect()
    }

    pub fn mail_timeout(&self) -> Duration {
        Duration::from_secs(self.mail_timeout_secs)
    }

    pub fn payment_timeout(&self) -> Duration {
        Duration::from_secs(self.payment_timeout_secs)
    }

    pub fn dispatch_interval(&self) -> Duration {
        Duration::from_secs(self.dispatch_interval_secs)
    }

    pub fn resync_interval(&self) -> Duration {
        Duration::from_secs(self.resync_interval_secs)
    }

    pub fn dispatch_lease_ttl(&self) -> Duration {
        Duration::from_secs(self.dispatch_lease_ttl_secs)
    }
}
