use std::net::IpAddr;
use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct Config {
    pub host: IpAddr,
    pub port: u16,
    pub out_dir: PathBuf,
    pub max_body_size: usize,
    pub log_level: String,
    pub smtp: Option<SmtpConfig>,
}

/// Mail transport settings. Present only when `SMTP_HOST` is set.
#[derive(Debug, Clone)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    /// Implicit TLS when true, opportunistic STARTTLS otherwise.
    pub secure: bool,
    pub user: Option<String>,
    pub pass: Option<String>,
    pub notify_to: Option<String>,
    pub from: Option<String>,
}

impl SmtpConfig {
    /// Sender address: `MAIL_FROM`, falling back to the transport username.
    pub fn sender(&self) -> Option<&str> {
        self.from.as_deref().or(self.user.as_deref())
    }
}

impl Config {
    pub fn from_env() -> Result<Self, String> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a config from an arbitrary key lookup. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, String>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let var_or = |key: &str, default: &str| var(key).unwrap_or_else(|| default.to_string());

        let host: IpAddr = var_or("HOST", "0.0.0.0")
            .parse()
            .map_err(|e| format!("Invalid HOST: {e}"))?;

        let port: u16 = var_or("PORT", "8080")
            .parse()
            .map_err(|e| format!("Invalid PORT: {e}"))?;

        let out_dir = PathBuf::from(var_or("OUT_DIR", "submissions"));

        let max_body_size: usize = var_or("MAX_BODY_SIZE", "26214400")
            .parse()
            .map_err(|e| format!("Invalid MAX_BODY_SIZE: {e}"))?;

        let log_level = var_or("LOG_LEVEL", "info");

        let smtp = match var("SMTP_HOST") {
            Some(smtp_host) => Some(SmtpConfig {
                host: smtp_host,
                port: var_or("SMTP_PORT", "587")
                    .parse()
                    .map_err(|e| format!("Invalid SMTP_PORT: {e}"))?,
                secure: var("SMTP_SECURE").is_some_and(|v| v.trim().eq_ignore_ascii_case("true")),
                user: var("SMTP_USER"),
                pass: var("SMTP_PASS"),
                notify_to: var("NOTIFY_TO"),
                from: var("MAIL_FROM"),
            }),
            None => None,
        };

        Ok(Config {
            host,
            port,
            out_dir,
            max_body_size,
            log_level,
            smtp,
        })
    }
}
