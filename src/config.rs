//! Runtime configuration, read from worker vars/secrets or the process environment.

use std::fmt;
use std::str::FromStr;

use log::LevelFilter;
use secrecy::SecretString;
use url::Url;

use crate::stats::StatsLimits;

/// Application configuration.
#[derive(Debug)]
pub struct Config {
    /// Base URL of the auth gateway (a Supabase project), with trailing slash.
    pub supabase_url: Url,
    /// Service role key for admin calls to the auth gateway.
    pub service_role_key: SecretString,
    /// HS256 secret for verifying access tokens locally. If unset, every token is checked
    /// remotely.
    pub jwt_secret: Option<SecretString>,
    /// Prefix all routes are nested under, e.g. `/make-server-f2b5fafa`. Empty for none.
    pub route_prefix: String,
    /// Result sizes for `GET /stats`.
    pub stats: StatsLimits,
    /// Max log level.
    pub log_level: LevelFilter,
}
impl Config {
    /// Builds the config from a variable lookup, e.g. `|name| std::env::var(name).ok()`.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let required = |name: &'static str| {
            lookup(name)
                .filter(|value| !value.is_empty())
                .ok_or(ConfigError::Missing(name))
        };

        let supabase_url = {
            let mut url = Url::parse(&required("SUPABASE_URL")?)
                .map_err(|e| ConfigError::invalid("SUPABASE_URL", e))?;
            if !url.path().ends_with('/') {
                let path = format!("{}/", url.path());
                url.set_path(&path);
            }
            url
        };
        let service_role_key = required("SUPABASE_SERVICE_ROLE_KEY")?.into();
        let jwt_secret = lookup("SUPABASE_JWT_SECRET")
            .filter(|secret| !secret.is_empty())
            .map(SecretString::from);
        let route_prefix = normalize_prefix(lookup("ROUTE_PREFIX").unwrap_or_default());
        let defaults = StatsLimits::default();
        let stats = StatsLimits {
            top_mcs: parse_or(&lookup, "STATS_TOP_MCS", defaults.top_mcs)?,
            upcoming_battles: parse_or(&lookup, "STATS_UPCOMING_BATTLES", defaults.upcoming_battles)?,
        };
        let log_level = parse_or(&lookup, "LOG_LEVEL", LevelFilter::Info)?;

        Ok(Self {
            supabase_url,
            service_role_key,
            jwt_secret,
            route_prefix,
            stats,
            log_level,
        })
    }

    /// Builds the config from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }
}

/// `"api/"` -> `"/api"`, `"/"` -> `""`.
fn normalize_prefix(prefix: String) -> String {
    let trimmed = prefix.trim().trim_matches('/');
    if trimmed.is_empty() {
        String::new()
    } else {
        format!("/{}", trimmed)
    }
}

fn parse_or<T>(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &'static str,
    default: T,
) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: fmt::Display,
{
    match lookup(name).filter(|value| !value.is_empty()) {
        Some(value) => value.parse().map_err(|e| ConfigError::invalid(name, e)),
        None => Ok(default),
    }
}

/// Missing or malformed configuration.
#[derive(Debug, PartialEq, Eq)]
pub enum ConfigError {
    /// Required variable is not set.
    Missing(&'static str),
    /// Variable is set but cannot be used.
    Invalid {
        /// Variable name.
        name: &'static str,
        /// Why.
        message: String,
    },
}
impl ConfigError {
    fn invalid(name: &'static str, e: impl fmt::Display) -> Self {
        Self::Invalid {
            name,
            message: e.to_string(),
        }
    }
}
impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Missing(name) => write!(f, "Env var `{}` is not set.", name),
            ConfigError::Invalid { name, message } => {
                write!(f, "Env var `{}` is invalid: {}", name, message)
            }
        }
    }
}
impl std::error::Error for ConfigError {}

#[cfg(test)]
mod test {
    use std::collections::HashMap;

    use secrecy::ExposeSecret;

    use super::*;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars = vars
            .iter()
            .map(|&(k, v)| (k.to_owned(), v.to_owned()))
            .collect::<HashMap<_, _>>();
        move |name| vars.get(name).cloned()
    }

    const REQUIRED: [(&str, &str); 2] = [
        ("SUPABASE_URL", "https://project.supabase.co"),
        ("SUPABASE_SERVICE_ROLE_KEY", "service-key"),
    ];

    #[test]
    fn test_defaults() {
        let config = Config::from_lookup(lookup(&REQUIRED)).unwrap();
        assert_eq!("https://project.supabase.co/", config.supabase_url.as_str());
        assert_eq!("service-key", config.service_role_key.expose_secret());
        assert!(config.jwt_secret.is_none());
        assert_eq!("", config.route_prefix);
        assert_eq!(10, config.stats.top_mcs);
        assert_eq!(5, config.stats.upcoming_battles);
        assert_eq!(LevelFilter::Info, config.log_level);
    }

    #[test]
    fn test_overrides() {
        let mut vars = REQUIRED.to_vec();
        vars.extend([
            ("SUPABASE_URL", "https://project.supabase.co/base"),
            ("SUPABASE_JWT_SECRET", "shh"),
            ("ROUTE_PREFIX", "make-server-f2b5fafa/"),
            ("STATS_TOP_MCS", "3"),
            ("LOG_LEVEL", "debug"),
        ]);
        let config = Config::from_lookup(lookup(&vars)).unwrap();
        assert_eq!("https://project.supabase.co/base/", config.supabase_url.as_str());
        assert_eq!(Some("shh"), config.jwt_secret.as_ref().map(|s| s.expose_secret().as_str()));
        assert_eq!("/make-server-f2b5fafa", config.route_prefix);
        assert_eq!(3, config.stats.top_mcs);
        assert_eq!(LevelFilter::Debug, config.log_level);
    }

    #[test]
    fn test_missing_required() {
        let result = Config::from_lookup(lookup(&REQUIRED[..1]));
        assert_eq!(
            Some(ConfigError::Missing("SUPABASE_SERVICE_ROLE_KEY")),
            result.err()
        );
    }

    #[test]
    fn test_invalid_number() {
        let mut vars = REQUIRED.to_vec();
        vars.push(("STATS_UPCOMING_BATTLES", "five"));
        assert!(matches!(
            Config::from_lookup(lookup(&vars)),
            Err(ConfigError::Invalid {
                name: "STATS_UPCOMING_BATTLES",
                ..
            })
        ));
    }
}
