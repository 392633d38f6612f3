//! Server settings read from the environment.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};

use stagegrid_core::{ClampPolicy, EventDay, PlacementConfig, SnapConfig, WallClock};
use thiserror::Error;

pub const DEFAULT_PORT: u16 = 3001;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid value '{value}' for {key}: {reason}")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind: IpAddr,
    pub port: u16,
    /// Grid minute 0 of every performance day.
    pub event_day: EventDay,
    pub placement: PlacementConfig,
    /// `None` allows any origin.
    pub cors_origin: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            port: DEFAULT_PORT,
            event_day: EventDay::default(),
            placement: PlacementConfig::default(),
            cors_origin: None,
        }
    }
}

fn invalid(key: &'static str, value: &str, reason: impl ToString) -> ConfigError {
    ConfigError::Invalid {
        key,
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

impl ServerConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from `lookup`, falling back to defaults for unset
    /// keys.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(value) = lookup("STAGEGRID_BIND") {
            config.bind = value
                .parse()
                .map_err(|err| invalid("STAGEGRID_BIND", &value, err))?;
        }
        if let Some(value) = lookup("PORT") {
            config.port = value.parse().map_err(|err| invalid("PORT", &value, err))?;
        }
        if let Some(value) = lookup("STAGEGRID_EVENT_START") {
            let start: WallClock = value
                .parse()
                .map_err(|err| invalid("STAGEGRID_EVENT_START", &value, err))?;
            config.event_day = EventDay::new(start);
        }
        if let Some(value) = lookup("STAGEGRID_SNAP_MINUTES") {
            let interval: u32 = value
                .parse()
                .map_err(|err| invalid("STAGEGRID_SNAP_MINUTES", &value, err))?;
            if interval == 0 || interval > 60 {
                return Err(invalid(
                    "STAGEGRID_SNAP_MINUTES",
                    &value,
                    "must be between 1 and 60",
                ));
            }
            config.placement.snap = SnapConfig::new(interval);
        }
        if let Some(value) = lookup("STAGEGRID_CLAMP_POLICY") {
            config.placement.clamp_policy = match value.trim() {
                "touching" => ClampPolicy::Touching,
                "setup-offset" => ClampPolicy::SetupOffset,
                _ => {
                    return Err(invalid(
                        "STAGEGRID_CLAMP_POLICY",
                        &value,
                        "expected 'touching' or 'setup-offset'",
                    ));
                }
            };
        }
        config.cors_origin = lookup("CORS_ORIGIN").filter(|origin| !origin.trim().is_empty());

        Ok(config)
    }

    pub fn addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind, self.port)
    }
}
