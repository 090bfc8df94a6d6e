use std::{env, fmt::Display, net::IpAddr, net::SocketAddr, path::PathBuf, str::FromStr};
use tracing::{info, warn};

const DEFAULT_PORT: u16 = 8080;
const DEFAULT_BIND: &str = "0.0.0.0";
const DEFAULT_DATA_PATH: &str = "data/network.json";

#[derive(Debug, Clone)]
pub struct Config {
    pub bind: IpAddr,
    pub port: u16,
    pub data_path: PathBuf,
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let default_bind = IpAddr::from([0, 0, 0, 0]);
        Self {
            bind: parse_or(&lookup, "BIND_ADDR", DEFAULT_BIND, default_bind),
            port: parse_or(&lookup, "PORT", &DEFAULT_PORT.to_string(), DEFAULT_PORT),
            data_path: lookup("APP_DATA_PATH")
                .filter(|value| !value.trim().is_empty())
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_PATH)),
        }
    }

    pub fn addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind, self.port)
    }
}

fn parse_or<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, shown: &str, default: T) -> T
where
    T: FromStr,
    T::Err: Display,
{
    let Some(raw) = lookup(key) else {
        info!("{key} not set, using default: {shown}");
        return default;
    };
    raw.trim().parse().unwrap_or_else(|err| {
        warn!("invalid {key} value '{raw}': {err}, using default: {shown}");
        default
    })
}
