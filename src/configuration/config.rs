#[cfg(test)]
#[path = "config_test.rs"]
mod tests;

use dashmap::DashMap;
use once_cell::sync::Lazy;
use strum::EnumIter;

static CONFIG: Lazy<DashMap<String, String>> = Lazy::new(DashMap::new);

#[derive(Clone, Copy, Eq, PartialEq, EnumIter, strum::Display)]
#[strum(serialize_all = "kebab-case")]
pub enum ConfigKey {
    ApiURL,
    AuthToken,
    CacheDir,
    GatewayURL,
    Notifier,
    ParticipantId,
    Username,
}

pub struct Config {}

impl Config {
    pub fn get(key: ConfigKey) -> String {
        if let Some(val) = CONFIG.get(&key.to_string()) {
            return val.to_string();
        }

        return Config::default(key);
    }

    pub fn set(key: ConfigKey, value: &str) {
        CONFIG.insert(key.to_string(), value.to_string());
    }

    pub fn default(key: ConfigKey) -> String {
        let res = match key {
            ConfigKey::ApiURL => "http://localhost:4000",
            ConfigKey::AuthToken => "",
            ConfigKey::CacheDir => "",
            ConfigKey::GatewayURL => "ws://localhost:4001",
            ConfigKey::Notifier => "desktop",
            ConfigKey::ParticipantId => "",
            ConfigKey::Username => "Customer",
        };

        return res.to_string();
    }
}
