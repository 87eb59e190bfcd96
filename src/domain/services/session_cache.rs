#[cfg(test)]
#[path = "session_cache_test.rs"]
mod tests;

use std::path;

use anyhow::Result;
use chrono::Local;
use chrono::SecondsFormat;
use tokio::fs;
use tokio::io::AsyncWriteExt;

use crate::configuration::Config;
use crate::configuration::ConfigKey;
use crate::domain::models::CachedConversation;

/// Conversation ids cached per participant so a reload resumes the same
/// support thread instead of opening a new one. One YAML file per
/// participant; the cache is only ever written by the bootstrap path.
pub struct SessionCache {
    pub cache_dir: path::PathBuf,
}

impl Default for SessionCache {
    fn default() -> SessionCache {
        let configured = Config::get(ConfigKey::CacheDir);
        if !configured.is_empty() {
            return SessionCache::new(path::PathBuf::from(configured));
        }

        let cache_dir = dirs::cache_dir().unwrap().join("souk/conversations");
        return SessionCache::new(cache_dir);
    }
}

impl SessionCache {
    pub fn new(cache_dir: path::PathBuf) -> SessionCache {
        return SessionCache { cache_dir };
    }

    fn get_file_path(&self, participant_id: &str) -> path::PathBuf {
        return self.cache_dir.join(format!("{participant_id}.yaml"));
    }

    pub async fn load(&self, participant_id: &str) -> Result<Option<String>> {
        let file_path = self.get_file_path(participant_id);
        if !file_path.exists() {
            return Ok(None);
        }

        let payload = fs::read_to_string(file_path).await?;
        let cached: CachedConversation = serde_yaml::from_str(&payload)?;

        return Ok(Some(cached.conversation_id));
    }

    pub async fn save(&self, participant_id: &str, conversation_id: &str) -> Result<()> {
        let cached = CachedConversation {
            conversation_id: conversation_id.to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            timestamp: Local::now().to_rfc3339_opts(SecondsFormat::Secs, false),
        };

        let payload = serde_yaml::to_string(&cached)?;

        if !self.cache_dir.exists() {
            fs::create_dir_all(&self.cache_dir).await?;
        }

        let mut file = fs::File::create(self.get_file_path(participant_id)).await?;
        file.write_all(payload.as_bytes()).await?;

        return Ok(());
    }

    pub async fn delete(&self, participant_id: &str) -> Result<()> {
        let file_path = self.get_file_path(participant_id);
        if !file_path.exists() {
            return Ok(());
        }

        fs::remove_file(file_path).await?;
        return Ok(());
    }
}
