//! Chat storage backed by one JSON file per chat.

use crate::error::SessionError;
use crate::types::{ChatSession, ChatSummary, validate_name};
use std::path::{Path, PathBuf};

/// File-based chat store. Each chat is `<name>.json` in `chats_dir`.
pub struct ChatStore {
    chats_dir: PathBuf,
}

impl ChatStore {
    /// Create a new store, ensuring the chats directory exists.
    pub async fn new(chats_dir: PathBuf) -> Result<Self, SessionError> {
        tokio::fs::create_dir_all(&chats_dir).await?;
        Ok(Self { chats_dir })
    }

    pub fn dir(&self) -> &Path {
        &self.chats_dir
    }

    /// Save a chat to disk (atomic write: .tmp → rename).
    pub async fn save(&self, chat: &ChatSession) -> Result<PathBuf, SessionError> {
        let path = self.chat_path(&chat.name)?;
        let tmp_path = path.with_extension("json.tmp");
        let json = serde_json::to_string_pretty(chat)?;
        tokio::fs::write(&tmp_path, json).await?;
        tokio::fs::rename(&tmp_path, &path).await?;
        tracing::debug!(
            name = %chat.name,
            messages = chat.messages.len(),
            "Saved chat to {}",
            path.display()
        );
        Ok(path)
    }

    /// Load a chat by name.
    pub async fn load(&self, name: &str) -> Result<ChatSession, SessionError> {
        let path = self.chat_path(name)?;
        if !tokio::fs::try_exists(&path).await? {
            return Err(SessionError::NotFound {
                name: name.to_string(),
            });
        }
        let data = tokio::fs::read_to_string(&path).await?;
        let mut chat: ChatSession = serde_json::from_str(&data)?;
        // The file name is authoritative if the stored name was edited.
        chat.name = name.to_string();
        Ok(chat)
    }

    /// Whether a chat with this name has been saved.
    pub async fn exists(&self, name: &str) -> Result<bool, SessionError> {
        let path = self.chat_path(name)?;
        Ok(tokio::fs::try_exists(&path).await?)
    }

    /// List all chats sorted by name. Unreadable files are skipped.
    pub async fn list(&self) -> Result<Vec<ChatSummary>, SessionError> {
        let mut summaries = Vec::new();

        let mut entries = tokio::fs::read_dir(&self.chats_dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let name = entry.file_name();
            let name_str = name.to_string_lossy();
            let Some(stem) = name_str.strip_suffix(".json") else {
                continue;
            };
            match tokio::fs::read_to_string(entry.path()).await {
                Ok(data) => match serde_json::from_str::<ChatSession>(&data) {
                    Ok(mut chat) => {
                        chat.name = stem.to_string();
                        summaries.push(chat.to_summary());
                    }
                    Err(e) => {
                        tracing::warn!("Failed to parse chat {}: {}", name_str, e);
                    }
                },
                Err(e) => {
                    tracing::warn!("Failed to read chat {}: {}", name_str, e);
                }
            }
        }

        summaries.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(summaries)
    }

    fn chat_path(&self, name: &str) -> Result<PathBuf, SessionError> {
        validate_name(name)?;
        Ok(self.chats_dir.join(format!("{name}.json")))
    }
}
