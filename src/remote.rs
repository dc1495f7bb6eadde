use crate::archive::WATCH_BASE_URL;
use crate::probe::first_json_value;
use crate::{Result, YtAudioError};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize)]
struct InfoJson {
    title: Option<String>,
    id: Option<String>,
    webpage_url: Option<String>,
    entries: Option<Vec<Option<InfoEntry>>>,
}

#[derive(Debug, Deserialize)]
struct InfoEntry {
    id: Option<String>,
    url: Option<String>,
}

/// What an info query says a URL points at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteItem {
    Single { url: String, title: Option<String> },
    Playlist { title: String, urls: Vec<String> },
}

impl RemoteItem {
    /// Classifies the info-query output for `requested_url`.
    ///
    /// Output that is not JSON means the download tool rejected the URL.
    pub fn from_info(requested_url: &str, info: &str) -> Result<Self> {
        let parsed: InfoJson = first_json_value(info).ok_or_else(|| YtAudioError::InvalidUrl {
            url: requested_url.to_string(),
        })?;

        if let Some(entries) = parsed.entries {
            let urls = entries.into_iter().flatten().filter_map(entry_url).collect();
            let title = parsed
                .title
                .or(parsed.id)
                .unwrap_or_else(|| "playlist".to_string());
            return Ok(RemoteItem::Playlist { title, urls });
        }

        let url = parsed
            .webpage_url
            .filter(|u| !u.trim().is_empty())
            .unwrap_or_else(|| requested_url.to_string());
        Ok(RemoteItem::Single {
            url,
            title: parsed.title,
        })
    }

    pub fn urls(&self) -> Vec<String> {
        match self {
            RemoteItem::Single { url, .. } => vec![url.clone()],
            RemoteItem::Playlist { urls, .. } => urls.clone(),
        }
    }

    /// Playlists get their own sub-directory named after the playlist title.
    pub fn target_directory(&self, base: &Path) -> PathBuf {
        match self {
            RemoteItem::Single { .. } => base.to_path_buf(),
            RemoteItem::Playlist { title, .. } => base.join(folder_name(title)),
        }
    }
}

fn entry_url(entry: InfoEntry) -> Option<String> {
    if let Some(id) = entry.id.map(|v| v.trim().to_string()).filter(|v| !v.is_empty()) {
        return Some(format!("{WATCH_BASE_URL}{id}"));
    }
    entry
        .url
        .filter(|u| u.starts_with("http://") || u.starts_with("https://"))
}

/// Playlist titles become a single path component.
fn folder_name(title: &str) -> String {
    let cleaned: String = title
        .chars()
        .map(|ch| if matches!(ch, '/' | '\\' | '\0') { '_' } else { ch })
        .collect();
    let trimmed = cleaned.trim();
    if trimmed.is_empty() || trimmed == "." || trimmed == ".." {
        "playlist".to_string()
    } else {
        trimmed.to_string()
    }
}
