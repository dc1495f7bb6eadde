use crate::cmd::{self, Invocation, ReadMode};
use crate::config::Settings;
use crate::entry::UrlEntry;
use crate::planner::Planner;
use crate::probe::first_json_value;
use crate::remote::RemoteItem;
use crate::template;
use crate::tools::Capabilities;
use crate::{Result, YtAudioError};
use serde::Deserialize;
use std::path::Path;

/// Totals for one pass over the URL list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Entries that were queried, planned and (if needed) downloaded.
    pub processed: usize,
    /// Entries with nothing left to download.
    pub in_sync: usize,
    /// Entries abandoned because of an error.
    pub failed: usize,
    /// Items the download tool reported as finished.
    pub downloaded: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntryOutcome {
    InSync,
    Downloaded { completed: usize, requested: usize },
}

/// One line of download tool output, as far as progress reporting cares.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProgressLine {
    /// A finished item (`--print-json` output).
    Title(String),
    /// A line the tool flagged with `ERROR:`.
    Error(String),
    Other(String),
}

#[derive(Debug, Deserialize)]
struct PrintedItem {
    title: Option<String>,
}

impl ProgressLine {
    pub fn parse(line: &str) -> Self {
        let trimmed = line.trim();
        if let Some(rest) = trimmed.strip_prefix("ERROR:") {
            return ProgressLine::Error(rest.trim().to_string());
        }
        if trimmed.starts_with('{') {
            if let Some(item) = first_json_value::<PrintedItem>(trimmed) {
                return ProgressLine::Title(item.title.unwrap_or_else(|| "(untitled)".to_string()));
            }
        }
        ProgressLine::Other(trimmed.to_string())
    }
}

/// Drives the per-entry cycle: parse, query, classify, plan, download.
pub struct Orchestrator<'a> {
    settings: &'a Settings,
    capabilities: &'a Capabilities,
}

impl<'a> Orchestrator<'a> {
    pub fn new(settings: &'a Settings, capabilities: &'a Capabilities) -> Self {
        Self {
            settings,
            capabilities,
        }
    }

    /// Processes every configured entry. A failing entry is logged and the
    /// loop moves on to the next one.
    pub fn run(&self) -> RunSummary {
        let mut summary = RunSummary::default();
        for raw in &self.settings.url_list {
            match self.process_entry(raw) {
                Ok(EntryOutcome::InSync) => {
                    summary.processed += 1;
                    summary.in_sync += 1;
                }
                Ok(EntryOutcome::Downloaded { completed, .. }) => {
                    summary.processed += 1;
                    summary.downloaded += completed;
                }
                Err(e @ YtAudioError::InvalidUrl { .. }) => {
                    log::error!("{e}");
                    summary.failed += 1;
                }
                Err(e) => {
                    log::error!("{raw}: {e}");
                    summary.failed += 1;
                }
            }
        }
        summary
    }

    pub fn process_entry(&self, raw: &str) -> Result<EntryOutcome> {
        let entry = UrlEntry::parse(raw);
        let base_dir = entry.output_directory(&self.settings.output_directory);

        log::info!("\nProcessing link {}", entry.url);
        let item = self.query_info(&entry.url)?;

        match &item {
            RemoteItem::Playlist { title, urls } => {
                log::info!("Found {} record(s) in [Remote] playlist '{title}'", urls.len());
            }
            RemoteItem::Single { title, .. } => {
                log::info!("[Single] {}", title.as_deref().unwrap_or(&entry.url));
            }
        }

        let target_dir = item.target_directory(&base_dir);
        log::info!("Save directory: {}", target_dir.to_string_lossy());
        std::fs::create_dir_all(&target_dir)?;

        let candidates = item.urls();
        let planned = Planner::new(self.settings, self.capabilities).plan(&target_dir, &candidates)?;
        if planned.is_empty() {
            log::info!("Titles are already in sync.");
            return Ok(EntryOutcome::InSync);
        }

        log::info!("{} record(s) will be downloaded.", planned.len());
        let completed = self.download(&target_dir, &planned)?;
        Ok(EntryOutcome::Downloaded {
            completed,
            requested: planned.len(),
        })
    }

    fn query_info(&self, url: &str) -> Result<RemoteItem> {
        log::info!("Fetching info...");
        let template = &self.settings.playlist_info_command;
        let url_words = [url.to_string()];
        let command = template::build_shell(
            template,
            &[(template::PLAYLIST_URL, &url_words[..]), (template::URL, &url_words[..])],
        );
        let output = cmd::run_to_string(&command, Invocation::detect(template))?;
        RemoteItem::from_info(url, &output)
    }

    /// Builds the download command for `urls` and streams its progress.
    /// Returns how many items the tool reported as finished.
    fn download(&self, target_dir: &Path, urls: &[String]) -> Result<usize> {
        let command = self.download_command(target_dir, urls);
        let total = urls.len();

        println!("Download begin\n");
        let mut stream = cmd::run(&command, Invocation::Shell, ReadMode::Lines)?;
        let mut count = 0;
        for line in stream.by_ref() {
            match ProgressLine::parse(&line) {
                ProgressLine::Title(title) => {
                    count += 1;
                    println!("[{count}/{total}] {title}");
                }
                ProgressLine::Error(message) => log::error!("{message}"),
                ProgressLine::Other(text) if text.is_empty() => {}
                ProgressLine::Other(text) => log::debug!("{text}"),
            }
        }
        let status = stream.finish()?;
        if !status.success() {
            log::warn!(
                "download command exited with code {}",
                status
                    .code()
                    .map(|c| c.to_string())
                    .unwrap_or_else(|| "unknown".to_string())
            );
        }
        println!("\nDownload complete!\n");
        Ok(count)
    }

    pub fn download_command(&self, target_dir: &Path, urls: &[String]) -> String {
        let output = target_dir
            .join(&self.settings.output_format)
            .to_string_lossy()
            .into_owned();
        let archive = self
            .settings
            .archive_path(target_dir)
            .to_string_lossy()
            .into_owned();
        template::build_shell(
            &self.settings.download_command,
            &[
                (template::OUTPUT, std::slice::from_ref(&output)),
                (template::URL, urls),
                (template::ARCHIVE, std::slice::from_ref(&archive)),
            ],
        )
    }
}
