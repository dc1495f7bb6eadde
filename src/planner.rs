use crate::archive;
use crate::config::{Settings, TrackingMode};
use crate::probe;
use crate::tools::Capabilities;
use crate::Result;
use std::collections::HashSet;
use std::path::Path;

/// Decides which candidate URLs still need downloading for one directory.
#[derive(Debug, Clone, Copy)]
pub struct Planner<'a> {
    pub mode: TrackingMode,
    pub archive_file: &'a str,
    pub probe_command: &'a str,
    pub capabilities: &'a Capabilities,
}

impl<'a> Planner<'a> {
    pub fn new(settings: &'a Settings, capabilities: &'a Capabilities) -> Self {
        Self {
            mode: settings.tracking,
            archive_file: &settings.archive_file,
            probe_command: &settings.ffprobe_command,
            capabilities,
        }
    }

    /// The candidates not yet present in `target_dir`, in their original order.
    pub fn plan(&self, target_dir: &Path, candidates: &[String]) -> Result<Vec<String>> {
        let known: HashSet<String> = match self.mode {
            TrackingMode::None => return Ok(candidates.to_vec()),
            TrackingMode::Archive => {
                let Some(lines) = archive::read_archive(&target_dir.join(self.archive_file))? else {
                    return Ok(candidates.to_vec());
                };
                archive::archived_urls(&lines).into_iter().collect()
            }
            TrackingMode::Metadata => {
                if !target_dir.is_dir() {
                    return Ok(candidates.to_vec());
                }
                self.tagged_urls(target_dir)?
            }
        };

        Ok(candidates
            .iter()
            .filter(|url| !known.contains(url.as_str()))
            .cloned()
            .collect())
    }

    fn tagged_urls(&self, dir: &Path) -> Result<HashSet<String>> {
        let mut out = HashSet::new();
        for entry in std::fs::read_dir(dir)? {
            let path = entry?.path();
            if !path.is_file() {
                continue;
            }
            if let Some(url) = probe::probe_url(&path, self.probe_command, self.capabilities)? {
                out.insert(url);
            }
        }
        Ok(out)
    }
}
