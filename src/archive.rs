use crate::Result;
use std::path::Path;

/// Prefix that turns an archived video id back into a watch URL.
pub const WATCH_BASE_URL: &str = "https://www.youtube.com/watch?v=";

pub const DEFAULT_ARCHIVE_FILENAME: &str = "archive.txt";

/// Reads the download tool's archive file.
///
/// A missing file is the normal first-run state, not an error: `None` is
/// returned and the user is told a new archive will be created.
pub fn read_archive(path: &Path) -> Result<Option<Vec<String>>> {
    match std::fs::read_to_string(path) {
        Ok(raw) => Ok(Some(raw.lines().map(str::to_string).collect())),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            log::warn!("{}: No such file or directory", path.to_string_lossy());
            log::info!(
                "> New archive file '{}' will be created",
                path.to_string_lossy()
            );
            Ok(None)
        }
        Err(e) => Err(e.into()),
    }
}

/// Maps a `<extractor> <video-id> ...` record to its canonical URL.
pub fn archive_url(line: &str) -> Option<String> {
    let mut parts = line.split_whitespace();
    let _extractor = parts.next()?;
    let video_id = parts.next()?;
    Some(format!("{WATCH_BASE_URL}{video_id}"))
}

/// Canonical URLs of every well-formed record in `lines`.
pub fn archived_urls(lines: &[String]) -> Vec<String> {
    lines.iter().filter_map(|line| archive_url(line)).collect()
}
