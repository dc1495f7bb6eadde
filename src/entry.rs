use std::path::{Path, PathBuf};

const DIRECTORY_SEPARATOR: &str = "::";

/// One item of the URL list: a video/playlist URL with an optional
/// per-entry output directory (`URL::DIR`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UrlEntry {
    pub url: String,
    pub directory: Option<PathBuf>,
}

impl UrlEntry {
    pub fn parse(raw: &str) -> Self {
        // Shell escapes (e.g. `watch\?v=`) survive some copy/paste paths.
        let cleaned = raw.trim().replace('\\', "");
        match cleaned.split_once(DIRECTORY_SEPARATOR) {
            Some((url, dir)) if !dir.trim().is_empty() => UrlEntry {
                url: url.trim().to_string(),
                directory: Some(PathBuf::from(dir.trim())),
            },
            Some((url, _)) => UrlEntry {
                url: url.trim().to_string(),
                directory: None,
            },
            None => UrlEntry {
                url: cleaned,
                directory: None,
            },
        }
    }

    /// The entry's own directory, or `default` when none was given.
    pub fn output_directory(&self, default: &Path) -> PathBuf {
        self.directory
            .clone()
            .unwrap_or_else(|| default.to_path_buf())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_url_with_directory() {
        let entry = UrlEntry::parse("http://x::/tmp/out");
        assert_eq!(entry.url, "http://x");
        assert_eq!(entry.directory, Some(PathBuf::from("/tmp/out")));
        assert_eq!(entry.output_directory(Path::new("/music")), PathBuf::from("/tmp/out"));
    }

    #[test]
    fn falls_back_to_default_directory() {
        let entry = UrlEntry::parse("https://www.youtube.com/watch?v=abc");
        assert_eq!(entry.url, "https://www.youtube.com/watch?v=abc");
        assert_eq!(entry.directory, None);
        assert_eq!(entry.output_directory(Path::new("/music")), PathBuf::from("/music"));
    }

    #[test]
    fn strips_shell_escapes_and_empty_directory() {
        let entry = UrlEntry::parse(r"https://www.youtube.com/watch\?v=abc::");
        assert_eq!(entry.url, "https://www.youtube.com/watch?v=abc");
        assert_eq!(entry.directory, None);
    }
}
