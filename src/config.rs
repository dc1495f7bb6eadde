use crate::archive::DEFAULT_ARCHIVE_FILENAME;
use crate::template;
use crate::{Result, YtAudioError};
use serde::Deserialize;
use std::path::{Path, PathBuf};

pub const CONFIG_ENV_VAR: &str = "YT_AUDIO_CONFIG";
const CONFIG_DIR_NAME: &str = "yt-audio";
const CONFIG_FILE_NAME: &str = "config.toml";

pub const DEFAULT_DOWNLOAD_COMMAND: &str = "youtube-dl -x -q --print-json --audio-format mp3 --audio-quality 0 --add-metadata --embed-thumbnail -o $OUTPUT$ $URL$";
pub const DEFAULT_PLAYLIST_INFO_COMMAND: &str = "youtube-dl --flat-playlist -J $PLAYLIST_URL$";
pub const DEFAULT_FFPROBE_COMMAND: &str = "ffprobe -v quiet -print_format json -show_format -hide_banner $PATH$";
pub const DEFAULT_OUTPUT_FORMAT: &str = "%(title)s.%(ext)s";

/// Arguments the download template must always carry: audio extraction and
/// one JSON line per finished item (progress reporting depends on it).
const REQUIRED_DOWNLOAD_ARGS: [&str; 2] = ["-x", "--print-json"];
const METADATA_DOWNLOAD_ARG: &str = "--add-metadata";
const ARCHIVE_DOWNLOAD_ARG: &str = "--download-archive";

/// How already-downloaded items are recognised.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TrackingMode {
    /// The download tool's archive file in the target directory.
    Archive,
    /// `purl` tags embedded in the files already in the target directory.
    Metadata,
    #[default]
    None,
}

impl TrackingMode {
    /// Archive tracking wins when both are requested.
    pub fn from_flags(use_archive: bool, use_metadata: bool) -> Self {
        if use_archive {
            TrackingMode::Archive
        } else if use_metadata {
            TrackingMode::Metadata
        } else {
            TrackingMode::None
        }
    }
}

/// A config-declared shortcut: `--<flag>` on the command line selects `url`
/// (saved into `directory` when given).
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CustomArgument {
    pub flag: String,
    #[serde(default)]
    pub short: Option<char>,
    #[serde(default)]
    pub help: Option<String>,
    pub url: String,
    #[serde(default)]
    pub directory: Option<String>,
}

impl CustomArgument {
    /// The `URL[::DIR]` entry this argument stands for.
    pub fn entry(&self) -> String {
        match self.directory.as_deref().map(str::trim) {
            Some(dir) if !dir.is_empty() => format!("{}::{}", self.url, expand_home(dir).to_string_lossy()),
            _ => self.url.clone(),
        }
    }
}

/// Contents of the config file. Every key is optional.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    pub url_list: Vec<CustomArgument>,
    pub output_format: Option<String>,
    pub output_directory: Option<String>,
    pub playlist_info_command: Option<String>,
    pub ffprobe_command: Option<String>,
    pub download_command: Option<String>,
    pub use_archive: Option<bool>,
    pub use_metadata: Option<bool>,
    pub archive_file: Option<String>,
    pub ytdl_args: Option<String>,
}

/// Values given on the command line; `None`/`false` defer to the config file.
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub urls: Vec<String>,
    pub use_archive: bool,
    pub use_metadata: bool,
    pub output_format: Option<String>,
    pub output_directory: Option<String>,
    pub playlist_info_command: Option<String>,
    pub ffprobe_command: Option<String>,
    pub download_command: Option<String>,
    pub ytdl_args: Option<String>,
}

/// Fully resolved, validated run configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub url_list: Vec<String>,
    pub output_format: String,
    pub output_directory: PathBuf,
    pub playlist_info_command: String,
    pub ffprobe_command: String,
    pub download_command: String,
    pub tracking: TrackingMode,
    pub archive_file: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            url_list: Vec::new(),
            output_format: DEFAULT_OUTPUT_FORMAT.to_string(),
            output_directory: default_output_directory(),
            playlist_info_command: DEFAULT_PLAYLIST_INFO_COMMAND.to_string(),
            ffprobe_command: DEFAULT_FFPROBE_COMMAND.to_string(),
            download_command: DEFAULT_DOWNLOAD_COMMAND.to_string(),
            tracking: TrackingMode::None,
            archive_file: DEFAULT_ARCHIVE_FILENAME.to_string(),
        }
    }
}

impl Settings {
    /// Merges command line, config file and built-in defaults (in that order
    /// of priority) and validates the result.
    ///
    /// `selected` are the custom arguments switched on for this run; their
    /// entries come before the positional URLs.
    pub fn resolve(file: &FileConfig, cli: &CliOverrides, selected: &[&CustomArgument]) -> Result<Self> {
        let defaults = Settings::default();

        let mut url_list: Vec<String> = selected.iter().map(|arg| arg.entry()).collect();
        url_list.extend(cli.urls.iter().cloned());
        if url_list.is_empty() {
            return Err(YtAudioError::Configuration(
                "URL(s)/custom arguments required. Use --help for available options".to_string(),
            ));
        }

        let tracking = TrackingMode::from_flags(
            cli.use_archive || file.use_archive.unwrap_or(false),
            cli.use_metadata || file.use_metadata.unwrap_or(false),
        );

        let output_directory = pick(&cli.output_directory, &file.output_directory)
            .map(expand_home)
            .unwrap_or(defaults.output_directory);

        let mut settings = Settings {
            url_list,
            output_format: pick(&cli.output_format, &file.output_format)
                .map(str::to_string)
                .unwrap_or(defaults.output_format),
            output_directory,
            playlist_info_command: pick(&cli.playlist_info_command, &file.playlist_info_command)
                .map(str::to_string)
                .unwrap_or(defaults.playlist_info_command),
            ffprobe_command: pick(&cli.ffprobe_command, &file.ffprobe_command)
                .map(str::to_string)
                .unwrap_or(defaults.ffprobe_command),
            download_command: pick(&cli.download_command, &file.download_command)
                .map(str::to_string)
                .unwrap_or(defaults.download_command),
            tracking,
            archive_file: file
                .archive_file
                .as_deref()
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(str::to_string)
                .unwrap_or(defaults.archive_file),
        };

        if tracking == TrackingMode::Archive {
            settings.download_command = with_archive_argument(&settings.download_command);
        }
        if let Some(extra) = pick(&cli.ytdl_args, &file.ytdl_args) {
            settings.download_command = format!("{} {}", settings.download_command, extra);
        }

        settings.validate()?;
        Ok(settings)
    }

    /// Checks that every command template carries the tokens and tool
    /// arguments the run depends on.
    pub fn validate(&self) -> Result<()> {
        let missing = template::missing_placeholders(&self.download_command, &[template::URL, template::OUTPUT]);
        if !missing.is_empty() {
            return Err(YtAudioError::Configuration(format!(
                "download_command is missing required placeholder(s): {}",
                missing.join(" ")
            )));
        }

        let mut required_args: Vec<&str> = REQUIRED_DOWNLOAD_ARGS.to_vec();
        if self.tracking == TrackingMode::Metadata {
            required_args.push(METADATA_DOWNLOAD_ARG);
        }
        let missing = template::missing_arguments(&self.download_command, &required_args);
        if !missing.is_empty() {
            return Err(YtAudioError::Configuration(format!(
                "The following youtube-dl arguments are mandatory for yt-audio to work: {}",
                missing.join(" ")
            )));
        }

        let info_tokens = [template::PLAYLIST_URL, template::URL];
        if template::missing_placeholders(&self.playlist_info_command, &info_tokens).len() == info_tokens.len() {
            return Err(YtAudioError::Configuration(format!(
                "playlist_info_command must contain {} or {}",
                template::PLAYLIST_URL,
                template::URL
            )));
        }

        if self.tracking == TrackingMode::Metadata
            && !template::missing_placeholders(&self.ffprobe_command, &[template::PATH]).is_empty()
        {
            return Err(YtAudioError::Configuration(format!(
                "ffprobe_command must contain {}",
                template::PATH
            )));
        }

        if self.output_format.trim().is_empty() {
            return Err(YtAudioError::Configuration("output_format must not be empty".to_string()));
        }

        Ok(())
    }

    /// Archive file location for a target directory.
    pub fn archive_path(&self, directory: &Path) -> PathBuf {
        directory.join(&self.archive_file)
    }
}

fn pick<'a>(cli: &'a Option<String>, file: &'a Option<String>) -> Option<&'a str> {
    cli.as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .or_else(|| file.as_deref().map(str::trim).filter(|v| !v.is_empty()))
}

fn with_archive_argument(download_command: &str) -> String {
    let has_token = download_command.contains(template::ARCHIVE);
    let has_arg = download_command
        .split_whitespace()
        .any(|word| word == ARCHIVE_DOWNLOAD_ARG);
    if has_token || has_arg {
        return download_command.to_string();
    }
    format!("{download_command} {ARCHIVE_DOWNLOAD_ARG} {}", template::ARCHIVE)
}

pub fn default_output_directory() -> PathBuf {
    dirs::home_dir()
        .map(|home| home.join("Music"))
        .unwrap_or_else(|| PathBuf::from("Music"))
}

/// Expands a leading `~` to the user's home directory.
pub fn expand_home(raw: &str) -> PathBuf {
    if raw == "~" {
        if let Some(home) = dirs::home_dir() {
            return home;
        }
    }
    if let Some(rest) = raw.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    PathBuf::from(raw)
}

/// Where the config file lives: explicit path, then `$YT_AUDIO_CONFIG`, then
/// `$XDG_CONFIG_HOME/yt-audio/config.toml`, then `~/.config/yt-audio/config.toml`.
pub fn config_path(explicit: Option<&Path>) -> Option<PathBuf> {
    config_path_from(explicit, |key| std::env::var(key).ok(), dirs::home_dir())
}

pub fn config_path_from(
    explicit: Option<&Path>,
    env: impl Fn(&str) -> Option<String>,
    home: Option<PathBuf>,
) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return Some(path.to_path_buf());
    }
    let non_empty = |key: &str| env(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
    if let Some(path) = non_empty(CONFIG_ENV_VAR) {
        return Some(PathBuf::from(path));
    }
    if let Some(base) = non_empty("XDG_CONFIG_HOME") {
        return Some(PathBuf::from(base).join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME));
    }
    home.map(|h| h.join(".config").join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME))
}

/// Loads the config file at `path`. A missing file yields the defaults unless
/// the path was given explicitly.
pub fn load_config(path: Option<&Path>, explicit: bool) -> Result<FileConfig> {
    let Some(path) = path else {
        return Ok(FileConfig::default());
    };
    if !path.exists() {
        if explicit {
            return Err(YtAudioError::Configuration(format!(
                "config file not found: {}",
                path.to_string_lossy()
            )));
        }
        log::debug!("no config file at {}; using defaults", path.to_string_lossy());
        return Ok(FileConfig::default());
    }
    let raw = std::fs::read_to_string(path)?;
    parse_config(&raw).map_err(|source| YtAudioError::ConfigFile {
        path: path.to_path_buf(),
        source,
    })
}

pub fn parse_config(raw: &str) -> std::result::Result<FileConfig, toml::de::Error> {
    toml::from_str(raw)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cli_with_url(url: &str) -> CliOverrides {
        CliOverrides {
            urls: vec![url.to_string()],
            ..CliOverrides::default()
        }
    }

    #[test]
    fn parses_full_config_file() {
        let raw = r#"
output_directory = "/srv/music"
output_format = "%(title)s.%(ext)s"
use_archive = true
archive_file = "done.txt"

[[url_list]]
flag = "lofi"
short = "l"
help = "Lofi beats"
url = "https://www.youtube.com/playlist?list=PL1"
directory = "/srv/lofi"

[[url_list]]
flag = "news"
url = "https://www.youtube.com/playlist?list=PL2"
"#;
        let file = parse_config(raw).expect("parse");
        assert_eq!(file.output_directory.as_deref(), Some("/srv/music"));
        assert_eq!(file.use_archive, Some(true));
        assert_eq!(file.use_metadata, None);
        assert_eq!(file.url_list.len(), 2);
        assert_eq!(file.url_list[0].short, Some('l'));
        assert_eq!(file.url_list[0].entry(), "https://www.youtube.com/playlist?list=PL1::/srv/lofi");
        assert_eq!(file.url_list[1].entry(), "https://www.youtube.com/playlist?list=PL2");
    }

    #[test]
    fn cli_beats_file_beats_defaults() {
        let file = FileConfig {
            output_format: Some("%(id)s.%(ext)s".to_string()),
            output_directory: Some("/from/file".to_string()),
            ..FileConfig::default()
        };
        let mut cli = cli_with_url("https://x");
        cli.output_directory = Some("/from/cli".to_string());

        let settings = Settings::resolve(&file, &cli, &[]).expect("resolve");
        assert_eq!(settings.output_directory, PathBuf::from("/from/cli"));
        assert_eq!(settings.output_format, "%(id)s.%(ext)s");
        assert_eq!(settings.download_command, DEFAULT_DOWNLOAD_COMMAND);
        assert_eq!(settings.archive_file, DEFAULT_ARCHIVE_FILENAME);
        assert_eq!(settings.tracking, TrackingMode::None);
    }

    #[test]
    fn archive_mode_wins_over_metadata() {
        let file = FileConfig {
            use_metadata: Some(true),
            ..FileConfig::default()
        };
        let mut cli = cli_with_url("https://x");
        cli.use_archive = true;
        let settings = Settings::resolve(&file, &cli, &[]).expect("resolve");
        assert_eq!(settings.tracking, TrackingMode::Archive);
        assert!(settings
            .download_command
            .ends_with("--download-archive $ARCHIVE$"));
    }

    #[test]
    fn archive_argument_is_not_duplicated() {
        let cmd = "dl -x --print-json -o $OUTPUT$ --download-archive $ARCHIVE$ $URL$";
        assert_eq!(with_archive_argument(cmd), cmd);
    }

    #[test]
    fn empty_url_list_is_rejected() {
        let err = Settings::resolve(&FileConfig::default(), &CliOverrides::default(), &[])
            .err()
            .expect("should fail");
        assert!(matches!(err, YtAudioError::Configuration(ref msg) if msg.contains("URL(s)")));
    }

    #[test]
    fn selected_custom_arguments_come_first() {
        let custom = CustomArgument {
            flag: "lofi".to_string(),
            short: None,
            help: None,
            url: "https://a".to_string(),
            directory: Some("/d".to_string()),
        };
        let settings =
            Settings::resolve(&FileConfig::default(), &cli_with_url("https://b"), &[&custom]).expect("resolve");
        assert_eq!(settings.url_list, vec!["https://a::/d", "https://b"]);
    }

    #[test]
    fn missing_placeholders_are_fatal() {
        let mut cli = cli_with_url("https://x");
        cli.download_command = Some("youtube-dl -x --print-json $URL$".to_string());
        let err = Settings::resolve(&FileConfig::default(), &cli, &[])
            .err()
            .expect("should fail");
        assert!(matches!(err, YtAudioError::Configuration(ref msg) if msg.contains("$OUTPUT$")));
    }

    #[test]
    fn missing_tool_arguments_are_fatal() {
        let mut cli = cli_with_url("https://x");
        cli.download_command = Some("youtube-dl -o $OUTPUT$ $URL$".to_string());
        let err = Settings::resolve(&FileConfig::default(), &cli, &[])
            .err()
            .expect("should fail");
        assert!(matches!(err, YtAudioError::Configuration(ref msg) if msg.contains("-x --print-json")));

        cli.download_command = Some("youtube-dl -x --print-json -o $OUTPUT$ $URL$".to_string());
        Settings::resolve(&FileConfig::default(), &cli, &[]).expect("metadata flag not needed");
        cli.use_metadata = true;
        let err = Settings::resolve(&FileConfig::default(), &cli, &[])
            .err()
            .expect("should fail");
        assert!(matches!(err, YtAudioError::Configuration(ref msg) if msg.contains("--add-metadata")));
    }

    #[test]
    fn ytdl_args_are_appended() {
        let mut cli = cli_with_url("https://x");
        cli.ytdl_args = Some("--proxy socks5://127.0.0.1".to_string());
        let settings = Settings::resolve(&FileConfig::default(), &cli, &[]).expect("resolve");
        assert!(settings
            .download_command
            .ends_with("$URL$ --proxy socks5://127.0.0.1"));
    }

    #[test]
    fn info_command_needs_url_token() {
        let mut cli = cli_with_url("https://x");
        cli.playlist_info_command = Some("youtube-dl -J".to_string());
        assert!(Settings::resolve(&FileConfig::default(), &cli, &[]).is_err());
        cli.playlist_info_command = Some("youtube-dl -J $URL$".to_string());
        assert!(Settings::resolve(&FileConfig::default(), &cli, &[]).is_ok());
    }

    #[test]
    fn config_path_resolution_order() {
        let home = Some(PathBuf::from("/home/u"));
        let none = |_: &str| None;
        assert_eq!(
            config_path_from(Some(Path::new("/etc/y.toml")), none, home.clone()),
            Some(PathBuf::from("/etc/y.toml"))
        );
        let env = |key: &str| (key == CONFIG_ENV_VAR).then(|| "/env/y.toml".to_string());
        assert_eq!(config_path_from(None, env, home.clone()), Some(PathBuf::from("/env/y.toml")));
        let xdg = |key: &str| (key == "XDG_CONFIG_HOME").then(|| "/xdg".to_string());
        assert_eq!(
            config_path_from(None, xdg, home.clone()),
            Some(PathBuf::from("/xdg/yt-audio/config.toml"))
        );
        assert_eq!(
            config_path_from(None, none, home),
            Some(PathBuf::from("/home/u/.config/yt-audio/config.toml"))
        );
    }

    #[test]
    fn missing_config_file_uses_defaults() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("config.toml");
        let file = load_config(Some(&path), false).expect("defaults");
        assert!(file.url_list.is_empty());
        assert!(load_config(Some(&path), true).is_err());
    }

    #[test]
    fn malformed_config_file_is_reported() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "use_archive = \"maybe\"\n").expect("write");
        let err = load_config(Some(&path), false).err().expect("should fail");
        assert!(matches!(err, YtAudioError::ConfigFile { .. }));
    }
}
