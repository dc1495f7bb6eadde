use crate::config::{CliOverrides, CustomArgument};
use crate::{Result, YtAudioError};
use clap::{Arg, ArgAction, ArgMatches, Command};
use std::collections::HashSet;
use std::ffi::OsString;
use std::path::PathBuf;

const CUSTOM_HEADING: &str = "Custom Arguments";
const CUSTOM_ID_PREFIX: &str = "custom:";

const RESERVED_LONG: [&str; 13] = [
    "use-archive",
    "use-metadata",
    "output-format",
    "output-directory",
    "ytdl-args",
    "download-command",
    "playlist-info-command",
    "ffprobe-command",
    "config",
    "verbose",
    "all",
    "help",
    "version",
];
const RESERVED_SHORT: [char; 4] = ['h', 'v', 'o', 'c'];

/// Command line after parsing, before it is merged with the config file.
#[derive(Debug, Clone, Default)]
pub struct ParsedArgs {
    pub overrides: CliOverrides,
    /// Long names of the custom arguments switched on.
    pub selected: Vec<String>,
    pub all: bool,
    pub verbose: bool,
    pub config: Option<PathBuf>,
}

impl ParsedArgs {
    /// Custom arguments selected for this run, in config declaration order.
    pub fn selected_arguments<'a>(&self, custom: &'a [CustomArgument]) -> Vec<&'a CustomArgument> {
        custom
            .iter()
            .filter(|arg| self.all || self.selected.iter().any(|s| s == long_name(arg)))
            .collect()
    }
}

/// Options that must be known before the full command line can be built.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Prescan {
    pub config: Option<PathBuf>,
    pub verbose: bool,
}

/// Finds `--config`/`-c` and `--verbose` ahead of full parsing, since the
/// config file decides which custom flags exist.
pub fn prescan(args: &[OsString]) -> Prescan {
    let mut out = Prescan::default();
    let mut iter = args.iter().skip(1).map(|a| a.to_string_lossy());
    while let Some(arg) = iter.next() {
        match &*arg {
            "--" => break,
            "--verbose" => out.verbose = true,
            "--config" | "-c" => {
                if let Some(v) = iter.next() {
                    out.config = Some(PathBuf::from(v.into_owned()));
                }
            }
            other => {
                if let Some(v) = other.strip_prefix("--config=") {
                    out.config = Some(PathBuf::from(v));
                }
            }
        }
    }
    out
}

fn long_name(arg: &CustomArgument) -> &str {
    arg.flag.trim().trim_start_matches('-')
}

/// Rejects custom arguments that would collide with built-in or each other's flags.
pub fn validate_custom_arguments(custom: &[CustomArgument]) -> Result<()> {
    let mut longs: HashSet<&str> = HashSet::new();
    let mut shorts: HashSet<char> = HashSet::new();
    for arg in custom {
        let long = long_name(arg);
        if long.is_empty() || !long.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_') {
            return Err(YtAudioError::Configuration(format!(
                "invalid custom argument flag '{}'",
                arg.flag
            )));
        }
        if RESERVED_LONG.contains(&long) || !longs.insert(long) {
            return Err(YtAudioError::Configuration(format!(
                "custom argument --{long} is already defined"
            )));
        }
        if let Some(short) = arg.short {
            if !short.is_ascii_alphanumeric() || RESERVED_SHORT.contains(&short) || !shorts.insert(short) {
                return Err(YtAudioError::Configuration(format!(
                    "custom argument short flag -{short} for --{long} is not available"
                )));
            }
        }
        if arg.url.trim().is_empty() {
            return Err(YtAudioError::Configuration(format!(
                "custom argument --{long} has no url"
            )));
        }
    }
    Ok(())
}

/// The full command line, including one flag per custom argument.
pub fn build_command(custom: &[CustomArgument]) -> Command {
    let mut command = Command::new("yt-audio")
        .version(env!("CARGO_PKG_VERSION"))
        .about("A simple youtube-dl wrapper for downloading and managing youtube audio")
        .override_usage(
            "yt-audio [OPTIONS] [URL[::DIR] [URL[::DIR]...] and/or CUSTOM_ARGUMENT [CUSTOM_ARGUMENT...]]",
        )
        .disable_version_flag(true)
        .arg(
            Arg::new("version")
                .short('v')
                .long("version")
                .help("Print version information")
                .action(ArgAction::Version),
        )
        .arg(
            Arg::new("urls")
                .value_name("URL[::DIR]")
                .help("Video/Playlist URL with (optional) save directory [URL::dir]")
                .num_args(0..)
                .action(ArgAction::Append),
        )
        .arg(
            Arg::new("use_archive")
                .long("use-archive")
                .help("Skip items listed in the download archive file of the target directory")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("use_metadata")
                .long("use-metadata")
                .help("Skip items whose source URL is tagged in files of the target directory")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("output_format")
                .long("output-format")
                .value_name("FORMAT")
                .help("File output format"),
        )
        .arg(
            Arg::new("output_directory")
                .short('o')
                .long("output-directory")
                .value_name("DIR")
                .help("Default save directory"),
        )
        .arg(
            Arg::new("ytdl_args")
                .long("ytdl-args")
                .value_name("ARGS")
                .allow_hyphen_values(true)
                .help("Extra arguments appended to the download command"),
        )
        .arg(
            Arg::new("download_command")
                .long("download-command")
                .value_name("COMMAND")
                .help("youtube-dl audio download command"),
        )
        .arg(
            Arg::new("playlist_info_command")
                .long("playlist-info-command")
                .value_name("COMMAND")
                .help("Fetch playlist info"),
        )
        .arg(
            Arg::new("ffprobe_command")
                .long("ffprobe-command")
                .value_name("COMMAND")
                .help("ffprobe command"),
        )
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .value_parser(clap::value_parser!(PathBuf))
                .help("Config file path"),
        )
        .arg(
            Arg::new("verbose")
                .long("verbose")
                .help("Show debug output")
                .action(ArgAction::SetTrue),
        );

    for arg in custom {
        let long = long_name(arg).to_string();
        let mut flag = Arg::new(format!("{CUSTOM_ID_PREFIX}{long}"))
            .long(long)
            .help(arg.help.clone().unwrap_or_else(|| arg.url.clone()))
            .help_heading(CUSTOM_HEADING)
            .action(ArgAction::SetTrue);
        if let Some(short) = arg.short {
            flag = flag.short(short);
        }
        command = command.arg(flag);
    }
    if !custom.is_empty() {
        command = command.arg(
            Arg::new("all")
                .long("all")
                .help("All Custom Arguments")
                .help_heading(CUSTOM_HEADING)
                .action(ArgAction::SetTrue),
        );
    }

    command
}

/// Parses `args` (including the program name) against the command built for `custom`.
pub fn parse_from<I, T>(args: I, custom: &[CustomArgument]) -> Result<ParsedArgs>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    validate_custom_arguments(custom)?;
    let matches = build_command(custom).try_get_matches_from(args)?;
    Ok(from_matches(&matches, custom))
}

fn from_matches(matches: &ArgMatches, custom: &[CustomArgument]) -> ParsedArgs {
    let string = |id: &str| matches.get_one::<String>(id).cloned();

    let overrides = CliOverrides {
        urls: matches
            .get_many::<String>("urls")
            .map(|values| values.cloned().collect())
            .unwrap_or_default(),
        use_archive: matches.get_flag("use_archive"),
        use_metadata: matches.get_flag("use_metadata"),
        output_format: string("output_format"),
        output_directory: string("output_directory"),
        playlist_info_command: string("playlist_info_command"),
        ffprobe_command: string("ffprobe_command"),
        download_command: string("download_command"),
        ytdl_args: string("ytdl_args"),
    };

    let selected = custom
        .iter()
        .map(long_name)
        .filter(|long| matches.get_flag(&format!("{CUSTOM_ID_PREFIX}{long}")))
        .map(str::to_string)
        .collect();

    ParsedArgs {
        overrides,
        selected,
        all: !custom.is_empty() && matches.get_flag("all"),
        verbose: matches.get_flag("verbose"),
        config: matches.get_one::<PathBuf>("config").cloned(),
    }
}
