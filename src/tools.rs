use crate::cmd::{self, Invocation};
use crate::config::{Settings, TrackingMode};
use crate::{Result, YtAudioError};

const TRANSCODERS: [&str; 2] = ["ffmpeg", "avconv"];
const PROBES: [&str; 2] = ["ffprobe", "avprobe"];

/// Which of the interchangeable helper executables are installed.
///
/// Built once at startup and passed by reference to whatever needs it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Capabilities {
    pub ffmpeg: bool,
    pub avconv: bool,
    pub ffprobe: bool,
    pub avprobe: bool,
}

impl Capabilities {
    pub fn detect() -> Self {
        Self::detect_with(|program| which::which(program).is_ok())
    }

    pub fn detect_with(available: impl Fn(&str) -> bool) -> Self {
        Self {
            ffmpeg: available("ffmpeg"),
            avconv: available("avconv"),
            ffprobe: available("ffprobe"),
            avprobe: available("avprobe"),
        }
    }

    pub fn has_transcoder(&self) -> bool {
        self.ffmpeg || self.avconv
    }

    pub fn has_probe(&self) -> bool {
        self.ffprobe || self.avprobe
    }

    /// The probe variant to run instead of `program` when only the other one
    /// is installed.
    pub fn probe_substitute(&self, program: &str) -> Option<&'static str> {
        match program {
            "ffprobe" if !self.ffprobe && self.avprobe => Some("avprobe"),
            "avprobe" if !self.avprobe && self.ffprobe => Some("ffprobe"),
            _ => None,
        }
    }
}

/// First word of a command template with surrounding quotes removed.
pub fn program_name(template: &str) -> Option<&str> {
    let first = template.split_whitespace().next()?;
    let trimmed = first.trim_matches(|c| c == '"' || c == '\'');
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed)
    }
}

/// Verifies every external program the resolved settings will invoke.
pub fn check_dependencies(settings: &Settings) -> Result<Capabilities> {
    check_dependencies_with(settings, |program| which::which(program).is_ok())
}

pub fn check_dependencies_with(
    settings: &Settings,
    available: impl Fn(&str) -> bool,
) -> Result<Capabilities> {
    let capabilities = Capabilities::detect_with(&available);

    if !capabilities.has_transcoder() {
        return Err(YtAudioError::DependencyMissing {
            tool: TRANSCODERS.join("/"),
        });
    }

    for template in [&settings.download_command, &settings.playlist_info_command] {
        let program = program_name(template)
            .ok_or_else(|| YtAudioError::Configuration("empty command template".to_string()))?;
        if !available(program) {
            return Err(YtAudioError::DependencyMissing {
                tool: program.to_string(),
            });
        }
    }

    if settings.tracking == TrackingMode::Metadata {
        let program = program_name(&settings.ffprobe_command)
            .ok_or_else(|| YtAudioError::Configuration("empty ffprobe command".to_string()))?;
        let found = if PROBES.contains(&program) {
            capabilities.has_probe()
        } else {
            available(program)
        };
        if !found {
            let tool = if PROBES.contains(&program) {
                PROBES.join("/")
            } else {
                program.to_string()
            };
            return Err(YtAudioError::DependencyMissing { tool });
        }
    }

    Ok(capabilities)
}

/// First line of `<program> --version`, if the program runs at all.
pub fn tool_version_first_line(program: &str) -> Option<String> {
    let text = cmd::run_to_string(&format!("{} --version", shell_words::quote(program)), Invocation::Direct).ok()?;
    let first = text.lines().next()?.trim();
    if first.is_empty() {
        return None;
    }
    Some(first.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Settings;

    fn only(installed: &'static [&'static str]) -> impl Fn(&str) -> bool {
        move |program| installed.contains(&program)
    }

    #[test]
    fn detects_available_variants() {
        let caps = Capabilities::detect_with(only(&["avconv", "ffprobe"]));
        assert!(!caps.ffmpeg);
        assert!(caps.avconv);
        assert!(caps.ffprobe);
        assert!(!caps.avprobe);
        assert!(caps.has_transcoder());
        assert!(caps.has_probe());
    }

    #[test]
    fn substitutes_missing_probe_variant() {
        let caps = Capabilities::detect_with(only(&["avprobe"]));
        assert_eq!(caps.probe_substitute("ffprobe"), Some("avprobe"));
        assert_eq!(caps.probe_substitute("avprobe"), None);
        assert_eq!(caps.probe_substitute("mediainfo"), None);
    }

    #[test]
    fn program_name_strips_quotes() {
        assert_eq!(program_name(r#""ffprobe" -v quiet"#), Some("ffprobe"));
        assert_eq!(program_name("  youtube-dl -x"), Some("youtube-dl"));
        assert_eq!(program_name("   "), None);
    }

    #[test]
    fn missing_downloader_is_fatal() {
        let settings = Settings::default();
        let err = check_dependencies_with(&settings, only(&["ffmpeg", "ffprobe"]))
            .err()
            .expect("should fail");
        assert!(matches!(err, YtAudioError::DependencyMissing { ref tool } if tool == "youtube-dl"));
    }

    #[test]
    fn missing_transcoder_is_fatal() {
        let settings = Settings::default();
        let err = check_dependencies_with(&settings, only(&["youtube-dl", "ffprobe"]))
            .err()
            .expect("should fail");
        assert!(matches!(err, YtAudioError::DependencyMissing { ref tool } if tool == "ffmpeg/avconv"));
    }

    #[test]
    fn probe_only_required_in_metadata_mode() {
        let mut settings = Settings::default();
        settings.tracking = TrackingMode::None;
        check_dependencies_with(&settings, only(&["youtube-dl", "ffmpeg"])).expect("no probe needed");

        settings.tracking = TrackingMode::Metadata;
        let err = check_dependencies_with(&settings, only(&["youtube-dl", "ffmpeg"]))
            .err()
            .expect("should fail");
        assert!(matches!(err, YtAudioError::DependencyMissing { ref tool } if tool == "ffprobe/avprobe"));

        check_dependencies_with(&settings, only(&["youtube-dl", "ffmpeg", "avprobe"]))
            .expect("avprobe stands in for ffprobe");
    }
}
