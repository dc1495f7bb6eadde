use std::ffi::OsString;
use std::process::ExitCode;

use yt_audio::config::{self, Settings};
use yt_audio::orchestrator::Orchestrator;
use yt_audio::{cli, logging, tools, YtAudioError};

fn main() -> ExitCode {
    let args: Vec<OsString> = std::env::args_os().collect();
    let prescan = cli::prescan(&args);
    logging::init(prescan.verbose);
    if let Err(e) = ctrlc::set_handler(|| {
        log::error!("Interrupted by user. Aborting!");
        std::process::exit(1);
    }) {
        log::debug!("failed to install interrupt handler: {e}");
    }

    match run(args, prescan) {
        Ok(()) => ExitCode::SUCCESS,
        Err(YtAudioError::Cli(e)) => {
            let _ = e.print();
            if e.use_stderr() {
                ExitCode::FAILURE
            } else {
                ExitCode::SUCCESS
            }
        }
        Err(e) => {
            log::error!("{e}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: Vec<OsString>, prescan: cli::Prescan) -> yt_audio::Result<()> {
    let config_path = config::config_path(prescan.config.as_deref());
    let file = config::load_config(config_path.as_deref(), prescan.config.is_some())?;

    let parsed = cli::parse_from(args, &file.url_list)?;
    let selected = parsed.selected_arguments(&file.url_list);
    let settings = Settings::resolve(&file, &parsed.overrides, &selected)?;

    let capabilities = tools::check_dependencies(&settings)?;
    if log::log_enabled!(log::Level::Debug) {
        if let Some(program) = tools::program_name(&settings.download_command) {
            if let Some(version) = tools::tool_version_first_line(program) {
                log::debug!("{program} {version}");
            }
        }
    }
    log::debug!("tracking mode: {:?}", settings.tracking);

    let summary = Orchestrator::new(&settings, &capabilities).run();
    log::debug!(
        "processed {} entries ({} in sync, {} failed), {} item(s) downloaded",
        summary.processed,
        summary.in_sync,
        summary.failed,
        summary.downloaded
    );
    Ok(())
}
