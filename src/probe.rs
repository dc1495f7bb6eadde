use crate::cmd::{self, Invocation};
use crate::template;
use crate::tools::{self, Capabilities};
use crate::Result;
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Deserialize)]
struct ProbeOutput {
    format: Option<ProbeFormat>,
}

#[derive(Debug, Deserialize)]
struct ProbeFormat {
    tags: Option<ProbeTags>,
}

#[derive(Debug, Deserialize)]
struct ProbeTags {
    purl: Option<String>,
}

/// Runs the probe template against `file` and returns its `purl` tag.
///
/// Files without the tag, and files the probe tool cannot read at all, give
/// `Ok(None)`. Only a failure to launch the probe is an error.
pub fn probe_url(file: &Path, probe_command: &str, capabilities: &Capabilities) -> Result<Option<String>> {
    let file_path = file.to_string_lossy().into_owned();
    let command = template::build_shell(
        &resolve_program(probe_command, capabilities),
        &[(template::PATH, std::slice::from_ref(&file_path))],
    );
    let output = cmd::run_to_string(&command, Invocation::Shell)?;
    let url = purl_from_json(&output);
    if url.is_none() {
        log::debug!("no purl tag in {file_path}");
    }
    Ok(url)
}

/// Extracts `format.tags.purl` from the first JSON value in `output`.
pub fn purl_from_json(output: &str) -> Option<String> {
    let parsed: ProbeOutput = first_json_value(output)?;
    parsed
        .format?
        .tags?
        .purl
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Parses the first JSON document in `text`, ignoring anything after it.
pub fn first_json_value<T: serde::de::DeserializeOwned>(text: &str) -> Option<T> {
    serde_json::Deserializer::from_str(text)
        .into_iter::<T>()
        .next()?
        .ok()
}

fn resolve_program(probe_command: &str, capabilities: &Capabilities) -> String {
    let Some(program) = tools::program_name(probe_command) else {
        return probe_command.to_string();
    };
    match capabilities.probe_substitute(program) {
        Some(substitute) => probe_command.replacen(program, substitute, 1),
        None => probe_command.to_string(),
    }
}
