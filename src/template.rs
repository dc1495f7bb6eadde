//! Placeholder substitution for the user-configurable command templates.

pub const URL: &str = "$URL$";
pub const OUTPUT: &str = "$OUTPUT$";
pub const ARCHIVE: &str = "$ARCHIVE$";
pub const PLAYLIST_URL: &str = "$PLAYLIST_URL$";
pub const PATH: &str = "$PATH$";

/// Replaces every literal occurrence of each placeholder with its value.
///
/// Substitution happens in a single left-to-right scan, so values that happen
/// to contain another placeholder token are never expanded a second time and
/// the order of `substitutions` does not matter.
pub fn build(template: &str, substitutions: &[(&str, &str)]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    'scan: while !rest.is_empty() {
        for (token, value) in substitutions {
            if !token.is_empty() && rest.starts_with(token) {
                out.push_str(value);
                rest = &rest[token.len()..];
                continue 'scan;
            }
        }
        let mut chars = rest.chars();
        if let Some(c) = chars.next() {
            out.push(c);
        }
        rest = chars.as_str();
    }

    out
}

/// Substitutes placeholders in a template that is handed to a shell or
/// split into words.
///
/// Each value is a list of words. Every word is shell-quoted on its own and
/// the words are joined with spaces, so `$`, quotes and `&` in titles, file
/// names and URLs stay literal. Double quotes written around a placeholder in
/// the template (`"$OUTPUT$"`) are dropped, since the value is quoted anyway.
pub fn build_shell(template: &str, substitutions: &[(&str, &[String])]) -> String {
    let mut unquoted = template.to_string();
    for (token, _) in substitutions {
        unquoted = unquoted.replace(&format!("\"{token}\""), token);
    }
    let quoted: Vec<(&str, String)> = substitutions
        .iter()
        .map(|(token, words)| (*token, shell_words::join(words.iter())))
        .collect();
    let pairs: Vec<(&str, &str)> = quoted.iter().map(|(token, value)| (*token, value.as_str())).collect();
    build(&unquoted, &pairs)
}

/// Required tokens that do not appear in `template`, in the order given.
pub fn missing_placeholders<'a>(template: &str, required: &[&'a str]) -> Vec<&'a str> {
    required
        .iter()
        .copied()
        .filter(|token| !template.contains(token))
        .collect()
}

/// Tool arguments (whitespace separated words) that do not appear in `template`.
pub fn missing_arguments<'a>(template: &str, required: &[&'a str]) -> Vec<&'a str> {
    required
        .iter()
        .copied()
        .filter(|arg| !template.split_whitespace().any(|word| word == *arg))
        .collect()
}
