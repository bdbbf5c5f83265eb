//! Section boundary scanning shared by the section readers.
//!
//! EDI has no grammar beyond "a line starting with `>` opens something".
//! A section starts at its marker line and runs until the next marker that
//! the caller does not accept as a continuation of the same section.

/// Raw lines belonging to one section
#[derive(Debug, Clone, PartialEq)]
pub struct Section<'a> {
    /// Index of the marker line in the source
    pub start: usize,
    /// The marker line itself, trimmed
    pub marker: &'a str,
    /// Non-blank body lines, untrimmed, including accepted continuation markers
    pub body: Vec<&'a str>,
}

/// True for a line that opens a section or block
pub fn is_marker(line: &str) -> bool {
    line.trim_start().starts_with('>')
}

/// True for `!` comment lines
pub fn is_comment(line: &str) -> bool {
    line.trim_start().starts_with('!')
}

/// Case-insensitive prefix test on the trimmed line
pub fn starts_with_marker(line: &str, marker: &str) -> bool {
    let trimmed = line.trim_start();
    trimmed.len() >= marker.len()
        && trimmed.is_char_boundary(marker.len())
        && trimmed[..marker.len()].eq_ignore_ascii_case(marker)
}

/// Locate the first section whose marker satisfies `is_start`
pub fn find_section<'a, S, C>(lines: &[&'a str], is_start: S, continues: C) -> Option<Section<'a>>
where
    S: Fn(&str) -> bool,
    C: Fn(&str) -> bool,
{
    let start = lines
        .iter()
        .position(|&line| is_marker(line) && is_start(line))?;

    let mut body = Vec::new();
    for &line in &lines[start + 1..] {
        if is_marker(line) && !continues(line) {
            break;
        }
        if line.trim().is_empty() {
            continue;
        }
        body.push(line);
    }

    Some(Section {
        start,
        marker: lines[start].trim(),
        body,
    })
}

/// Locate a section by marker prefix; any later marker ends it
pub fn find_simple_section<'a>(lines: &[&'a str], marker: &str) -> Option<Section<'a>> {
    find_section(lines, |line| starts_with_marker(line, marker), |_| false)
}

/// Split a `KEY=VALUE` line on the first `=`
///
/// The key is lowercased and the value has surrounding quotes removed.
/// Lines without `=` or with an empty key yield `None`.
pub fn split_key_value(line: &str) -> Option<(String, String)> {
    let (key, value) = line.trim().split_once('=')?;
    let key = key.trim();
    if key.is_empty() {
        return None;
    }
    Some((key.to_lowercase(), unquote(value)))
}

/// Strip whitespace and one layer of double quotes
pub fn unquote(value: &str) -> String {
    let trimmed = value.trim();
    let stripped = trimmed
        .strip_prefix('"')
        .and_then(|v| v.strip_suffix('"'))
        .unwrap_or(trimmed);
    stripped.replace('"', "").trim().to_string()
}
