// ABOUTME: Line-oriented KEY=VALUE environment file parsing.
// ABOUTME: Trims whitespace, skips comments, strips one layer of quoting.

use std::collections::HashMap;

/// Strip surrounding whitespace, then exactly one layer of matching single
/// or double quotes.
fn sanitize(value: &str) -> &str {
    let value = value.trim();
    if value.len() < 2 {
        return value;
    }

    let bytes = value.as_bytes();
    if bytes[0] == bytes[value.len() - 1] && (bytes[0] == b'"' || bytes[0] == b'\'') {
        return &value[1..value.len() - 1];
    }

    value
}

/// Parse environment lines. Empty lines and `#` comments are skipped; the
/// value may itself contain `=`; a line whose key sanitizes to empty is
/// dropped. Later lines win on duplicate keys.
pub fn parse_environment<'a, I>(lines: I) -> HashMap<String, String>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut environment = HashMap::new();

    for line in lines {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let (key, value) = match line.split_once('=') {
            Some((key, value)) => (sanitize(key), sanitize(value)),
            None => (sanitize(line), ""),
        };

        if key.is_empty() {
            continue;
        }

        environment.insert(key.to_string(), value.to_string());
    }

    environment
}
