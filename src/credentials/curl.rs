//! Header extraction from a browser "Copy as cURL" command.
//!
//! Picks up `-H` / `--header` arguments (`'Name: value'`) and folds
//! `-b` / `--cookie` into a `cookie` header. Header names are lowercased.

use crate::types::HeaderBlob;

/// Split a shell-style command line into arguments, honouring single and
/// double quotes and backslash line continuations.
fn shell_words(command: &str) -> Vec<String> {
    let mut words = Vec::new();
    let mut current = String::new();
    let mut in_word = false;
    let mut quote: Option<char> = None;
    let mut chars = command.chars().peekable();

    while let Some(c) = chars.next() {
        match quote {
            Some(q) if c == q => quote = None,
            Some('"') if c == '\\' => {
                if let Some(next) = chars.next() {
                    current.push(next);
                }
            }
            Some(_) => current.push(c),
            None => match c {
                '\'' | '"' => {
                    quote = Some(c);
                    in_word = true;
                }
                '\\' => match chars.next() {
                    Some('\n') | Some('\r') | None => {}
                    Some(next) => {
                        current.push(next);
                        in_word = true;
                    }
                },
                c if c.is_whitespace() => {
                    if in_word {
                        words.push(std::mem::take(&mut current));
                        in_word = false;
                    }
                }
                c => {
                    current.push(c);
                    in_word = true;
                }
            },
        }
    }
    if in_word {
        words.push(current);
    }
    words
}

/// Extract request headers from a curl command.
///
/// Arguments without a `:` are skipped. The value keeps any further
/// colons (`Referer: https://...`).
pub fn extract_headers_from_curl(command: &str) -> HeaderBlob {
    let words = shell_words(command);
    let mut headers = HeaderBlob::new();
    let mut iter = words.iter();

    while let Some(word) = iter.next() {
        match word.as_str() {
            "-H" | "--header" => {
                if let Some((name, value)) = iter.next().and_then(|h| h.split_once(':')) {
                    let name = name.trim().to_ascii_lowercase();
                    if !name.is_empty() {
                        headers.insert(name, value.trim().to_string());
                    }
                }
            }
            "-b" | "--cookie" => {
                if let Some(cookie) = iter.next() {
                    headers.insert("cookie".to_string(), cookie.trim().to_string());
                }
            }
            _ => {}
        }
    }
    headers
}
