use std::collections::BTreeMap;

use secrecy::SecretString;
use tracing::{debug, warn};

/// Parse the notes of a 1Password item into environment variables.
///
/// Every `key=value` line becomes a variable. Lines starting with `#` are
/// comments; lines without `=` are ignored. Keys and values have backslash
/// escapes decoded, whitespace trimmed and surrounding quotes removed.
/// If a key appears twice, the last value wins.
pub fn parse_secrets_document(document: &str) -> BTreeMap<String, SecretString> {
    let mut env_vars = BTreeMap::new();
    for line in document.trim().split('\n') {
        if line.trim_start().starts_with('#') {
            continue;
        }
        let Some((key, value)) = line.split_once('=') else {
            continue;
        };
        let key = clean(key);
        if key.is_empty() {
            warn!("ignoring secret without a name");
            continue;
        }
        debug!("found secret {key}");
        env_vars.insert(key, SecretString::from(clean(value)));
    }
    env_vars
}

fn clean(raw: &str) -> String {
    unescape(raw)
        .trim()
        .trim_matches(|c: char| c == '\'' || c == '"')
        .to_string()
}

/// Decode backslash escapes: the single character ones, octal `\ooo`,
/// `\xHH`, `\uXXXX` and `\UXXXXXXXX`. Unknown or malformed escapes are kept
/// verbatim.
fn unescape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some('a') => out.push('\u{07}'),
            Some('b') => out.push('\u{08}'),
            Some('f') => out.push('\u{0c}'),
            Some('v') => out.push('\u{0b}'),
            Some('\\') => out.push('\\'),
            Some('\'') => out.push('\''),
            Some('"') => out.push('"'),
            Some(first @ '0'..='7') => {
                let mut code = u32::from(first) - u32::from('0');
                for _ in 0..2 {
                    match chars.clone().next().and_then(|d| d.to_digit(8)) {
                        Some(digit) => {
                            code = code * 8 + digit;
                            chars.next();
                        }
                        None => break,
                    }
                }
                // at most 0o777, always a valid char
                out.extend(char::from_u32(code));
            }
            Some(kind @ ('x' | 'u' | 'U')) => {
                let len = match kind {
                    'x' => 2,
                    'u' => 4,
                    _ => 8,
                };
                let digits: String = chars.clone().take(len).collect();
                let decoded = (digits.len() == len && digits.chars().all(|d| d.is_ascii_hexdigit()))
                    .then(|| u32::from_str_radix(&digits, 16).ok())
                    .flatten()
                    .and_then(char::from_u32);
                match decoded {
                    Some(decoded) => {
                        out.push(decoded);
                        for _ in 0..len {
                            chars.next();
                        }
                    }
                    None => {
                        out.push('\\');
                        out.push(kind);
                    }
                }
            }
            Some(other) => {
                out.push('\\');
                out.push(other);
            }
            None => out.push('\\'),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use secrecy::ExposeSecret as _;

    use super::*;

    fn parse(document: &str) -> BTreeMap<String, String> {
        parse_secrets_document(document)
            .into_iter()
            .map(|(k, v)| (k, v.expose_secret().to_string()))
            .collect()
    }

    fn map(entries: &[(&str, &str)]) -> BTreeMap<String, String> {
        entries
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn comments_are_skipped_and_quotes_removed() {
        assert_eq!(
            parse("# comment\nA=1\nB=\"two words\"\n"),
            map(&[("A", "1"), ("B", "two words")])
        );
    }

    #[test]
    fn lines_without_equal_sign_are_ignored() {
        assert_eq!(parse("JUST_A_NAME\nC=3"), map(&[("C", "3")]));
    }

    #[test]
    fn empty_document_has_no_secrets() {
        assert!(parse("").is_empty());
        assert!(parse("\n\n   \n").is_empty());
    }

    #[test]
    fn value_keeps_everything_after_the_first_equal_sign() {
        assert_eq!(
            parse("TOKEN=abc==\nURL='postgres://u:p@h/db?a=b'"),
            map(&[("TOKEN", "abc=="), ("URL", "postgres://u:p@h/db?a=b")])
        );
    }

    #[test]
    fn keys_and_values_are_trimmed() {
        assert_eq!(
            parse("  'KEY'  =  \"value\"  \r\n"),
            map(&[("KEY", "value")])
        );
    }

    #[test]
    fn last_duplicate_wins() {
        assert_eq!(parse("A=1\nA=2"), map(&[("A", "2")]));
    }

    #[test]
    fn indented_comments_are_skipped() {
        assert_eq!(parse("  # A=1\nB=2"), map(&[("B", "2")]));
    }

    #[test]
    fn empty_keys_are_skipped() {
        assert_eq!(parse("=orphan\nB=2"), map(&[("B", "2")]));
    }

    #[test]
    fn escapes_are_decoded() {
        assert_eq!(
            parse(r#"PEM=line1\nline2
TAB=a\tb
QUOTE=say \"hi\" now
HEX=\x41é
ODD=\q"#),
            map(&[
                ("PEM", "line1\nline2"),
                ("TAB", "a\tb"),
                ("QUOTE", "say \"hi\" now"),
                ("HEX", "Aé"),
                ("ODD", "\\q"),
            ])
        );
    }

    #[test]
    fn control_character_escapes_are_decoded() {
        assert_eq!(unescape(r"\a\b\f\v"), "\u{07}\u{08}\u{0c}\u{0b}");
    }

    #[test]
    fn octal_escapes_take_up_to_three_digits() {
        assert_eq!(unescape(r"\101\0"), "A\0");
        assert_eq!(unescape(r"\12x"), "\nx");
        assert_eq!(unescape(r"\1018"), "A8");
        assert_eq!(unescape(r"\8"), r"\8");
    }

    #[test]
    fn long_unicode_escape_is_decoded() {
        assert_eq!(unescape(r"smile \U0001F600"), "smile 😀");
        assert_eq!(unescape(r"\U0001F6"), r"\U0001F6");
        assert_eq!(unescape(r"\UFFFFFFFF"), r"\UFFFFFFFF");
    }

    #[test]
    fn malformed_unicode_escape_is_kept() {
        assert_eq!(unescape(r"\u12"), r"\u12");
        assert_eq!(unescape(r"trailing\"), r"trailing\");
    }
}
