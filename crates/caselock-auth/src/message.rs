//! # Sign-In Message
//!
//! The structured plain-text message a wallet signs to authenticate:
//!
//! ```text
//! <domain> wants you to sign in with your Ethereum account:
//! <address>
//!
//! <statement>
//!
//! URI: <uri>
//! Version: <version>
//! Chain ID: <chainId>
//! Nonce: <nonce>
//! Issued At: <RFC 3339 timestamp>
//! ```
//!
//! Labelled fields are located by prefix anywhere in the message, so a
//! statement spanning several lines does not shift them; every statement
//! line is kept. `Issued At` is kept verbatim and only
//! interpreted during the freshness check.

use serde::{Deserialize, Serialize};

use crate::error::AuthError;

const HEADER_SUFFIX: &str = " wants you to sign in with your Ethereum account:";
const MIN_LINES: usize = 8;

const URI: &str = "URI: ";
const VERSION: &str = "Version: ";
const CHAIN_ID: &str = "Chain ID: ";
const NONCE: &str = "Nonce: ";
const ISSUED_AT: &str = "Issued At: ";
const LABELS: [&str; 5] = [URI, VERSION, CHAIN_ID, NONCE, ISSUED_AT];

/// Parsed fields of a sign-in message. Immutable once parsed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignedMessage {
    pub domain: String,
    /// The address the signer claims, as written in the message.
    pub address: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub statement: Option<String>,
    pub uri: String,
    pub version: String,
    pub chain_id: u64,
    pub nonce: String,
    /// Raw `Issued At` text.
    pub issued_at: String,
}

impl SignedMessage {
    /// Parse the message text. Lines may end in `\r\n`, `\n`, or `\r`.
    pub fn parse(raw: &str) -> Result<Self, AuthError> {
        let lines = split_lines(raw);
        if lines.len() < MIN_LINES {
            return Err(AuthError::ParseError(format!(
                "expected at least {MIN_LINES} lines, got {}",
                lines.len()
            )));
        }

        let domain = lines[0]
            .trim_end()
            .strip_suffix(HEADER_SUFFIX)
            .map(str::trim)
            .unwrap_or_default();
        if domain.is_empty() {
            return Err(AuthError::ParseError("missing domain header".into()));
        }

        let address = lines[1].trim();
        if address.is_empty() {
            return Err(AuthError::ParseError("missing address".into()));
        }

        let chain_id_raw = labelled(&lines, CHAIN_ID)?;
        let chain_id = chain_id_raw.parse::<u64>().map_err(|_| {
            AuthError::ParseError(format!("chain id is not an integer: {chain_id_raw:?}"))
        })?;

        Ok(Self {
            domain: domain.to_string(),
            address: address.to_string(),
            statement: statement(&lines),
            uri: labelled(&lines, URI)?.to_string(),
            version: labelled(&lines, VERSION)?.to_string(),
            chain_id,
            nonce: labelled(&lines, NONCE)?.to_string(),
            issued_at: labelled(&lines, ISSUED_AT)?.to_string(),
        })
    }

    /// Render the message in its canonical layout with `\n` line endings.
    pub fn render(&self) -> String {
        let mut out = format!("{}{HEADER_SUFFIX}\n{}\n\n", self.domain, self.address);
        if let Some(statement) = self.statement.as_deref().filter(|s| !s.is_empty()) {
            out.push_str(statement);
            out.push_str("\n\n");
        }
        out.push_str(&format!(
            "{URI}{}\n{VERSION}{}\n{CHAIN_ID}{}\n{NONCE}{}\n{ISSUED_AT}{}",
            self.uri, self.version, self.chain_id, self.nonce, self.issued_at
        ));
        out
    }
}

impl std::str::FromStr for SignedMessage {
    type Err = AuthError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

fn split_lines(raw: &str) -> Vec<&str> {
    let mut lines = Vec::new();
    let mut rest = raw;
    while let Some(pos) = rest.find(['\r', '\n']) {
        lines.push(&rest[..pos]);
        let skip = if rest[pos..].starts_with("\r\n") { 2 } else { 1 };
        rest = &rest[pos + skip..];
    }
    lines.push(rest);
    lines
}

fn labelled<'a>(lines: &[&'a str], label: &str) -> Result<&'a str, AuthError> {
    lines
        .iter()
        .copied()
        .find_map(|l| l.strip_prefix(label))
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or_else(|| AuthError::ParseError(format!("missing field {:?}", label.trim_end())))
}

/// Every line between the address and the first labelled field, with the
/// surrounding blank lines removed. Interior lines are joined with `\n`.
fn statement(lines: &[&str]) -> Option<String> {
    let block: Vec<&str> = lines
        .iter()
        .skip(2)
        .take_while(|l| !LABELS.iter().any(|label| l.starts_with(label)))
        .map(|l| l.trim())
        .collect();
    let first = block.iter().position(|l| !l.is_empty())?;
    let last = block.iter().rposition(|l| !l.is_empty())?;
    Some(block[first..=last].join("\n"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> SignedMessage {
        SignedMessage {
            domain: "portal.example".into(),
            address: "0x7E5F4552091A69125d5DfCb7b8C2659029395Bdf".into(),
            statement: Some("Sign in to the evidence portal.".into()),
            uri: "https://portal.example".into(),
            version: "1".into(),
            chain_id: 11155111,
            nonce: "abcDEF123_-xyz".into(),
            issued_at: "2025-01-15T12:00:00Z".into(),
        }
    }

    // ── Parsing ─────────────────────────────────────────────────────

    #[test]
    fn test_parse_rendered_message() {
        let msg = sample();
        assert_eq!(SignedMessage::parse(&msg.render()).unwrap(), msg);
    }

    #[test]
    fn test_parse_without_statement() {
        let msg = SignedMessage {
            statement: None,
            ..sample()
        };
        let text = msg.render();
        assert_eq!(text.lines().count(), 8);
        assert_eq!(SignedMessage::parse(&text).unwrap(), msg);
    }

    #[test]
    fn test_parse_accepts_crlf_and_cr() {
        let text = sample().render();
        let crlf = text.replace('\n', "\r\n");
        let cr = text.replace('\n', "\r");
        assert_eq!(SignedMessage::parse(&crlf).unwrap(), sample());
        assert_eq!(SignedMessage::parse(&cr).unwrap(), sample());
    }

    #[test]
    fn test_multi_line_statement_kept_whole() {
        let msg = SignedMessage {
            statement: Some("Sign in to the evidence portal.\n\nCase QC-2025-0042 only.".into()),
            ..sample()
        };
        let text = msg.render();
        assert_eq!(SignedMessage::parse(&text).unwrap(), msg);
        assert_eq!(
            SignedMessage::parse(&text.replace('\n', "\r\n")).unwrap().statement,
            msg.statement
        );
    }

    #[test]
    fn test_fields_trimmed() {
        let text = sample().render().replace("Nonce: ", "Nonce:    ");
        assert_eq!(SignedMessage::parse(&text).unwrap().nonce, "abcDEF123_-xyz");
    }

    #[test]
    fn test_labels_found_in_any_order() {
        let text = "portal.example wants you to sign in with your Ethereum account:\n\
                    0xabc\n\
                    \n\
                    Nonce: n1\n\
                    Issued At: 2025-01-15T12:00:00Z\n\
                    Chain ID: 1\n\
                    Version: 1\n\
                    URI: https://portal.example";
        let msg = SignedMessage::parse(text).unwrap();
        assert_eq!(msg.nonce, "n1");
        assert_eq!(msg.chain_id, 1);
        assert_eq!(msg.statement, None);
    }

    #[test]
    fn test_first_matching_label_wins() {
        let text = sample().render() + "\nNonce: second";
        assert_eq!(SignedMessage::parse(&text).unwrap().nonce, "abcDEF123_-xyz");
    }

    // ── Rejections ──────────────────────────────────────────────────

    #[test]
    fn test_too_few_lines() {
        let err = SignedMessage::parse("a\nb\nc").unwrap_err();
        assert!(matches!(err, AuthError::ParseError(_)));
    }

    #[test]
    fn test_bad_header() {
        let text = sample().render().replace(" wants you to sign in", " would like to sign in");
        assert!(matches!(
            SignedMessage::parse(&text),
            Err(AuthError::ParseError(_))
        ));
    }

    #[test]
    fn test_empty_domain() {
        let text = sample().render().replacen("portal.example", "", 1);
        assert!(matches!(
            SignedMessage::parse(&text),
            Err(AuthError::ParseError(_))
        ));
    }

    #[test]
    fn test_missing_field() {
        for label in LABELS {
            let text: String = sample()
                .render()
                .lines()
                .filter(|l| !l.starts_with(label))
                .chain(std::iter::once(""))
                .collect::<Vec<_>>()
                .join("\n");
            assert!(
                matches!(SignedMessage::parse(&text), Err(AuthError::ParseError(_))),
                "missing {label} accepted"
            );
        }
    }

    #[test]
    fn test_empty_field_value() {
        let text = sample().render().replace("Version: 1", "Version:   ");
        assert!(matches!(
            SignedMessage::parse(&text),
            Err(AuthError::ParseError(_))
        ));
    }

    #[test]
    fn test_non_integer_chain_id() {
        for bad in ["Chain ID: mainnet", "Chain ID: -1", "Chain ID: 1.5"] {
            let text = sample().render().replace("Chain ID: 11155111", bad);
            assert!(matches!(
                SignedMessage::parse(&text),
                Err(AuthError::ParseError(_))
            ));
        }
    }

    #[test]
    fn test_issued_at_not_validated_during_parse() {
        let text = sample().render().replace("2025-01-15T12:00:00Z", "not a date");
        assert_eq!(SignedMessage::parse(&text).unwrap().issued_at, "not a date");
    }
}
