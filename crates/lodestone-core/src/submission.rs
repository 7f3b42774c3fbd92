//! Magnet submission parsing and provisional identity derivation.

use data_encoding::{BASE32, HEXLOWER};
use url::Url;

use crate::error::{JobError, JobResult};
use crate::model::JobId;

/// Display name used when a submission carries no `dn` parameter.
pub const UNKNOWN_DISPLAY_NAME: &str = "Unknown torrent";

const MAGNET_SCHEME: &str = "magnet:";
const BTIH_PREFIX: &str = "urn:btih:";
const HEX_LEN: usize = 40;
const BASE32_LEN: usize = 32;
const INVALID_FINGERPRINT: &str = "fingerprint must be 40 hex or 32 base32 characters";

/// Text encoding of a content fingerprint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FingerprintEncoding {
    /// 40 hexadecimal characters.
    Hex,
    /// 32 RFC 4648 base32 characters.
    Base32,
}

/// Content fingerprint (`btih` info-hash) extracted from a submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fingerprint {
    text: String,
    encoding: FingerprintEncoding,
    hex: String,
}

impl Fingerprint {
    /// Validate and normalise a raw `btih` value.
    ///
    /// # Errors
    ///
    /// Returns `JobError::Validation` when the value is neither 40 hex nor 32 base32 characters.
    pub fn parse(raw: &str) -> JobResult<Self> {
        let invalid = || JobError::Validation {
            reason: INVALID_FINGERPRINT,
        };
        let text = raw.trim().to_ascii_lowercase();
        if text.len() == HEX_LEN && text.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Ok(Self {
                hex: text.clone(),
                text,
                encoding: FingerprintEncoding::Hex,
            });
        }
        if text.len() != BASE32_LEN {
            return Err(invalid());
        }
        let bytes = BASE32
            .decode(text.to_ascii_uppercase().as_bytes())
            .map_err(|_| invalid())?;
        Ok(Self {
            hex: HEXLOWER.encode(&bytes),
            text,
            encoding: FingerprintEncoding::Base32,
        })
    }

    /// Lowercase canonical text form.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.text
    }

    /// Encoding the fingerprint was submitted in.
    #[must_use]
    pub const fn encoding(&self) -> FingerprintEncoding {
        self.encoding
    }

    /// Lowercase hexadecimal rendering; base32 input is decoded at parse time.
    #[must_use]
    pub fn to_hex(&self) -> String {
        self.hex.clone()
    }
}

/// A validated magnet submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MagnetSubmission {
    uri: String,
    fingerprint: Fingerprint,
    display_name: String,
}

impl MagnetSubmission {
    /// Validate a submitted magnet URI and extract its fingerprint and display name.
    ///
    /// # Errors
    ///
    /// Returns `JobError::Validation` when the input is empty, uses another
    /// scheme, or carries no usable `btih` fingerprint.
    pub fn parse(input: &str) -> JobResult<Self> {
        let uri = input.trim();
        if uri.is_empty() {
            return Err(JobError::Validation {
                reason: "no magnet link provided",
            });
        }
        if !uri.starts_with(MAGNET_SCHEME) {
            return Err(JobError::Validation {
                reason: "invalid magnet link: must start with magnet:",
            });
        }
        let parsed = Url::parse(uri).map_err(|_| JobError::Validation {
            reason: "magnet link is not a valid URI",
        })?;

        let mut fingerprint = None;
        let mut display_name = None;
        for (key, value) in parsed.query_pairs() {
            match key.as_ref() {
                "xt" if fingerprint.is_none() => {
                    if let Some(hash) = strip_prefix_ignore_case(&value, BTIH_PREFIX) {
                        fingerprint = Some(Fingerprint::parse(hash)?);
                    }
                }
                "dn" if display_name.is_none() => {
                    let name = value.trim();
                    if !name.is_empty() {
                        display_name = Some(name.to_string());
                    }
                }
                _ => {}
            }
        }

        let fingerprint = fingerprint.ok_or(JobError::Validation {
            reason: "magnet link carries no btih fingerprint",
        })?;
        Ok(Self {
            uri: uri.to_string(),
            fingerprint,
            display_name: display_name.unwrap_or_else(|| UNKNOWN_DISPLAY_NAME.to_string()),
        })
    }

    /// Trimmed magnet URI as handed to the engine.
    #[must_use]
    pub fn uri(&self) -> &str {
        &self.uri
    }

    /// Extracted content fingerprint.
    #[must_use]
    pub const fn fingerprint(&self) -> &Fingerprint {
        &self.fingerprint
    }

    /// Display name (`dn`), form-decoded.
    #[must_use]
    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    /// Provisional identity: the lowercase fingerprint text.
    #[must_use]
    pub fn provisional_id(&self) -> JobId {
        JobId::new(self.fingerprint.as_str())
    }
}

fn strip_prefix_ignore_case<'a>(value: &'a str, prefix: &str) -> Option<&'a str> {
    let head = value.get(..prefix.len())?;
    head.eq_ignore_ascii_case(prefix)
        .then(|| &value[prefix.len()..])
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEX: &str = "ABCDEF0123456789ABCDEF0123456789ABCDEF01";

    #[test]
    fn hex_submission_yields_lowercase_provisional_id() -> JobResult<()> {
        let submission = MagnetSubmission::parse(&format!("magnet:?xt=urn:btih:{HEX}&dn=LinuxISO"))?;
        assert_eq!(
            submission.provisional_id().as_str(),
            "abcdef0123456789abcdef0123456789abcdef01"
        );
        assert_eq!(submission.display_name(), "LinuxISO");
        assert_eq!(submission.fingerprint().encoding(), FingerprintEncoding::Hex);
        Ok(())
    }

    #[test]
    fn display_name_is_form_decoded_and_defaults() -> JobResult<()> {
        let named = MagnetSubmission::parse(&format!(
            "  magnet:?xt=urn:btih:{HEX}&dn=Ubuntu+24.04%20Desktop  "
        ))?;
        assert_eq!(named.display_name(), "Ubuntu 24.04 Desktop");
        assert!(named.uri().starts_with("magnet:?"));

        let unnamed = MagnetSubmission::parse(&format!("magnet:?xt=urn:btih:{HEX}"))?;
        assert_eq!(unnamed.display_name(), UNKNOWN_DISPLAY_NAME);
        Ok(())
    }

    #[test]
    fn base32_fingerprint_decodes_to_hex() -> JobResult<()> {
        // 20 zero bytes followed by 0x01 in the last position.
        let submission = MagnetSubmission::parse(
            "magnet:?xt=urn:btih:AAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAB",
        )?;
        let fingerprint = submission.fingerprint();
        assert_eq!(fingerprint.encoding(), FingerprintEncoding::Base32);
        assert_eq!(fingerprint.as_str(), "aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaab");
        assert_eq!(fingerprint.to_hex(), format!("{}01", "0".repeat(38)));
        Ok(())
    }

    #[test]
    fn rejects_malformed_input() {
        let cases = [
            ("", "no magnet link provided"),
            ("   ", "no magnet link provided"),
            ("http://example.com", "invalid magnet link: must start with magnet:"),
            ("magnet:?dn=NoHash", "magnet link carries no btih fingerprint"),
            ("magnet:?xt=urn:btih:1234", "fingerprint must be 40 hex or 32 base32 characters"),
            (
                "magnet:?xt=urn:btih:11111111111111111111111111111111",
                "fingerprint must be 40 hex or 32 base32 characters",
            ),
        ];
        for (input, expected) in cases {
            match MagnetSubmission::parse(input) {
                Err(JobError::Validation { reason }) => assert_eq!(reason, expected, "{input}"),
                other => panic!("unexpected result for {input:?}: {other:?}"),
            }
        }
    }

    #[test]
    fn xt_prefix_is_case_insensitive() -> JobResult<()> {
        let submission = MagnetSubmission::parse(&format!("magnet:?xt=URN:BTIH:{HEX}"))?;
        assert_eq!(submission.fingerprint().as_str(), HEX.to_ascii_lowercase());
        Ok(())
    }
}
