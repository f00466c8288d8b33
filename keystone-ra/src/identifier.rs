/// Identifiers and the policy deciding which ones may be authorized
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Identifier type for DNS names, the only type authorized today
pub const IDENTIFIER_DNS: &str = "dns";

/// Maximum number of labels in an authorizable name
pub const MAX_LABELS: usize = 10;

/// Maximum length of a single DNS label
pub const MAX_LABEL_LEN: usize = 63;

/// Name to be authorized
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Identifier {
    /// Identifier type (usually "dns")
    #[serde(rename = "type")]
    pub id_type: String,

    /// Identifier value (domain name)
    pub value: String,
}

impl Identifier {
    /// Create a DNS identifier
    pub fn dns(domain: impl Into<String>) -> Self {
        Self {
            id_type: IDENTIFIER_DNS.to_string(),
            value: domain.into(),
        }
    }

    /// Create an identifier of an arbitrary type
    pub fn new(id_type: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            id_type: id_type.into(),
            value: value.into(),
        }
    }

    pub fn is_dns(&self) -> bool {
        self.id_type == IDENTIFIER_DNS
    }
}

static DNS_LABEL: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Za-z0-9-]*$").unwrap());

static DIGITS_AND_DOTS: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[0-9.]*$").unwrap());

/// Decide whether `id` must be refused authorization.
///
/// A name is allowed only if it has between 2 and [`MAX_LABELS`] labels,
/// every label is 1 to 63 letters, digits or hyphens, does not begin or
/// end with a hyphen and is not a punycode (`xn--`) label, the whole name
/// does not look like an IPv4 literal, and the final label is not
/// numeric.
pub fn forbidden_identifier(id: &str) -> bool {
    // One extra split slot so that an eleventh label is detectable.
    let labels: Vec<&str> = id.splitn(MAX_LABELS + 1, '.').collect();
    if labels.len() < 2 || labels.len() > MAX_LABELS {
        return true;
    }

    if labels.iter().any(|label| forbidden_label(label)) {
        return true;
    }

    if DIGITS_AND_DOTS.is_match(id) {
        return true;
    }

    labels
        .last()
        .is_none_or(|last| DIGITS_AND_DOTS.is_match(last))
}

fn forbidden_label(label: &str) -> bool {
    if label.is_empty() || label.len() > MAX_LABEL_LEN {
        return true;
    }
    if !DNS_LABEL.is_match(label) {
        return true;
    }
    if label.starts_with('-') || label.ends_with('-') {
        return true;
    }
    // Internationalized names stay disabled until homoglyph handling exists.
    label
        .get(..4)
        .is_some_and(|prefix| prefix.eq_ignore_ascii_case("xn--"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identifier_dns() {
        let identifier = Identifier::dns("example.com");
        assert_eq!(identifier.id_type, "dns");
        assert_eq!(identifier.value, "example.com");
        assert!(identifier.is_dns());
        assert!(!Identifier::new("ip", "10.0.0.1").is_dns());
    }

    #[test]
    fn test_identifier_serialization() {
        let json = serde_json::to_string(&Identifier::dns("example.com")).unwrap();
        assert_eq!(json, r#"{"type":"dns","value":"example.com"}"#);
    }

    #[test]
    fn test_allowed_names() {
        for name in [
            "foo.com",
            "www.example.org",
            "a-b.c-d.example.net",
            "123.example.com",
            "foo.c0m",
            "a.b.c.d.e.f.g.h.i.com",
        ] {
            assert!(!forbidden_identifier(name), "{} should be allowed", name);
        }
    }

    #[test]
    fn test_label_count_bounds() {
        assert!(forbidden_identifier("foo"));
        assert!(forbidden_identifier(""));
        assert!(forbidden_identifier("a.b.c.d.e.f.g.h.i.j.com"));
        assert!(forbidden_identifier("a.b.c.d.e.f.g.h.i.j.k.l.m.com"));
    }

    #[test]
    fn test_label_rules() {
        assert!(forbidden_identifier("-foo.com"));
        assert!(forbidden_identifier("evil-.com"));
        assert!(forbidden_identifier("foo..com"));
        assert!(forbidden_identifier(".foo.com"));
        assert!(forbidden_identifier("foo.com."));
        assert!(forbidden_identifier("foo_bar.com"));
        assert!(forbidden_identifier("*.example.com"));
        assert!(forbidden_identifier("exämple.com"));
        assert!(forbidden_identifier(&format!("{}.com", "a".repeat(64))));
        assert!(!forbidden_identifier(&format!("{}.com", "a".repeat(63))));
    }

    #[test]
    fn test_punycode_rejected() {
        assert!(forbidden_identifier("xn--abc.com"));
        assert!(forbidden_identifier("www.xn--bcher-kva.example"));
        assert!(forbidden_identifier("XN--abc.com"));
        assert!(!forbidden_identifier("xn-abc.com"));
    }

    #[test]
    fn test_numeric_names_rejected() {
        assert!(forbidden_identifier("192.168.1.1"));
        assert!(forbidden_identifier("10.0"));
        assert!(forbidden_identifier("foo.123"));
    }
}
