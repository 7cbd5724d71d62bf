//! HTTP authentication schemes for CalDAV.
//!
//! - RFC 7617 (Basic)
//! - RFC 7616 (Digest, MD5 and MD5-sess)

use base64::Engine;
use rand::Rng;
use std::collections::HashMap;

/// The scheme a server asked for in `WWW-Authenticate`.
#[derive(Debug, Clone)]
pub enum AuthScheme {
    Basic,
    Digest(DigestAuth),
}

impl AuthScheme {
    /// Picks a scheme from a `WWW-Authenticate` header value.
    ///
    /// Digest wins when offered and parseable; anything else falls back to
    /// Basic.
    pub fn from_challenge(header: &str) -> Self {
        let trimmed = header.trim_start();
        let is_digest = trimmed
            .get(..7)
            .is_some_and(|p| p.eq_ignore_ascii_case("digest "));
        if is_digest && let Some(digest) = DigestAuth::parse(trimmed) {
            return Self::Digest(digest);
        }
        Self::Basic
    }

    /// Produces the `Authorization` header value for one request.
    pub fn authorize(&mut self, method: &str, uri: &str, username: &str, password: &str) -> String {
        match self {
            Self::Basic => basic_auth(username, password),
            Self::Digest(digest) => digest.authorize(method, uri, username, password),
        }
    }
}

/// RFC 7616 Digest state for one server challenge.
#[derive(Debug, Clone)]
pub struct DigestAuth {
    pub realm: String,
    pub nonce: String,
    pub opaque: Option<String>,
    /// True when the server offered `qop=auth`.
    pub qop_auth: bool,
    /// `MD5` or `MD5-sess`.
    pub algorithm: String,
    nc: u32,
}

impl DigestAuth {
    /// Parses a `Digest ...` challenge.
    pub fn parse(header: &str) -> Option<Self> {
        let content = header.get(7..)?.trim();
        let params = parse_auth_params(content);

        let qop_auth = params
            .get("qop")
            .is_some_and(|q| q.split(',').any(|opt| opt.trim().eq_ignore_ascii_case("auth")));

        Some(Self {
            realm: params.get("realm")?.clone(),
            nonce: params.get("nonce")?.clone(),
            opaque: params.get("opaque").cloned(),
            qop_auth,
            algorithm: params
                .get("algorithm")
                .cloned()
                .unwrap_or_else(|| "MD5".to_string()),
            nc: 0,
        })
    }

    fn is_session_variant(&self) -> bool {
        self.algorithm.eq_ignore_ascii_case("MD5-sess")
    }

    /// Generates an Authorization header value and advances the nonce count.
    pub fn authorize(&mut self, method: &str, uri: &str, username: &str, password: &str) -> String {
        self.nc += 1;
        let nc = format!("{:08x}", self.nc);
        let cnonce = generate_cnonce();

        let mut ha1 = md5_hex(&format!("{}:{}:{}", username, self.realm, password));
        if self.is_session_variant() {
            ha1 = md5_hex(&format!("{}:{}:{}", ha1, self.nonce, cnonce));
        }
        let ha2 = md5_hex(&format!("{}:{}", method, uri));

        let response = if self.qop_auth {
            md5_hex(&format!(
                "{}:{}:{}:{}:auth:{}",
                ha1, self.nonce, nc, cnonce, ha2
            ))
        } else {
            md5_hex(&format!("{}:{}:{}", ha1, self.nonce, ha2))
        };

        let mut parts = vec![
            format!("username=\"{}\"", username),
            format!("realm=\"{}\"", self.realm),
            format!("nonce=\"{}\"", self.nonce),
            format!("uri=\"{}\"", uri),
            format!("response=\"{}\"", response),
            format!("algorithm={}", self.algorithm),
        ];

        if self.qop_auth {
            parts.push("qop=auth".to_string());
            parts.push(format!("nc={}", nc));
            parts.push(format!("cnonce=\"{}\"", cnonce));
        }

        if let Some(ref opaque) = self.opaque {
            parts.push(format!("opaque=\"{}\"", opaque));
        }

        format!("Digest {}", parts.join(", "))
    }
}

/// Generates a Basic authentication header value.
pub fn basic_auth(username: &str, password: &str) -> String {
    let encoded =
        base64::engine::general_purpose::STANDARD.encode(format!("{}:{}", username, password));
    format!("Basic {}", encoded)
}

/// Parses `key=value, key="quoted, value"` lists.
fn parse_auth_params(content: &str) -> HashMap<String, String> {
    let mut params = HashMap::new();
    let mut chars = content.chars().peekable();

    loop {
        while chars.peek().is_some_and(|c| c.is_whitespace() || *c == ',') {
            chars.next();
        }

        let key: String = chars
            .by_ref()
            .take_while(|c| *c != '=')
            .collect::<String>()
            .trim()
            .to_lowercase();
        if key.is_empty() {
            break;
        }

        let value = if chars.peek() == Some(&'"') {
            chars.next();
            let mut val = String::new();
            let mut escaped = false;
            for c in chars.by_ref() {
                match (escaped, c) {
                    (true, c) => {
                        val.push(c);
                        escaped = false;
                    }
                    (false, '\\') => escaped = true,
                    (false, '"') => break,
                    (false, c) => val.push(c),
                }
            }
            val
        } else {
            chars
                .by_ref()
                .take_while(|c| *c != ',' && !c.is_whitespace())
                .collect()
        };

        params.insert(key, value);
    }

    params
}

fn generate_cnonce() -> String {
    let bytes: [u8; 8] = rand::rng().random();
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}

fn md5_hex(input: &str) -> String {
    format!("{:x}", md5::compute(input.as_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn picks_digest_when_offered() {
        let scheme = AuthScheme::from_challenge(
            r#"Digest realm="icloud", nonce="abc123", qop="auth,auth-int", algorithm=MD5"#,
        );
        match scheme {
            AuthScheme::Digest(d) => {
                assert_eq!(d.realm, "icloud");
                assert_eq!(d.nonce, "abc123");
                assert!(d.qop_auth);
            }
            AuthScheme::Basic => panic!("expected digest"),
        }
    }

    #[test]
    fn falls_back_to_basic() {
        assert!(matches!(
            AuthScheme::from_challenge(r#"Basic realm="caldav""#),
            AuthScheme::Basic
        ));
        // Digest without a nonce is unusable.
        assert!(matches!(
            AuthScheme::from_challenge(r#"Digest realm="x""#),
            AuthScheme::Basic
        ));
    }

    #[test]
    fn quoted_values_may_contain_commas() {
        let d = DigestAuth::parse(r#"Digest realm="a, b", nonce="n", opaque="o\"q""#).unwrap();
        assert_eq!(d.realm, "a, b");
        assert_eq!(d.opaque.as_deref(), Some("o\"q"));
        assert!(!d.qop_auth);
    }

    #[test]
    fn digest_header_increments_nonce_count() {
        let mut d = DigestAuth::parse(r#"Digest realm="r", nonce="n", qop="auth""#).unwrap();
        let first = d.authorize("PROPFIND", "/", "user", "pass");
        let second = d.authorize("REPORT", "/cal/", "user", "pass");
        assert!(first.contains("nc=00000001"));
        assert!(second.contains("nc=00000002"));
        assert!(second.contains("uri=\"/cal/\""));
        assert!(second.starts_with("Digest "));
    }

    #[test]
    fn digest_without_qop_uses_rfc2069_form() {
        let mut d = DigestAuth::parse(r#"Digest realm="r", nonce="n""#).unwrap();
        let header = d.authorize("GET", "/", "u", "p");
        assert!(!header.contains("qop="));
        assert!(!header.contains("cnonce="));
    }

    #[test]
    fn basic_auth_encoding() {
        assert_eq!(basic_auth("user", "password"), "Basic dXNlcjpwYXNzd29yZA==");
    }

    #[test]
    fn md5_hex_computation() {
        assert_eq!(md5_hex("hello"), "5d41402abc4b2a76b9719d911017c592");
    }
}
