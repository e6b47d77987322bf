//! Credential handling: masking in text and HTTP basic header encoding.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;

const MASK: &str = "***";

/// Replace every occurrence of `secret` in `text` with `***`.
///
/// Also masks the base64 header form so a git trace echoing the
/// extra header does not leak the token.
pub fn redact(text: &str, secret: Option<&str>) -> String {
    let Some(secret) = secret.filter(|s| !s.is_empty()) else {
        return text.to_string();
    };

    text.replace(&basic_credentials(secret), MASK)
        .replace(secret, MASK)
}

/// Base64 payload for `Authorization: basic` using GitHub's token user.
pub fn basic_credentials(token: &str) -> String {
    STANDARD.encode(format!("x-access-token:{}", token))
}

/// Value for git's `http.extraheader` carrying the token.
pub fn auth_header(token: &str) -> String {
    format!("AUTHORIZATION: basic {}", basic_credentials(token))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn redact_masks_plain_and_encoded_token() {
        let token = "ghp_secret";
        let text = format!("push failed for {} with header {}", token, auth_header(token));
        let out = redact(&text, Some(token));
        assert!(!out.contains(token));
        assert!(!out.contains(&basic_credentials(token)));
        assert!(out.contains(MASK));
    }

    #[test]
    fn redact_without_secret_is_identity() {
        assert_eq!(redact("nothing here", None), "nothing here");
        assert_eq!(redact("nothing here", Some("")), "nothing here");
    }

    #[test]
    fn basic_credentials_uses_token_user() {
        assert_eq!(basic_credentials("abc"), "eC1hY2Nlc3MtdG9rZW46YWJj");
    }
}
