//! PKCE (Proof Key for Code Exchange) helpers for the web-server flow
//!
//! Implements RFC 7636 `S256` challenges and random CSRF state tokens.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use rand::RngCore;
use sha2::{Digest, Sha256};

fn random_token() -> String {
    let mut bytes = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

/// BASE64URL(SHA256(verifier))
pub fn generate_code_challenge(verifier: &str) -> String {
    let hash = Sha256::digest(verifier.as_bytes());
    URL_SAFE_NO_PAD.encode(hash)
}

/// Random state token (43 URL-safe characters).
pub fn generate_state() -> String {
    random_token()
}

/// Constant-time comparison of the state sent and the state received.
pub fn validate_state(expected: &str, actual: &str) -> bool {
    if expected.len() != actual.len() {
        return false;
    }
    expected.bytes().zip(actual.bytes()).fold(0u8, |acc, (a, b)| acc | (a ^ b)) == 0
}

/// Verifier/challenge pair plus the CSRF state for one authorization round.
#[derive(Debug, Clone)]
pub struct PkceChallenge {
    pub code_verifier: String,
    pub code_challenge: String,
    pub state: String,
}

impl PkceChallenge {
    pub fn generate() -> Self {
        let code_verifier = random_token();
        let code_challenge = generate_code_challenge(&code_verifier);
        Self { code_verifier, code_challenge, state: generate_state() }
    }

    pub fn challenge_method(&self) -> &'static str {
        "S256"
    }
}
