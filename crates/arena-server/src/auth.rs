//! Session token verification.
//!
//! Sessions are issued by an external provider; the server only needs
//! to turn the token a client presents into a [`SessionId`] or refuse it.

use arena_core::SessionId;

/// Resolves a presented token to a session.
pub trait SessionVerifier: Send + Sync + 'static {
    /// `None` refuses the connection.
    fn verify(&self, token: &SessionId) -> Option<SessionId>;
}

/// Longest accepted opaque token.
pub const MAX_TOKEN_LEN: usize = 128;

/// Accepts any well-formed opaque token as its own session id.
///
/// Well-formed: 1 to [`MAX_TOKEN_LEN`] characters from `[A-Za-z0-9_-]`.
#[derive(Debug, Clone, Copy, Default)]
pub struct OpaqueTokenVerifier;

impl SessionVerifier for OpaqueTokenVerifier {
    fn verify(&self, token: &SessionId) -> Option<SessionId> {
        let raw = token.as_str();
        let well_formed = !raw.is_empty()
            && raw.len() <= MAX_TOKEN_LEN
            && raw
                .bytes()
                .all(|b| b.is_ascii_alphanumeric() || b == b'_' || b == b'-');
        well_formed.then(|| token.clone())
    }
}
