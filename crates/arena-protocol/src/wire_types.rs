//! Wire constants.
//!
//! Every frame is one UTF-8 JSON object followed by `\n`. The first
//! frame a client sends must be a handshake (`hello` or `setNickname`);
//! everything after a successful `hello` is an arena event.

/// Current protocol version, announced in the server's `welcome` frame.
///
/// Bumped when a frame or event changes incompatibly.
pub const PROTOCOL_VERSION: u32 = 1;

/// Longest accepted line, excluding the terminator.
///
/// Large enough for a full board snapshot, small enough that one
/// connection cannot make the server buffer without bound.
pub const MAX_LINE_LEN: usize = 256 * 1024;

/// Check a raw line length against [`MAX_LINE_LEN`].
pub fn validate_line_len(len: usize) -> bool {
    len <= MAX_LINE_LEN
}
