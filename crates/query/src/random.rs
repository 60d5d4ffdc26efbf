//! URL-safe random tokens for salts and ancillary identifiers.

use rand::RngCore;
use rand::rngs::OsRng;

/// Token alphabet; every character encodes 6 bits.
pub const ALPHABET: &[u8; 64] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789_-";
/// Bits of entropy carried by a token.
pub const TOKEN_BITS: usize = 512;
/// Characters in a token: 512 bits at 6 bits per character, rounded up.
pub const TOKEN_LENGTH: usize = TOKEN_BITS.div_ceil(6);

/// Generate a random 85 character token over [`ALPHABET`].
///
/// ```
/// let token = tabula_query::random_string();
/// assert_eq!(token.len(), 85);
/// ```
pub fn random_string() -> String {
    let mut rng = OsRng;
    token_from(|| rng.next_u32())
}

/// Build a token from a source of 32-bit draws.
///
/// Each draw yields five characters taken from its top 30 bits (shifts 26,
/// 20, 14, 8 and 2); the lowest two bits are discarded.
fn token_from(mut next: impl FnMut() -> u32) -> String {
    let mut token = String::with_capacity(TOKEN_LENGTH);
    while token.len() < TOKEN_LENGTH {
        let draw = next();
        for shift in [26, 20, 14, 8, 2] {
            if token.len() == TOKEN_LENGTH {
                break;
            }
            token.push(char::from(ALPHABET[((draw >> shift) & 0x3F) as usize]));
        }
    }
    token
}
