//! AD password operations using unicodePwd attribute encoding.
//!
//! Active Directory takes passwords through `unicodePwd`: the password is
//! wrapped in double quotes and encoded as UTF-16LE. Writes are only
//! accepted over an encrypted connection.

use rand::rngs::OsRng;
use rand::seq::SliceRandom;
use rand::Rng;
use tracing::instrument;

use dirsync_connector::error::{ConnectorError, ConnectorResult};

const LOWER: &[u8] = b"abcdefghijkmnopqrstuvwxyz";
const UPPER: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ";
const DIGITS: &[u8] = b"23456789";
const SYMBOLS: &[u8] = b"!@#$%^&*-_=+";

/// Encode a plaintext password for AD's unicodePwd attribute.
///
/// # Errors
/// Returns an error if the password is empty.
#[instrument(skip(password))]
pub fn encode_ad_password(password: &str) -> ConnectorResult<Vec<u8>> {
    if password.is_empty() {
        return Err(ConnectorError::InvalidData {
            message: "password cannot be empty".to_string(),
        });
    }

    let quoted = format!("\"{password}\"");
    Ok(quoted.encode_utf16().flat_map(u16::to_le_bytes).collect())
}

/// Reject password writes over a plain connection.
pub fn validate_password_connection(use_ssl: bool) -> ConnectorResult<()> {
    if !use_ssl {
        return Err(ConnectorError::invalid_config(
            "LDAPS connection required for unicodePwd writes",
        ));
    }
    Ok(())
}

/// Generate a random password that satisfies AD complexity rules.
///
/// The result always holds at least one lowercase letter, uppercase letter,
/// digit and symbol. Look-alike characters (`l`, `I`, `O`, `0`, `1`) are excluded.
pub fn generate_password(length: usize) -> String {
    let length = length.max(8);
    let classes = [LOWER, UPPER, DIGITS, SYMBOLS];
    let all: Vec<u8> = classes.concat();
    let mut rng = OsRng;

    let mut chars: Vec<u8> = classes
        .iter()
        .map(|class| class[rng.gen_range(0..class.len())])
        .collect();
    while chars.len() < length {
        chars.push(all[rng.gen_range(0..all.len())]);
    }
    chars.shuffle(&mut rng);

    chars.into_iter().map(char::from).collect()
}
