//! Secret strength validation module
//!
//! Validates the HS256 signing secret so a guessable value never reaches
//! production.

const MIN_SECRET_LENGTH: usize = 32; // 256 bits minimum
const RECOMMENDED_SECRET_LENGTH: usize = 64; // 512 bits recommended

/// Secret strength classification
#[derive(Debug, PartialEq, Eq)]
pub enum SecretStrength {
    /// Weak secret - REJECT
    Weak,
    /// Acceptable secret - WARN
    Acceptable,
    /// Strong secret - OK
    Strong,
}

/// Classify an HS256 secret
///
/// **Criteria**:
/// - Minimum 32 bytes (256 bits)
/// - Recommended 64 bytes (512 bits)
/// - Shannon entropy > 4.0 bits/byte
/// - No runs of four repeated or sequential bytes
pub fn validate_secret_strength(secret: &str) -> SecretStrength {
    let bytes = secret.as_bytes();

    if bytes.len() < MIN_SECRET_LENGTH {
        return SecretStrength::Weak;
    }

    let entropy = shannon_entropy(bytes);
    if entropy < 4.0 || has_obvious_patterns(bytes) {
        return SecretStrength::Weak;
    }

    if bytes.len() >= RECOMMENDED_SECRET_LENGTH && entropy >= 5.0 {
        SecretStrength::Strong
    } else {
        SecretStrength::Acceptable
    }
}

/// Bits per byte (0-8 scale)
fn shannon_entropy(data: &[u8]) -> f64 {
    let mut freq = [0u32; 256];
    let len = data.len() as f64;

    for &byte in data {
        freq[byte as usize] += 1;
    }

    freq.iter()
        .filter(|&&count| count > 0)
        .map(|&count| {
            let p = count as f64 / len;
            -p * p.log2()
        })
        .sum()
}

fn has_obvious_patterns(data: &[u8]) -> bool {
    let mut repeated = 1;
    let mut sequential = 1;
    for window in data.windows(2) {
        repeated = if window[0] == window[1] { repeated + 1 } else { 1 };
        sequential = if window[1] as i16 - window[0] as i16 == 1 {
            sequential + 1
        } else {
            1
        };
        if repeated >= 4 || sequential >= 4 {
            return true;
        }
    }
    false
}
