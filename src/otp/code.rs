use rand::{rngs::OsRng, Rng};

/// Generate a numeric code of `length` digits drawn from the OS RNG.
///
/// Leading zeroes are kept, so every code has exactly `length` characters.
#[must_use]
pub fn generate_code(length: usize) -> String {
    let mut rng = OsRng;
    (0..length)
        .map(|_| char::from(b'0' + rng.gen_range(0..10u8)))
        .collect()
}

/// Compare a submitted code with the stored one without short-circuiting on
/// the first differing byte.
#[must_use]
pub fn codes_match(expected: &str, submitted: &str) -> bool {
    let expected = expected.as_bytes();
    let submitted = submitted.as_bytes();
    if expected.len() != submitted.len() {
        return false;
    }
    expected
        .iter()
        .zip(submitted)
        .fold(0u8, |acc, (a, b)| acc | (a ^ b))
        == 0
}
