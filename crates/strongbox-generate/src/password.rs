// SPDX-FileCopyrightText: 2026 Strongbox Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Random password and username generation.

use rand::Rng;
use rand::seq::SliceRandom;

use strongbox_core::PasswordParameters;

pub const MIN_PASSWORD_LENGTH: usize = 4;
pub const MAX_PASSWORD_LENGTH: usize = 200;
pub const USERNAME_LENGTH: usize = 20;

const UPPER: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ";
const LOWER: &[u8] = b"abcdefghijklmnopqrstuvwxyz";
const DIGITS: &[u8] = b"0123456789";
const SPECIAL: &[u8] = b"!\"#$%&'()*+,-./:;<=>?@[\\]^_`{|}~";

/// The character classes `params` enables.
fn classes(params: &PasswordParameters) -> Vec<&'static [u8]> {
    let mut classes = Vec::with_capacity(4);
    if !params.exclude_upper {
        classes.push(UPPER);
    }
    if !params.exclude_lower {
        classes.push(LOWER);
    }
    if !params.exclude_number {
        classes.push(DIGITS);
    }
    if params.include_special {
        classes.push(SPECIAL);
    }
    classes
}

/// Check length bounds and that at least one class is enabled.
pub fn validate(params: &PasswordParameters) -> Result<(), String> {
    if !(MIN_PASSWORD_LENGTH..=MAX_PASSWORD_LENGTH).contains(&params.length) {
        return Err(format!(
            "password length must be between {MIN_PASSWORD_LENGTH} and {MAX_PASSWORD_LENGTH}, got {}",
            params.length
        ));
    }
    if classes(params).is_empty() {
        return Err("password parameters exclude every character class".to_string());
    }
    Ok(())
}

/// Generate a password with at least one character from every enabled class.
pub fn generate_password(params: &PasswordParameters) -> Result<String, String> {
    validate(params)?;
    let classes = classes(params);
    let pool: Vec<u8> = classes.concat();
    let mut rng = rand::thread_rng();

    let mut chars: Vec<u8> = classes
        .iter()
        .map(|class| class[rng.gen_range(0..class.len())])
        .collect();
    while chars.len() < params.length {
        chars.push(pool[rng.gen_range(0..pool.len())]);
    }
    chars.shuffle(&mut rng);

    Ok(chars.into_iter().map(char::from).collect())
}

/// A random username of [`USERNAME_LENGTH`] ASCII letters.
pub fn generate_username() -> String {
    let letters: Vec<u8> = [UPPER, LOWER].concat();
    let mut rng = rand::thread_rng();
    (0..USERNAME_LENGTH)
        .map(|_| char::from(letters[rng.gen_range(0..letters.len())]))
        .collect()
}
