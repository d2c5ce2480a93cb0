use rand::{Rng, distributions::Alphanumeric};

const SYNTHETIC_PREFIX: &str = "nx-";

pub fn random_local_part(len: usize) -> String {
    let length = len.clamp(6, 32);
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(length)
        .map(|byte| char::from(byte).to_ascii_lowercase())
        .collect()
}

/// A recipient at `domain` that no real mailbox plausibly owns, distinct
/// from `target`.
pub fn synthetic_address(target: &str, domain: &str) -> String {
    loop {
        let candidate = format!("{SYNTHETIC_PREFIX}{}@{domain}", random_local_part(20));
        if !candidate.eq_ignore_ascii_case(target) {
            return candidate;
        }
    }
}
