use rand::{Rng, distr::Alphanumeric};

/// Length of a signup confirmation code.
const CODE_LEN: usize = 24;

/// Generates a random alphanumeric confirmation code.
pub fn generate_code() -> String {
    rand::rng()
        .sample_iter(Alphanumeric)
        .take(CODE_LEN)
        .map(char::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_are_alphanumeric_and_sized() {
        let code = generate_code();
        assert_eq!(code.len(), CODE_LEN);
        assert!(code.chars().all(|c| c.is_ascii_alphanumeric()));
    }

    #[test]
    fn codes_differ_between_calls() {
        assert_ne!(generate_code(), generate_code());
    }
}
