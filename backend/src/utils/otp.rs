use rand::Rng;

/// Number of digits in a generated one-time password.
pub const OTP_LENGTH: usize = 6;

/// Generates a random 6-digit numeric one-time password.
///
/// Values below 100000 are zero-padded so the code always has exactly
/// six characters.
pub fn generate_otp() -> String {
    let code: u32 = rand::thread_rng().gen_range(0..1_000_000);
    format!("{:0width$}", code, width = OTP_LENGTH)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_otp_is_six_numeric_digits() {
        for _ in 0..200 {
            let otp = generate_otp();
            assert_eq!(otp.len(), OTP_LENGTH);
            assert!(otp.chars().all(|c| c.is_ascii_digit()), "bad otp: {otp}");
        }
    }
}
