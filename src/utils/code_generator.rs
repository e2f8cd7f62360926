use rand::Rng;

/// 生成指定字节数的十六进制大写代码
fn generate_hex_code(byte_len: usize) -> String {
    let mut rng = rand::thread_rng();
    (0..byte_len)
        .map(|_| format!("{:02X}", rng.gen_range(0..=255u8)))
        .collect()
}

/// 推荐码：5字节 -> 10个十六进制字符
pub fn generate_referral_code() -> String {
    generate_hex_code(5)
}

/// 代金券码：7字节 -> 14个十六进制字符
pub fn generate_voucher_code() -> String {
    generate_hex_code(7)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_referral_code_shape() {
        let code = generate_referral_code();
        assert_eq!(code.len(), 10);
        assert!(code.chars().all(|c| c.is_ascii_hexdigit()));
        assert!(!code.chars().any(|c| c.is_ascii_lowercase()));
    }

    #[test]
    fn test_voucher_code_shape() {
        let code = generate_voucher_code();
        assert_eq!(code.len(), 14);
        assert!(code.chars().all(|c| c.is_ascii_hexdigit()));
        assert!(!code.chars().any(|c| c.is_ascii_lowercase()));
    }

    #[test]
    fn test_generated_codes_vary() {
        // 理论上可能相同，但概率很小；主要确保生成器不会卡死
        let codes: Vec<String> = (0..8).map(|_| generate_voucher_code()).collect();
        let first = &codes[0];
        assert!(codes.iter().any(|c| c != first) || codes.len() == 1);
    }
}
