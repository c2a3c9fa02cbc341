/// Retain only ASCII decimal digits.
pub fn digits_only(text: &str) -> String {
    text.chars().filter(|c| c.is_ascii_digit()).collect()
}

/// Progressively apply the CNPJ punctuation pattern `NN.NNN.NNN/NNNN-NN`
/// as digits accumulate. Input beyond 14 digits is truncated; non-digits
/// are filtered out first.
pub fn mask_cnpj(text: &str) -> String {
    let d: String = digits_only(text).chars().take(14).collect();
    match d.len() {
        0..=2 => d,
        3..=5 => format!("{}.{}", &d[..2], &d[2..]),
        6..=8 => format!("{}.{}.{}", &d[..2], &d[2..5], &d[5..]),
        9..=12 => format!("{}.{}.{}/{}", &d[..2], &d[2..5], &d[5..8], &d[8..]),
        _ => format!(
            "{}.{}.{}/{}-{}",
            &d[..2],
            &d[2..5],
            &d[5..8],
            &d[8..12],
            &d[12..]
        ),
    }
}

/// True iff the input contains exactly 14 digits.
///
/// Length-only check — the CNPJ check-digit algorithm is intentionally not
/// applied. Known limitation carried over from the tool's contract.
pub fn is_valid_cnpj14(text: &str) -> bool {
    digits_only(text).len() == 14
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn digits_only_filters() {
        assert_eq!(digits_only("12.345.678/0001-95"), "12345678000195");
        assert_eq!(digits_only("abc"), "");
        assert_eq!(digits_only(""), "");
    }

    #[test]
    fn mask_progressive() {
        assert_eq!(mask_cnpj(""), "");
        assert_eq!(mask_cnpj("12"), "12");
        assert_eq!(mask_cnpj("123"), "12.3");
        assert_eq!(mask_cnpj("12345"), "12.345");
        assert_eq!(mask_cnpj("123456"), "12.345.6");
        assert_eq!(mask_cnpj("12345678"), "12.345.678");
        assert_eq!(mask_cnpj("123456789"), "12.345.678/9");
        // 11 digits: partial punctuation, no trailing separator.
        assert_eq!(mask_cnpj("12345678000"), "12.345.678/000");
        assert_eq!(mask_cnpj("1234567800019"), "12.345.678/0001-9");
        assert_eq!(mask_cnpj("12345678000195"), "12.345.678/0001-95");
    }

    #[test]
    fn mask_truncates_past_14() {
        assert_eq!(mask_cnpj("12345678000195999"), "12.345.678/0001-95");
    }

    #[test]
    fn cnpj14_length_only() {
        assert!(is_valid_cnpj14("12345678000195"));
        assert!(is_valid_cnpj14("12.345.678/0001-95"));
        assert!(!is_valid_cnpj14("1234567800019"));
        // No checksum: an obviously fake 14-digit value still passes.
        assert!(is_valid_cnpj14("00000000000000"));
    }
}
