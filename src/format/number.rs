use rust_decimal::{Decimal, RoundingStrategy};

/// Parse a pt-BR decimal text into a [`Decimal`].
///
/// Whitespace is stripped. When a comma is present it is the decimal
/// separator and periods are thousands grouping (`"1.234,50"` → `1234.5`);
/// with no comma a period is the decimal point (`"12.5"` → `12.5`).
///
/// Unparseable or empty input yields zero — bad numeric text is
/// data-loss-tolerant, not an error.
pub fn parse_locale_number(text: &str) -> Decimal {
    let cleaned: String = text.chars().filter(|c| !c.is_whitespace()).collect();
    if cleaned.is_empty() {
        return Decimal::ZERO;
    }
    let normalized = if cleaned.contains(',') {
        cleaned.replace('.', "").replace(',', ".")
    } else {
        cleaned
    };
    normalized.parse().unwrap_or(Decimal::ZERO)
}

/// Format a monetary value in the pt-BR convention with a fixed precision:
/// `R$ ` prefix, `.` thousands grouping, `,` decimal separator.
///
/// `format_currency(dec!(1234.5), 2)` → `"R$ 1.234,50"`.
pub fn format_currency(value: Decimal, decimals: u32) -> String {
    let negative = value.is_sign_negative();
    let grouped = group_fixed(value.abs(), decimals);
    if negative {
        format!("-R$ {grouped}")
    } else {
        format!("R$ {grouped}")
    }
}

/// Format a quantity in the pt-BR convention: thousands grouping, up to 10
/// fractional digits, trailing zeros stripped.
pub fn format_quantity(value: Decimal) -> String {
    let rounded = value
        .round_dp_with_strategy(10, RoundingStrategy::MidpointAwayFromZero)
        .normalize();
    let negative = rounded.is_sign_negative();
    let decimals = rounded.scale();
    let grouped = group_fixed(rounded.abs(), decimals);
    if negative { format!("-{grouped}") } else { grouped }
}

/// Canonical text for an editable numeric input: fixed precision, comma
/// decimal separator, no grouping. `dec!(12)` → `"12,00"`.
pub fn to_input_text(value: Decimal, decimals: u32) -> String {
    to_xml_number(value, decimals).replace('.', ",")
}

/// Fixed-point, dot-separated numeric text for exported XML fields.
/// Rounds half away from zero. `dec!(0)` → `"0.00"`.
pub fn to_xml_number(value: Decimal, decimals: u32) -> String {
    let rounded = value.round_dp_with_strategy(decimals, RoundingStrategy::MidpointAwayFromZero);
    let prec = decimals as usize;
    format!("{rounded:.prec$}")
}

/// Fixed-point rendering with `.` thousands grouping and `,` decimal
/// separator (no sign, no prefix).
fn group_fixed(value: Decimal, decimals: u32) -> String {
    let fixed = to_xml_number(value, decimals);
    let (int_part, frac_part) = match fixed.split_once('.') {
        Some((i, f)) => (i, Some(f)),
        None => (fixed.as_str(), None),
    };

    let digits: Vec<char> = int_part.chars().collect();
    let mut grouped = String::with_capacity(fixed.len() + digits.len() / 3);
    for (pos, ch) in digits.iter().enumerate() {
        if pos > 0 && (digits.len() - pos) % 3 == 0 {
            grouped.push('.');
        }
        grouped.push(*ch);
    }

    match frac_part {
        Some(f) => format!("{grouped},{f}"),
        None => grouped,
    }
}
