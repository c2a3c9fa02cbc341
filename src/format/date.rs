/// Reorder the leading `YYYY-MM-DD` of an ISO-ish timestamp to `DD/MM/YYYY`.
///
/// Only the first 10 characters are considered. When the date component does
/// not split into exactly three non-empty parts the input is returned
/// unchanged.
pub fn format_date_local(text: &str) -> String {
    if text.is_empty() {
        return String::new();
    }
    let date_part: String = text.chars().take(10).collect();
    let parts: Vec<&str> = date_part.split('-').collect();
    match parts.as_slice() {
        [y, m, d] if !y.is_empty() && !m.is_empty() && !d.is_empty() => {
            format!("{d}/{m}/{y}")
        }
        _ => text.to_string(),
    }
}
