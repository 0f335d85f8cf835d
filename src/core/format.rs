/// Whole-euro rendering with comma thousands separators, e.g. `€ 301,354`.
pub fn format_euro(amount: f64) -> String {
    if !amount.is_finite() {
        return format!("€ {amount}");
    }
    let rounded = amount.round();
    let sign = if rounded < 0.0 { "-" } else { "" };
    let digits = format!("{:.0}", rounded.abs());

    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (idx, ch) in digits.chars().enumerate() {
        if idx > 0 && (digits.len() - idx) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    format!("€ {sign}{grouped}")
}
