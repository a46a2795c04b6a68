//! Currency formatting for budget messages.
//!
//! Amounts are shown in rupees with Indian digit grouping (`₹1,00,000.00`):
//! the last three integer digits form one group, the rest are grouped in
//! pairs.

/// Currency symbol prefixed to every formatted amount.
pub const CURRENCY_SYMBOL: &str = "₹";

/// Format an amount as rupees with two decimals and Indian digit grouping.
pub fn format_inr(amount: f64) -> String {
    let cents = (amount * 100.0).round();
    let negative = cents < 0.0;
    let cents = cents.abs() as u64;

    let whole = (cents / 100).to_string();
    let fraction = cents % 100;

    let grouped = group_indian(&whole);
    let sign = if negative { "-" } else { "" };
    format!("{sign}{CURRENCY_SYMBOL}{grouped}.{fraction:02}")
}

fn group_indian(digits: &str) -> String {
    if digits.len() <= 3 {
        return digits.to_string();
    }

    let (head, tail) = digits.split_at(digits.len() - 3);
    let mut groups: Vec<&str> = Vec::new();
    let mut end = head.len();
    while end > 0 {
        let start = end.saturating_sub(2);
        groups.push(&head[start..end]);
        end = start;
    }
    groups.reverse();

    format!("{},{tail}", groups.join(","))
}
