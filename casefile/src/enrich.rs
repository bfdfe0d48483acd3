//! Opportunistic enrichment from caller speech.
//!
//! Callers often volunteer the incident date or the amount they lost
//! without being asked. These extractors scan the spoken text for
//! such details so the record can carry them; they are best-effort
//! and never required, a miss just leaves the field empty.

use chrono::{Duration, NaiveDate};

const CURRENCY_WORDS: [&str; 7] = ["rupees", "rupee", "rs", "dollars", "dollar", "inr", "usd"];
const LOSS_WORDS: [&str; 5] = ["lost", "lose", "paid", "sent", "transferred"];

/// Pull a volunteered incident date out of spoken text, as an ISO
/// `YYYY-MM-DD` string.
///
/// Relative wording ("yesterday", "today") is resolved against the
/// supplied date; otherwise the text is scanned for an explicit ISO
/// date. Returns `None` when nothing date-like was said.
pub fn incident_date(text: &str, today: NaiveDate) -> Option<String> {
    let lower = text.to_lowercase();
    // "yesterday" contains "today", so it is checked first.
    if lower.contains("yesterday") {
        return Some((today - Duration::days(1)).format("%Y-%m-%d").to_string());
    }
    if lower.contains("today") {
        return Some(today.format("%Y-%m-%d").to_string());
    }
    find_iso_date(text)
}

fn find_iso_date(text: &str) -> Option<String> {
    let chars: Vec<char> = text.chars().collect();
    if chars.len() < 10 {
        return None;
    }
    for i in 0..=chars.len() - 10 {
        let window = &chars[i..i + 10];
        let shaped = window.iter().enumerate().all(|(j, c)| match j {
            4 | 7 => *c == '-',
            _ => c.is_ascii_digit(),
        });
        if !shaped {
            continue;
        }
        // Digit boundaries, so longer digit runs are not misread.
        if i > 0 && chars[i - 1].is_ascii_digit() {
            continue;
        }
        if chars.get(i + 10).is_some_and(|c| c.is_ascii_digit()) {
            continue;
        }
        let candidate: String = window.iter().collect();
        if NaiveDate::parse_from_str(&candidate, "%Y-%m-%d").is_ok() {
            return Some(candidate);
        }
    }
    None
}

/// Pull a volunteered monetary loss out of spoken text.
///
/// A number counts only with monetary context: a currency symbol
/// prefix, a currency word after it, or a loss verb before it. Bare
/// digit runs (contact numbers, dates) never match.
pub fn amount_lost(text: &str) -> Option<f64> {
    let words: Vec<&str> = text.split_whitespace().collect();

    for (i, raw) in words.iter().enumerate() {
        let token = trim_punct(raw);
        let (has_symbol, number) = match token.strip_prefix('₹').or_else(|| token.strip_prefix('$'))
        {
            Some(rest) => (true, rest),
            None => (false, token),
        };

        if number.is_empty()
            || !number.chars().next().is_some_and(|c| c.is_ascii_digit())
            || !number.chars().all(|c| c.is_ascii_digit() || c == ',' || c == '.')
        {
            continue;
        }

        let monetary = has_symbol
            || words
                .get(i + 1)
                .map(|w| trim_punct(w).to_lowercase())
                .is_some_and(|w| CURRENCY_WORDS.contains(&w.as_str()))
            || i
                .checked_sub(1)
                .and_then(|p| words.get(p))
                .map(|w| trim_punct(w).to_lowercase())
                .is_some_and(|w| LOSS_WORDS.contains(&w.as_str()));
        if !monetary {
            continue;
        }

        let cleaned: String = number
            .chars()
            .filter(|c| c.is_ascii_digit() || *c == '.')
            .collect();
        if let Ok(amount) = cleaned.parse::<f64>() {
            if amount > 0.0 {
                return Some(amount);
            }
        }
    }
    None
}

fn trim_punct(word: &str) -> &str {
    word.trim_matches(|c: char| matches!(c, ',' | '.' | ';' | ':' | '!' | '?' | '(' | ')'))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 1, 15).unwrap()
    }

    #[test]
    fn test_relative_dates_resolved() {
        assert_eq!(
            incident_date("it happened yesterday evening", today()),
            Some("2025-01-14".to_string())
        );
        assert_eq!(
            incident_date("this happened today", today()),
            Some("2025-01-15".to_string())
        );
    }

    #[test]
    fn test_explicit_iso_date() {
        assert_eq!(
            incident_date("the transfer went out on 2025-01-10.", today()),
            Some("2025-01-10".to_string())
        );
        // Shape alone is not enough; the date must be real.
        assert_eq!(incident_date("code 2025-13-45 appeared", today()), None);
    }

    #[test]
    fn test_no_date_volunteered() {
        assert_eq!(incident_date("I got a phishing email", today()), None);
    }

    #[test]
    fn test_amount_with_currency_word() {
        assert_eq!(amount_lost("I lost 5000 rupees to them"), Some(5000.0));
        assert_eq!(amount_lost("they took 1,200 dollars"), Some(1200.0));
    }

    #[test]
    fn test_amount_with_symbol() {
        assert_eq!(amount_lost("₹5,000 was debited"), Some(5000.0));
        assert_eq!(amount_lost("about $99.50 gone"), Some(99.5));
    }

    #[test]
    fn test_amount_after_loss_verb() {
        assert_eq!(amount_lost("I transferred 30000 before I realised"), Some(30000.0));
    }

    #[test]
    fn test_bare_numbers_ignored() {
        // Contact numbers and dates carry no monetary context.
        assert_eq!(amount_lost("my number is 9876543210"), None);
        assert_eq!(amount_lost("it was on 2025-01-10"), None);
        assert_eq!(amount_lost("I got a phishing email"), None);
    }
}
