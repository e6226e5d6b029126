//! Cooking-time parsing and display
//!
//! Recipe times arrive as free text from editors and from LLM output:
//! "1 hour 30 mins", "1 jam 30 minit", "45 min", "1.5 hours", "PT1H30M",
//! "90", "1-2 hours". They are stored as whole minutes.

/// Upper bound for any parsed duration (one week)
const MAX_MINUTES: f64 = 7.0 * 24.0 * 60.0;

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Number(f64),
    Word(String),
    RangeDash,
}

fn tokenize(text: &str) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut chars = text.chars().peekable();

    while let Some(&c) = chars.peek() {
        if c.is_ascii_digit() || ((c == '.' || c == ',') && !tokens.is_empty()) {
            let mut number = String::new();
            while let Some(&d) = chars.peek() {
                if d.is_ascii_digit() {
                    number.push(d);
                } else if d == '.' || d == ',' {
                    number.push('.');
                } else {
                    break;
                }
                chars.next();
            }
            if let Ok(n) = number.trim_matches('.').parse::<f64>() {
                tokens.push(Token::Number(n));
            }
        } else if c.is_alphabetic() {
            let mut word = String::new();
            while let Some(&d) = chars.peek() {
                if d.is_alphabetic() {
                    word.extend(d.to_lowercase());
                    chars.next();
                } else {
                    break;
                }
            }
            tokens.push(Token::Word(word));
        } else if c == '-' || c == '–' || c == '~' {
            tokens.push(Token::RangeDash);
            chars.next();
        } else if c == '½' {
            tokens.push(Token::Number(0.5));
            chars.next();
        } else {
            chars.next();
        }
    }

    tokens
}

/// Minutes per unit word, English and Malay
fn unit_minutes(word: &str) -> Option<f64> {
    match word {
        "s" | "sec" | "secs" | "second" | "seconds" | "saat" => Some(1.0 / 60.0),
        "m" | "min" | "mins" | "minute" | "minutes" | "minit" | "mnt" => Some(1.0),
        "h" | "hr" | "hrs" | "hour" | "hours" | "jam" => Some(60.0),
        "d" | "day" | "days" | "hari" => Some(24.0 * 60.0),
        _ => None,
    }
}

fn is_range_word(word: &str) -> bool {
    matches!(word, "to" | "or" | "hingga" | "sehingga" | "atau" | "ke")
}

fn is_half_word(word: &str) -> bool {
    matches!(word, "half" | "setengah" | "separuh")
}

/// Parse free-text duration into whole minutes
///
/// Ranges resolve to their upper bound. A bare number is minutes.
/// Returns `None` when no quantity can be found.
///
/// # Examples
///
/// ```
/// use resepi_common::duration::parse_minutes;
///
/// assert_eq!(parse_minutes("1 hour 30 mins"), Some(90));
/// assert_eq!(parse_minutes("1 jam 30 minit"), Some(90));
/// assert_eq!(parse_minutes("PT1H30M"), Some(90));
/// assert_eq!(parse_minutes("1-2 hours"), Some(120));
/// assert_eq!(parse_minutes("45"), Some(45));
/// assert_eq!(parse_minutes("overnight"), None);
/// ```
pub fn parse_minutes(text: &str) -> Option<u32> {
    let tokens = tokenize(text);

    let mut total = 0.0f64;
    let mut found = false;
    let mut pending: Option<f64> = None;
    let mut in_range = false;
    let mut last_unit: Option<f64> = None;

    for token in tokens {
        match token {
            Token::Number(n) => {
                if in_range && pending.is_some() {
                    // "1-2 hours": keep the upper bound
                    pending = Some(n);
                } else {
                    if let Some(bare) = pending.take() {
                        // Number without unit followed by another number
                        total += bare * last_unit.map(|u| next_smaller_unit(u)).unwrap_or(1.0);
                        found = true;
                    }
                    pending = Some(n);
                }
                in_range = false;
            }
            Token::RangeDash => {
                if pending.is_some() {
                    in_range = true;
                }
            }
            Token::Word(word) => {
                if let Some(mult) = unit_minutes(&word) {
                    if let Some(n) = pending.take() {
                        total += n * mult;
                        found = true;
                        last_unit = Some(mult);
                    }
                    in_range = false;
                } else if is_range_word(&word) {
                    if pending.is_some() {
                        in_range = true;
                    }
                } else if is_half_word(&word) {
                    match (pending, last_unit) {
                        // "half an hour", "setengah jam"
                        (None, None) => pending = Some(0.5),
                        // "1 jam setengah"
                        (None, Some(unit)) => {
                            total += 0.5 * unit;
                            found = true;
                        }
                        // "1 and a half hours"
                        (Some(n), _) => pending = Some(n + 0.5),
                    }
                }
            }
        }
    }

    if let Some(n) = pending {
        total += n * last_unit.map(next_smaller_unit).unwrap_or(1.0);
        found = true;
    }

    if !found || !total.is_finite() || total < 0.0 {
        return None;
    }

    Some(total.min(MAX_MINUTES).round() as u32)
}

/// Unit implied for a trailing bare number ("1 jam 30" → 30 minutes)
fn next_smaller_unit(unit: f64) -> f64 {
    if unit >= 24.0 * 60.0 {
        60.0
    } else {
        1.0
    }
}

/// Format minutes for display: "45 min", "1 hr", "1 hr 30 min"
///
/// # Examples
///
/// ```
/// use resepi_common::duration::format_minutes;
///
/// assert_eq!(format_minutes(45), "45 min");
/// assert_eq!(format_minutes(60), "1 hr");
/// assert_eq!(format_minutes(90), "1 hr 30 min");
/// ```
pub fn format_minutes(minutes: i64) -> String {
    if minutes < 60 {
        return format!("{} min", minutes.max(0));
    }

    let hours = minutes / 60;
    let mins = minutes % 60;
    if mins == 0 {
        format!("{} hr", hours)
    } else {
        format!("{} hr {} min", hours, mins)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_units() {
        assert_eq!(parse_minutes("45 min"), Some(45));
        assert_eq!(parse_minutes("45 minutes"), Some(45));
        assert_eq!(parse_minutes("2 hours"), Some(120));
        assert_eq!(parse_minutes("2 jam"), Some(120));
        assert_eq!(parse_minutes("90 saat"), Some(2));
    }

    #[test]
    fn test_decimal_hours() {
        assert_eq!(parse_minutes("1.5 hours"), Some(90));
        assert_eq!(parse_minutes("1,5 jam"), Some(90));
    }

    #[test]
    fn test_half_words() {
        assert_eq!(parse_minutes("half an hour"), Some(30));
        assert_eq!(parse_minutes("setengah jam"), Some(30));
        assert_eq!(parse_minutes("1 jam setengah"), Some(90));
        assert_eq!(parse_minutes("1 and a half hours"), Some(90));
    }

    #[test]
    fn test_ranges_take_upper_bound() {
        assert_eq!(parse_minutes("20-25 min"), Some(25));
        assert_eq!(parse_minutes("20 to 25 minutes"), Some(25));
        assert_eq!(parse_minutes("1 hingga 2 jam"), Some(120));
    }

    #[test]
    fn test_trailing_bare_number_is_minutes_after_hours() {
        assert_eq!(parse_minutes("1 jam 30"), Some(90));
        assert_eq!(parse_minutes("1h30"), Some(90));
    }

    #[test]
    fn test_iso_duration() {
        assert_eq!(parse_minutes("PT45M"), Some(45));
        assert_eq!(parse_minutes("PT2H"), Some(120));
    }

    #[test]
    fn test_unparseable_text() {
        assert_eq!(parse_minutes(""), None);
        assert_eq!(parse_minutes("semalaman"), None);
        assert_eq!(parse_minutes("as needed"), None);
    }

    #[test]
    fn test_caps_absurd_values() {
        assert_eq!(parse_minutes("100 days"), Some(MAX_MINUTES as u32));
    }

    #[test]
    fn test_format_minutes() {
        assert_eq!(format_minutes(0), "0 min");
        assert_eq!(format_minutes(5), "5 min");
        assert_eq!(format_minutes(120), "2 hr");
        assert_eq!(format_minutes(135), "2 hr 15 min");
    }
}
