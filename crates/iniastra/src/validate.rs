//! Field-level checks shared by the catalog, admissions, and accounts validators.

/// Mirrors `^\S+@\S+\.\S+$`.
pub(crate) fn looks_like_email(value: &str) -> bool {
    if value.is_empty() || value.chars().any(char::is_whitespace) {
        return false;
    }

    value.char_indices().any(|(at, ch)| {
        if ch != '@' || at == 0 {
            return false;
        }
        let domain = &value[at + 1..];
        domain
            .char_indices()
            .any(|(dot, c)| c == '.' && dot > 0 && dot + 1 < domain.len())
    })
}

/// Mirrors `^https?:\/\/[^\s$.?#].[^\s]*$`.
pub(crate) fn looks_like_url(value: &str) -> bool {
    let rest = match value
        .strip_prefix("https://")
        .or_else(|| value.strip_prefix("http://"))
    {
        Some(rest) => rest,
        None => return false,
    };

    let mut chars = rest.chars();
    match chars.next() {
        Some(first) if !first.is_whitespace() && !matches!(first, '$' | '.' | '?' | '#') => {}
        _ => return false,
    }

    match chars.next() {
        Some(second) if !second.is_whitespace() => {}
        _ => return false,
    }

    chars.all(|c| !c.is_whitespace())
}

pub(crate) fn trimmed(value: Option<String>) -> Option<String> {
    value
        .map(|raw| raw.trim().to_string())
        .filter(|raw| !raw.is_empty())
}

pub(crate) fn check_max_chars(errors: &mut Vec<String>, value: Option<&str>, max: usize, message: &str) {
    if value.map(|text| text.chars().count() > max).unwrap_or(false) {
        errors.push(message.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn email_shapes() {
        assert!(looks_like_email("student@example.com"));
        assert!(looks_like_email("a@b.co"));
        assert!(!looks_like_email("student@example"));
        assert!(!looks_like_email("@example.com"));
        assert!(!looks_like_email("student @example.com"));
        assert!(!looks_like_email("student@example."));
    }

    #[test]
    fn url_shapes() {
        assert!(looks_like_url("https://www.ethz.ch"));
        assert!(looks_like_url("http://localhost:5173/path"));
        assert!(!looks_like_url("ftp://example.com"));
        assert!(!looks_like_url("https://.example.com"));
        assert!(!looks_like_url("https://example .com"));
        assert!(!looks_like_url("https://x"));
    }
}
