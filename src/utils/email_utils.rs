use once_cell::sync::Lazy;
use regex::Regex;

const MAX_EMAIL_LEN: usize = 254;
const MAX_LOCAL_LEN: usize = 64;

static EMAIL_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^[a-z0-9!#$%&'*+=?^_`{|}~-]+(?:\.[a-z0-9!#$%&'*+=?^_`{|}~-]+)*@(?:[a-z0-9](?:[a-z0-9-]{0,61}[a-z0-9])?\.)+[a-z]{2,63}$",
    )
    .expect("email regex is valid")
});

/// Characters that may appear anywhere in an email address. Everything else is dropped.
fn is_email_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || "!#$%&'*+-=?^_`{|}~@.[]".contains(c)
}

/// Trims, strips characters that cannot appear in an address, and lowercases.
pub fn normalize_email(raw: &str) -> String {
    raw.trim()
        .chars()
        .filter(|c| is_email_char(*c))
        .collect::<String>()
        .to_ascii_lowercase()
}

/// Grammar check on an already normalized address.
pub fn is_valid_email(email: &str) -> bool {
    if email.len() > MAX_EMAIL_LEN {
        return false;
    }
    match email.split_once('@') {
        Some((local, _)) if local.len() > MAX_LOCAL_LEN => false,
        Some(_) => EMAIL_REGEX.is_match(email),
        None => false,
    }
}
