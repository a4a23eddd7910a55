use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

/// Minimum accepted backup password length, in characters
pub const MIN_PASSWORD_LEN: usize = 6;

static HAS_LETTER: Lazy<Regex> = Lazy::new(|| Regex::new(r"[A-Za-z]").unwrap());
static HAS_DIGIT: Lazy<Regex> = Lazy::new(|| Regex::new(r"[0-9]").unwrap());

/// The first password rule a candidate fails
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PasswordRule {
    TooShort,
    MissingLetter,
    MissingDigit,
}

impl std::fmt::Display for PasswordRule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PasswordRule::TooShort => {
                write!(f, "must be at least {} characters", MIN_PASSWORD_LEN)
            }
            PasswordRule::MissingLetter => f.write_str("must contain a letter"),
            PasswordRule::MissingDigit => f.write_str("must contain a digit"),
        }
    }
}

/// Check a backup password against the policy.
pub fn check_password(password: &str) -> Result<(), PasswordRule> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(PasswordRule::TooShort);
    }
    if !HAS_LETTER.is_match(password) {
        return Err(PasswordRule::MissingLetter);
    }
    if !HAS_DIGIT.is_match(password) {
        return Err(PasswordRule::MissingDigit);
    }
    Ok(())
}

/// Shape check on the unwrapped `data` value, before typed decoding.
pub fn check_structure(data: &Value) -> Result<(), String> {
    let Some(obj) = data.as_object() else {
        return Err("backup data is not an object".to_string());
    };
    match obj.get("projects") {
        Some(Value::Array(_)) => {}
        Some(_) => return Err("'projects' is not a list".to_string()),
        None => return Err("'projects' is missing".to_string()),
    }
    if let Some(filters) = obj.get("filters")
        && !filters.is_object()
    {
        return Err("'filters' is not an object".to_string());
    }
    if let Some(pf) = obj.get("projectFilters")
        && !pf.is_object()
    {
        return Err("'projectFilters' is not an object".to_string());
    }
    Ok(())
}
