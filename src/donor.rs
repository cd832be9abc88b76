use anyhow::{Result, anyhow};

pub const MAX_EMAIL_LEN: usize = 320;
pub const MAX_EMAIL_LOCAL_LEN: usize = 64;
pub const MAX_NAME_LEN: usize = 128;
pub const MAX_THOUGHTS_LEN: usize = 2_000;
pub const MAX_DATE_LEN: usize = 64;
pub const MAX_CONTRIBUTION_AMOUNT: f64 = 1_000_000_000.0;

const _: [(); MAX_EMAIL_LEN - MAX_EMAIL_LOCAL_LEN] = [(); MAX_EMAIL_LEN - MAX_EMAIL_LOCAL_LEN];

/// Normalizes an email to its canonical lookup form (trimmed, lowercased)
/// after checking it against standard address grammar.
pub fn normalize_email(value: &str) -> Result<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(anyhow!("email cannot be empty"));
    }
    if trimmed.len() > MAX_EMAIL_LEN {
        return Err(anyhow!("email exceeds {MAX_EMAIL_LEN} character limit"));
    }
    if trimmed.chars().any(|ch| ch.is_whitespace() || ch.is_control()) {
        return Err(anyhow!("email cannot contain whitespace"));
    }

    let (local, domain) = trimmed
        .split_once('@')
        .ok_or_else(|| anyhow!("email must contain a single '@'"))?;
    if domain.contains('@') {
        return Err(anyhow!("email must contain a single '@'"));
    }
    if local.is_empty() || local.len() > MAX_EMAIL_LOCAL_LEN {
        return Err(anyhow!(
            "email local part must be 1 to {MAX_EMAIL_LOCAL_LEN} characters"
        ));
    }
    if local.starts_with('.') || local.ends_with('.') || local.contains("..") {
        return Err(anyhow!("email local part has misplaced dots"));
    }

    if !domain.contains('.') {
        return Err(anyhow!("email domain must contain a dot"));
    }
    for label in domain.split('.') {
        if label.is_empty() {
            return Err(anyhow!("email domain has an empty label"));
        }
        if label.starts_with('-') || label.ends_with('-') {
            return Err(anyhow!("email domain label cannot start or end with '-'"));
        }
        if !label.chars().all(|ch| ch.is_ascii_alphanumeric() || ch == '-') {
            return Err(anyhow!("email domain contains invalid characters"));
        }
    }

    Ok(trimmed.to_ascii_lowercase())
}

pub fn canonicalize_name(value: &str) -> Result<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(anyhow!("name cannot be empty"));
    }
    if trimmed.chars().count() > MAX_NAME_LEN {
        return Err(anyhow!("name exceeds {MAX_NAME_LEN} character limit"));
    }
    Ok(trimmed.to_string())
}

pub fn validate_amount(value: f64) -> Result<f64> {
    if !value.is_finite() {
        return Err(anyhow!("amount must be a finite number"));
    }
    if value <= 0.0 {
        return Err(anyhow!("amount must be positive"));
    }
    if value > MAX_CONTRIBUTION_AMOUNT {
        return Err(anyhow!(
            "amount exceeds {MAX_CONTRIBUTION_AMOUNT} defensive limit"
        ));
    }
    Ok(value)
}

pub fn validate_thoughts(value: &str) -> Result<String> {
    if value.chars().count() > MAX_THOUGHTS_LEN {
        return Err(anyhow!(
            "thoughts exceed {MAX_THOUGHTS_LEN} character limit"
        ));
    }
    Ok(value.to_string())
}

/// Accepts the caller-supplied contribution date if it parses as ISO-8601
/// (RFC 3339, bare date, or naive datetime). The string is stored verbatim;
/// the caller's clock is trusted.
pub fn validate_contribution_date(value: &str) -> Result<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(anyhow!("date cannot be empty"));
    }
    if trimmed.len() > MAX_DATE_LEN {
        return Err(anyhow!("date exceeds {MAX_DATE_LEN} character limit"));
    }

    let parses = chrono::DateTime::parse_from_rfc3339(trimmed).is_ok()
        || chrono::NaiveDate::parse_from_str(trimmed, "%Y-%m-%d").is_ok()
        || chrono::NaiveDateTime::parse_from_str(trimmed, "%Y-%m-%dT%H:%M:%S%.f").is_ok();
    if !parses {
        return Err(anyhow!("date must be an ISO-8601 date or datetime"));
    }
    Ok(trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn email_normalization() {
        assert_eq!(
            normalize_email("  Donor@Example.COM ").unwrap(),
            "donor@example.com"
        );
        assert_eq!(normalize_email("a@x.com").unwrap(), "a@x.com");
    }

    #[test]
    fn email_rejects_malformed_input() {
        assert!(normalize_email("not-an-email").is_err());
        assert!(normalize_email("").is_err());
        assert!(normalize_email("two@@x.com").is_err());
        assert!(normalize_email("a@nodot").is_err());
        assert!(normalize_email("a b@x.com").is_err());
        assert!(normalize_email(".leading@x.com").is_err());
        assert!(normalize_email("a@-bad.com").is_err());
        let long_local = format!("{}@x.com", "a".repeat(MAX_EMAIL_LOCAL_LEN + 1));
        assert!(normalize_email(&long_local).is_err());
    }

    #[test]
    fn name_validation() {
        assert_eq!(canonicalize_name(" Asha ").unwrap(), "Asha");
        assert!(canonicalize_name("   ").is_err());
        let long_name = "x".repeat(MAX_NAME_LEN + 1);
        assert!(canonicalize_name(&long_name).is_err());
    }

    #[test]
    fn amount_validation() {
        assert_eq!(validate_amount(10.0).unwrap(), 10.0);
        assert!(validate_amount(0.0).is_err());
        assert!(validate_amount(-5.0).is_err());
        assert!(validate_amount(f64::NAN).is_err());
        assert!(validate_amount(f64::INFINITY).is_err());
        assert!(validate_amount(MAX_CONTRIBUTION_AMOUNT * 2.0).is_err());
    }

    #[test]
    fn date_validation() {
        assert!(validate_contribution_date("2026-08-05").is_ok());
        assert!(validate_contribution_date("2026-08-05T10:30:00Z").is_ok());
        assert!(validate_contribution_date("2026-08-05T10:30:00.123Z").is_ok());
        assert!(validate_contribution_date("2026-08-05T10:30:00").is_ok());
        assert!(validate_contribution_date("yesterday").is_err());
        assert!(validate_contribution_date("").is_err());
    }

    #[test]
    fn thoughts_validation() {
        assert!(validate_thoughts("").is_ok());
        assert!(validate_thoughts(&"x".repeat(MAX_THOUGHTS_LEN + 1)).is_err());
    }
}
