//! Request-shape validation executed before controller logic.
//!
//! All checks return `Error::InvalidInput` with a human-readable message;
//! handlers run them before touching the database.

use once_cell::sync::Lazy;
use regex::Regex;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::models::{MerchantLink, NotePosition};

/// Hard cap applied to every `limit` query parameter.
pub const MAX_PAGE_LIMIT: i64 = 100;

/// Default page size for list endpoints.
pub const DEFAULT_PAGE_LIMIT: i64 = 20;

/// Minimum length accepted by the specialized search endpoint.
pub const MIN_SEARCH_QUERY_LEN: usize = 2;

/// Olfactory families recognized by the catalog.
///
/// The historical schema and the admin form disagreed on the family list;
/// this is the finalized configuration set.
pub const FAMILIES: &[&str] = &[
    "agrumes",
    "florale",
    "boisée",
    "orientale",
    "fougère",
    "chyprée",
    "aromatique",
    "gourmande",
    "cuirée",
    "musquée",
    "verte",
    "aquatique",
];

static USERNAME_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Za-z0-9]{3,20}$").unwrap());
static EMAIL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap());
static HEX_COLOR_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^#[0-9a-fA-F]{6}$").unwrap());

/// Username: 3-20 alphanumeric characters.
pub fn validate_username(username: &str) -> Result<()> {
    if USERNAME_RE.is_match(username) {
        Ok(())
    } else {
        Err(Error::InvalidInput(
            "username must be 3-20 alphanumeric characters".to_string(),
        ))
    }
}

/// Email: basic shape check. Stored lowercase; callers normalize first.
pub fn validate_email(email: &str) -> Result<()> {
    if EMAIL_RE.is_match(email) {
        Ok(())
    } else {
        Err(Error::InvalidInput("invalid email address".to_string()))
    }
}

/// Password: minimum 6 characters.
pub fn validate_password(password: &str) -> Result<()> {
    if password.chars().count() >= 6 {
        Ok(())
    } else {
        Err(Error::InvalidInput(
            "password must be at least 6 characters".to_string(),
        ))
    }
}

fn check_len(field: &str, value: &str, min: usize, max: usize) -> Result<()> {
    let len = value.chars().count();
    if len < min || len > max {
        return Err(Error::InvalidInput(format!(
            "{} must be {}-{} characters",
            field, min, max
        )));
    }
    Ok(())
}

/// Perfume name: 2-100 characters.
pub fn validate_parfum_name(name: &str) -> Result<()> {
    check_len("name", name.trim(), 2, 100)
}

/// Brand: 2-50 characters.
pub fn validate_brand(brand: &str) -> Result<()> {
    check_len("brand", brand.trim(), 2, 50)
}

/// Perfume description: at most 1000 characters.
pub fn validate_parfum_description(description: &str) -> Result<()> {
    if description.chars().count() > 1000 {
        return Err(Error::InvalidInput(
            "description must be at most 1000 characters".to_string(),
        ));
    }
    Ok(())
}

/// Note name: 2-50 characters.
pub fn validate_note_name(name: &str) -> Result<()> {
    check_len("name", name.trim(), 2, 50)
}

/// Note description: at most 500 characters.
pub fn validate_note_description(description: &str) -> Result<()> {
    if description.chars().count() > 500 {
        return Err(Error::InvalidInput(
            "description must be at most 500 characters".to_string(),
        ));
    }
    Ok(())
}

/// Family must belong to the configured family list.
pub fn validate_family(family: &str) -> Result<()> {
    if FAMILIES.contains(&family) {
        Ok(())
    } else {
        Err(Error::InvalidInput(format!(
            "unknown olfactory family '{}'",
            family
        )))
    }
}

/// Intensity: 1..=10.
pub fn validate_intensity(intensity: i32) -> Result<()> {
    if (1..=10).contains(&intensity) {
        Ok(())
    } else {
        Err(Error::InvalidInput(
            "intensity must be between 1 and 10".to_string(),
        ))
    }
}

/// Hex color, e.g. `#a1b2c3`.
pub fn validate_color(color: &str) -> Result<()> {
    if HEX_COLOR_RE.is_match(color) {
        Ok(())
    } else {
        Err(Error::InvalidInput(format!("invalid hex color '{}'", color)))
    }
}

/// Price must be non-negative when present.
pub fn validate_price(price: f64) -> Result<()> {
    if price.is_finite() && price >= 0.0 {
        Ok(())
    } else {
        Err(Error::InvalidInput("price must be >= 0".to_string()))
    }
}

/// Merchant links need a name and a url; prices must be non-negative.
pub fn validate_merchant_links(links: &[MerchantLink]) -> Result<()> {
    for link in links {
        if link.name.trim().is_empty() || link.url.trim().is_empty() {
            return Err(Error::InvalidInput(
                "merchant links require a name and a url".to_string(),
            ));
        }
        if let Some(price) = link.price {
            validate_price(price)?;
        }
    }
    Ok(())
}

/// Clamp a requested page/limit pair into bounds. Page is 1-based.
pub fn clamp_pagination(page: Option<i64>, limit: Option<i64>) -> (i64, i64) {
    let page = page.unwrap_or(1).max(1);
    let limit = limit
        .unwrap_or(DEFAULT_PAGE_LIMIT)
        .clamp(1, MAX_PAGE_LIMIT);
    (page, limit)
}

/// Parse a comma-separated list of note ids, silently dropping malformed
/// entries.
pub fn parse_note_id_filter(raw: &str) -> Vec<Uuid> {
    raw.split(',')
        .filter_map(|part| Uuid::parse_str(part.trim()).ok())
        .collect()
}

/// Parse a position from a `type` query parameter.
pub fn parse_position_filter(raw: &str) -> Result<NotePosition> {
    NotePosition::parse(raw)
        .ok_or_else(|| Error::InvalidInput(format!("unknown note type '{}'", raw)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_username() {
        assert!(validate_username("alice42").is_ok());
        assert!(validate_username("ab").is_err());
        assert!(validate_username("a".repeat(21).as_str()).is_err());
        assert!(validate_username("has space").is_err());
        assert!(validate_username("tiret-").is_err());
    }

    #[test]
    fn test_validate_email() {
        assert!(validate_email("user@example.com").is_ok());
        assert!(validate_email("no-at-sign").is_err());
        assert!(validate_email("two@@example.com").is_err());
        assert!(validate_email("user@nodot").is_err());
    }

    #[test]
    fn test_validate_password_boundary() {
        assert!(validate_password("12345").is_err());
        assert!(validate_password("123456").is_ok());
    }

    #[test]
    fn test_validate_parfum_name_bounds() {
        assert!(validate_parfum_name("N°5").is_ok());
        assert!(validate_parfum_name("x").is_err());
        assert!(validate_parfum_name(&"x".repeat(101)).is_err());
        assert!(validate_parfum_name(&"x".repeat(100)).is_ok());
    }

    #[test]
    fn test_validate_family_membership() {
        assert!(validate_family("florale").is_ok());
        assert!(validate_family("boisée").is_ok());
        assert!(validate_family("metallique").is_err());
    }

    #[test]
    fn test_validate_color() {
        assert!(validate_color("#a1B2c3").is_ok());
        assert!(validate_color("a1b2c3").is_err());
        assert!(validate_color("#fff").is_err());
    }

    #[test]
    fn test_clamp_pagination_caps_limit() {
        assert_eq!(clamp_pagination(None, None), (1, DEFAULT_PAGE_LIMIT));
        assert_eq!(clamp_pagination(Some(0), Some(500)), (1, MAX_PAGE_LIMIT));
        assert_eq!(clamp_pagination(Some(3), Some(50)), (3, 50));
    }

    #[test]
    fn test_parse_note_id_filter_drops_malformed() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let raw = format!("{}, not-a-uuid ,{},", a, b);
        assert_eq!(parse_note_id_filter(&raw), vec![a, b]);
        assert!(parse_note_id_filter("garbage,,").is_empty());
    }

    #[test]
    fn test_validate_merchant_links() {
        let ok = vec![MerchantLink {
            name: "Shop".to_string(),
            url: "https://shop.example.com/p/1".to_string(),
            price: Some(79.9),
        }];
        assert!(validate_merchant_links(&ok).is_ok());

        let bad = vec![MerchantLink {
            name: String::new(),
            url: "https://shop.example.com".to_string(),
            price: None,
        }];
        assert!(validate_merchant_links(&bad).is_err());

        let negative = vec![MerchantLink {
            name: "Shop".to_string(),
            url: "https://shop.example.com".to_string(),
            price: Some(-1.0),
        }];
        assert!(validate_merchant_links(&negative).is_err());
    }
}
