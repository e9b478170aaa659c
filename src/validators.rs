//! Input validation and sanitization functions for FireGuard
//!
//! Field-level checks for rule drafts. Each validator returns `Err(String)`
//! with a user-facing message; callers attach the field name. Contact form
//! fields are declared with the `validator` derive in [`crate::contact`].

/// Maximum length of a rule name after sanitization
pub const MAX_LABEL_LEN: usize = 64;

/// Sanitizes a label for display in the rule table and CLI output.
///
/// Removes control characters, quotes, and shell metacharacters.
/// Limits length to 64 ASCII characters.
///
/// # Examples
///
/// ```
/// use fireguard::validators::sanitize_label;
///
/// let safe = sanitize_label("Allow HTTP");
/// assert_eq!(safe, "Allow HTTP");
///
/// let unsafe_label = "Test\nNewline\"Quote";
/// let safe = sanitize_label(unsafe_label);
/// assert!(!safe.contains('\n'));
/// assert!(!safe.contains('"'));
/// ```
pub fn sanitize_label(input: &str) -> String {
    input
        .chars()
        .filter(|c| {
            // ASCII only, so Unicode look-alikes never reach the table
            c.is_ascii_alphanumeric() || matches!(c, ' ' | '-' | '_' | '.' | ':' | '(' | ')')
        })
        .take(MAX_LABEL_LEN)
        .collect::<String>()
        .trim()
        .to_string()
}

/// Validates and sanitizes a rule name.
///
/// # Errors
///
/// Returns `Err` if the name is blank, longer than 64 characters, or contains
/// only characters removed by [`sanitize_label`].
pub fn validate_label(input: &str) -> Result<String, String> {
    let trimmed = require(input)?;

    if trimmed.len() > MAX_LABEL_LEN {
        return Err(format!("Name too long (max {MAX_LABEL_LEN} characters)"));
    }

    let sanitized = sanitize_label(trimmed);
    if sanitized.is_empty() {
        return Err("Name contains only invalid characters".to_string());
    }

    Ok(sanitized)
}

/// Trims `input` and rejects it if nothing is left.
///
/// # Errors
///
/// Returns `Err("Required")` for empty or whitespace-only input.
pub fn require(input: &str) -> Result<&str, String> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        Err("Required".to_string())
    } else {
        Ok(trimmed)
    }
}

/// Returns the conventional service name of a port, if it has one.
///
/// Informational only, shown next to rules in the rule table.
pub fn well_known_service(port: &str) -> Option<&'static str> {
    let service = match port.trim().parse::<u16>().ok()? {
        20 | 21 => "FTP",
        22 => "SSH",
        23 => "Telnet",
        25 => "SMTP",
        53 => "DNS",
        80 => "HTTP",
        143 => "IMAP",
        443 => "HTTPS",
        587 => "SMTP Submission",
        993 => "IMAPS",
        3389 => "RDP",
        _ => return None,
    };
    Some(service)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_label_normal() {
        assert_eq!(sanitize_label("Block Telnet"), "Block Telnet");
        assert_eq!(sanitize_label("Allow SSH (LAN)"), "Allow SSH (LAN)");
    }

    #[test]
    fn test_sanitize_label_removes_control_chars() {
        let sanitized = sanitize_label("Test\nLabel\r\t");
        assert!(!sanitized.contains('\n'));
        assert!(!sanitized.contains('\r'));
        assert!(!sanitized.contains('\t'));
    }

    #[test]
    fn test_sanitize_label_removes_shell_metacharacters() {
        assert_eq!(sanitize_label("rule; rm -rf $HOME"), "rule rm -rf HOME");
    }

    #[test]
    fn test_sanitize_label_length_limit() {
        let long = "a".repeat(100);
        assert_eq!(sanitize_label(&long).len(), 64);
    }

    #[test]
    fn test_validate_label() {
        assert_eq!(validate_label("  Allow HTTP ").unwrap(), "Allow HTTP");
        assert_eq!(validate_label("   ").unwrap_err(), "Required");
        assert!(validate_label("\"\"\"").is_err());
        assert!(validate_label(&"x".repeat(65)).is_err());
    }

    #[test]
    fn test_require() {
        assert_eq!(require(" Any ").unwrap(), "Any");
        assert!(require("").is_err());
        assert!(require("\t\n").is_err());
    }

    #[test]
    fn test_well_known_service() {
        assert_eq!(well_known_service("23"), Some("Telnet"));
        assert_eq!(well_known_service("443"), Some("HTTPS"));
        assert_eq!(well_known_service("8080"), None);
        assert_eq!(well_known_service("Any"), None);
    }
}

#[cfg(test)]
mod property_tests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn test_sanitize_label_never_exceeds_64_chars(input in "\\PC*") {
            let sanitized = sanitize_label(&input);
            prop_assert!(sanitized.len() <= MAX_LABEL_LEN);
        }

        #[test]
        fn test_sanitize_label_no_dangerous_chars(input in "\\PC*") {
            let sanitized = sanitize_label(&input);
            prop_assert!(!sanitized.chars().any(char::is_control));
            prop_assert!(!sanitized.contains('"'));
            prop_assert!(!sanitized.contains('\''));
            prop_assert!(!sanitized.contains('$'));
            prop_assert!(!sanitized.contains('`'));
            prop_assert!(!sanitized.contains(';'));
        }

        #[test]
        fn test_blank_is_never_required(input in "[ \t\n]*") {
            prop_assert!(require(&input).is_err());
        }
    }
}
