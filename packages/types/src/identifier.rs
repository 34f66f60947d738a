//! ICS24 identifier validation for client and port identifiers.

use thiserror::Error;

/// Minimum length of a client identifier
pub const MIN_CLIENT_ID_LENGTH: usize = 4;
/// Maximum length of a client identifier
pub const MAX_CLIENT_ID_LENGTH: usize = 64;
/// Minimum length of a port identifier
pub const MIN_PORT_ID_LENGTH: usize = 2;
/// Maximum length of a port identifier
pub const MAX_PORT_ID_LENGTH: usize = 128;
/// Maximum length of a client type (the `<type>` in `<type>-<n>`)
pub const MAX_CLIENT_TYPE_LENGTH: usize = 32;
/// Prefix reserved for identifiers assigned by the router itself
pub const RESERVED_CLIENT_ID_PREFIX: &str = "client-";

/// Errors returned when an identifier does not follow the ICS24 grammar
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IdentifierError {
    /// Identifier is empty
    #[error("identifier cannot be empty")]
    Empty,

    /// Identifier length is out of bounds
    #[error("identifier `{id}` has length {len}, must be between {min} and {max}")]
    InvalidLength {
        /// Offending identifier
        id: String,
        /// Actual length
        len: usize,
        /// Minimum allowed length
        min: usize,
        /// Maximum allowed length
        max: usize,
    },

    /// Identifier contains a character outside the allowed set
    #[error("identifier `{id}` contains invalid character `{ch}`")]
    InvalidCharacter {
        /// Offending identifier
        id: String,
        /// First invalid character
        ch: char,
    },

    /// Custom client identifier uses the router-reserved prefix
    #[error("identifier `{id}` uses the reserved prefix `{RESERVED_CLIENT_ID_PREFIX}`")]
    ReservedPrefix {
        /// Offending identifier
        id: String,
    },

    /// Custom client identifier reads as an identifier the router assigns
    #[error("identifier `{id}` has the shape of an assigned `{client_type}-<n>` identifier")]
    AssignedShape {
        /// Offending identifier
        id: String,
        /// Client type whose assigned identifiers it would shadow
        client_type: String,
    },
}

const fn is_valid_id_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '+' | '-' | '#' | '[' | ']' | '<' | '>')
}

/// Validates an identifier against the ICS24 character set and the given length bounds.
///
/// # Errors
/// Returns an error if the identifier is empty, too short/long or contains invalid characters.
pub fn validate_identifier(id: &str, min: usize, max: usize) -> Result<(), IdentifierError> {
    if id.is_empty() {
        return Err(IdentifierError::Empty);
    }

    let len = id.len();
    if len < min || len > max {
        return Err(IdentifierError::InvalidLength {
            id: id.to_string(),
            len,
            min,
            max,
        });
    }

    if let Some(ch) = id.chars().find(|c| !is_valid_id_char(*c)) {
        return Err(IdentifierError::InvalidCharacter {
            id: id.to_string(),
            ch,
        });
    }

    Ok(())
}

/// Validates a client identifier.
///
/// # Errors
/// See [`validate_identifier`].
pub fn validate_client_id(id: &str) -> Result<(), IdentifierError> {
    validate_identifier(id, MIN_CLIENT_ID_LENGTH, MAX_CLIENT_ID_LENGTH)
}

/// Validates a custom (caller-chosen) client identifier, which must additionally
/// stay clear of the prefix the router uses for identifiers it assigns.
///
/// # Errors
/// See [`validate_identifier`]; also fails with [`IdentifierError::ReservedPrefix`].
pub fn validate_custom_client_id(id: &str) -> Result<(), IdentifierError> {
    validate_client_id(id)?;
    if id.starts_with(RESERVED_CLIENT_ID_PREFIX) {
        return Err(IdentifierError::ReservedPrefix { id: id.to_string() });
    }
    Ok(())
}

/// Fails if `id` reads as `<client_type>-<n>`, the shape of the identifiers
/// the router assigns to clients of that type.
///
/// # Errors
/// [`IdentifierError::AssignedShape`]
pub fn ensure_not_assigned_shape(id: &str, client_type: &str) -> Result<(), IdentifierError> {
    let assigned = id
        .strip_prefix(client_type)
        .and_then(|rest| rest.strip_prefix('-'))
        .is_some_and(|n| !n.is_empty() && n.bytes().all(|b| b.is_ascii_digit()));
    if assigned {
        return Err(IdentifierError::AssignedShape {
            id: id.to_string(),
            client_type: client_type.to_string(),
        });
    }
    Ok(())
}

/// Validates a port identifier.
///
/// # Errors
/// See [`validate_identifier`].
pub fn validate_port_id(id: &str) -> Result<(), IdentifierError> {
    validate_identifier(id, MIN_PORT_ID_LENGTH, MAX_PORT_ID_LENGTH)
}

/// Validates a light client type. Types cannot contain `-` since they are the
/// prefix of the identifiers `<type>-<n>` the router hands out.
///
/// # Errors
/// See [`validate_identifier`].
pub fn validate_client_type(client_type: &str) -> Result<(), IdentifierError> {
    validate_identifier(client_type, 1, MAX_CLIENT_TYPE_LENGTH)?;
    if let Some(ch) = client_type.chars().find(|c| *c == '-') {
        return Err(IdentifierError::InvalidCharacter {
            id: client_type.to_string(),
            ch,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case::assigned("attestor-0")]
    #[case::tendermint("07-tendermint-12")]
    #[case::all_symbols("a.b_c+d-e#f[g]<h>")]
    #[case::min_len("abcd")]
    fn accepts_valid_client_ids(#[case] id: &str) {
        assert!(validate_client_id(id).is_ok());
    }

    #[rstest]
    #[case::empty("", IdentifierError::Empty)]
    #[case::too_short(
        "abc",
        IdentifierError::InvalidLength { id: "abc".into(), len: 3, min: 4, max: 64 }
    )]
    #[case::slash("client/0", IdentifierError::InvalidCharacter { id: "client/0".into(), ch: '/' })]
    #[case::space(
        "my client",
        IdentifierError::InvalidCharacter { id: "my client".into(), ch: ' ' }
    )]
    #[case::unicode(
        "clïent",
        IdentifierError::InvalidCharacter { id: "clïent".into(), ch: 'ï' }
    )]
    fn rejects_invalid_client_ids(#[case] id: &str, #[case] expected: IdentifierError) {
        assert_eq!(validate_client_id(id), Err(expected));
    }

    #[test]
    fn rejects_too_long_client_id() {
        let id = "a".repeat(MAX_CLIENT_ID_LENGTH + 1);
        assert!(matches!(
            validate_client_id(&id),
            Err(IdentifierError::InvalidLength { len: 65, .. })
        ));
    }

    #[test]
    fn custom_client_id_cannot_use_reserved_prefix() {
        assert!(matches!(
            validate_custom_client_id("client-7"),
            Err(IdentifierError::ReservedPrefix { .. })
        ));
        assert!(validate_custom_client_id("cosmoshub-4").is_ok());
    }

    #[rstest]
    #[case::assigned("attestor-5", false)]
    #[case::counter_only("attestor-", true)]
    #[case::suffix_not_numeric("attestor-main", true)]
    #[case::other_type("wasm-5", true)]
    #[case::longer_type("attestorx-5", true)]
    fn custom_ids_cannot_shadow_assigned_ids(#[case] id: &str, #[case] ok: bool) {
        assert_eq!(ensure_not_assigned_shape(id, "attestor").is_ok(), ok);
    }

    #[rstest]
    #[case::transfer("transfer", true)]
    #[case::two_chars("tr", true)]
    #[case::one_char("t", false)]
    #[case::colon("port:1", false)]
    fn validates_port_ids(#[case] id: &str, #[case] ok: bool) {
        assert_eq!(validate_port_id(id).is_ok(), ok);
    }

    #[rstest]
    #[case::attestor("attestor", true)]
    #[case::with_dash("07-tendermint", false)]
    #[case::empty("", false)]
    fn validates_client_types(#[case] client_type: &str, #[case] ok: bool) {
        assert_eq!(validate_client_type(client_type).is_ok(), ok);
    }
}
