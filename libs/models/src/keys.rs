//! Typed keys for placement requests, reps, and auctioneer instances.

use crate::{define_id, define_key};

define_key!(
    /// Unique key of a desired process; identifies a placement request.
    ProcessGuid,
    "process guid"
);

define_key!(
    /// Identity of a rep (a worker able to run processes).
    RepId,
    "rep id"
);

define_key!(
    /// Opaque capability tag. A rep is eligible for a request only when the
    /// stacks are equal.
    Stack,
    "stack"
);

define_id!(
    /// Identity of one auctioneer process, used as the lock owner.
    AuctioneerId,
    "auc"
);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::KeyError;
    use proptest::prelude::*;

    #[test]
    fn test_key_roundtrip() {
        let guid: ProcessGuid = "my-guid".parse().unwrap();
        assert_eq!(guid.as_str(), "my-guid");
        assert_eq!(guid.to_string(), "my-guid");
    }

    #[test]
    fn test_key_empty() {
        let result: Result<Stack, _> = "".parse();
        assert_eq!(result.unwrap_err(), KeyError::Empty { kind: "stack" });
    }

    #[test]
    fn test_key_rejects_whitespace() {
        let result: Result<RepId, _> = "first rep".parse();
        assert!(matches!(
            result.unwrap_err(),
            KeyError::InvalidCharacter { found: ' ', .. }
        ));
    }

    #[test]
    fn test_key_json_is_plain_string() {
        let stack: Stack = ".Net".parse().unwrap();
        let json = serde_json::to_string(&stack).unwrap();
        assert_eq!(json, "\".Net\"");

        let parsed: Stack = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, stack);
    }

    #[test]
    fn test_key_json_rejects_empty() {
        let result: Result<RepId, _> = serde_json::from_str("\"\"");
        assert!(result.is_err());
    }

    #[test]
    fn test_auctioneer_id_prefix() {
        let id = AuctioneerId::new();
        assert!(id.to_string().starts_with("auc_"));

        let parsed: AuctioneerId = id.to_string().parse().unwrap();
        assert_eq!(parsed, id);
    }

    #[test]
    fn test_auctioneer_id_invalid_prefix() {
        let result: Result<AuctioneerId, _> = "rep_01HV4Z2WQXKJNM8GPQY6VBKC3D".parse();
        assert!(matches!(
            result.unwrap_err(),
            KeyError::InvalidPrefix { expected: "auc", .. }
        ));
    }

    proptest! {
        #[test]
        fn prop_printable_keys_parse(s in "[a-zA-Z0-9._:-]{1,40}") {
            let rep = RepId::parse(&s).unwrap();
            prop_assert_eq!(rep.as_str(), s.as_str());
        }
    }
}
