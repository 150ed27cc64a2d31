use ulid::Ulid;

/// Generates a new ULID-based ID with the given prefix.
///
/// # Examples
/// ```
/// let id = redops_common::id::prefixed_ulid("op");
/// assert!(id.starts_with("op_"));
/// ```
pub fn prefixed_ulid(prefix: &str) -> String {
    format!("{}_{}", prefix, Ulid::new())
}

/// Marker trait for types whose IDs carry a well-known prefix.
pub trait PrefixedId {
    const PREFIX: &'static str;

    fn generate() -> String {
        prefixed_ulid(Self::PREFIX)
    }

    /// Cheap shape check: right prefix followed by a parseable ULID.
    fn is_valid_id(id: &str) -> bool {
        id.strip_prefix(Self::PREFIX)
            .and_then(|rest| rest.strip_prefix('_'))
            .is_some_and(|ulid| Ulid::from_string(ulid).is_ok())
    }
}

/// Well-known ID prefixes.
pub mod prefix {
    pub const USER: &str = "usr";
    pub const OPERATION: &str = "op";
    pub const TASK: &str = "tsk";
    pub const TOOL: &str = "tool";
    pub const RESULT: &str = "res";
    pub const NOTIFICATION: &str = "ntf";
    pub const ENDPOINT: &str = "ep";
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Op;

    impl PrefixedId for Op {
        const PREFIX: &'static str = prefix::OPERATION;
    }

    #[test]
    fn test_prefixed_ulid_format() {
        let id = prefixed_ulid("usr");
        assert!(id.starts_with("usr_"));
        // ULID is 26 chars, plus prefix + underscore
        assert_eq!(id.len(), 4 + 26);
    }

    #[test]
    fn test_uniqueness() {
        let a = prefixed_ulid("usr");
        let b = prefixed_ulid("usr");
        assert_ne!(a, b);
    }

    #[test]
    fn generated_ids_validate_against_their_prefix() {
        let id = Op::generate();
        assert!(Op::is_valid_id(&id));
        assert!(!Op::is_valid_id("op_not-a-ulid"));
        assert!(!Op::is_valid_id(&prefixed_ulid("tsk")));
        assert!(!Op::is_valid_id("op"));
    }
}
