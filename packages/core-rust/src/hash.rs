//! Stable file references for session-sticky routing.
//!
//! Every editor session on the same file must address the same WOPI endpoint
//! path, so that a reverse proxy can route all of them to one editor server.
//! The reference is the hex SHA-256 of the resource's storage identity.
//!
//! Each component is length-prefixed before hashing, so ids containing
//! separator characters cannot make two distinct identities collide.

use sha2::{Digest, Sha256};

use crate::messages::ResourceId;

/// Computes the URL-safe file reference for a resource identity.
///
/// # Examples
///
/// ```
/// use wopibridge_core::hash::file_ref;
/// use wopibridge_core::messages::ResourceId;
///
/// let id = ResourceId {
///     storage_id: "storage-1".into(),
///     space_id: "space-1".into(),
///     opaque_id: "opaque-1".into(),
/// };
/// assert_eq!(file_ref(&id).len(), 64);
/// assert_eq!(file_ref(&id), file_ref(&id.clone()));
/// ```
#[must_use]
pub fn file_ref(id: &ResourceId) -> String {
    let mut hasher = Sha256::new();
    for part in [&id.storage_id, &id.space_id, &id.opaque_id] {
        hasher.update((part.len() as u64).to_be_bytes());
        hasher.update(part.as_bytes());
    }
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    fn id(storage: &str, space: &str, opaque: &str) -> ResourceId {
        ResourceId {
            storage_id: storage.into(),
            space_id: space.into(),
            opaque_id: opaque.into(),
        }
    }

    #[test]
    fn known_vector() {
        assert_eq!(
            file_ref(&id("storage-1", "space-1", "opaque-1")),
            "99848331afdc49fe3ad2a3188d14d9a3d25be118b88d971039096145f6987a42"
        );
    }

    #[test]
    fn output_is_lowercase_hex() {
        let r = file_ref(&id("a", "b", "c"));
        assert_eq!(r.len(), 64);
        assert!(r.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }

    #[test]
    fn separator_characters_do_not_collide() {
        assert_ne!(file_ref(&id("a$b", "c", "d")), file_ref(&id("a", "b$c", "d")));
        assert_ne!(file_ref(&id("a", "b!c", "d")), file_ref(&id("a", "b", "c!d")));
        assert_ne!(file_ref(&id("ab", "", "c")), file_ref(&id("a", "b", "c")));
    }

    proptest! {
        #[test]
        fn same_triple_same_reference(s in ".*", sp in ".*", o in ".*") {
            prop_assert_eq!(file_ref(&id(&s, &sp, &o)), file_ref(&id(&s, &sp, &o)));
        }

        #[test]
        fn distinct_triples_distinct_references(
            a in (".{0,8}", ".{0,8}", ".{0,8}"),
            b in (".{0,8}", ".{0,8}", ".{0,8}"),
        ) {
            prop_assume!(a != b);
            prop_assert_ne!(
                file_ref(&id(&a.0, &a.1, &a.2)),
                file_ref(&id(&b.0, &b.1, &b.2))
            );
        }
    }
}
