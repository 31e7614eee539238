//! Schema hashing.
//!
//! The schema hash is the SHA-256 digest of the sorted, canonicalized set
//! of `inputs -> output` mappings across every compiled arm. It namespaces
//! all persistent state for a schema so that two schemas — even ones that
//! happen to share a storage root — can never alias each other's nodes.

use crate::expr::CanonicalMapping;
use sha2::{Digest, Sha256};

/// Compute the stable schema hash (lowercase hex) over a set of canonical
/// mappings. The mappings are sorted by their canonical text first, so
/// declaration order never affects the hash.
pub fn schema_hash(mappings: &[CanonicalMapping]) -> String {
    let mut texts: Vec<String> = mappings.iter().map(|m| m.canonical_text()).collect();
    texts.sort();

    let mut hasher = Sha256::new();
    for text in &texts {
        hasher.update(text.as_bytes());
        hasher.update(b"\n");
    }
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::{canonicalize_mapping, parse_expr};

    #[test]
    fn hash_is_stable_and_order_independent() {
        let m1 = canonicalize_mapping(&parse_expr("b(x)").unwrap(), &[parse_expr("a(x)").unwrap()]);
        let m2 = canonicalize_mapping(&parse_expr("a(x)").unwrap(), &[]);

        let forward = schema_hash(&[m1.clone(), m2.clone()]);
        let backward = schema_hash(&[m2, m1]);
        assert_eq!(forward, backward);
        assert_eq!(forward.len(), 64);
    }

    #[test]
    fn hash_changes_when_mapping_changes() {
        let m1 = canonicalize_mapping(&parse_expr("a(x)").unwrap(), &[]);
        let m2 = canonicalize_mapping(&parse_expr("a(x,y)").unwrap(), &[]);
        assert_ne!(schema_hash(&[m1]), schema_hash(&[m2]));
    }
}
