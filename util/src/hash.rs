//! FNV-1a 64-bit hashing.
//!
//! This is the single authoritative content hash of the compiler: scope
//! symbol maps, the liveness table and the redundant-expression cache all
//! key through it, either directly via [`fnv1a64`](fn.fnv1a64.html) or
//! through the [`FnvHashMap`](type.FnvHashMap.html) alias.

use std::collections::{HashMap, HashSet};
use std::hash::{BuildHasherDefault, Hasher};

const FNV_OFFSET_BASIS: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x100_0000_01b3;

/// Hashes `bytes` with FNV-1a 64-bit.
pub fn fnv1a64(bytes: &[u8]) -> u64 {
    let mut hash = FNV_OFFSET_BASIS;
    for &byte in bytes {
        hash ^= u64::from(byte);
        hash = hash.wrapping_mul(FNV_PRIME);
    }
    hash
}

/// A [`Hasher`](https://doc.rust-lang.org/std/hash/trait.Hasher.html)
/// running the same FNV-1a rounds as [`fnv1a64`](fn.fnv1a64.html).
#[derive(Clone, Copy, Debug)]
pub struct FnvHasher(u64);

impl Default for FnvHasher {
    fn default() -> FnvHasher {
        FnvHasher(FNV_OFFSET_BASIS)
    }
}

impl Hasher for FnvHasher {
    fn finish(&self) -> u64 {
        self.0
    }

    fn write(&mut self, bytes: &[u8]) {
        for &byte in bytes {
            self.0 ^= u64::from(byte);
            self.0 = self.0.wrapping_mul(FNV_PRIME);
        }
    }
}

pub type FnvHashMap<K, V> = HashMap<K, V, BuildHasherDefault<FnvHasher>>;
pub type FnvHashSet<T> = HashSet<T, BuildHasherDefault<FnvHasher>>;

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn empty_input_is_the_offset_basis() {
        assert_eq!(fnv1a64(b""), 0xcbf2_9ce4_8422_2325);
    }

    #[test]
    fn single_byte_vector() {
        assert_eq!(fnv1a64(b"a"), 0xaf63_dc4c_8601_ec8c);
    }

    #[test]
    fn hasher_matches_free_function() {
        let mut hasher = FnvHasher::default();
        hasher.write(b"redundant");
        assert_eq!(hasher.finish(), fnv1a64(b"redundant"));
    }

    #[test]
    fn map_stores_and_shadows() {
        let mut map: FnvHashMap<String, u32> = FnvHashMap::default();
        assert_eq!(map.insert("x".to_owned(), 1), None);
        assert_eq!(map.insert("x".to_owned(), 2), Some(1));
        assert_eq!(map.get("x"), Some(&2));
        assert_eq!(map.get("y"), None);
    }
}
