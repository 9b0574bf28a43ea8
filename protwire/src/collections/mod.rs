//! Defines collection types used by messages for repeated and map fields

use core::hash::Hash;

pub mod unknown_fields;

pub use unknown_fields::{UnknownField, UnknownFieldSet};

/// A repeated field. Elements keep the order they were read or pushed in.
pub type RepeatedField<T> = alloc::vec::Vec<T>;

/// A map field. Later insertions of a key replace earlier ones, which is how duplicate keys on the wire resolve.
pub type MapField<K, V> = hashbrown::HashMap<K, V>;

/// Gets the entries of a map ordered by key. Map iteration order is unspecified, so output that
/// must be stable across runs (the wire format and JSON) is written from this.
pub fn sorted_entries<K: Ord + Hash, V>(map: &MapField<K, V>) -> alloc::vec::Vec<(&K, &V)> {
    let mut entries: alloc::vec::Vec<_> = map.iter().collect();
    entries.sort_unstable_by(|a, b| a.0.cmp(b.0));
    entries
}

#[cfg(test)]
mod test {
    use super::{sorted_entries, MapField};

    #[test]
    fn sorted() {
        let mut map = MapField::new();
        map.insert("b", 2);
        map.insert("c", 3);
        map.insert("a", 1);
        map.insert("b", 4);

        let entries: Vec<_> = sorted_entries(&map).into_iter().map(|(k, v)| (*k, *v)).collect();
        assert_eq!(entries, [("a", 1), ("b", 4), ("c", 3)]);
    }
}
