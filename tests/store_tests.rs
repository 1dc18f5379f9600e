//! Tests for ContentStore
//!
//! These tests verify:
//! - Sorted insertion and binary-search lookup
//! - Upsert overwrite semantics
//! - Split partitioning (keys and values cut at the same index)
//! - Shard serialization layout and round trip
//! - Malformed shard detection
//! - Index-only and offloaded residency

use shardcache::storage::{ByteOrder, ContentStore, FormatConfig, Residency};
use shardcache::{CacheError, Key};

// =============================================================================
// Helper Functions
// =============================================================================

/// Key whose last byte is `n` and all others zero
fn key(n: u8) -> Key {
    let mut bytes = [0u8; 32];
    bytes[31] = n;
    Key::from_bytes(bytes)
}

/// Key spread over the key space so inserts land out of order
fn scattered_key(i: u32) -> Key {
    let mut bytes = [0u8; 32];
    bytes[0..4].copy_from_slice(&i.wrapping_mul(2_654_435_761).to_be_bytes());
    bytes[4..8].copy_from_slice(&i.to_be_bytes());
    Key::from_bytes(bytes)
}

fn store_with(keys: &[u8]) -> ContentStore {
    let mut store = ContentStore::new();
    for &n in keys {
        store.upsert(key(n), format!("value{}", n).into_bytes()).unwrap();
    }
    store
}

// =============================================================================
// Lookup / Upsert Tests
// =============================================================================

#[test]
fn test_new_store_is_empty() {
    let store = ContentStore::new();
    assert!(store.is_empty());
    assert_eq!(store.len(), 0);
    assert_eq!(store.residency(), Residency::Full);
    assert_eq!(store.first_key(), None);
}

#[test]
fn test_lookup_existing_key() {
    let store = store_with(&[3, 1, 2]);
    assert_eq!(store.lookup(&key(2)).unwrap(), Some(&b"value2"[..]));
}

#[test]
fn test_lookup_missing_key() {
    let store = store_with(&[1, 3]);
    assert_eq!(store.lookup(&key(2)).unwrap(), None);
    assert_eq!(store.lookup(&key(0)).unwrap(), None);
    assert_eq!(store.lookup(&key(9)).unwrap(), None);
}

#[test]
fn test_lookup_on_empty_store() {
    let store = ContentStore::new();
    assert_eq!(store.lookup(&key(1)).unwrap(), None);
    assert!(!store.contains(&key(1)).unwrap());
}

#[test]
fn test_contains() {
    let store = store_with(&[5, 7]);
    assert!(store.contains(&key(5)).unwrap());
    assert!(!store.contains(&key(6)).unwrap());
}

#[test]
fn test_keys_stay_strictly_ascending() {
    let mut store = ContentStore::new();
    for i in 0..500u32 {
        store.upsert(scattered_key(i), vec![i as u8]).unwrap();
        assert!(store.keys().windows(2).all(|w| w[0] < w[1]));
    }
    assert_eq!(store.len(), 500);
}

#[test]
fn test_upsert_overwrites_in_place() {
    let mut store = store_with(&[1, 2, 3]);

    let previous = store.upsert(key(2), b"v1".to_vec()).unwrap();
    assert_eq!(previous, Some(b"value2".to_vec()));
    let len_before = store.len();

    let previous = store.upsert(key(2), b"v2".to_vec()).unwrap();
    assert_eq!(previous, Some(b"v1".to_vec()));

    assert_eq!(store.len(), len_before);
    assert_eq!(store.lookup(&key(2)).unwrap(), Some(&b"v2"[..]));
}

#[test]
fn test_upsert_new_key_returns_none() {
    let mut store = ContentStore::new();
    assert_eq!(store.upsert(key(1), b"a".to_vec()).unwrap(), None);
}

#[test]
fn test_iter_in_key_order() {
    let store = store_with(&[9, 4, 6]);
    let keys: Vec<Key> = store.iter().map(|(k, _)| *k).collect();
    assert_eq!(keys, vec![key(4), key(6), key(9)]);

    for (k, v) in store.iter() {
        assert_eq!(v, format!("value{}", k.as_bytes()[31]).as_bytes());
    }
}

// =============================================================================
// Split Tests
// =============================================================================

#[test]
fn test_split_at_midpoint() {
    let store = store_with(&[1, 2, 3, 4, 5]);
    let (lesser, greater) = store.split().unwrap();

    assert_eq!(lesser.keys(), &[key(1), key(2)]);
    assert_eq!(greater.keys(), &[key(3), key(4), key(5)]);
}

#[test]
fn test_split_keeps_values_with_keys() {
    let store = store_with(&[10, 20, 30, 40]);
    let (lesser, greater) = store.split().unwrap();

    for n in [10u8, 20] {
        let expected = format!("value{}", n).into_bytes();
        assert_eq!(lesser.lookup(&key(n)).unwrap(), Some(expected.as_slice()));
    }
    for n in [30u8, 40] {
        let expected = format!("value{}", n).into_bytes();
        assert_eq!(greater.lookup(&key(n)).unwrap(), Some(expected.as_slice()));
    }
}

#[test]
fn test_split_is_complete_and_disjoint() {
    let mut store = ContentStore::new();
    for i in 0..101u32 {
        store.upsert(scattered_key(i), i.to_le_bytes().to_vec()).unwrap();
    }
    let original: Vec<(Key, Vec<u8>)> = store.iter().map(|(k, v)| (*k, v.to_vec())).collect();

    let (lesser, greater) = store.split().unwrap();
    assert_eq!(lesser.len(), 50);
    assert_eq!(greater.len(), 51);

    let max_lesser = lesser.last_key().unwrap();
    let min_greater = greater.first_key().unwrap();
    assert!(max_lesser < min_greater);

    let rejoined: Vec<(Key, Vec<u8>)> = lesser
        .iter()
        .chain(greater.iter())
        .map(|(k, v)| (*k, v.to_vec()))
        .collect();
    assert_eq!(rejoined, original);
}

#[test]
fn test_split_two_entries() {
    let (lesser, greater) = store_with(&[1, 2]).split().unwrap();
    assert_eq!(lesser.keys(), &[key(1)]);
    assert_eq!(greater.keys(), &[key(2)]);
}

// =============================================================================
// Serialization Tests
// =============================================================================

#[test]
fn test_serialize_exact_layout() {
    let mut store = ContentStore::new();
    store.upsert(key(2), b"bb".to_vec()).unwrap();
    store.upsert(key(1), b"a".to_vec()).unwrap();

    let bytes = store.serialize(&FormatConfig::default()).unwrap();

    let mut expected = Vec::new();
    expected.extend_from_slice(&[2, 0, 0, 0, 0]); // entry count, 5-byte LE
    expected.extend_from_slice(key(1).as_bytes());
    expected.extend_from_slice(key(2).as_bytes());
    expected.extend_from_slice(&[1, 0, 0, 0, 0]);
    expected.extend_from_slice(b"a");
    expected.extend_from_slice(&[2, 0, 0, 0, 0]);
    expected.extend_from_slice(b"bb");

    assert_eq!(bytes, expected);
    assert_eq!(bytes.len(), store.encoded_len(&FormatConfig::default()));
}

#[test]
fn test_serialize_empty_store() {
    let bytes = ContentStore::new()
        .serialize(&FormatConfig::default())
        .unwrap();
    assert_eq!(bytes, vec![0, 0, 0, 0, 0]);

    let restored = ContentStore::deserialize(&bytes, &FormatConfig::default()).unwrap();
    assert!(restored.is_empty());
}

#[test]
fn test_store_round_trip() {
    let mut store = ContentStore::new();
    for i in 0..64u32 {
        store.upsert(scattered_key(i), vec![i as u8; i as usize]).unwrap();
    }
    let format = FormatConfig::default();

    let bytes = store.serialize(&format).unwrap();
    let restored = ContentStore::deserialize(&bytes, &format).unwrap();

    assert_eq!(restored, store);
}

#[test]
fn test_round_trip_big_endian_three_byte_lengths() {
    let format = FormatConfig::new(3, ByteOrder::Big).unwrap();
    let mut store = ContentStore::new();
    store.upsert(key(1), vec![7u8; 300]).unwrap();

    let bytes = store.serialize(&format).unwrap();
    assert_eq!(&bytes[0..3], &[0, 0, 1]);
    assert_eq!(&bytes[3 + 32..3 + 32 + 3], &[0, 1, 44]); // 300 = 0x00012C

    let restored = ContentStore::deserialize(&bytes, &format).unwrap();
    assert_eq!(restored, store);
}

#[test]
fn test_serialize_rejects_value_too_large_for_width() {
    let format = FormatConfig::new(1, ByteOrder::Little).unwrap();
    let mut store = ContentStore::new();
    store.upsert(key(1), vec![0u8; 256]).unwrap();

    let result = store.serialize(&format);
    assert!(matches!(
        result,
        Err(CacheError::ValueTooLarge { len: 256, max: 255 })
    ));
}

// =============================================================================
// Malformed Input Tests
// =============================================================================

#[test]
fn test_deserialize_truncated_count() {
    let result = ContentStore::deserialize(&[1, 0], &FormatConfig::default());
    assert!(matches!(result, Err(CacheError::CorruptFormat(_))));
}

#[test]
fn test_deserialize_truncated_keys() {
    let mut bytes = vec![2, 0, 0, 0, 0];
    bytes.extend_from_slice(key(1).as_bytes());
    bytes.extend_from_slice(&[0u8; 10]);

    let result = ContentStore::deserialize(&bytes, &FormatConfig::default());
    assert!(matches!(result, Err(CacheError::CorruptFormat(_))));
}

#[test]
fn test_deserialize_value_length_exceeds_data() {
    let format = FormatConfig::default();
    let bytes = store_with(&[1]).serialize(&format).unwrap();

    // Drop the last byte of the value
    let result = ContentStore::deserialize(&bytes[..bytes.len() - 1], &format);
    assert!(matches!(result, Err(CacheError::CorruptFormat(_))));
}

#[test]
fn test_deserialize_rejects_trailing_bytes() {
    let format = FormatConfig::default();
    let mut bytes = store_with(&[1, 2]).serialize(&format).unwrap();
    bytes.push(0xFF);

    let result = ContentStore::deserialize(&bytes, &format);
    assert!(matches!(result, Err(CacheError::CorruptFormat(_))));
}

#[test]
fn test_deserialize_rejects_unsorted_keys() {
    let mut bytes = vec![2, 0, 0, 0, 0];
    bytes.extend_from_slice(key(2).as_bytes());
    bytes.extend_from_slice(key(1).as_bytes());
    bytes.extend_from_slice(&[0, 0, 0, 0, 0]);
    bytes.extend_from_slice(&[0, 0, 0, 0, 0]);

    let result = ContentStore::deserialize(&bytes, &FormatConfig::default());
    assert!(matches!(result, Err(CacheError::CorruptFormat(_))));
}

#[test]
fn test_deserialize_huge_length_does_not_allocate() {
    // Claims a value of ~1 TB but carries 3 bytes
    let mut bytes = vec![1, 0, 0, 0, 0];
    bytes.extend_from_slice(key(1).as_bytes());
    bytes.extend_from_slice(&[0xFF, 0xFF, 0xFF, 0xFF, 0xFF]);
    bytes.extend_from_slice(b"abc");

    let result = ContentStore::deserialize(&bytes, &FormatConfig::default());
    assert!(matches!(result, Err(CacheError::CorruptFormat(_))));
}

// =============================================================================
// Residency Tests
// =============================================================================

#[test]
fn test_index_only_read() {
    let format = FormatConfig::default();
    let bytes = store_with(&[1, 2, 3]).serialize(&format).unwrap();

    let mut reader = bytes.as_slice();
    let index = ContentStore::read_index_from(&mut reader, &format).unwrap();

    assert_eq!(index.residency(), Residency::IndexOnly);
    assert_eq!(index.len(), 3);
    assert!(index.contains(&key(2)).unwrap());
    assert!(!index.contains(&key(4)).unwrap());
}

#[test]
fn test_index_only_refuses_value_access() {
    let format = FormatConfig::default();
    let bytes = store_with(&[1]).serialize(&format).unwrap();
    let mut index = ContentStore::read_index_from(&mut bytes.as_slice(), &format).unwrap();

    assert!(matches!(index.lookup(&key(1)), Err(CacheError::NotResident(_))));
    assert!(matches!(
        index.upsert(key(2), vec![]),
        Err(CacheError::NotResident(_))
    ));
    assert!(matches!(index.serialize(&format), Err(CacheError::NotResident(_))));
}

#[test]
fn test_offload_drops_everything() {
    let mut store = store_with(&[1, 2]);
    store.offload();

    assert_eq!(store.residency(), Residency::Offloaded);
    assert!(store.is_empty());
    assert!(matches!(store.contains(&key(1)), Err(CacheError::NotResident(_))));
    assert!(matches!(store.split(), Err(CacheError::NotResident(_))));
}
