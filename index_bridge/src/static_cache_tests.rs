use super::*;
use crate::bridge::Error;
use crate::mock_backend::MockBufferFactory;

// ============================================================================
// Helpers
// ============================================================================

fn u8_bytes(indices: &[u8]) -> Vec<u8> {
    indices.to_vec()
}

fn u16_bytes(indices: &[u16]) -> Vec<u8> {
    bytemuck::cast_slice(indices).to_vec()
}

// ============================================================================
// State tests
// ============================================================================

#[test]
fn test_new_cache_is_empty() {
    let cache = StaticIndexCache::new();
    assert!(!cache.is_valid());
    assert!(!cache.is_allocated());
    assert_eq!(cache.valid_type(), None);
    assert_eq!(cache.get(IndexType::U16, false), None);
}

#[test]
fn test_cache_state_of() {
    assert_eq!(CacheState::of(None), CacheState::Detached);

    let mut cache = StaticIndexCache::default();
    assert_eq!(CacheState::of(Some(&cache)), CacheState::Invalid);

    let factory = MockBufferFactory::new();
    cache.build(&factory, IndexType::U8, IndexType::U16, &u8_bytes(&[0, 1, 2]), false).unwrap();
    assert_eq!(CacheState::of(Some(&cache)), CacheState::Valid(IndexType::U16, false));

    cache.invalidate();
    assert_eq!(CacheState::of(Some(&cache)), CacheState::Invalid);
}

// ============================================================================
// Build tests
// ============================================================================

#[test]
fn test_build_translates_whole_buffer() {
    let factory = MockBufferFactory::new();
    let mut cache = StaticIndexCache::new();

    let cached = cache
        .build(&factory, IndexType::U8, IndexType::U16, &u8_bytes(&[1, 2, 255, 4]), false)
        .unwrap();

    assert!(cache.is_valid());
    assert_eq!(cached.index_type, IndexType::U16);
    assert_eq!(cache.get(IndexType::U16, false), Some(cached));
    assert_eq!(cache.get(IndexType::U32, false), None);

    let ledger = factory.ledger();
    assert_eq!(ledger.read::<u16>(cached.buffer, 0, 4), vec![1, 2, 255, 4]);
    assert_eq!(ledger.open_mappings(), 0);
}

#[test]
fn test_build_with_remap_rewrites_sentinels() {
    let factory = MockBufferFactory::new();
    let mut cache = StaticIndexCache::new();

    let cached = cache
        .build(&factory, IndexType::U16, IndexType::U32, &u16_bytes(&[0xFFFF, 3, 0xFFFF]), true)
        .unwrap();

    assert_eq!(
        factory.ledger().read::<u32>(cached.buffer, 0, 3),
        vec![0xFFFF_FFFF, 3, 0xFFFF_FFFF]
    );
}

#[test]
fn test_entry_serves_only_matching_sentinel_handling() {
    let factory = MockBufferFactory::new();
    let mut cache = StaticIndexCache::new();

    let cached = cache
        .build(&factory, IndexType::U8, IndexType::U16, &u8_bytes(&[1, 255]), true)
        .unwrap();

    assert_eq!(cache.valid_entry(), Some((IndexType::U16, true)));
    assert_eq!(cache.get(IndexType::U16, true), Some(cached));
    assert_eq!(cache.get(IndexType::U16, false), None);
    assert_eq!(CacheState::of(Some(&cache)), CacheState::Valid(IndexType::U16, true));
    assert_eq!(factory.ledger().read::<u16>(cached.buffer, 0, 2), vec![1, 0xFFFF]);
}

#[test]
fn test_build_ignores_trailing_partial_element() {
    let factory = MockBufferFactory::new();
    let mut cache = StaticIndexCache::new();

    let mut bytes = u16_bytes(&[5, 6]);
    bytes.push(0xAB);
    let cached = cache.build(&factory, IndexType::U16, IndexType::U32, &bytes, false).unwrap();

    assert_eq!(factory.ledger().read::<u32>(cached.buffer, 0, 2), vec![5, 6]);
}

#[test]
fn test_invalidate_keeps_allocation() {
    let factory = MockBufferFactory::new();
    let mut cache = StaticIndexCache::new();
    cache.build(&factory, IndexType::U8, IndexType::U16, &u8_bytes(&[1, 2]), false).unwrap();

    cache.invalidate();

    assert!(!cache.is_valid());
    assert!(cache.is_allocated());
    assert_eq!(cache.get(IndexType::U16, false), None);
}

#[test]
fn test_rebuild_same_width_reuses_buffer_with_new_serial() {
    let factory = MockBufferFactory::new();
    let mut cache = StaticIndexCache::new();
    let first = cache.build(&factory, IndexType::U8, IndexType::U16, &u8_bytes(&[1, 2]), false).unwrap();

    cache.invalidate();
    let second = cache.build(&factory, IndexType::U8, IndexType::U16, &u8_bytes(&[3, 4]), false).unwrap();

    assert_eq!(first.buffer, second.buffer);
    assert_ne!(first.serial, second.serial);
    let ledger = factory.ledger();
    assert_eq!(ledger.creates, 1);
    assert_eq!(ledger.discards, 1);
    assert_eq!(ledger.read::<u16>(second.buffer, 0, 2), vec![3, 4]);
}

#[test]
fn test_rebuild_other_width_replaces_buffer() {
    let factory = MockBufferFactory::new();
    let mut cache = StaticIndexCache::new();
    let data = u16_bytes(&[7, 0xFFFF]);
    let narrow = cache.build(&factory, IndexType::U16, IndexType::U16, &data, false).unwrap();

    let wide = cache.build(&factory, IndexType::U16, IndexType::U32, &data, true).unwrap();

    assert_ne!(narrow.buffer, wide.buffer);
    assert_ne!(narrow.serial, wide.serial);
    assert_eq!(cache.valid_type(), Some(IndexType::U32));
    assert_eq!(cache.get(IndexType::U16, false), None);
    assert_eq!(factory.ledger().creates, 2);
}

#[test]
fn test_rebuild_other_size_replaces_buffer() {
    let factory = MockBufferFactory::new();
    let mut cache = StaticIndexCache::new();
    let small = cache.build(&factory, IndexType::U8, IndexType::U16, &u8_bytes(&[1]), false).unwrap();
    let large = cache.build(&factory, IndexType::U8, IndexType::U16, &u8_bytes(&[1, 2, 3]), false).unwrap();

    assert_ne!(small.buffer, large.buffer);
    assert_eq!(factory.ledger().read::<u16>(large.buffer, 0, 3), vec![1, 2, 3]);
}

#[test]
fn test_build_empty_buffer() {
    let factory = MockBufferFactory::new();
    let mut cache = StaticIndexCache::new();

    let cached = cache.build(&factory, IndexType::U8, IndexType::U16, &[], false).unwrap();

    assert!(cache.is_valid());
    assert_eq!(cached.index_type, IndexType::U16);
    assert_eq!(factory.ledger().maps, 0);
}

// ============================================================================
// Failure tests
// ============================================================================

#[test]
fn test_failed_create_leaves_cache_invalid() {
    let factory = MockBufferFactory::new();
    factory.ledger().fail_create = true;
    let mut cache = StaticIndexCache::new();

    let result = cache.build(&factory, IndexType::U8, IndexType::U16, &u8_bytes(&[1]), false);

    assert!(matches!(result, Err(Error::OutOfMemory(_))));
    assert!(!cache.is_valid());
    assert!(!cache.is_allocated());
}

#[test]
fn test_failed_map_leaves_cache_invalid_and_unmapped() {
    let factory = MockBufferFactory::new();
    let mut cache = StaticIndexCache::new();
    cache.build(&factory, IndexType::U8, IndexType::U16, &u8_bytes(&[1, 2]), false).unwrap();
    cache.invalidate();
    factory.ledger().fail_map = true;

    let result = cache.build(&factory, IndexType::U8, IndexType::U16, &u8_bytes(&[1, 2]), false);

    assert!(matches!(result, Err(Error::MappingFailure(_))));
    assert!(!cache.is_valid());
    assert!(cache.is_allocated());
    assert_eq!(factory.ledger().open_mappings(), 0);
}

#[test]
fn test_failed_conversion_unmaps_and_stays_invalid() {
    let factory = MockBufferFactory::new();
    let mut cache = StaticIndexCache::new();

    let result = cache.build(&factory, IndexType::U32, IndexType::U16, &[0; 8], false);

    assert!(matches!(result, Err(Error::Unsupported(_))));
    assert!(!cache.is_valid());
    let ledger = factory.ledger();
    assert_eq!(ledger.maps, 1);
    assert_eq!(ledger.open_mappings(), 0);
}

#[test]
fn test_failed_unmap_stays_invalid() {
    let factory = MockBufferFactory::new();
    factory.ledger().fail_unmap = true;
    let mut cache = StaticIndexCache::new();

    let result = cache.build(&factory, IndexType::U8, IndexType::U16, &u8_bytes(&[1]), false);

    assert!(matches!(result, Err(Error::BackendError(_))));
    assert!(!cache.is_valid());
}
