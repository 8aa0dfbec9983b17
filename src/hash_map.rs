use std::any::TypeId;

pub type RandomState = ahash::RandomState;

pub type HashMap<K, V> = hashbrown::HashMap<K, V, RandomState>;

/// Map keyed by [`TypeId`], used for per-type registries.
pub type TypeIdMap<V> = HashMap<TypeId, V>;
