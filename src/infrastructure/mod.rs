pub mod in_memory;
pub mod payhero;
#[cfg(feature = "storage-rocksdb")]
pub mod rocksdb;
