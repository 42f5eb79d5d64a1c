// taskq Infrastructure - Redis Adapter
// Implements: OrderedStore on Redis lists (LPUSH / BRPOPLPUSH / LREM / LLEN)

mod ordered_store;

pub use ordered_store::{RedisOrderedStore, MIN_CLAIM_TIMEOUT};
