pub mod cache;
pub mod redis;
pub mod store;

pub use self::redis::create_redis_client;
pub use self::redis::RedisStore;
pub use cache::{CachedRecommendation, Clock, HeroCache, SystemClock, HERO_CACHE_KEY, HERO_CACHE_TTL};
pub use store::{MemoryStore, SlotStore};
