pub mod store;
pub mod stores;

pub use store::KeyedStore;
pub use stores::EngineCache;
