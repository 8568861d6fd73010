//! Strategies shared by every platform chain.

pub mod cache;
pub mod memo;
pub mod time_limit;

pub use cache::CacheStrategy;
pub use memo::MemoStrategy;
pub use time_limit::TimeLimited;
