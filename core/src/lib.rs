pub mod api;
pub mod clock;
pub mod config;
pub mod error;
pub mod pool;
pub mod relayer;
pub mod storage;

#[cfg(test)]
mod tests;
