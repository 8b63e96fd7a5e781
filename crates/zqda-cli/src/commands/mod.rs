pub mod config;
pub mod read;
pub mod serve;
pub mod sync;
pub mod tags;
