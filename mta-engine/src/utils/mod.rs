//! Utility modules for mta-engine

pub mod atomic_write;

pub use atomic_write::atomic_write;
