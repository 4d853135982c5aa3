//! Comment threads: rebuilding the tree under a story and walking from a
//! comment back up to its story.

pub mod builder;
pub mod resolver;

pub use builder::{order_thread, ThreadBuilder};
pub use resolver::RootResolver;
