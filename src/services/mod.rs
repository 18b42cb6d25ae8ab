pub mod filter;
pub mod reconciler;
pub mod repository_resolver;
pub mod retention;
pub mod runner;
