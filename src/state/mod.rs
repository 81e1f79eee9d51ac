/// State management module
///
/// This module handles everything the finishing pipeline reads or updates:
/// - Shared data structures (data.rs)
/// - Live watermark settings and location (settings.rs)
/// - The SQLite-backed album and its store contract (library.rs)
/// - The paginated photo index shown by the gallery (index.rs)

pub mod data;
pub mod index;
pub mod library;
pub mod settings;

#[cfg(test)]
pub(crate) mod testing;
