#[allow(clippy::module_inception)]
mod catalog;
mod entry;

pub use {catalog::RecordingCatalog, entry::RecordingEntry};
