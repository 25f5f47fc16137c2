pub mod document;
pub mod export;
pub mod import;

pub use document::{DocumentRenderer, PdfRenderer};
pub use export::SummaryExporter;
pub use import::{ImportOptions, RosterImporter};
