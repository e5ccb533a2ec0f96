//! Data model for PDF pages and extraction results.
//!
//! [`Page`] is what the loader reads from a PDF; [`PageResult`] and
//! [`DocumentResult`] are what the extraction pipeline produces and the
//! writer serializes.

mod document;
mod page;

pub use document::{
    DocumentInfo, DocumentResult, ExtractionMethod, PageError, PageResult, ProcessingInfo,
    PAGE_SEPARATOR,
};
pub use page::{Page, PageImage};
