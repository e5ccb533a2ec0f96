//! PDF access: page text and geometry through lopdf, page images through
//! Poppler.

mod loader;
mod render;

pub use loader::{PdfLoader, PdfSource};
pub use render::{find_page_image, PageRenderer, PdftoppmRenderer};
