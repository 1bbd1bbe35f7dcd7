//! Format converter implementations.

pub mod command;
pub mod docx;
pub mod html;
pub mod mhtml;
pub mod onepkg;
pub mod pdf_text;

pub use docx::{DocxConverter, OoxmlHtmlConverter, PandocHtmlConverter};
pub use html::HtmlConverter;
pub use mhtml::MhtmlConverter;
pub use onepkg::OnepkgConverter;
pub use pdf_text::{PdfConverter, PopplerPdfExtractor};
