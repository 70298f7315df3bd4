//! Helper functions for pages
//!
//! Date formatting, URL generation and HTML escaping shared by the
//! generator, the templates and the dev server.

mod date;
mod html;
mod url;

pub use date::*;
pub use html::*;
pub use url::*;
