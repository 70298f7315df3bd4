//! Content module - posts, pagination, navigation, and rich text

pub mod loader;
pub mod navigation;
pub mod pagination;
mod post;
pub mod reading_time;
pub mod rich_text;

pub use loader::PostLoader;
pub use navigation::Adjacent;
pub use pagination::PostsPagination;
pub use post::{ContentBlock, Post, PreviewLink, RichTextFragment, Span};
