pub mod bookmarks;
pub mod compare;
pub mod links;
pub mod notes;
pub mod page_links;
pub mod rewrite;
