pub mod page;

pub use page::{Page, PageSequence, DEFAULT_PAGE_SIZE};
