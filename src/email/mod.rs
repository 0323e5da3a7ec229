pub mod common;
pub mod memory;
pub mod source;

// Re-export commonly used items
pub use common::{BatchOutcome, Discovery, Notification, Watermark};
pub use memory::InMemoryMailSource;
pub use source::MailSource;
