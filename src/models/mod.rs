pub mod page;
pub mod record;
pub mod request;

pub use page::{PageContext, PageKind};
pub use record::{ListingCell, SubmissionRecord, VerdictStatus};
pub use request::SubmissionRequest;
