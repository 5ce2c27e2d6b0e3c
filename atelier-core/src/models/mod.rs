mod booking;
mod identity;
mod inbox;
mod message;
mod thread;

pub use booking::{Booking, BookingRequest, BookingStatus, StudioService};
pub use identity::{Identity, Role};
pub use inbox::{ArchiveFilter, InboxFilter, ThreadDetail, ThreadSummary};
pub use message::{LatestMessage, Message};
pub use thread::{Participant, Thread, ThreadFlags, ThreadStatus, ThreadType};
