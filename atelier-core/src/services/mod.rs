mod inbox;
mod message_log;
mod messaging;
mod participants;
mod read_state;
mod threads;
mod workflow;

pub use inbox::{inbox_order, InboxProjector};
pub use message_log::{
    AppendObserver, Appended, DynAppendObserver, LastMessageAtObserver, MessageLog,
};
pub use messaging::{default_observers, MessagingService};
pub use participants::ParticipantDirectory;
pub use read_state::ReadStateTracker;
pub use threads::ThreadService;
pub use workflow::{AutoContactObserver, StatusWorkflow};
