pub mod email;
pub mod error;
pub mod presets;
pub mod profile;
pub mod reply;
pub mod ticket;

pub use email::{sanitize_email, validate_email};
pub use error::ValidationError;
pub use presets::QuickPick;
pub use profile::{ActivityDigest, Post, Profile, RecordId};
pub use reply::{Tone, draft_reply, excerpt};
pub use ticket::{HostMode, ResolutionState, Ticket};
