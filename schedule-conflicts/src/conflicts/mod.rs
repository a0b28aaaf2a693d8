pub mod detector;
pub mod overlap;
pub mod types;

pub use detector::{conflicting_pairs, detect, detect_for_person, index_batch, BatchIndex};
pub use overlap::intervals_overlap;
pub use types::{Appointment, ConflictGroup, Person};
