pub mod angle;
pub mod identity;
pub mod reps;
pub mod squat;

pub use angle::joint_angle;
pub use identity::{assign_identities, center_x, rank_identities, IdentityMap, MAX_BODIES};
pub use reps::{knee_angle, FrameReport, PersonReport, RepCounter};
pub use squat::{SquatCounter, SquatPhase, SquatStatus};
