pub mod face_swap_flow;
pub mod face_swap_state;
pub mod poll_policy;

pub use face_swap_flow::FaceSwapFlow;
pub use face_swap_state::{FaceSwapState, JobEvent, JobPhase};
pub use poll_policy::PollPolicy;
