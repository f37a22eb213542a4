//! Pipeline step implementations.
//!
//! Each step handles one stage of a production: synthesis, post-processing
//! and delivery.

mod delivery;
mod post_process;
mod synthesis;

pub use delivery::DeliveryStep;
pub use post_process::PostProcessStep;
pub use synthesis::SynthesisStep;
