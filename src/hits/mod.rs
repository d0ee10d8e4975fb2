//! Hit Stream: normalised, filtered hit records (spec.md §4.2).

pub mod record;
pub mod report;
pub mod stream;

pub use record::{Hit, ModelHit, Status};
pub use stream::HitStream;
