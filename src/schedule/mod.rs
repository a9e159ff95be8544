//! Scheduling: global code motion over the sequencing spine, producing the
//! flat instruction partition consumed by the interpreter.

mod gcm;

pub use gcm::{ScheduledInstructions, schedule_block, schedule_top_level_script};
