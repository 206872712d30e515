pub mod pipeline;
pub mod step;
