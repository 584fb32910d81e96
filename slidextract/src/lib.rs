pub mod batch;
pub mod error;
pub mod frame;
pub mod job;
pub mod media;
pub mod pipeline;
pub mod report;
pub mod sampler;
