pub mod policy;
pub mod recommendation;
pub mod scoring;
pub mod workflow;
