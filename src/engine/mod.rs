pub mod conflict;
pub mod estimate;
pub mod lifecycle;
pub mod workload;
