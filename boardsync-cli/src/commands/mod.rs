pub mod check;
pub mod plan;
pub mod prune;
pub mod sync;
