pub mod plan;
pub mod sync;

mod shared;
