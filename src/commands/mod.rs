pub mod batch;
pub mod extract;
