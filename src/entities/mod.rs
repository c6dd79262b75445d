pub mod inspection_batch;
pub mod nonconformance;
pub mod supplier;
