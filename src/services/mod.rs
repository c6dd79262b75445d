// Inspection workflow
pub mod inspection;
pub mod inspection_batches;

// Nonconformance registry
pub mod incs;
pub mod photo_storage;

// Supplier registry
pub mod suppliers;
