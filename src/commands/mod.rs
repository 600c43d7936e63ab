pub mod classifier;
pub mod shell;
