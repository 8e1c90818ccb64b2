pub mod analysis;
pub mod loader;
pub mod plot;
pub mod ranges;
pub mod report;
