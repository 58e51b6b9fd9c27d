pub mod reference;
pub mod report;
