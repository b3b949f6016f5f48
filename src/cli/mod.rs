pub mod report;
pub mod ui;
