/// Console output helpers.
pub mod ui;
