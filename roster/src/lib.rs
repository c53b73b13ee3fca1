pub mod calendar;
pub mod consts;
pub mod diagnostics;
pub mod import;
pub mod model;
pub mod persistence;
pub mod store;
