pub mod importer;
pub mod row;
