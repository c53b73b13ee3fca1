pub mod employee;
pub mod statement;
