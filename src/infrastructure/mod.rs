pub mod bank_repository;
pub mod generic_repository;
