// DoS domain - service records, the repository that reads them and database secrets

pub mod repository;
pub mod secrets;
pub mod service;
