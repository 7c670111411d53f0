// Events domain - NHS UK change events and the receiver that admits them

pub mod domain;
pub mod parser;
pub mod receiver;
