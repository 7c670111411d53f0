// Messaging - hands change requests to the sender and delivers them to DoS

pub mod dispatcher;
pub mod domain;
pub mod function_client;
pub mod sender;
