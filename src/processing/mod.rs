// Processing domain - matches change events to DoS services and builds change requests

pub mod change_request;
pub mod processor;
