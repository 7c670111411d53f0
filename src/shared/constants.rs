// Domain constants for DoS integration

pub mod dos {
    /// DoS service type ids that may receive change requests
    pub const VALID_SERVICE_TYPES: [i32; 5] = [13, 131, 132, 134, 137];
    pub const VALID_STATUS_ID: i32 = 1;

    pub const ODS5_LENGTH: usize = 5;
    pub const CONNECT_TIMEOUT_SECS: u64 = 30;
    pub const DEFAULT_PORT: u16 = 5432;
}

pub mod nhs {
    pub const ORGANISATION_TYPE_PHARMACY: &str = "PHA";
    pub const ORGANISATION_SUB_TYPE_COMMUNITY: &str = "Community";
}

pub mod aws {
    pub const DEFAULT_REGION: &str = "eu-west-2";
    pub const DEFAULT_TRACE_ID: &str = "00000-00000-00000";
    pub const TRACE_ID_ENV: &str = "_X_AMZN_TRACE_ID";
    pub const TRACE_ID_HEADER: &str = "x-amzn-trace-id";
    pub const FUNCTION_NAME_ENV: &str = "AWS_LAMBDA_FUNCTION_NAME";
}

pub mod change_request {
    pub const SYSTEM: &str = "DoS Integration";
    pub const DEFAULT_TIMEOUT_SECS: u64 = 30;
}

pub mod functions {
    pub const EVENT_RECEIVER: &str = "event-receiver";
    pub const EVENT_PROCESSOR: &str = "event-processor";
    pub const EVENT_SENDER: &str = "event-sender";
}

pub mod pipeline {
    pub const EVENT_CHANNEL_CAPACITY: usize = 1000;
    pub const CHANGE_REQUEST_CHANNEL_CAPACITY: usize = 1000;
    pub const STATS_COLLECTION_INTERVAL: u64 = 60; // seconds
}
