// Broker Topology Names (contractual)

/// Exchange routing record payloads by topic
pub const EXCHANGE_LWGS: &str = "lwgs";
/// Exchange routing empty-payload state shadows by the same topic
pub const EXCHANGE_LWGS_STATE: &str = "lwgs-state";

pub const QUEUE_PARTIAL_INCOMING: &str = "persondata-partial-incoming";
pub const QUEUE_PARTIAL_OUTGOING: &str = "persondata-partial-outgoing";
pub const QUEUE_PARTIAL_FAILED: &str = "persondata-partial-failed";
pub const QUEUE_FULL_INCOMING: &str = "persondata-full-incoming";
pub const QUEUE_FULL_OUTGOING: &str = "persondata-full-outgoing";
pub const QUEUE_FULL_FAILED: &str = "persondata-full-failed";
pub const QUEUE_TRANSACTION_STATE: &str = "transaction-state";
pub const QUEUE_SEDEX_STATE: &str = "sedex-state";
pub const QUEUE_SEDEX_OUTGOING: &str = "sedex-outgoing";

/// All contractual queues, in the order operators expect them listed
pub const ALL_QUEUES: [&str; 9] = [
    QUEUE_PARTIAL_INCOMING,
    QUEUE_PARTIAL_OUTGOING,
    QUEUE_PARTIAL_FAILED,
    QUEUE_FULL_INCOMING,
    QUEUE_FULL_OUTGOING,
    QUEUE_FULL_FAILED,
    QUEUE_TRANSACTION_STATE,
    QUEUE_SEDEX_STATE,
    QUEUE_SEDEX_OUTGOING,
];
