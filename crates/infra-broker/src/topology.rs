// Standard Broker Topology
//
// Declares the contractual exchanges, queues and bindings: record queues
// bound to `lwgs` by their own topic, the state queues collecting the
// matching shadows from `lwgs-state`, and the incoming record queues
// dead-lettering into their `-failed` peers.

use lwgs_core::domain::topology::*;
use lwgs_core::error::Result;

use crate::InMemoryBroker;

pub fn declare_standard_topology(broker: &InMemoryBroker) -> Result<()> {
    broker.declare_exchange(EXCHANGE_LWGS);
    broker.declare_exchange(EXCHANGE_LWGS_STATE);

    broker.declare_queue(QUEUE_PARTIAL_INCOMING, Some(QUEUE_PARTIAL_FAILED));
    broker.declare_queue(QUEUE_PARTIAL_OUTGOING, None);
    broker.declare_queue(QUEUE_PARTIAL_FAILED, None);
    broker.declare_queue(QUEUE_FULL_INCOMING, Some(QUEUE_FULL_FAILED));
    broker.declare_queue(QUEUE_FULL_OUTGOING, None);
    broker.declare_queue(QUEUE_FULL_FAILED, None);
    broker.declare_queue(QUEUE_TRANSACTION_STATE, None);
    broker.declare_queue(QUEUE_SEDEX_STATE, None);
    broker.declare_queue(QUEUE_SEDEX_OUTGOING, None);

    // Record payloads route to the queue named like their topic
    for queue in [
        QUEUE_PARTIAL_INCOMING,
        QUEUE_PARTIAL_OUTGOING,
        QUEUE_FULL_INCOMING,
        QUEUE_FULL_OUTGOING,
        QUEUE_SEDEX_OUTGOING,
    ] {
        broker.bind(EXCHANGE_LWGS, queue, queue)?;
    }

    // State shadows of person-data topics collect in transaction-state
    for topic in [
        QUEUE_PARTIAL_INCOMING,
        QUEUE_PARTIAL_OUTGOING,
        QUEUE_PARTIAL_FAILED,
        QUEUE_FULL_INCOMING,
        QUEUE_FULL_OUTGOING,
        QUEUE_FULL_FAILED,
    ] {
        broker.bind(EXCHANGE_LWGS_STATE, topic, QUEUE_TRANSACTION_STATE)?;
    }

    // Sedex transport state collects in sedex-state
    broker.bind(EXCHANGE_LWGS_STATE, QUEUE_SEDEX_OUTGOING, QUEUE_SEDEX_STATE)?;

    Ok(())
}
