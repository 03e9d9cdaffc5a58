// LWGS Infrastructure - In-Process Broker Adapter
// Implements the MessageBroker port with AMQP-style topic exchanges,
// queues, ack/nack, redelivery limits and dead-lettering

mod memory_broker;
mod topology;

pub use memory_broker::InMemoryBroker;
pub use topology::declare_standard_topology;
