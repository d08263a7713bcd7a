//! RTK correction forwarding is out of scope for this process (no network
//! daemon lives here) but the wire contract is still worth pinning down so
//! an out-of-tree forwarder can be written against it without guessing
//! framing. See [`contract`].

pub mod contract;
