//! Wire formats spoken by quickping.

pub mod icmp;
