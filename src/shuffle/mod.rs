//! Cryptographically strong shuffling.
//!
//! [`SecureShuffle`] is the single randomness object threaded through heat
//! generation, local search and result simulation. Without a seed it draws
//! from the operating system's entropy source, so heat order cannot be
//! predicted or gamed; with a seed every permutation is reproducible.

mod secure;

pub use secure::SecureShuffle;
