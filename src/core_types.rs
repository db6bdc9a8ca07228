//! Core types used throughout the system
//!
//! Fundamental type aliases shared by all modules.

/// Connection ID - unique per accepted TCP connection for the lifetime of
/// the process.
///
/// Sessions are keyed by connection ID, never by socket handle, so the
/// wallet core can track authentication state without owning any I/O.
pub type ConnId = u64;
