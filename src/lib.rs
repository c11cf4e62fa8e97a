//! ECSS-PUS command-and-data-handling runtime core.
//!
//! A bounded-resource, single-threaded-cooperative pipeline for
//! onboard telecommand handling and telemetry generation:
//!
//! ```text
//!  inbound:  InStream ─▶ InLoader ─▶ InFactory ─▶ InManager ─▶ handlers
//!  outbound: handlers ─▶ OutFactory ─▶ OutLoader ─▶ OutManager ─▶ OutStream
//! ```
//!
//! Every resource is pre-allocated: packet buffers live in a fixed
//! pool, component instances in factory slots, work lists in bounded
//! arrays.  Exhaustion is reported and sheds the new work; nothing
//! blocks and nothing allocates on the hot path.
//!
//! The embedding application supplies a [`config::FwAppConfig`] of
//! kind tables and adaptation callbacks, constructs a
//! [`framework::Framework`], and drives it once per scheduler cycle.
//! Transports, the data pool, time, and the PUS service bodies are
//! external collaborators behind narrow traits and `fn` pointers.

#![deny(unused_must_use)]

pub mod base;
pub mod cfgcheck;
pub mod config;
pub mod error;
pub mod factory;
pub mod framework;
pub mod incmd;
pub mod inloader;
pub mod inmanager;
pub mod inrep;
pub mod kinds;
pub mod outcmp;
pub mod outloader;
pub mod outmanager;
pub mod packet;
pub mod queue;
pub mod registry;
pub mod stream;
pub mod verif;

#[cfg(test)]
pub(crate) mod testutil;

pub use framework::Framework;
