//! Deterministic Simulation Testing (DST) infrastructure.
//!
//! This module provides tools for testing the authentication core with:
//! - Controlled time (no real system time)
//! - Fault injection at the user store and revocation registry
//! - Reproducible random operation streams
//! - Invariant checking after each operation
//!
//! # Design Principles
//!
//! 1. All I/O is abstracted behind traits and can be simulated
//! 2. All randomness that affects outcomes is seeded
//! 3. Time is controlled, not real
//! 4. Given the same seed, the outcome summary is identical
//!
//! # Usage
//!
//! ```no_run
//! use auth_service::simulation::{FaultConfig, Simulator, SimulatorConfig};
//!
//! let config = SimulatorConfig::new(12345).with_fault_config(FaultConfig::low_faults());
//! let mut sim = Simulator::new(config);
//! let result = sim.run(1000);
//!
//! assert!(result.invariant_violations.is_empty());
//! ```

mod faults;
mod invariants;
mod simulator;
mod time;

pub use faults::{FaultConfig, FaultyRevocationStore, FaultyUserStore};
pub use invariants::{InvariantChecker, InvariantViolation, OperationHistory, TokenRecord};
pub use simulator::{SimulationResult, Simulator, SimulatorConfig};
pub use time::SimulatedClock;
