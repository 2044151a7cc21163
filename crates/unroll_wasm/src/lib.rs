//! WASM bridge for the unrolling simulation.
//!
//! The browser front end owns plotting; this crate only ships parameters in
//! and trajectory columns or summaries out.

mod system;

pub use system::WasmRollSimulation;
