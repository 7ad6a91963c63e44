pub mod gpu;
pub mod input;
pub mod surface;
pub mod simulator;

// Arithmetic and animation core
pub mod arithmetic;
pub mod scheduler;
pub mod flow;

// Circuit presentation
pub mod layout;
pub mod palette;

#[cfg(not(target_arch = "wasm32"))]
pub mod cli;

#[cfg(target_arch = "wasm32")]
pub mod wasm;
