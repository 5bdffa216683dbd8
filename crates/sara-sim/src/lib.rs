//! SARA Module Simulation Library
//!
//! Stand-in for a SARA module when testing the driver without hardware. A
//! [`ScriptedModule`] knows which commands to expect and what to answer,
//! including URCs slipped into or after a reply.
//!
//! # Example
//!
//! ```rust
//! use sara_sim::ScriptedModule;
//! use sara_protocol::ModuleVariant;
//!
//! let mut module = ScriptedModule::new(ModuleVariant::SaraN211)
//!     .expect("AT+CSCON=1", &["+CSCON: 1", "OK"]);
//!
//! let reply = module.handle("AT+CSCON=1");
//! assert_eq!(reply, b"\r\n+CSCON: 1\r\n\r\nOK\r\n".to_vec());
//! ```

pub mod module;
pub mod task;

pub use module::{frame_lines, ScriptedModule, SimReport};
pub use task::{run_scripted_module, spawn_scripted_module};
