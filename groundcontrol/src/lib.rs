//! Ground Control
//!
//! The concurrent engine for the Ground Control satellite-swarm broker: the
//! Acceptor, the Reader, the Router pool, and the `Core` supervisor that
//! owns their lifecycle. Built on top of the protocol-agnostic kernel in
//! `groundcontrol-core` (the wire codec, the guarded satellite set and
//! subscription index, the event queue).
//!
//! ```no_run
//! use groundcontrol::config::CoreConfig;
//! use groundcontrol::supervisor::Core;
//!
//! let core = Core::new(CoreConfig::default());
//! core.start().expect("start");
//! // ... satellites connect, publish, and subscribe over TCP ...
//! core.shutdown().expect("clean shutdown");
//! ```

pub mod acceptor;
pub mod config;
pub mod dev_tracing;
pub mod error;
pub mod reader;
pub mod router;
pub mod supervisor;

pub use config::CoreConfig;
pub use error::{CoreError, Result, WorkerId};
pub use supervisor::{Core, CoreState};
