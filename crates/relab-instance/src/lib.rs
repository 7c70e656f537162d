//! Reactor instance elaboration
//!
//! This crate turns a validated program into a fully resolved instance tree:
//! - Instance tree construction following the instantiation hierarchy
//! - Parameter resolution with overrides from instantiation sites
//! - Timer, action and port elaboration with concrete timing values
//!
//! The finished [`InstanceTree`] is immutable and is what code generation and
//! scheduling read.

pub mod builder;
pub mod config;
pub mod error;
pub mod instance;
pub mod params;
pub mod trigger;
pub mod value;

pub use builder::Elaborator;
pub use config::{ConfigError, ElaborationConfig};
pub use error::{ElaborationError, ErrorKind, Result};
pub use instance::{DepthFirst, InstanceId, InstanceTree, ReactorInstance};
pub use params::ParameterResolver;
pub use trigger::{
    ActionInstance, PortDirection, PortInstance, TimerInstance, TriggerElaborator,
    TriggerInstance, TriggerKind,
};
pub use value::{ParameterInstance, Provenance, Value};

use relab_ast::Program;

/// Elaborate `program` from its main reactor
pub fn elaborate(program: &Program, config: &ElaborationConfig) -> Result<InstanceTree> {
    let definitions = program.definitions()?;
    Elaborator::new(&definitions, config).elaborate(&program.main)
}
