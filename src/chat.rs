//! Persona group chat
//!
//! A user request is appended to an ordered history; personas take turns
//! replying until the latest reply carries the approval sentinel.

mod driver;
mod group;
mod message;
mod persona;
mod selection;
mod termination;

#[cfg(test)]
mod proptests;

pub use driver::run_pipeline;
pub use group::GroupChat;
pub use message::ChatMessage;
pub use persona::{default_personas, load_personas};
pub use termination::{is_approved, ApprovalTermination, DEFAULT_MAXIMUM_ITERATIONS};
