//! Read entities definitions.

pub mod reservation;

/// Selector of the next free ID of an entity, drawn from its sequence.
#[derive(Clone, Copy, Debug, Default)]
pub struct NextId;
