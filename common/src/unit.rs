//! Marker types distinguishing [`DateTimeOf`] kinds.
//!
//! [`DateTimeOf`]: crate::DateTimeOf

/// Marker of the moment an entity was created or issued.
#[derive(Clone, Copy, Debug)]
pub struct Creation;

/// Marker of the moment an event starts.
#[derive(Clone, Copy, Debug)]
pub struct Start;

/// Marker of the moment an event is scheduled to end.
#[derive(Clone, Copy, Debug)]
pub struct End;

/// Marker of the moment an event actually ended.
#[derive(Clone, Copy, Debug)]
pub struct EffectiveEnd;

/// Marker of the moment a payment is due.
#[derive(Clone, Copy, Debug)]
pub struct Due;

/// Marker of the moment a payment was made.
#[derive(Clone, Copy, Debug)]
pub struct Payment;
