//! Events emitted by the controller.

use bevy::prelude::*;

/// A jump was applied.
#[derive(Event, Debug, Clone, Copy, PartialEq, Eq)]
pub struct Jumped {
    /// Character that jumped.
    pub entity: Entity,
    /// Index of the consumed jump charge.
    pub charge: usize,
}

/// A dash started.
#[derive(Event, Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dashed {
    pub entity: Entity,
    /// Index of the consumed dash charge.
    pub charge: usize,
}

/// The character reversed against its own motion hard enough to skid.
#[derive(Event, Debug, Clone, Copy, PartialEq, Eq)]
pub struct Burnout {
    pub entity: Entity,
}

/// The character touched valid ground after being airborne.
#[derive(Event, Debug, Clone, Copy, PartialEq, Eq)]
pub struct Landed {
    pub entity: Entity,
}
