//! Picking hooks.
//!
//! Contour objects take part in the host's id-rendering pass by recording a
//! pick offset, but turning a hover into a hit is left to a [`PickResolver`]
//! supplied by the integrator. The default resolver reports nothing under the
//! cursor.

use crate::bounds::Bounds;
use crate::mesh::ContourMesh;

/// A hover/pick query coming from the host.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PickQuery {
    pub x: f64,
    pub y: f64,
    /// Decoded id-buffer value under the cursor, when the host has one.
    pub value: Option<f64>,
}

/// A resolved hit.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PickResult {
    pub index: u32,
    pub position: [f64; 2],
    pub value: f64,
}

/// What a resolver gets to look at: the derived geometry (including the
/// uploaded pick ids), the data bounds and the recorded pick offset.
#[derive(Debug, Clone, Copy)]
pub struct PickContext<'a> {
    pub bounds: &'a Bounds,
    pub mesh: &'a ContourMesh,
    pub pick_offset: u32,
}

pub trait PickResolver {
    fn resolve(&self, context: &PickContext<'_>, query: &PickQuery) -> Option<PickResult>;
}

impl<F> PickResolver for F
where
    F: Fn(&PickContext<'_>, &PickQuery) -> Option<PickResult>,
{
    fn resolve(&self, context: &PickContext<'_>, query: &PickQuery) -> Option<PickResult> {
        self(context, query)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NoPickResolver;

impl PickResolver for NoPickResolver {
    fn resolve(&self, _context: &PickContext<'_>, _query: &PickQuery) -> Option<PickResult> {
        None
    }
}
