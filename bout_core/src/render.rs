//! Cue rendering seam.
//!
//! The engine only emits events; a `CueRenderer` turns them into sound,
//! speech or text. Rendering is fire-and-forget: a failing renderer is
//! logged and never affects engine state.

use crate::events::Event;
use crate::Result;

/// Consumer of engine events
pub trait CueRenderer {
    fn render(&mut self, event: &Event) -> Result<()>;
}

/// Hand every event to the renderer in order, logging failures
pub fn dispatch<C: CueRenderer + ?Sized>(renderer: &mut C, events: &[Event]) {
    for event in events {
        if let Err(e) = renderer.render(event) {
            tracing::warn!("Cue renderer failed on {:?}: {}", event, e);
        }
    }
}
