use std::cell::{Cell, RefCell};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::core::Key;

/// Default settle delay for user-interaction bursts. Brush drags and other
/// rapid gestures collapse to one refresh per quiet window of this length.
pub const EVENT_DELAY: Duration = Duration::from_millis(40);

/// Handle for a scheduled action. Tokens are never reused within a trigger,
/// so a stale token can be cancelled harmlessly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EventToken(u64);

struct Pending<A> {
    token: EventToken,
    remaining: Duration,
    action: A,
}

/// Single-slot deferred-action queue.
///
/// Scheduling while an action is pending discards the pending one, so of a
/// burst of triggers only the last survives. Time only advances through
/// [`EventTrigger::pump`]; the host decides when to call it, which keeps
/// interaction sequences reproducible in tests.
pub struct EventTrigger<A> {
    slot: RefCell<Option<Pending<A>>>,
    next_token: Cell<u64>,
}

impl<A> Default for EventTrigger<A> {
    fn default() -> Self {
        Self {
            slot: RefCell::new(None),
            next_token: Cell::new(0),
        }
    }
}

impl<A> EventTrigger<A> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues `action` to run once `delay` has been pumped, superseding any
    /// pending action.
    pub fn schedule(&self, delay: Duration, action: A) -> EventToken {
        let token = EventToken(self.next_token.get());
        self.next_token.set(token.0 + 1);
        *self.slot.borrow_mut() = Some(Pending {
            token,
            remaining: delay,
            action,
        });
        token
    }

    /// Drops the pending action if `token` still owns the slot. Returns
    /// whether anything was cancelled.
    pub fn cancel(&self, token: EventToken) -> bool {
        let mut slot = self.slot.borrow_mut();
        if slot.as_ref().is_some_and(|pending| pending.token == token) {
            *slot = None;
            true
        } else {
            false
        }
    }

    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.slot.borrow().is_some()
    }

    /// Advances the trigger clock by `elapsed` and hands back the pending
    /// action if its delay has expired. The caller runs it outside any
    /// borrow of the trigger.
    pub fn pump(&self, elapsed: Duration) -> Option<A> {
        let mut slot = self.slot.borrow_mut();
        let due = match slot.as_mut() {
            Some(pending) if pending.remaining <= elapsed => true,
            Some(pending) => {
                pending.remaining -= elapsed;
                false
            }
            None => false,
        };
        if due {
            slot.take().map(|pending| pending.action)
        } else {
            None
        }
    }
}

/// Live brush gesture state on a coordinate-grid chart.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BrushState {
    pub extent: Option<(Key, Key)>,
    pub dragging: bool,
}

impl BrushState {
    /// An extent whose endpoints coincide selects nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        match &self.extent {
            None => true,
            Some((low, high)) => low == high,
        }
    }
}

/// Zoom gesture policy for a coordinate-grid chart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ZoomBehavior {
    pub mouse_zoomable: bool,
    /// Allowed magnification range relative to the unzoomed domain.
    pub scale_extent: (f64, f64),
    /// Clamp zoomed-out domains to the original domain's bounds.
    pub zoom_out_restrict: bool,
}

impl Default for ZoomBehavior {
    fn default() -> Self {
        Self {
            mouse_zoomable: false,
            scale_extent: (1.0, f64::INFINITY),
            zoom_out_restrict: true,
        }
    }
}
