//! One participant's view of a shared canvas.
//!
//! Ties a [`Document`] to a [`ViewStateEngine`] and a [`GestureAction`].
//! Everything runs on one thread: document notifications only park the
//! latest snapshot in a pending slot, and [`Session::pump`] runs the
//! recompute pass later, so a pass never overlaps another.

use crate::crdt::{CrdtDocument, VersionVector};
use crate::document::{Document, DocumentSnapshot};
use crate::error::Error;
use crate::geometry::Bounds;
use crate::gesture::{GestureAction, GestureConfig, GestureState};
use crate::ids::{IdGenerator, UuidGenerator};
use crate::input::PointerEvent;
use crate::subscription::SubscriptionId;
use crate::view::{ViewState, ViewStateEngine};
use std::cell::RefCell;
use std::rc::Rc;

pub struct Session<D: Document> {
    document: D,
    engine: ViewStateEngine,
    gesture: GestureAction,
    ids: Box<dyn IdGenerator>,
    /// Latest unprocessed snapshot. Newer ones replace older ones.
    pending: Rc<RefCell<Option<DocumentSnapshot>>>,
    subscription: SubscriptionId,
}

impl<D: Document> Session<D> {
    /// Session with default thresholds and random ids.
    pub fn new(document: D, bounds: Bounds) -> Result<Self, Error> {
        Self::with_config(document, bounds, GestureConfig::default(), Box::new(UuidGenerator))
    }

    pub fn with_config(
        mut document: D,
        bounds: Bounds,
        config: GestureConfig,
        ids: Box<dyn IdGenerator>,
    ) -> Result<Self, Error> {
        let pending = Rc::new(RefCell::new(None));
        let slot = Rc::clone(&pending);
        let subscription = document.subscribe(Box::new(move |snapshot: &DocumentSnapshot| {
            *slot.borrow_mut() = Some(snapshot.clone());
        }));

        let mut engine = ViewStateEngine::new(bounds);
        engine.recompute(&document.snapshot())?;

        Ok(Self {
            document,
            engine,
            gesture: GestureAction::new(config),
            ids,
            pending,
            subscription,
        })
    }

    pub fn document(&self) -> &D {
        &self.document
    }

    /// Direct access for changes made outside of gestures. Call
    /// [`Session::pump`] afterwards to refresh the view.
    pub fn document_mut(&mut self) -> &mut D {
        &mut self.document
    }

    pub fn engine(&self) -> &ViewStateEngine {
        &self.engine
    }

    /// For subscribing renderers to the view.
    pub fn engine_mut(&mut self) -> &mut ViewStateEngine {
        &mut self.engine
    }

    pub fn view(&self) -> &ViewState {
        self.engine.view()
    }

    pub fn gesture_state(&self) -> &GestureState {
        self.gesture.state()
    }

    /// Run the gesture machine and apply whatever it asks for.
    pub fn handle_pointer(&mut self, event: PointerEvent) -> Result<(), Error> {
        let edit = self.gesture.handle(event, &self.engine, self.ids.as_mut())?;
        if let Some(edit) = edit {
            if let Err(err) = edit.apply(&mut self.document, self.ids.as_mut()) {
                // A gesture whose first edit failed has nothing to act on.
                if matches!(event, PointerEvent::Down { .. }) {
                    log::warn!("Pointer down rejected: {}", err);
                    self.gesture.cancel();
                }
                return Err(err.into());
            }
        }
        self.pump()?;
        Ok(())
    }

    /// Recompute from the pending snapshot, if any. Returns whether a
    /// pass ran.
    pub fn pump(&mut self) -> Result<bool, Error> {
        let pending = self.pending.borrow_mut().take();
        let Some(snapshot) = pending else {
            return Ok(false);
        };
        self.engine.recompute(&snapshot)?;
        Ok(true)
    }

    pub fn resize(&mut self, bounds: Bounds) -> &ViewState {
        self.engine.set_bounds(bounds)
    }

    /// Detach from the document and hand it back.
    pub fn into_document(mut self) -> D {
        self.document.unsubscribe(self.subscription);
        self.document
    }
}

impl Session<CrdtDocument> {
    /// Merge bytes from a peer and refresh the view.
    pub fn import_remote(&mut self, bytes: &[u8]) -> Result<(), Error> {
        self.document.import(bytes)?;
        self.pump()?;
        Ok(())
    }

    pub fn export_snapshot(&self) -> Vec<u8> {
        self.document.export_snapshot()
    }

    pub fn export_updates(&self, since: &VersionVector) -> Vec<u8> {
        self.document.export_updates(since)
    }

    pub fn version(&self) -> VersionVector {
        self.document.version()
    }
}
