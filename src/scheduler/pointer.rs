//! Pointer tracking
//!
//! Mouse and single-touch input collapse into one pointer. Positions are
//! relative to the surface's bounding rectangle at event time. Idleness is a
//! deadline pushed forward by every position update, read at frame time.

use glam::Vec2;

use crate::consts::POINTER_IDLE_MS;
use crate::renderer::SurfaceRect;

/// Pointer state as seen by one frame
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointerSnapshot {
    pub has_entered: bool,
    pub position: Vec2,
    pub is_down: bool,
    pub is_idle: bool,
}

impl Default for PointerSnapshot {
    fn default() -> Self {
        Self {
            has_entered: false,
            position: Vec2::ZERO,
            is_down: false,
            is_idle: true,
        }
    }
}

#[derive(Debug, Clone)]
pub struct PointerTracker {
    has_entered: bool,
    position: Vec2,
    is_down: bool,
    idle_timeout_ms: f64,
    /// `None` until the first interaction
    idle_at: Option<f64>,
}

impl PointerTracker {
    pub fn new() -> Self {
        Self::with_idle_timeout(POINTER_IDLE_MS)
    }

    pub fn with_idle_timeout(idle_timeout_ms: f64) -> Self {
        Self {
            has_entered: false,
            position: Vec2::ZERO,
            is_down: false,
            idle_timeout_ms,
            idle_at: None,
        }
    }

    /// Pointer moved to client coordinates `client`
    pub fn move_to(&mut self, client: Vec2, rect: SurfaceRect, now: f64) {
        self.position = client - rect.origin();
        self.has_entered = true;
        self.idle_at = Some(now + self.idle_timeout_ms);
    }

    /// Mouse down or touch start
    pub fn press(&mut self, client: Vec2, rect: SurfaceRect, now: f64) {
        self.move_to(client, rect, now);
        self.is_down = true;
    }

    /// Mouse up or touch end. Position and idle timer are untouched.
    pub fn release(&mut self) {
        self.is_down = false;
    }

    pub fn has_entered(&self) -> bool {
        self.has_entered
    }

    pub fn position(&self) -> Vec2 {
        self.position
    }

    pub fn is_down(&self) -> bool {
        self.is_down
    }

    pub fn is_idle(&self, now: f64) -> bool {
        self.idle_at.is_none_or(|at| now >= at)
    }

    pub fn snapshot(&self, now: f64) -> PointerSnapshot {
        PointerSnapshot {
            has_entered: self.has_entered,
            position: self.position,
            is_down: self.is_down,
            is_idle: self.is_idle(now),
        }
    }
}

impl Default for PointerTracker {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(target_arch = "wasm32")]
pub use browser::PointerListeners;

#[cfg(target_arch = "wasm32")]
mod browser {
    use std::cell::RefCell;
    use std::rc::Rc;

    use glam::Vec2;
    use wasm_bindgen::JsCast;
    use wasm_bindgen::prelude::*;
    use web_sys::{Element, Event, MouseEvent, TouchEvent};

    use super::PointerTracker;
    use crate::renderer::SurfaceRect;

    #[derive(Clone, Copy)]
    enum Action {
        Press,
        Move,
        Release,
    }

    const EVENTS: [(&str, Action); 6] = [
        ("mousedown", Action::Press),
        ("mousemove", Action::Move),
        ("mouseup", Action::Release),
        ("touchstart", Action::Press),
        ("touchmove", Action::Move),
        ("touchend", Action::Release),
    ];

    /// DOM listeners feeding a `PointerTracker`. Removed on drop.
    pub struct PointerListeners {
        element: Element,
        closures: Vec<(&'static str, Closure<dyn FnMut(Event)>)>,
    }

    impl PointerListeners {
        pub fn attach(
            element: &Element,
            tracker: Rc<RefCell<PointerTracker>>,
        ) -> Result<Self, JsValue> {
            let mut closures = Vec::with_capacity(EVENTS.len());

            for (name, action) in EVENTS {
                let tracker = tracker.clone();
                let target = element.clone();
                let closure = Closure::<dyn FnMut(_)>::new(move |event: Event| {
                    let now = now_ms();
                    let mut tracker = tracker.borrow_mut();
                    if let Action::Release = action {
                        tracker.release();
                        return;
                    }
                    let Some(client) = client_position(&event) else {
                        return;
                    };
                    let rect = SurfaceRect::from(target.get_bounding_client_rect());
                    match action {
                        Action::Press => tracker.press(client, rect, now),
                        _ => tracker.move_to(client, rect, now),
                    }
                });
                element.add_event_listener_with_callback(name, closure.as_ref().unchecked_ref())?;
                closures.push((name, closure));
            }

            log::debug!("Pointer listeners attached");
            Ok(Self {
                element: element.clone(),
                closures,
            })
        }
    }

    impl Drop for PointerListeners {
        fn drop(&mut self) {
            for (name, closure) in &self.closures {
                let _ = self
                    .element
                    .remove_event_listener_with_callback(name, closure.as_ref().unchecked_ref());
            }
            log::debug!("Pointer listeners removed");
        }
    }

    fn client_position(event: &Event) -> Option<Vec2> {
        if let Some(mouse) = event.dyn_ref::<MouseEvent>() {
            return Some(Vec2::new(mouse.client_x() as f32, mouse.client_y() as f32));
        }
        let touch = event.dyn_ref::<TouchEvent>()?.touches().get(0)?;
        Some(Vec2::new(touch.client_x() as f32, touch.client_y() as f32))
    }

    fn now_ms() -> f64 {
        web_sys::window()
            .and_then(|w| w.performance())
            .map(|p| p.now())
            .unwrap_or_else(js_sys::Date::now)
    }
}
