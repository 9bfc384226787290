//! Browser driver for `FrameClock`
//!
//! Owns the `requestAnimationFrame` closure and the start/stop timers.
//! Dropping the loop cancels any pending frame and timer.

use std::cell::RefCell;
use std::rc::Rc;

use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;

use super::clock::{ClockEvent, ClockState, FrameClock, FrameProps};
use super::pointer::PointerTracker;
use crate::settings::AnimationSettings;

type FrameCallback = Box<dyn FnMut(&mut FrameProps)>;
type Hook = Box<dyn FnMut()>;
type FrameClosure = Rc<RefCell<Option<Closure<dyn FnMut(f64)>>>>;

struct LoopState {
    clock: FrameClock,
    pointer: Rc<RefCell<PointerTracker>>,
    on_frame: Option<FrameCallback>,
    on_start: Option<Hook>,
    on_end: Option<Hook>,
    request_id: Option<i32>,
}

pub struct AnimationLoop {
    state: Rc<RefCell<LoopState>>,
    frame: FrameClosure,
    delay: Option<f64>,
    timers: Vec<(i32, Closure<dyn FnMut()>)>,
}

impl AnimationLoop {
    pub fn new(
        settings: &AnimationSettings,
        pointer: Rc<RefCell<PointerTracker>>,
        on_frame: impl FnMut(&mut FrameProps) + 'static,
    ) -> Self {
        let mut clock = FrameClock::new();
        clock.configure(settings.target_fps, settings.end_after_ms);

        let state = Rc::new(RefCell::new(LoopState {
            clock,
            pointer,
            on_frame: Some(Box::new(on_frame)),
            on_start: None,
            on_end: None,
            request_id: None,
        }));

        let frame: FrameClosure = Rc::new(RefCell::new(None));
        {
            let state = state.clone();
            let frame_handle = frame.clone();
            *frame.borrow_mut() = Some(Closure::<dyn FnMut(_)>::new(move |time: f64| {
                run_frame(&state, &frame_handle, time);
            }));
        }

        Self {
            state,
            frame,
            delay: settings.delay_ms,
            timers: Vec::new(),
        }
    }

    pub fn on_start(self, hook: impl FnMut() + 'static) -> Self {
        self.state.borrow_mut().on_start = Some(Box::new(hook));
        self
    }

    pub fn on_end(self, hook: impl FnMut() + 'static) -> Self {
        self.state.borrow_mut().on_end = Some(Box::new(hook));
        self
    }

    pub fn is_playing(&self) -> bool {
        self.state.borrow().clock.is_playing()
    }

    /// Start after the configured delay. No-op unless stopped.
    pub fn start(&mut self) -> Result<(), JsValue> {
        let now = now_ms();
        if !self.state.borrow_mut().clock.start(now, self.delay) {
            return Ok(());
        }
        self.clear_timers();
        dispatch(&self.state, &self.frame, now)?;

        let window = web_sys::window().ok_or("no window")?;
        let deadlines = {
            let state = self.state.borrow();
            let clock = &state.clock;
            let start_at = match clock.state() {
                ClockState::Pending { start_at } => Some(start_at),
                _ => None,
            };
            start_at.into_iter().chain(clock.end_at()).collect::<Vec<_>>()
        };

        for deadline in deadlines {
            let state = self.state.clone();
            let frame = self.frame.clone();
            let timer = Closure::<dyn FnMut()>::new(move || {
                let now = now_ms().max(deadline);
                if let Err(e) = dispatch(&state, &frame, now) {
                    log::error!("Animation timer failed: {:?}", e);
                }
            });
            let id = window.set_timeout_with_callback_and_timeout_and_arguments_0(
                timer.as_ref().unchecked_ref(),
                (deadline - now).max(0.0) as i32,
            )?;
            self.timers.push((id, timer));
        }
        Ok(())
    }

    /// Stop and cancel the pending frame. Idempotent.
    pub fn stop(&mut self) {
        self.clear_timers();
        let mut state = self.state.borrow_mut();
        state.clock.stop();
        cancel_frame(&mut state);
    }

    fn clear_timers(&mut self) {
        if let Some(window) = web_sys::window() {
            for (id, _) in &self.timers {
                window.clear_timeout_with_handle(*id);
            }
        }
        self.timers.clear();
    }
}

impl Drop for AnimationLoop {
    fn drop(&mut self) {
        self.stop();
        // Break the closure's reference back to itself
        self.frame.borrow_mut().take();
    }
}

fn run_frame(state: &Rc<RefCell<LoopState>>, frame: &FrameClosure, time: f64) {
    let (props, callback) = {
        let mut s = state.borrow_mut();
        s.request_id = None;
        let pointer = s.pointer.borrow().snapshot(time);
        let props = s.clock.frame(time, pointer);
        let callback = if props.is_some() { s.on_frame.take() } else { None };
        (props, callback)
    };

    if let (Some(mut props), Some(mut callback)) = (props, callback) {
        callback(&mut props);
        state.borrow_mut().on_frame = Some(callback);

        if let Some(request) = props.request.take() {
            let event = state.borrow_mut().clock.apply(request, time);
            if let Some(event) = event {
                fire(state, event);
            }
        }
    }

    if let Err(e) = dispatch(state, frame, time) {
        log::error!("Animation frame failed: {:?}", e);
    }
}

/// Resolve due clock deadlines, then keep a frame queued while running
fn dispatch(state: &Rc<RefCell<LoopState>>, frame: &FrameClosure, now: f64) -> Result<(), JsValue> {
    loop {
        let event = state.borrow_mut().clock.poll(now);
        match event {
            Some(event) => fire(state, event),
            None => break,
        }
    }

    let (running, queued) = {
        let s = state.borrow();
        (s.clock.is_playing(), s.request_id.is_some())
    };
    if !running {
        cancel_frame(&mut state.borrow_mut());
    } else if !queued {
        let window = web_sys::window().ok_or("no window")?;
        if let Some(closure) = frame.borrow().as_ref() {
            let id = window.request_animation_frame(closure.as_ref().unchecked_ref())?;
            state.borrow_mut().request_id = Some(id);
        }
    }
    Ok(())
}

fn fire(state: &Rc<RefCell<LoopState>>, event: ClockEvent) {
    let hook = {
        let mut s = state.borrow_mut();
        match event {
            ClockEvent::Started => s.on_start.take(),
            ClockEvent::Ended => {
                cancel_frame(&mut s);
                s.on_end.take()
            }
        }
    };
    if let Some(mut hook) = hook {
        hook();
        let mut s = state.borrow_mut();
        match event {
            ClockEvent::Started => s.on_start = Some(hook),
            ClockEvent::Ended => s.on_end = Some(hook),
        }
    }
}

fn cancel_frame(state: &mut LoopState) {
    if let Some(id) = state.request_id.take() {
        if let Some(window) = web_sys::window() {
            let _ = window.cancel_animation_frame(id);
        }
    }
}

fn now_ms() -> f64 {
    web_sys::window()
        .and_then(|w| w.performance())
        .map(|p| p.now())
        .unwrap_or_else(js_sys::Date::now)
}
