//! Frame scheduling
//!
//! - `clock`: Throttled frame clock with rolling FPS, start delay and auto-stop
//! - `pointer`: Pointer position, press and idle tracking
//! - `animation`: `requestAnimationFrame` driver (wasm only)

#[cfg(target_arch = "wasm32")]
pub mod animation;
pub mod clock;
pub mod pointer;

#[cfg(target_arch = "wasm32")]
pub use animation::AnimationLoop;
pub use clock::{ClockEvent, ClockState, FrameClock, FrameProps, PlaybackRequest};
#[cfg(target_arch = "wasm32")]
pub use pointer::PointerListeners;
pub use pointer::{PointerSnapshot, PointerTracker};
