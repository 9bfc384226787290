//! Frame clock
//!
//! Pure, timestamp-driven state machine behind the animation loop. The
//! browser driver feeds it `requestAnimationFrame` timestamps and timer
//! callbacks; tests feed it synthetic milliseconds.

use std::collections::VecDeque;

use glam::Vec2;

use super::pointer::PointerSnapshot;
use crate::consts::*;
use crate::mean;

/// Start/stop request made from inside a frame callback
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackRequest {
    Start,
    Stop,
}

/// Everything a frame callback gets to see
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FrameProps {
    /// Executed frames so far, starting at 1
    pub frame_count: u64,
    /// Milliseconds since the clock started
    pub elapsed_time: f64,
    /// FPS averaged over the last `FPS_WINDOW` executed frames
    pub fps: f64,
    pub is_playing: bool,
    /// True once the pointer has interacted with the surface
    pub mouse_has_entered: bool,
    /// Pointer position relative to the surface's top-left corner
    pub mouse_position: Vec2,
    pub mouse_is_down: bool,
    pub mouse_is_idle: bool,
    /// Applied by the clock's driver after the callback returns
    pub request: Option<PlaybackRequest>,
}

impl FrameProps {
    pub fn start_animation(&mut self) {
        self.request = Some(PlaybackRequest::Start);
    }

    pub fn stop_animation(&mut self) {
        self.request = Some(PlaybackRequest::Stop);
    }
}

/// Lifecycle transitions reported by `FrameClock::poll`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClockEvent {
    /// Start delay elapsed, frames will now execute
    Started,
    /// Auto-stop deadline reached
    Ended,
}

/// Clock state
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ClockState {
    Stopped,
    /// Waiting for the start delay to elapse
    Pending { start_at: f64 },
    Running,
}

#[derive(Debug, Clone)]
pub struct FrameClock {
    state: ClockState,
    target_fps: Option<f64>,
    end_after_ms: Option<f64>,
    end_at: Option<f64>,

    start_time: f64,
    prev_frame_time: f64,
    frame_count: u64,
    elapsed_time: f64,

    fps_window: VecDeque<f64>,
    average_fps: f64,
}

impl FrameClock {
    pub fn new() -> Self {
        let mut clock = Self {
            state: ClockState::Stopped,
            target_fps: None,
            end_after_ms: None,
            end_at: None,
            start_time: 0.0,
            prev_frame_time: 0.0,
            frame_count: 1,
            elapsed_time: 0.0,
            fps_window: VecDeque::with_capacity(FPS_WINDOW),
            average_fps: DEFAULT_FPS,
        };
        clock.reset_fps();
        clock
    }

    /// Set the throttle target and auto-stop duration. Non-positive values disable them.
    pub fn configure(&mut self, target_fps: Option<f64>, end_after_ms: Option<f64>) {
        self.target_fps = target_fps.filter(|fps| *fps > 0.0);
        self.end_after_ms = end_after_ms.filter(|ms| *ms > 0.0);
        self.reset_fps();
    }

    pub fn state(&self) -> ClockState {
        self.state
    }

    pub fn is_playing(&self) -> bool {
        self.state == ClockState::Running
    }

    pub fn average_fps(&self) -> f64 {
        self.average_fps
    }

    pub fn target_fps(&self) -> Option<f64> {
        self.target_fps
    }

    /// Request a start `delay_ms` from `now`. The transition itself happens
    /// in `poll`. No-op unless stopped.
    ///
    /// The auto-stop deadline is measured from this call, so an `end_after`
    /// shorter than the delay cancels the pending start.
    pub fn start(&mut self, now: f64, delay_ms: Option<f64>) -> bool {
        if self.state != ClockState::Stopped {
            return false;
        }
        let delay = delay_ms.unwrap_or(0.0).max(0.0);
        self.state = ClockState::Pending {
            start_at: now + delay,
        };
        self.end_at = self.end_after_ms.map(|ms| now + ms);
        log::debug!("Frame clock pending (delay {} ms)", delay);
        true
    }

    /// Stop immediately. Returns false if already stopped.
    pub fn stop(&mut self) -> bool {
        if self.state == ClockState::Stopped {
            return false;
        }
        self.state = ClockState::Stopped;
        self.end_at = None;
        log::debug!("Frame clock stopped after {} frames", self.frame_count - 1);
        true
    }

    /// Auto-stop deadline, once started
    pub fn end_at(&self) -> Option<f64> {
        self.end_at
    }

    /// Earliest pending timer deadline (start delay or auto-stop)
    pub fn next_deadline(&self) -> Option<f64> {
        let start = match self.state {
            ClockState::Pending { start_at } => Some(start_at),
            _ => None,
        };
        match (start, self.end_at) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }

    /// Resolve due deadlines. Call until it returns `None`.
    pub fn poll(&mut self, now: f64) -> Option<ClockEvent> {
        if let Some(end_at) = self.end_at {
            let start_due_first = matches!(
                self.state,
                ClockState::Pending { start_at } if start_at < end_at && now >= start_at
            );
            if now >= end_at && !start_due_first {
                self.stop();
                return Some(ClockEvent::Ended);
            }
        }

        if let ClockState::Pending { start_at } = self.state {
            if now >= start_at {
                self.begin(now);
                return Some(ClockEvent::Started);
            }
        }
        None
    }

    fn begin(&mut self, now: f64) {
        self.state = ClockState::Running;
        self.start_time = now;
        self.prev_frame_time = now;
        self.frame_count = 1;
        self.elapsed_time = 0.0;
        self.reset_fps();
        log::debug!("Frame clock running");
    }

    fn reset_fps(&mut self) {
        let baseline = self.target_fps.unwrap_or(DEFAULT_FPS);
        self.fps_window.clear();
        self.fps_window.extend(std::iter::repeat_n(baseline, FPS_WINDOW));
        self.average_fps = baseline;
    }

    /// Handle one display refresh at `now`.
    ///
    /// Returns `None` when stopped or when the throttle skips this refresh.
    /// Skipped refreshes are dropped, not queued.
    pub fn frame(&mut self, now: f64, pointer: PointerSnapshot) -> Option<FrameProps> {
        if self.state != ClockState::Running {
            return None;
        }

        let delta_ms = now - self.prev_frame_time;
        if let Some(target) = self.target_fps {
            if delta_ms < 1000.0 / target {
                return None;
            }
        }

        self.elapsed_time = now - self.start_time;
        // rAF timestamps can predate the start call by a fraction of a frame
        if delta_ms > 0.0 {
            let instantaneous = (1000.0 / delta_ms).round();
            if self.fps_window.len() == FPS_WINDOW {
                self.fps_window.pop_front();
            }
            self.fps_window.push_back(instantaneous);
            self.average_fps = mean(self.fps_window.iter().copied());
        }
        self.prev_frame_time = now;

        let props = FrameProps {
            frame_count: self.frame_count,
            elapsed_time: self.elapsed_time,
            fps: self.average_fps,
            is_playing: true,
            mouse_has_entered: pointer.has_entered,
            mouse_position: pointer.position,
            mouse_is_down: pointer.is_down,
            mouse_is_idle: pointer.is_idle,
            request: None,
        };
        self.frame_count += 1;

        log::trace!(
            "frame {} at {:.1} ms ({:.1} fps)",
            props.frame_count,
            props.elapsed_time,
            props.fps
        );
        Some(props)
    }

    /// Apply a request made by a frame callback
    pub fn apply(&mut self, request: PlaybackRequest, now: f64) -> Option<ClockEvent> {
        match request {
            PlaybackRequest::Start => {
                self.start(now, None);
                self.poll(now)
            }
            PlaybackRequest::Stop => {
                self.stop();
                None
            }
        }
    }
}

impl Default for FrameClock {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn running_clock() -> FrameClock {
        let mut clock = FrameClock::new();
        clock.start(0.0, None);
        assert_eq!(clock.poll(0.0), Some(ClockEvent::Started));
        clock
    }

    fn idle() -> PointerSnapshot {
        PointerSnapshot::default()
    }

    #[test]
    fn test_stopped_clock_runs_no_frames() {
        let mut clock = FrameClock::new();
        assert!(clock.frame(16.0, idle()).is_none());
        assert!(!clock.is_playing());
    }

    #[test]
    fn test_frame_count_starts_at_one() {
        let mut clock = running_clock();
        let first = clock.frame(16.0, idle()).unwrap();
        let second = clock.frame(32.0, idle()).unwrap();
        assert_eq!(first.frame_count, 1);
        assert_eq!(second.frame_count, 2);
        assert_eq!(second.elapsed_time, 32.0);
        assert!(second.is_playing);
    }

    #[test]
    fn test_rolling_fps_converges() {
        let mut clock = running_clock();
        let mut last = None;
        for i in 1..=25 {
            last = clock.frame(i as f64 * 30.0, idle());
        }
        assert_eq!(last.unwrap().fps, 33.0);
    }

    #[test]
    fn test_21st_sample_evicts_first() {
        let mut clock = running_clock();
        // One 100 fps sample, then 30 ms frames
        clock.frame(10.0, idle()).unwrap();
        let mut t = 10.0;
        let mut props = None;
        for _ in 0..19 {
            t += 30.0;
            props = clock.frame(t, idle());
        }
        let twentieth = props.unwrap().fps;
        assert!((twentieth - (100.0 + 19.0 * 33.0) / 20.0).abs() < 1e-9);

        t += 30.0;
        let twenty_first = clock.frame(t, idle()).unwrap().fps;
        assert_eq!(twenty_first, 33.0);
    }

    #[test]
    fn test_window_prefilled_with_baseline() {
        let mut clock = running_clock();
        let first = clock.frame(25.0, idle()).unwrap();
        // 19 baseline samples of 60 and one of 40
        assert!((first.fps - (19.0 * 60.0 + 40.0) / 20.0).abs() < 1e-9);
    }

    #[test]
    fn test_throttle_skips_early_refreshes() {
        let mut clock = FrameClock::new();
        clock.configure(Some(30.0), None);
        clock.start(0.0, None);
        clock.poll(0.0);

        // 60 Hz display, 30 fps target: every other refresh executes
        let executed: Vec<u64> = (1..=8)
            .filter_map(|i| clock.frame(i as f64 * 16.7, idle()))
            .map(|p| p.frame_count)
            .collect();
        assert_eq!(executed, vec![1, 2, 3, 4]);
        assert_eq!(clock.average_fps(), 30.0);
    }

    #[test]
    fn test_non_positive_timestamps_delta_keeps_average() {
        let mut clock = running_clock();
        let props = clock.frame(0.0, idle()).unwrap();
        assert_eq!(props.fps, DEFAULT_FPS);
    }

    #[test]
    fn test_delayed_start() {
        let mut clock = FrameClock::new();
        assert!(clock.start(100.0, Some(500.0)));
        assert_eq!(clock.next_deadline(), Some(600.0));
        assert_eq!(clock.poll(599.0), None);
        assert!(clock.frame(599.0, idle()).is_none());
        assert_eq!(clock.poll(600.0), Some(ClockEvent::Started));
        assert_eq!(clock.poll(600.0), None);
        assert!(clock.is_playing());
    }

    #[test]
    fn test_auto_stop() {
        let mut clock = FrameClock::new();
        clock.configure(None, Some(1000.0));
        clock.start(0.0, None);
        assert_eq!(clock.poll(0.0), Some(ClockEvent::Started));
        assert_eq!(clock.next_deadline(), Some(1000.0));
        assert!(clock.frame(500.0, idle()).is_some());
        assert_eq!(clock.poll(1000.0), Some(ClockEvent::Ended));
        assert!(!clock.is_playing());
        assert!(clock.frame(1016.0, idle()).is_none());
        assert_eq!(clock.poll(2000.0), None);
    }

    #[test]
    fn test_delay_then_auto_stop_in_one_poll_window() {
        let mut clock = FrameClock::new();
        clock.configure(None, Some(300.0));
        clock.start(0.0, Some(100.0));
        // Both deadlines passed: start first, then end
        assert_eq!(clock.poll(400.0), Some(ClockEvent::Started));
        assert_eq!(clock.poll(400.0), Some(ClockEvent::Ended));
        assert_eq!(clock.poll(400.0), None);
    }

    #[test]
    fn test_end_before_delay_cancels_start() {
        let mut clock = FrameClock::new();
        clock.configure(None, Some(100.0));
        clock.start(0.0, Some(500.0));
        assert_eq!(clock.poll(100.0), Some(ClockEvent::Ended));
        assert_eq!(clock.poll(600.0), None);
        assert_eq!(clock.state(), ClockState::Stopped);
    }

    #[test]
    fn test_stop_is_idempotent() {
        let mut clock = running_clock();
        assert!(clock.stop());
        assert!(!clock.stop());
        assert!(!FrameClock::new().stop());
    }

    #[test]
    fn test_stop_cancels_pending_start() {
        let mut clock = FrameClock::new();
        clock.start(0.0, Some(200.0));
        assert!(clock.stop());
        assert_eq!(clock.poll(300.0), None);
        assert!(!clock.is_playing());
    }

    #[test]
    fn test_restart_resets_counters() {
        let mut clock = running_clock();
        clock.frame(16.0, idle());
        clock.frame(32.0, idle());
        clock.stop();

        clock.start(1000.0, None);
        clock.poll(1000.0);
        let props = clock.frame(1016.0, idle()).unwrap();
        assert_eq!(props.frame_count, 1);
        assert_eq!(props.elapsed_time, 16.0);
    }

    #[test]
    fn test_start_after_frame_requested_stop() {
        let mut clock = running_clock();
        let mut props = clock.frame(16.0, idle()).unwrap();
        props.stop_animation();
        clock.apply(props.request.take().unwrap(), 16.0);
        assert!(clock.frame(32.0, idle()).is_none());

        assert!(clock.start(5000.0, None));
        assert_eq!(clock.poll(5000.0), Some(ClockEvent::Started));
        let resumed = clock.frame(5016.0, idle()).unwrap();
        assert_eq!(resumed.frame_count, 1);
        assert!(resumed.is_playing);
    }

    #[test]
    fn test_callback_requests() {
        let mut clock = running_clock();
        let mut props = clock.frame(16.0, idle()).unwrap();
        props.stop_animation();
        let request = props.request.take().unwrap();
        assert_eq!(clock.apply(request, 16.0), None);
        assert!(!clock.is_playing());

        assert_eq!(
            clock.apply(PlaybackRequest::Start, 50.0),
            Some(ClockEvent::Started)
        );
        assert!(clock.is_playing());
    }

    #[test]
    fn test_pointer_snapshot_is_forwarded() {
        let mut clock = running_clock();
        let pointer = PointerSnapshot {
            has_entered: true,
            position: Vec2::new(12.0, 34.0),
            is_down: true,
            is_idle: false,
        };
        let props = clock.frame(16.0, pointer).unwrap();
        assert!(props.mouse_has_entered);
        assert_eq!(props.mouse_position, Vec2::new(12.0, 34.0));
        assert!(props.mouse_is_down);
        assert!(!props.mouse_is_idle);
    }
}
