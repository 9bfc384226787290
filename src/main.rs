//! SDF Worlds entry point
//!
//! On the web: wires query options, the seeded world, the WebGL renderer and
//! the animation loop onto the page's canvas.
//! Natively: prints a world as JSON and dry-runs it through the headless renderer.

#[cfg(target_arch = "wasm32")]
use wasm_bindgen::prelude::*;

#[cfg(target_arch = "wasm32")]
mod wasm_app {
    use std::cell::RefCell;
    use std::rc::Rc;

    use wasm_bindgen::JsCast;
    use wasm_bindgen::prelude::*;
    use web_sys::{HtmlAnchorElement, HtmlCanvasElement, KeyboardEvent};

    use sdf_worlds::random::SeedSession;
    use sdf_worlds::renderer::{CanvasSurface, Renderer, WebGlBackend};
    use sdf_worlds::scheduler::{AnimationLoop, FrameProps, PointerListeners, PointerTracker};
    use sdf_worlds::settings::{LaunchOptions, pixelate_link, share_link, strip_world_param};
    use sdf_worlds::world::{LowFrameRateLatch, Viewport, generate_world};

    thread_local! {
        static ANIMATION: RefCell<Option<AnimationLoop>> = const { RefCell::new(None) };
    }

    /// One page's render instance
    struct App {
        options: LaunchOptions,
        session: SeedSession,
        surface: CanvasSurface,
        renderer: Renderer<WebGlBackend>,
        pointer: Rc<RefCell<PointerTracker>>,
        listeners: Option<PointerListeners>,
        /// Set when a frame failed to draw and stopped the loop
        halted: bool,
        // Outlives world rebuilds so the warning shows once per page
        low_fps: LowFrameRateLatch,
    }

    impl App {
        /// Generate the current seed's world for the window size and bind it
        fn load_world(&mut self) -> Result<(), JsValue> {
            let viewport = window_viewport(self.options.pixelation)?;
            self.surface.configure(&viewport);

            self.session.rewind();
            let world = generate_world(self.session.stream_mut(), viewport);
            log::info!("World {}: {}", world.seed, world.describe());

            self.renderer.initialize(&self.surface, &world)?;

            // The tracker outlives the canvas; only the listeners move
            self.listeners = Some(PointerListeners::attach(
                self.surface.canvas(),
                self.pointer.clone(),
            )?);
            update_share_link(&world.seed);
            Ok(())
        }

        /// Tear down and rebuild on a fresh canvas. A canvas whose context
        /// was lost can't hand out another one.
        fn rebuild(&mut self) -> Result<(), JsValue> {
            self.listeners = None;
            self.renderer.destroy();
            let canvas = replace_canvas(self.surface.canvas())?;
            self.surface = CanvasSurface::new(canvas);
            self.load_world()?;

            // A failed frame or a still world left the loop stopped
            if self.halted || !self.options.animation.is_animated {
                self.halted = false;
                resume_animation();
            }
            Ok(())
        }

        fn handle_resize(&mut self) {
            let Ok(viewport) = window_viewport(self.options.pixelation) else {
                return;
            };
            if !self.renderer.needs_reinitialize(&viewport) {
                return;
            }
            log::info!(
                "Viewport changed to {}x{}, rebuilding world {}",
                viewport.width,
                viewport.height,
                self.session.current_seed()
            );
            if let Err(e) = self.rebuild() {
                log::error!("Rebuild after resize failed: {:?}", e);
            }
        }

        fn next_world(&mut self) {
            let seed = self.session.reseed().to_string();
            log::info!("New world: {}", seed);
            if let Err(e) = self.rebuild() {
                log::error!("Failed to build world {}: {:?}", seed, e);
            }
        }

        fn on_frame(&mut self, props: &mut FrameProps) {
            if self.low_fps.observe(props.fps) {
                show_low_fps_warning(&self.options, self.session.current_seed());
            }

            if let Err(e) = self.renderer.tick(props) {
                log::error!("Frame {} not drawn: {}", props.frame_count, e);
                self.halted = true;
                props.stop_animation();
                return;
            }

            if !self.options.animation.is_animated {
                props.stop_animation();
            }
        }
    }

    pub fn run() -> Result<(), JsValue> {
        console_error_panic_hook::set_once();
        console_log::init_with_level(log::Level::Info).expect("Failed to init logger");

        log::info!("SDF Worlds starting...");

        let window = web_sys::window().ok_or("no window")?;
        let document = window.document().ok_or("no document")?;
        let location = window.location();

        let options = LaunchOptions::from_query(&location.search()?);
        log::info!("Launch options: {:?}", options);

        // The seed stays in the share link, not the address bar
        if let Some(stripped) = strip_world_param(&location.href()?) {
            window
                .history()?
                .replace_state_with_url(&JsValue::NULL, "", Some(&stripped))?;
        }

        if !options.show_ui {
            if let Some(ui) = document.get_element_by_id("ui") {
                let _ = ui.set_attribute("class", "hidden");
            }
        }

        let canvas: HtmlCanvasElement = document
            .get_element_by_id("canvas")
            .ok_or("no canvas")?
            .dyn_into()
            .map_err(|_| JsValue::from_str("#canvas is not a canvas"))?;

        let pointer = Rc::new(RefCell::new(PointerTracker::new()));
        let app = Rc::new(RefCell::new(App {
            session: SeedSession::from_optional(options.world.as_deref()),
            surface: CanvasSurface::new(canvas),
            renderer: Renderer::new(),
            pointer: pointer.clone(),
            listeners: None,
            halted: false,
            low_fps: LowFrameRateLatch::new(),
            options: options.clone(),
        }));
        app.borrow_mut().load_world()?;

        if let Some(loading) = document.get_element_by_id("loading") {
            let _ = loading.set_attribute("class", "hidden");
        }

        setup_window_handlers(app.clone())?;

        let mut animation = {
            let app = app.clone();
            AnimationLoop::new(&options.animation, pointer, move |props| {
                app.borrow_mut().on_frame(props);
            })
            .on_start(|| log::info!("Animation started"))
            .on_end(|| log::info!("Animation ended"))
        };
        animation.start()?;
        ANIMATION.with(|slot| *slot.borrow_mut() = Some(animation));

        log::info!("SDF Worlds running!");
        Ok(())
    }

    fn setup_window_handlers(app: Rc<RefCell<App>>) -> Result<(), JsValue> {
        let window = web_sys::window().ok_or("no window")?;

        // Resize
        {
            let app = app.clone();
            let closure = Closure::<dyn FnMut(_)>::new(move |_event: web_sys::Event| {
                app.borrow_mut().handle_resize();
            });
            window.add_event_listener_with_callback("resize", closure.as_ref().unchecked_ref())?;
            closure.forget();
        }

        // Keyboard
        {
            let closure = Closure::<dyn FnMut(_)>::new(move |event: KeyboardEvent| {
                match event.key().as_str() {
                    "n" | "N" => app.borrow_mut().next_world(),
                    " " => toggle_playback(),
                    _ => {}
                }
            });
            window.add_event_listener_with_callback("keydown", closure.as_ref().unchecked_ref())?;
            closure.forget();
        }
        Ok(())
    }

    fn resume_animation() {
        ANIMATION.with(|slot| {
            if let Some(animation) = slot.borrow_mut().as_mut() {
                if let Err(e) = animation.start() {
                    log::error!("Failed to restart animation: {:?}", e);
                }
            }
        });
    }

    fn toggle_playback() {
        ANIMATION.with(|slot| {
            if let Some(animation) = slot.borrow_mut().as_mut() {
                if animation.is_playing() {
                    animation.stop();
                    log::info!("Paused");
                } else if let Err(e) = animation.start() {
                    log::error!("Failed to resume: {:?}", e);
                }
            }
        });
    }

    fn window_viewport(pixelation: f32) -> Result<Viewport, JsValue> {
        let window = web_sys::window().ok_or("no window")?;
        let width = window.inner_width()?.as_f64().unwrap_or(1.0) as f32;
        let height = window.inner_height()?.as_f64().unwrap_or(1.0) as f32;
        Ok(Viewport::for_display(width, height, pixelation))
    }

    fn replace_canvas(old: &HtmlCanvasElement) -> Result<HtmlCanvasElement, JsValue> {
        let document = web_sys::window()
            .and_then(|w| w.document())
            .ok_or("no document")?;
        let canvas: HtmlCanvasElement = document
            .create_element("canvas")?
            .dyn_into()
            .map_err(|_| JsValue::from_str("created element is not a canvas"))?;
        canvas.set_id(&old.id());
        canvas.set_class_name(&old.class_name());
        old.replace_with_with_node_1(&canvas)?;
        Ok(canvas)
    }

    fn update_share_link(seed: &str) {
        let Some(window) = web_sys::window() else {
            return;
        };
        let host = window.location().host().unwrap_or_default();
        let link = share_link(&host, seed);
        log::info!("Share link: {}", link);

        let anchor = window
            .document()
            .and_then(|d| d.get_element_by_id("share-link"))
            .and_then(|el| el.dyn_into::<HtmlAnchorElement>().ok());
        if let Some(anchor) = anchor {
            anchor.set_href(&format!("//{}", link));
            anchor.set_text_content(Some(&link));
        }
    }

    fn show_low_fps_warning(options: &LaunchOptions, seed: &str) {
        let Some(document) = web_sys::window().and_then(|w| w.document()) else {
            return;
        };
        if let Some(el) = document.get_element_by_id("low-fps-warning") {
            let _ = el.set_attribute("class", "");
        }
        let anchor = document
            .get_element_by_id("pixelate-link")
            .and_then(|el| el.dyn_into::<HtmlAnchorElement>().ok());
        if let Some(anchor) = anchor {
            anchor.set_href(&pixelate_link(options.pixelation, seed));
            let label = if options.is_pixelated() {
                "pixelate again"
            } else {
                "pixelate"
            };
            anchor.set_text_content(Some(label));
        }
    }
}

#[cfg(target_arch = "wasm32")]
#[wasm_bindgen(start)]
pub fn wasm_main() -> Result<(), JsValue> {
    wasm_app::run()
}

#[cfg(not(target_arch = "wasm32"))]
const DRY_RUN_FRAMES: u32 = 120;

#[cfg(not(target_arch = "wasm32"))]
fn main() {
    use sdf_worlds::random::SeedSession;
    use sdf_worlds::world::{Viewport, generate_world};

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let (width, height) = match (args.get(1), args.get(2)) {
        (Some(w), Some(h)) => match (w.parse::<f32>(), h.parse::<f32>()) {
            (Ok(w), Ok(h)) if w >= 1.0 && h >= 1.0 => (w, h),
            _ => {
                eprintln!("usage: sdf-worlds [seed] [width height]");
                std::process::exit(2);
            }
        },
        _ => (1280.0, 720.0),
    };

    let mut session = SeedSession::from_optional(args.first().map(String::as_str));
    let world = generate_world(session.stream_mut(), Viewport::new(width, height));
    log::info!("World {}: {}", world.seed, world.describe());

    match world.to_json() {
        Ok(json) => println!("{}", json),
        Err(e) => {
            log::error!("Failed to serialize world: {}", e);
            std::process::exit(1);
        }
    }

    if let Err(e) = dry_run(&world) {
        log::error!("Dry run failed: {}", e);
        std::process::exit(1);
    }
}

/// Drive the world through the headless renderer at a simulated 60 Hz
#[cfg(not(target_arch = "wasm32"))]
fn dry_run(world: &sdf_worlds::World) -> Result<(), sdf_worlds::RenderError> {
    use sdf_worlds::renderer::{HeadlessBackend, HeadlessSurface};
    use sdf_worlds::scheduler::{FrameClock, PointerTracker};
    use sdf_worlds::Renderer;

    let (width, height) = world.viewport.pixel_size();
    let surface = HeadlessSurface::new(width, height);
    let mut renderer = Renderer::<HeadlessBackend>::new();
    renderer.initialize(&surface, world)?;

    let mut clock = FrameClock::new();
    clock.start(0.0, None);
    clock.poll(0.0);
    let pointer = PointerTracker::new();

    let mut last_fps = 0.0;
    for i in 1..=DRY_RUN_FRAMES {
        let now = i as f64 * 1000.0 / 60.0;
        if let Some(props) = clock.frame(now, pointer.snapshot(now)) {
            last_fps = props.fps;
            renderer.tick(&props)?;
        }
    }

    let time = renderer.live().map(|l| l.time).unwrap_or_default();
    let ledger = surface.ledger();
    log::info!(
        "Dry run: {} draws, {:.1} fps average, time uniform at {:.4}",
        ledger.borrow().draw_calls(),
        last_fps,
        time
    );
    renderer.destroy();
    Ok(())
}

#[cfg(target_arch = "wasm32")]
fn main() {
    // WASM entry point is wasm_main, this is just to satisfy the compiler
}
