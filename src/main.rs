//! Retro Platformer entry point
//!
//! Handles platform-specific initialization and runs the frame loop.

#[cfg(target_arch = "wasm32")]
use wasm_bindgen::prelude::*;

#[cfg(target_arch = "wasm32")]
mod wasm_game {
    use std::cell::RefCell;
    use std::rc::Rc;
    use wasm_bindgen::prelude::*;
    use web_sys::{Document, HtmlCanvasElement, HtmlElement, KeyboardEvent, PointerEvent};

    use retro_platformer::consts::*;
    use retro_platformer::renderer::PixelPresenter;
    use retro_platformer::sim::{Intent, Intents};
    use retro_platformer::{GameController, HostSink, Scoreboard, Settings};

    /// Device pixels per tile
    const TILE_PX: u32 = TILE as u32 * SCALE;

    thread_local! {
        /// Handle for the `reset_game`/`pause_game` exports
        static GAME: RefCell<Option<Rc<RefCell<Game>>>> = const { RefCell::new(None) };
    }

    struct Game {
        controller: GameController,
        presenter: Option<PixelPresenter>,
        /// Host-side HUD values, fed by the simulation
        scoreboard: Scoreboard,
        /// Held intents, written by keyboard and touch handlers
        input: Intents,
        show_fps: bool,
    }

    impl Game {
        fn toggle_pause(&mut self) {
            self.scoreboard.pause_toggle();
            self.controller.pause(self.scoreboard.paused);
            self.input.release_all();
            update_pause_button(self.scoreboard.paused);
        }

        fn set_paused(&mut self, paused: bool) {
            if self.scoreboard.paused != paused {
                self.toggle_pause();
            }
        }

        /// Reset button: new run with a fresh scoreboard
        fn restart(&mut self) {
            self.scoreboard.reset();
            self.controller.restart(&mut self.scoreboard);
            self.input.release_all();
            update_pause_button(false);
            log::info!("New run started");
        }

        fn frame(&mut self, time: f64) {
            let input = self.input;
            self.controller.frame(time, &input, &mut self.scoreboard);
        }

        /// Push the composed frame to the canvas
        fn render(&mut self) {
            if let Some(ref mut presenter) = self.presenter {
                match presenter.present(self.controller.framebuffer()) {
                    Ok(_) => {}
                    Err(wgpu::SurfaceError::Lost) => {
                        presenter.resize(presenter.size.0, presenter.size.1);
                    }
                    Err(wgpu::SurfaceError::OutOfMemory) => {
                        log::error!("Out of memory!");
                    }
                    Err(e) => log::warn!("Render error: {:?}", e),
                }
            }
        }

        /// Mirror the scoreboard into the HUD
        fn update_hud(&self) {
            let Some(document) = web_sys::window().and_then(|w| w.document()) else {
                return;
            };
            let board = &self.scoreboard;

            set_hud(&document, "#hud-score", &format!("{:06}", board.score));
            set_hud(&document, "#hud-coins", &format!("{:02}", board.coins));
            set_hud(&document, "#hud-world", &board.world);
            set_hud(&document, "#hud-time", &board.time.to_string());
            set_hud(&document, "#hud-lives", &board.lives.to_string());

            if let Some(el) = document.query_selector("#hud-fps").ok().flatten() {
                let class = if self.show_fps { "hud-item" } else { "hud-item hidden" };
                let _ = el.set_attribute("class", class);
            }
            if self.show_fps {
                set_hud(
                    &document,
                    "#hud-fps",
                    &format!("{:.0}", self.controller.fps()),
                );
            }
        }
    }

    fn set_hud(document: &Document, id: &str, text: &str) {
        let selector = format!("{id} .hud-value");
        if let Some(el) = document.query_selector(&selector).ok().flatten() {
            el.set_text_content(Some(text));
        }
    }

    fn update_pause_button(paused: bool) {
        let btn = web_sys::window()
            .and_then(|w| w.document())
            .and_then(|d| d.get_element_by_id("pause-btn"));
        if let Some(btn) = btn {
            btn.set_text_content(Some(if paused { "Resume" } else { "Pause" }));
        }
    }

    /// Host hook: reset the current level
    #[wasm_bindgen]
    pub fn reset_game() {
        GAME.with(|slot| {
            if let Some(game) = slot.borrow().as_ref() {
                let g = &mut *game.borrow_mut();
                g.controller.reset(&mut g.scoreboard);
            }
        });
    }

    /// Host hook: pause or resume the simulation
    #[wasm_bindgen]
    pub fn pause_game(paused: bool) {
        GAME.with(|slot| {
            if let Some(game) = slot.borrow().as_ref() {
                game.borrow_mut().set_paused(paused);
            }
        });
    }

    pub async fn run() {
        console_error_panic_hook::set_once();
        console_log::init_with_level(log::Level::Info).expect("Failed to init logger");

        log::info!("Retro Platformer starting...");

        let window = web_sys::window().expect("no window");
        let document = window.document().expect("no document");

        // Hide loading indicator
        if let Some(loading) = document.get_element_by_id("loading") {
            let _ = loading.set_attribute("class", "hidden");
        }

        let canvas: HtmlCanvasElement = document
            .get_element_by_id("canvas")
            .expect("no canvas")
            .dyn_into()
            .expect("not a canvas");

        // Whole tiles only; fixed for the lifetime of the page
        let view_cols = (canvas.client_width().max(0) as u32 / TILE_PX).max(1);
        let view_rows = (canvas.client_height().max(0) as u32 / TILE_PX).max(1);
        let width = view_cols * TILE_PX;
        let height = view_rows * TILE_PX;
        canvas.set_width(width);
        canvas.set_height(height);
        log::info!("View: {}x{} tiles, canvas {}x{}", view_cols, view_rows, width, height);

        let settings = Settings::load();
        let show_fps = settings.show_fps;
        let controller = match GameController::new(settings, view_cols, view_rows) {
            Ok(controller) => controller,
            Err(e) => {
                log::error!("Level data is invalid: {}", e);
                return;
            }
        };
        let frame_size = (
            controller.framebuffer().width(),
            controller.framebuffer().height(),
        );

        let game = Rc::new(RefCell::new(Game {
            controller,
            presenter: None,
            scoreboard: Scoreboard::new(),
            input: Intents::default(),
            show_fps,
        }));

        // Initialize WebGPU
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::BROWSER_WEBGPU | wgpu::Backends::GL,
            ..Default::default()
        });

        let surface = instance
            .create_surface(wgpu::SurfaceTarget::Canvas(canvas.clone()))
            .expect("Failed to create surface");

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::LowPower,
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .expect("Failed to get adapter");

        log::info!("Using adapter: {:?}", adapter.get_info().name);

        let presenter = PixelPresenter::new(surface, &adapter, width, height, frame_size).await;
        game.borrow_mut().presenter = Some(presenter);

        setup_keyboard(game.clone());
        setup_touch_controls(&document, game.clone());
        setup_buttons(&document, game.clone());
        setup_auto_pause(game.clone());

        if let Some(hud) = document.get_element_by_id("hud") {
            let _ = hud.set_attribute("class", "");
        }

        GAME.with(|slot| *slot.borrow_mut() = Some(game.clone()));

        request_animation_frame(game);

        log::info!("Retro Platformer running!");
    }

    fn setup_keyboard(game: Rc<RefCell<Game>>) {
        let window = web_sys::window().unwrap();

        // Key down: hold intents, Escape toggles pause, F toggles the FPS readout
        {
            let game = game.clone();
            let closure = Closure::<dyn FnMut(_)>::new(move |event: KeyboardEvent| {
                let mut g = game.borrow_mut();
                let key = event.key();
                if let Some(intent) = Intent::from_key(&key) {
                    event.prevent_default();
                    if !g.scoreboard.paused {
                        g.input.set(intent, true);
                    }
                    return;
                }
                if event.repeat() {
                    return;
                }
                match key.as_str() {
                    "Escape" => g.toggle_pause(),
                    "f" | "F" => {
                        g.show_fps = !g.show_fps;
                        let mut settings = g.controller.settings().clone();
                        settings.show_fps = g.show_fps;
                        settings.save();
                    }
                    _ => {}
                }
            });
            let _ = window
                .add_event_listener_with_callback("keydown", closure.as_ref().unchecked_ref());
            closure.forget();
        }

        // Key up: release
        {
            let closure = Closure::<dyn FnMut(_)>::new(move |event: KeyboardEvent| {
                if let Some(intent) = Intent::from_key(&event.key()) {
                    game.borrow_mut().input.set(intent, false);
                }
            });
            let _ = window
                .add_event_listener_with_callback("keyup", closure.as_ref().unchecked_ref());
            closure.forget();
        }
    }

    /// On-screen buttons tagged `data-intent="left|right|up|run"`
    fn setup_touch_controls(document: &Document, game: Rc<RefCell<Game>>) {
        let Ok(nodes) = document.query_selector_all("[data-intent]") else {
            return;
        };

        for i in 0..nodes.length() {
            let Some(button) = nodes
                .item(i)
                .and_then(|node| node.dyn_into::<HtmlElement>().ok())
            else {
                continue;
            };
            let Some(intent) = button
                .get_attribute("data-intent")
                .and_then(|name| Intent::from_name(&name))
            else {
                log::warn!("Ignoring button with unknown data-intent");
                continue;
            };

            for (event_name, pressed) in [
                ("pointerdown", true),
                ("pointerup", false),
                ("pointerleave", false),
                ("pointercancel", false),
            ] {
                let game = game.clone();
                let closure = Closure::<dyn FnMut(_)>::new(move |event: PointerEvent| {
                    event.prevent_default();
                    let mut g = game.borrow_mut();
                    if pressed && g.scoreboard.paused {
                        return;
                    }
                    g.input.set(intent, pressed);
                });
                let _ = button
                    .add_event_listener_with_callback(event_name, closure.as_ref().unchecked_ref());
                closure.forget();
            }
        }
        log::info!("Bound {} touch control(s)", nodes.length());
    }

    fn setup_buttons(document: &Document, game: Rc<RefCell<Game>>) {
        // Pause / resume
        if let Some(btn) = document.get_element_by_id("pause-btn") {
            let game = game.clone();
            let closure = Closure::<dyn FnMut(_)>::new(move |_event: web_sys::MouseEvent| {
                game.borrow_mut().toggle_pause();
            });
            let _ = btn.add_event_listener_with_callback("click", closure.as_ref().unchecked_ref());
            closure.forget();
        }

        // Reset
        if let Some(btn) = document.get_element_by_id("reset-btn") {
            let closure = Closure::<dyn FnMut(_)>::new(move |_event: web_sys::MouseEvent| {
                game.borrow_mut().restart();
            });
            let _ = btn.add_event_listener_with_callback("click", closure.as_ref().unchecked_ref());
            closure.forget();
        }
    }

    fn request_animation_frame(game: Rc<RefCell<Game>>) {
        let window = web_sys::window().unwrap();
        let closure = Closure::once(move |time: f64| {
            game_loop(game, time);
        });
        let _ = window.request_animation_frame(closure.as_ref().unchecked_ref());
        closure.forget();
    }

    fn game_loop(game: Rc<RefCell<Game>>, time: f64) {
        {
            let mut g = game.borrow_mut();
            g.frame(time);
            g.render();
            g.update_hud();
        }

        request_animation_frame(game);
    }

    fn setup_auto_pause(game: Rc<RefCell<Game>>) {
        let window = web_sys::window().unwrap();
        let document = window.document().unwrap();

        // Visibility change (tab switch, minimize)
        {
            let game = game.clone();
            let document_clone = document.clone();
            let closure = Closure::<dyn FnMut(_)>::new(move |_event: web_sys::Event| {
                if document_clone.visibility_state() == web_sys::VisibilityState::Hidden {
                    let mut g = game.borrow_mut();
                    if !g.scoreboard.paused {
                        g.set_paused(true);
                        log::info!("Auto-paused (tab hidden)");
                    }
                }
            });
            let _ = document.add_event_listener_with_callback(
                "visibilitychange",
                closure.as_ref().unchecked_ref(),
            );
            closure.forget();
        }

        // Window blur: keys released outside the page never send keyup
        {
            let closure = Closure::<dyn FnMut(_)>::new(move |_event: web_sys::FocusEvent| {
                let mut g = game.borrow_mut();
                g.input.release_all();
                if !g.scoreboard.paused {
                    g.set_paused(true);
                    log::info!("Auto-paused (window blur)");
                }
            });
            let _ = window.add_event_listener_with_callback("blur", closure.as_ref().unchecked_ref());
            closure.forget();
        }
    }
}

#[cfg(target_arch = "wasm32")]
#[wasm_bindgen(start)]
pub async fn wasm_main() {
    wasm_game::run().await;
}

#[cfg(not(target_arch = "wasm32"))]
fn main() {
    env_logger::init();
    log::info!("Retro Platformer (native) starting...");
    log::info!("Native mode runs headless - serve the wasm build for the playable version");

    if let Err(e) = demo_run() {
        log::error!("Demo run failed: {}", e);
        std::process::exit(1);
    }
}

#[cfg(target_arch = "wasm32")]
fn main() {
    // WASM entry point is wasm_main, this is just to satisfy the compiler
}

/// Scripted run: sprint right and hop every second, 30 s of game time
#[cfg(not(target_arch = "wasm32"))]
fn demo_run() -> Result<(), retro_platformer::sim::LevelError> {
    use retro_platformer::consts::FRAME_MS;
    use retro_platformer::sim::Intents;
    use retro_platformer::{GameController, Scoreboard, Settings};

    let mut game = GameController::new(Settings::load(), 20, 14)?;
    let mut board = Scoreboard::new();
    let mut now = 0.0f64;

    for frame in 0..(30 * 60) {
        let input = Intents {
            right: true,
            run: true,
            up: frame % 60 < 12,
            ..Default::default()
        };
        game.frame(now, &input, &mut board);
        now += f64::from(FRAME_MS);
    }

    let state = game.state();
    log::info!(
        "Demo finished: score {} coins {} lives {} world {} time {} (player x = {:.0})",
        board.score,
        board.coins,
        board.lives,
        board.world,
        board.time,
        state.player.body.pos.x
    );
    println!(
        "score={} coins={} lives={} world={}",
        board.score, board.coins, board.lives, board.world
    );
    Ok(())
}
