use std::sync::Arc;

use glam::Vec3;
use winit::application::ApplicationHandler;
use winit::event::{ElementState, WindowEvent};
use winit::event_loop::{ActiveEventLoop, EventLoop};
use winit::keyboard::{KeyCode, PhysicalKey};
use winit::window::{Window, WindowId};

use crate::camera::Camera;
use crate::gpu::GpuState;
use crate::scene::GearTrain;
use crate::sim::SimClock;
use crate::trackball::{Trackball, TrackballEvent, Viewport};

const TRAIN_SEED: u64 = 1;

// Initial camera offset from the assembly center.
const CAMERA_OFFSET: Vec3 = Vec3::new(1300.0, 1300.0, 1300.0);

struct AppState {
    window: Arc<Window>,
    gpu: GpuState,
    camera: Camera,
    trackball: Trackball,
    train: GearTrain,
    sim: SimClock,
    seed: u64,
}

struct App {
    state: Option<AppState>,
}

impl App {
    fn new() -> Self {
        Self { state: None }
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.state.is_some() {
            return;
        }

        let window_attributes =
            Window::default_attributes().with_title("Escapement - Clock Viewer");

        #[cfg(not(target_arch = "wasm32"))]
        let window_attributes =
            window_attributes.with_inner_size(winit::dpi::PhysicalSize::new(1280, 720));

        let window = Arc::new(event_loop.create_window(window_attributes).unwrap());

        #[cfg(target_arch = "wasm32")]
        {
            use winit::platform::web::WindowExtWebSys;

            let canvas = window.canvas().unwrap();

            let web_window = web_sys::window().unwrap();
            let document = web_window.document().unwrap();

            if let Some(container) = document.get_element_by_id("canvas") {
                let _ = container.replace_with_with_node_1(&canvas);
            } else {
                document.body().unwrap().append_child(&canvas).unwrap();
            }

            // Fill the browser viewport.
            let width = web_window.inner_width().unwrap().as_f64().unwrap() as u32;
            let height = web_window.inner_height().unwrap().as_f64().unwrap() as u32;
            let _ = window
                .request_inner_size(winit::dpi::PhysicalSize::new(width.max(1), height.max(1)));
        }

        let train = GearTrain::generate(TRAIN_SEED);
        let center = train.center();

        let mut camera = Camera::new(center + CAMERA_OFFSET);
        camera.look_at(center);

        let size = window.inner_size();
        let mut trackball = Trackball::new(
            &mut camera,
            Viewport::from_size(size.width.max(1) as f32, size.height.max(1) as f32),
        );
        trackball.set_target(center, &mut camera);
        let _ = trackball.subscribe(|event| {
            if event != TrackballEvent::CameraChanged {
                log::debug!("trackball: {:?}", event);
            }
        });

        let gpu = pollster::block_on(GpuState::new(window.clone(), &train));

        self.state = Some(AppState {
            window,
            gpu,
            camera,
            trackball,
            train,
            sim: SimClock::new(),
            seed: TRAIN_SEED,
        });
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        let state = match self.state.as_mut() {
            Some(s) => s,
            None => return,
        };

        // Pointer, wheel, and touch input belong to the trackball; keys are
        // shared with the hotkeys below.
        let _ = state.trackball.handle_event(&event);

        match event {
            WindowEvent::CloseRequested => {
                event_loop.exit();
            }

            WindowEvent::Resized(physical_size) => {
                state.gpu.resize(physical_size);
                state.trackball.handle_resize(Viewport::from_size(
                    physical_size.width.max(1) as f32,
                    physical_size.height.max(1) as f32,
                ));
            }

            WindowEvent::KeyboardInput { event, .. } => {
                if let PhysicalKey::Code(code) = event.physical_key {
                    // Ignore OS key repeats so a held key fires once.
                    if event.state == ElementState::Pressed && !event.repeat {
                        match code {
                            KeyCode::Escape => event_loop.exit(),

                            // Simulation rates: frozen, real time, a minute
                            // of clock time per second, twelve minutes per
                            // second.
                            KeyCode::Digit0 => state.sim.speed = 0.0,
                            KeyCode::Digit1 => state.sim.speed = 1.0,
                            KeyCode::Digit2 => state.sim.speed = 60.0,
                            KeyCode::Digit3 => state.sim.speed = 60.0 * 12.0,

                            KeyCode::KeyR => {
                                state.seed = state.seed.wrapping_add(1);
                                log::info!("regenerating gear train (seed {})", state.seed);
                                state.train = GearTrain::generate(state.seed);
                                state.gpu.upload_train(&state.train);

                                let center = state.train.center();
                                state.trackball.set_target(center, &mut state.camera);
                            }

                            _ => {}
                        }
                    }
                }
            }

            WindowEvent::RedrawRequested => {
                // Advance simulated time and pose the mechanism.
                let time = state.sim.advance();
                state.train.update_angles(time);

                // Consume pending gestures before the camera is read.
                state.trackball.update(&mut state.camera);

                match state.gpu.render(&state.camera, &state.train, time as f32) {
                    Ok(_) => {}
                    Err(wgpu::SurfaceError::Lost) => {
                        state.gpu.resize(state.gpu.size);
                    }
                    Err(wgpu::SurfaceError::OutOfMemory) => {
                        log::error!("Out of memory");
                        event_loop.exit();
                    }
                    Err(e) => {
                        log::warn!("Surface error: {:?}", e);
                    }
                }
            }

            _ => {}
        }
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(state) = &self.state {
            state.window.request_redraw();
        }
    }
}

pub async fn run() {
    let event_loop = EventLoop::new().expect("Failed to create event loop");
    event_loop.set_control_flow(winit::event_loop::ControlFlow::Poll);

    let mut app = App::new();
    event_loop.run_app(&mut app).expect("Event loop error");
}
