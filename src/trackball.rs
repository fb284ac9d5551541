use std::collections::HashSet;

use glam::{Quat, Vec2, Vec3};
use winit::event::{ElementState, MouseButton, MouseScrollDelta, TouchPhase, WindowEvent};
use winit::keyboard::{KeyCode, PhysicalKey};

use crate::camera::Camera;

// Squared camera movement below this is treated as "didn't move" when
// deciding whether to notify listeners.
const EPS: f32 = 1e-6;

// One wheel notch nudges the synthetic zoom gesture by this much in
// normalized screen units.
const WHEEL_STEP: f32 = 0.01;

// Pixel-delta wheels report roughly this many pixels per notch.
const PIXELS_PER_NOTCH: f32 = 40.0;

/// Which gesture is currently driving the camera.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GestureState {
    Idle,
    Rotate,
    Zoom,
    Pan,
    TouchRotate,
    TouchZoomPan,
}

/// Notifications delivered to subscribers. `CameraChanged` fires at most
/// once per `update()`; `GestureStarted`/`GestureEnded` bracket each
/// interaction (wheel ticks fire both back to back).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TrackballEvent {
    GestureStarted,
    GestureEnded,
    CameraChanged,
}

pub type ListenerId = usize;

/// On-screen rectangle of the input surface, in pixels. `left`/`top` are
/// nonzero when the controller is bound to a sub-region of the window.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Viewport {
    pub left: f32,
    pub top: f32,
    pub width: f32,
    pub height: f32,
}

impl Viewport {
    pub fn from_size(width: f32, height: f32) -> Self {
        Self {
            left: 0.0,
            top: 0.0,
            width,
            height,
        }
    }
}

/// Trackball camera controller: turns pointer, touch, wheel, and keyboard
/// input into orbit/zoom/pan motion of a camera around a target point.
///
/// Input handlers only record gesture endpoints; `update()` is the single
/// place where those endpoints are consumed and the camera is mutated, so
/// any number of events between two frames collapse to one delta.
pub struct Trackball {
    /// Master switch: when false every input handler is a no-op.
    pub enabled: bool,

    pub rotate_speed: f32,
    pub zoom_speed: f32,
    pub pan_speed: f32,

    pub allow_rotate: bool,
    pub allow_zoom: bool,
    pub allow_pan: bool,

    /// Permitted range for the camera-to-target distance.
    pub min_distance: f32,
    pub max_distance: f32,

    viewport: Viewport,
    target: Vec3,
    eye: Vec3,
    state: GestureState,
    keys_down: HashSet<KeyCode>,

    rotate_start: Vec2,
    rotate_end: Vec2,
    zoom_start: Vec2,
    zoom_end: Vec2,
    pan_start: Vec2,
    pan_end: Vec2,
    touch_zoom_distance_start: f32,
    touch_zoom_distance_end: f32,

    // Active touch points in press order, raw pixels.
    touches: Vec<(u64, Vec2)>,
    // Last cursor position in raw pixels; mouse-press events carry no
    // position of their own.
    cursor: Vec2,

    // Snapshot restored by reset().
    target0: Vec3,
    position0: Vec3,
    up0: Vec3,

    last_position: Vec3,
    listeners: Vec<(ListenerId, Box<dyn FnMut(TrackballEvent)>)>,
    next_listener: ListenerId,
}

impl Trackball {
    /// Captures the reset snapshot from the camera's current position and up
    /// vector (target starts at the origin) and runs one `update()` so the
    /// camera is consistent before the first frame.
    pub fn new(camera: &mut Camera, viewport: Viewport) -> Self {
        let mut trackball = Self {
            enabled: true,
            rotate_speed: 2.5,
            zoom_speed: 1.2,
            pan_speed: 0.8,
            allow_rotate: true,
            allow_zoom: true,
            allow_pan: true,
            min_distance: 0.0,
            max_distance: f32::INFINITY,
            viewport,
            target: Vec3::ZERO,
            eye: Vec3::ZERO,
            state: GestureState::Idle,
            keys_down: HashSet::new(),
            rotate_start: Vec2::ZERO,
            rotate_end: Vec2::ZERO,
            zoom_start: Vec2::ZERO,
            zoom_end: Vec2::ZERO,
            pan_start: Vec2::ZERO,
            pan_end: Vec2::ZERO,
            touch_zoom_distance_start: 0.0,
            touch_zoom_distance_end: 0.0,
            touches: Vec::new(),
            cursor: Vec2::ZERO,
            target0: Vec3::ZERO,
            position0: camera.position,
            up0: camera.up,
            last_position: Vec3::ZERO,
            listeners: Vec::new(),
            next_listener: 0,
        };
        trackball.update(camera);
        trackball
    }

    pub fn target(&self) -> Vec3 {
        self.target
    }

    pub fn gesture_state(&self) -> GestureState {
        self.state
    }

    /// Register an event listener. Listeners are called synchronously from
    /// `update()`, `reset()`, and the input handlers.
    pub fn subscribe(&mut self, listener: impl FnMut(TrackballEvent) + 'static) -> ListenerId {
        let id = self.next_listener;
        self.next_listener += 1;
        self.listeners.push((id, Box::new(listener)));
        id
    }

    pub fn unsubscribe(&mut self, id: ListenerId) {
        self.listeners.retain(|(listener_id, _)| *listener_id != id);
    }

    fn emit(&mut self, event: TrackballEvent) {
        let mut listeners = std::mem::take(&mut self.listeners);
        for (_, listener) in listeners.iter_mut() {
            listener(event);
        }
        // Keep any listeners subscribed during dispatch.
        listeners.append(&mut self.listeners);
        self.listeners = listeners;
    }

    /// The host must call this whenever the input surface's on-screen
    /// rectangle changes.
    pub fn handle_resize(&mut self, viewport: Viewport) {
        self.viewport = viewport;
    }

    // Raw pixels -> normalized surface coordinates.
    fn screen_point(&self, pos: Vec2) -> Vec2 {
        Vec2::new(
            (pos.x - self.viewport.left) / self.viewport.width,
            (pos.y - self.viewport.top) / self.viewport.height,
        )
    }

    // Space bar forces panning while held, like Photoshop.
    fn keyboard_state(&self) -> GestureState {
        if self.keys_down.contains(&KeyCode::Space) && self.allow_pan {
            GestureState::Pan
        } else {
            GestureState::Idle
        }
    }

    /// Route a winit window event into the controller. Returns true if the
    /// event was consumed as camera input.
    pub fn handle_event(&mut self, event: &WindowEvent) -> bool {
        if !self.enabled {
            return false;
        }

        match event {
            WindowEvent::CursorMoved { position, .. } => {
                self.mouse_move(Vec2::new(position.x as f32, position.y as f32));
                true
            }
            WindowEvent::MouseInput { state, button, .. } => {
                match state {
                    ElementState::Pressed => self.mouse_down(*button, self.cursor),
                    ElementState::Released => self.mouse_up(),
                }
                true
            }
            WindowEvent::MouseWheel { delta, .. } => {
                // Two reporting conventions, one notch-valued delta.
                let notches = match delta {
                    MouseScrollDelta::LineDelta(_, y) => *y,
                    MouseScrollDelta::PixelDelta(pos) => pos.y as f32 / PIXELS_PER_NOTCH,
                };
                self.mouse_wheel(notches);
                true
            }
            WindowEvent::Touch(touch) => {
                let pos = Vec2::new(touch.location.x as f32, touch.location.y as f32);
                match touch.phase {
                    TouchPhase::Started => self.touch_start(touch.id, pos),
                    TouchPhase::Moved => self.touch_move(touch.id, pos),
                    TouchPhase::Ended | TouchPhase::Cancelled => self.touch_end(touch.id),
                }
                true
            }
            WindowEvent::KeyboardInput { event, .. } => {
                if let PhysicalKey::Code(code) = event.physical_key {
                    match event.state {
                        // OS key repeats carry the repeat flag; the pressed
                        // set only tracks the initial press.
                        ElementState::Pressed if !event.repeat => self.key_down(code),
                        ElementState::Released => self.key_up(code),
                        _ => {}
                    }
                }
                // Keys are shared with the host's own hotkeys.
                false
            }
            _ => false,
        }
    }

    pub fn key_down(&mut self, code: KeyCode) {
        if !self.enabled {
            return;
        }
        let _ = self.keys_down.insert(code);
    }

    pub fn key_up(&mut self, code: KeyCode) {
        if !self.enabled {
            return;
        }
        let _ = self.keys_down.remove(&code);
    }

    /// Begin a mouse gesture at `pos` (raw pixels). The mode comes from the
    /// pan-override key if held, otherwise from the button identity.
    pub fn mouse_down(&mut self, button: MouseButton, pos: Vec2) {
        if !self.enabled {
            return;
        }

        let keyboard = self.keyboard_state();
        self.state = if keyboard == GestureState::Idle {
            match button {
                MouseButton::Left => GestureState::Rotate,
                MouseButton::Middle => GestureState::Zoom,
                MouseButton::Right => GestureState::Pan,
                _ => GestureState::Idle,
            }
        } else {
            keyboard
        };

        let point = self.screen_point(pos);
        match self.state {
            GestureState::Rotate if self.allow_rotate => {
                self.rotate_start = point;
                self.rotate_end = point;
            }
            GestureState::Zoom if self.allow_zoom => {
                self.zoom_start = point;
                self.zoom_end = point;
            }
            GestureState::Pan if self.allow_pan => {
                self.pan_start = point;
                self.pan_end = point;
            }
            _ => {}
        }

        log::debug!("gesture start: {:?}", self.state);
        self.emit(TrackballEvent::GestureStarted);
    }

    /// Advance the active gesture's end point to `pos` (raw pixels). Only
    /// the latest position before the next `update()` matters.
    pub fn mouse_move(&mut self, pos: Vec2) {
        if !self.enabled {
            return;
        }
        self.cursor = pos;

        let point = self.screen_point(pos);
        match self.state {
            GestureState::Rotate if self.allow_rotate => self.rotate_end = point,
            GestureState::Zoom if self.allow_zoom => self.zoom_end = point,
            GestureState::Pan if self.allow_pan => self.pan_end = point,
            _ => {}
        }
    }

    pub fn mouse_up(&mut self) {
        if !self.enabled || self.state == GestureState::Idle {
            return;
        }
        self.state = GestureState::Idle;
        self.emit(TrackballEvent::GestureEnded);
    }

    /// A wheel tick is a complete, instantaneous zoom gesture: it offsets
    /// the zoom start point and fires start and end notifications at once.
    /// Positive notches back the camera away from the target.
    pub fn mouse_wheel(&mut self, notches: f32) {
        if !self.enabled {
            return;
        }
        self.zoom_start.y -= notches * WHEEL_STEP;
        self.emit(TrackballEvent::GestureStarted);
        self.emit(TrackballEvent::GestureEnded);
    }

    pub fn touch_start(&mut self, id: u64, pos: Vec2) {
        if !self.enabled {
            return;
        }
        if let Some(entry) = self.touches.iter_mut().find(|(touch_id, _)| *touch_id == id) {
            entry.1 = pos;
        } else {
            self.touches.push((id, pos));
        }

        match self.touches.len() {
            1 => {
                self.state = GestureState::TouchRotate;
                let point = self.screen_point(self.touches[0].1);
                self.rotate_start = point;
                self.rotate_end = point;
            }
            2 => {
                self.state = GestureState::TouchZoomPan;
                let distance = (self.touches[0].1 - self.touches[1].1).length();
                self.touch_zoom_distance_start = distance;
                self.touch_zoom_distance_end = distance;

                let midpoint = self.screen_point((self.touches[0].1 + self.touches[1].1) / 2.0);
                self.pan_start = midpoint;
                self.pan_end = midpoint;
            }
            _ => self.state = GestureState::Idle,
        }

        self.emit(TrackballEvent::GestureStarted);
    }

    pub fn touch_move(&mut self, id: u64, pos: Vec2) {
        if !self.enabled {
            return;
        }
        if let Some(entry) = self.touches.iter_mut().find(|(touch_id, _)| *touch_id == id) {
            entry.1 = pos;
        }

        match self.touches.len() {
            1 => self.rotate_end = self.screen_point(self.touches[0].1),
            2 => {
                self.touch_zoom_distance_end = (self.touches[0].1 - self.touches[1].1).length();
                self.pan_end = self.screen_point((self.touches[0].1 + self.touches[1].1) / 2.0);
            }
            _ => self.state = GestureState::Idle,
        }
    }

    pub fn touch_end(&mut self, id: u64) {
        if !self.enabled {
            return;
        }
        self.touches.retain(|(touch_id, _)| *touch_id != id);

        // Re-seed the endpoints of whatever gesture the remaining fingers
        // describe so no stale delta is applied next frame.
        match self.touches.len() {
            1 => {
                self.rotate_end = self.screen_point(self.touches[0].1);
                self.rotate_start = self.rotate_end;
            }
            2 => {
                self.touch_zoom_distance_start = 0.0;
                self.touch_zoom_distance_end = 0.0;

                self.pan_end = self.screen_point((self.touches[0].1 + self.touches[1].1) / 2.0);
                self.pan_start = self.pan_end;
            }
            _ => {}
        }

        self.state = GestureState::Idle;
        self.emit(TrackballEvent::GestureEnded);
    }

    /// Consume the gesture deltas accumulated since the previous call and
    /// move the camera: rotate, zoom, pan, clamp the eye distance into
    /// `[min_distance, max_distance]`, and re-aim at the target. Safe to
    /// call every frame whether or not any input arrived.
    pub fn update(&mut self, camera: &mut Camera) {
        self.eye = camera.position - self.target;

        if self.allow_rotate {
            self.rotate_camera(camera);
        }
        if self.allow_zoom {
            self.zoom_camera();
        }
        if self.allow_pan {
            self.pan_camera(camera);
        }

        camera.position = self.target + self.eye;
        self.check_distances(camera);
        camera.look_at(self.target);

        if self.last_position.distance_squared(camera.position) > EPS {
            self.emit(TrackballEvent::CameraChanged);
            self.last_position = camera.position;
        }
    }

    // Yaw about world-up by -angleX, then pitch about the current right
    // axis by angleY. Eye and up get the same rotation so they stay
    // consistent.
    fn rotate_camera(&mut self, camera: &mut Camera) {
        let delta_x = self.rotate_end.x - self.rotate_start.x;
        let delta_y = self.rotate_end.y - self.rotate_start.y;
        if delta_x == 0.0 && delta_y == 0.0 {
            return;
        }

        let world_up = Vec3::Y;

        let yaw = Quat::from_axis_angle(world_up, -delta_x * self.rotate_speed);
        self.eye = yaw * self.eye;
        camera.up = yaw * camera.up;

        // Skipped when the eye is parallel to world-up (or zero); there is
        // no stable pitch axis that frame.
        if let Some(right) = self.eye.cross(world_up).try_normalize() {
            let pitch = Quat::from_axis_angle(right, delta_y * self.rotate_speed);
            self.eye = pitch * self.eye;
            camera.up = pitch * camera.up;
        }

        self.rotate_start = self.rotate_end;
    }

    // Scale the eye vector. Pinch uses the inter-finger distance ratio;
    // drag and wheel use the vertical delta of the zoom endpoints. Factors
    // that would invert the camera through the target are rejected.
    fn zoom_camera(&mut self) {
        if self.state == GestureState::TouchZoomPan {
            let factor = self.touch_zoom_distance_start / self.touch_zoom_distance_end;
            self.touch_zoom_distance_start = self.touch_zoom_distance_end;
            if factor.is_finite() && factor > 0.0 {
                self.eye *= factor;
            }
        } else {
            let factor = 1.0 + (self.zoom_end.y - self.zoom_start.y) * self.zoom_speed;
            if factor != 1.0 && factor > 0.0 {
                self.eye *= factor;
                self.zoom_start = self.zoom_end;
            }
        }
    }

    // Translate camera and target together, so the eye vector is
    // preserved. Pan distance scales with the current zoom distance.
    fn pan_camera(&mut self, camera: &mut Camera) {
        let change = self.pan_end - self.pan_start;
        if change.length_squared() == 0.0 {
            return;
        }

        let change = change * (self.eye.length() * self.pan_speed);
        let pan = with_length(self.eye.cross(camera.up), change.x)
            + with_length(camera.up, change.y);

        camera.position += pan;
        self.target += pan;

        self.pan_start = self.pan_end;
    }

    // Keep the distance to the target within permitted bounds, moving the
    // camera along the eye direction; the target never moves.
    fn check_distances(&mut self, camera: &mut Camera) {
        if !self.allow_zoom && !self.allow_pan {
            return;
        }

        if self.eye.length_squared() > self.max_distance * self.max_distance {
            if let Some(dir) = self.eye.try_normalize() {
                self.eye = dir * self.max_distance;
                camera.position = self.target + self.eye;
            }
        }

        if self.eye.length_squared() < self.min_distance * self.min_distance {
            if let Some(dir) = self.eye.try_normalize() {
                self.eye = dir * self.min_distance;
                camera.position = self.target + self.eye;
            }
        }
    }

    /// Restore the snapshot captured at construction (or the last
    /// `set_target`): target, camera position, and up vector. Clears any
    /// active gesture and pressed keys, and always notifies listeners.
    pub fn reset(&mut self, camera: &mut Camera) {
        self.state = GestureState::Idle;
        self.keys_down.clear();

        self.target = self.target0;
        camera.position = self.position0;
        camera.up = self.up0;

        self.eye = camera.position - self.target;
        camera.look_at(self.target);

        self.emit(TrackballEvent::CameraChanged);
        self.last_position = camera.position;
    }

    /// Point the controller at a new target. This overwrites the snapshot's
    /// target and performs a full `reset`, so the camera position and up
    /// also return to their snapshotted values.
    pub fn set_target(&mut self, target: Vec3, camera: &mut Camera) {
        self.target0 = target;
        self.reset(camera);
    }
}

fn with_length(v: Vec3, length: f32) -> Vec3 {
    v.try_normalize().map_or(Vec3::ZERO, |unit| unit * length)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    const CENTER: Vec3 = Vec3::new(1100.0, -400.0, 0.0);

    fn rig() -> (Camera, Trackball) {
        let mut camera = Camera::new(Vec3::new(2400.0, 900.0, 1300.0));
        let mut trackball = Trackball::new(&mut camera, Viewport::from_size(800.0, 600.0));
        trackball.set_target(CENTER, &mut camera);
        (camera, trackball)
    }

    fn distance_to_target(camera: &Camera, trackball: &Trackball) -> f32 {
        (camera.position - trackball.target()).length()
    }

    fn drag(trackball: &mut Trackball, button: MouseButton, from: Vec2, to: Vec2) {
        trackball.mouse_move(from);
        trackball.mouse_down(button, from);
        trackball.mouse_move(to);
    }

    #[test]
    fn update_without_input_is_a_fixed_point() {
        let (mut camera, mut trackball) = rig();
        let position = camera.position;
        let up = camera.up;
        let target = trackball.target();

        for _ in 0..5 {
            trackball.update(&mut camera);
        }

        assert!((camera.position - position).length() < 1e-4);
        assert!((camera.up - up).length() < 1e-6);
        assert_eq!(trackball.target(), target);
    }

    #[test]
    fn rotate_gesture_preserves_distance_and_yaws_about_world_up() {
        let (mut camera, mut trackball) = rig();
        let eye0 = camera.position - CENTER;
        let distance0 = eye0.length();

        // Single-finger drag: 80px right on an 800px surface = 0.1
        // normalized, so 0.25 radians of yaw at the default speed.
        trackball.touch_start(7, Vec2::new(400.0, 300.0));
        trackball.touch_move(7, Vec2::new(480.0, 300.0));
        assert_eq!(trackball.gesture_state(), GestureState::TouchRotate);
        trackball.update(&mut camera);

        let eye1 = camera.position - trackball.target();
        assert!((eye1.length() - distance0).abs() < distance0 * 1e-4);

        let expected = Quat::from_axis_angle(Vec3::Y, -0.25) * eye0;
        assert!(eye1.normalize().dot(expected.normalize()) > 0.9999);
        assert_eq!(trackball.target(), CENTER);
    }

    #[test]
    fn mouse_drag_rotates_like_touch() {
        let (mut touch_camera, mut touch_trackball) = rig();
        touch_trackball.touch_start(1, Vec2::new(100.0, 100.0));
        touch_trackball.touch_move(1, Vec2::new(180.0, 160.0));
        touch_trackball.update(&mut touch_camera);

        let (mut mouse_camera, mut mouse_trackball) = rig();
        drag(
            &mut mouse_trackball,
            MouseButton::Left,
            Vec2::new(100.0, 100.0),
            Vec2::new(180.0, 160.0),
        );
        mouse_trackball.update(&mut mouse_camera);

        assert!((touch_camera.position - mouse_camera.position).length() < 1e-3);
    }

    #[test]
    fn wheel_zoom_scales_eye_by_documented_factor() {
        let (mut camera, mut trackball) = rig();
        let distance0 = distance_to_target(&camera, &trackball);

        // +3 notches at the default zoom speed: factor 1 + 0.03 * 1.2.
        trackball.mouse_wheel(3.0);
        trackball.update(&mut camera);

        let distance1 = distance_to_target(&camera, &trackball);
        assert!((distance1 - distance0 * 1.036).abs() < distance0 * 1e-4);
    }

    #[test]
    fn wheel_tick_fires_start_and_end_immediately() {
        let (_, mut trackball) = rig();
        let events = Rc::new(RefCell::new(Vec::new()));
        let sink = events.clone();
        let _ = trackball.subscribe(move |event| sink.borrow_mut().push(event));

        trackball.mouse_wheel(1.0);
        assert_eq!(
            *events.borrow(),
            vec![TrackballEvent::GestureStarted, TrackballEvent::GestureEnded]
        );
    }

    #[test]
    fn drag_zoom_rejects_inverting_factor() {
        let (mut camera, mut trackball) = rig();
        let distance0 = distance_to_target(&camera, &trackball);

        // A huge upward drag would drive the factor negative; the step is
        // skipped rather than flipping the camera through the target.
        drag(
            &mut trackball,
            MouseButton::Middle,
            Vec2::new(400.0, 600.0),
            Vec2::new(400.0, 0.0),
        );
        trackball.update(&mut camera);

        let distance1 = distance_to_target(&camera, &trackball);
        assert!((distance1 - distance0).abs() < distance0 * 1e-4);
    }

    #[test]
    fn pinch_zoom_uses_distance_ratio() {
        let (mut camera, mut trackball) = rig();
        let distance0 = distance_to_target(&camera, &trackball);

        trackball.touch_start(1, Vec2::new(300.0, 300.0));
        trackball.touch_start(2, Vec2::new(500.0, 300.0));
        assert_eq!(trackball.gesture_state(), GestureState::TouchZoomPan);

        // Fingers move apart to twice the separation: factor 1/2.
        trackball.touch_move(1, Vec2::new(200.0, 300.0));
        trackball.touch_move(2, Vec2::new(600.0, 300.0));
        trackball.update(&mut camera);

        let distance1 = distance_to_target(&camera, &trackball);
        assert!((distance1 - distance0 * 0.5).abs() < distance0 * 1e-4);
    }

    #[test]
    fn pan_preserves_distance_and_moves_target() {
        let (mut camera, mut trackball) = rig();
        let distance0 = distance_to_target(&camera, &trackball);

        drag(
            &mut trackball,
            MouseButton::Right,
            Vec2::new(400.0, 300.0),
            Vec2::new(480.0, 360.0),
        );
        trackball.update(&mut camera);

        assert!(trackball.target() != CENTER);
        let distance1 = distance_to_target(&camera, &trackball);
        assert!((distance1 - distance0).abs() < distance0 * 1e-4);
    }

    #[test]
    fn space_bar_overrides_any_button_to_pan() {
        let (_, mut trackball) = rig();
        trackball.key_down(KeyCode::Space);
        trackball.mouse_down(MouseButton::Left, Vec2::new(400.0, 300.0));
        assert_eq!(trackball.gesture_state(), GestureState::Pan);

        trackball.mouse_up();
        trackball.key_up(KeyCode::Space);
        trackball.mouse_down(MouseButton::Left, Vec2::new(400.0, 300.0));
        assert_eq!(trackball.gesture_state(), GestureState::Rotate);
    }

    #[test]
    fn disallowed_gesture_does_nothing() {
        let (mut camera, mut trackball) = rig();
        trackball.allow_rotate = false;
        let position = camera.position;

        drag(
            &mut trackball,
            MouseButton::Left,
            Vec2::new(100.0, 100.0),
            Vec2::new(400.0, 400.0),
        );
        trackball.update(&mut camera);

        assert!((camera.position - position).length() < 1e-4);
    }

    #[test]
    fn disabled_controller_ignores_all_input() {
        let (mut camera, mut trackball) = rig();
        trackball.enabled = false;
        let position = camera.position;

        drag(
            &mut trackball,
            MouseButton::Left,
            Vec2::new(100.0, 100.0),
            Vec2::new(400.0, 400.0),
        );
        trackball.mouse_wheel(5.0);
        trackball.touch_start(1, Vec2::new(10.0, 10.0));
        trackball.update(&mut camera);

        assert_eq!(trackball.gesture_state(), GestureState::Idle);
        assert!((camera.position - position).length() < 1e-4);
    }

    #[test]
    fn three_fingers_is_unsupported() {
        let (_, mut trackball) = rig();
        trackball.touch_start(1, Vec2::new(100.0, 100.0));
        trackball.touch_start(2, Vec2::new(200.0, 100.0));
        trackball.touch_start(3, Vec2::new(300.0, 100.0));
        assert_eq!(trackball.gesture_state(), GestureState::Idle);
    }

    #[test]
    fn distance_clamp_leaves_target_alone() {
        let (mut camera, mut trackball) = rig();
        trackball.max_distance = 500.0;
        trackball.update(&mut camera);
        assert!((distance_to_target(&camera, &trackball) - 500.0).abs() < 1e-2);
        assert_eq!(trackball.target(), CENTER);

        trackball.max_distance = f32::INFINITY;
        trackball.min_distance = 900.0;
        trackball.update(&mut camera);
        assert!((distance_to_target(&camera, &trackball) - 900.0).abs() < 1e-2);
        assert_eq!(trackball.target(), CENTER);
    }

    #[test]
    fn reset_round_trips_after_arbitrary_gestures() {
        let (mut camera, mut trackball) = rig();
        let position0 = camera.position;
        let up0 = camera.up;
        let target0 = trackball.target();

        drag(
            &mut trackball,
            MouseButton::Left,
            Vec2::new(100.0, 100.0),
            Vec2::new(300.0, 200.0),
        );
        trackball.update(&mut camera);
        trackball.mouse_up();
        drag(
            &mut trackball,
            MouseButton::Right,
            Vec2::new(400.0, 300.0),
            Vec2::new(500.0, 380.0),
        );
        trackball.update(&mut camera);
        trackball.mouse_up();
        trackball.mouse_wheel(-4.0);
        trackball.update(&mut camera);

        trackball.reset(&mut camera);

        assert!((camera.position - position0).length() < 1e-3);
        assert!((camera.up - up0).length() < 1e-5);
        assert!((trackball.target() - target0).length() < 1e-5);
        assert_eq!(trackball.gesture_state(), GestureState::Idle);
    }

    #[test]
    fn set_target_also_restores_position_and_up() {
        let (mut camera, mut trackball) = rig();
        let position0 = camera.position;
        let up0 = camera.up;

        drag(
            &mut trackball,
            MouseButton::Left,
            Vec2::new(100.0, 100.0),
            Vec2::new(350.0, 250.0),
        );
        trackball.update(&mut camera);
        trackball.mouse_up();

        let new_target = Vec3::new(0.0, 50.0, -200.0);
        trackball.set_target(new_target, &mut camera);

        assert_eq!(trackball.target(), new_target);
        assert!((camera.position - position0).length() < 1e-3);
        assert!((camera.up - up0).length() < 1e-5);
    }

    #[test]
    fn change_notification_respects_threshold() {
        let (mut camera, mut trackball) = rig();
        let changes = Rc::new(RefCell::new(0u32));
        let sink = changes.clone();
        let _ = trackball.subscribe(move |event| {
            if event == TrackballEvent::CameraChanged {
                *sink.borrow_mut() += 1;
            }
        });

        // No input: no notification.
        trackball.update(&mut camera);
        assert_eq!(*changes.borrow(), 0);

        // A real move: exactly one notification per update, and none on the
        // following idle frame.
        drag(
            &mut trackball,
            MouseButton::Left,
            Vec2::new(100.0, 100.0),
            Vec2::new(200.0, 100.0),
        );
        trackball.update(&mut camera);
        assert_eq!(*changes.borrow(), 1);
        trackball.update(&mut camera);
        assert_eq!(*changes.borrow(), 1);
    }

    #[test]
    fn sub_threshold_move_does_not_notify() {
        let (mut camera, mut trackball) = rig();
        let changes = Rc::new(RefCell::new(0u32));
        let sink = changes.clone();
        let _ = trackball.subscribe(move |event| {
            if event == TrackballEvent::CameraChanged {
                *sink.borrow_mut() += 1;
            }
        });

        // A 5e-5 pixel drag rotates the eye by well under a micro-radian:
        // the camera moves, but by less than the notification threshold.
        drag(
            &mut trackball,
            MouseButton::Left,
            Vec2::new(100.0, 100.0),
            Vec2::new(100.00005, 100.0),
        );
        trackball.update(&mut camera);
        assert_eq!(*changes.borrow(), 0);
    }

    #[test]
    fn reset_always_notifies() {
        let (mut camera, mut trackball) = rig();
        let changes = Rc::new(RefCell::new(0u32));
        let sink = changes.clone();
        let id = trackball.subscribe(move |event| {
            if event == TrackballEvent::CameraChanged {
                *sink.borrow_mut() += 1;
            }
        });

        trackball.reset(&mut camera);
        assert_eq!(*changes.borrow(), 1);

        trackball.unsubscribe(id);
        trackball.reset(&mut camera);
        assert_eq!(*changes.borrow(), 1);
    }

    #[test]
    fn moves_between_updates_coalesce_to_the_latest() {
        let (mut one_move_camera, mut one_move) = rig();
        drag(
            &mut one_move,
            MouseButton::Left,
            Vec2::new(100.0, 100.0),
            Vec2::new(260.0, 180.0),
        );
        one_move.update(&mut one_move_camera);

        let (mut two_move_camera, mut two_move) = rig();
        drag(
            &mut two_move,
            MouseButton::Left,
            Vec2::new(100.0, 100.0),
            Vec2::new(170.0, 230.0),
        );
        two_move.mouse_move(Vec2::new(260.0, 180.0));
        two_move.update(&mut two_move_camera);

        assert!((one_move_camera.position - two_move_camera.position).length() < 1e-4);
    }

    #[test]
    fn gesture_endpoints_are_consumed_once() {
        let (mut camera, mut trackball) = rig();
        drag(
            &mut trackball,
            MouseButton::Left,
            Vec2::new(100.0, 100.0),
            Vec2::new(200.0, 150.0),
        );
        trackball.update(&mut camera);
        let position = camera.position;

        // Same delta must not be applied again on the next frame.
        trackball.update(&mut camera);
        assert!((camera.position - position).length() < 1e-4);
    }

    #[test]
    fn lifting_one_of_two_fingers_cancels_pending_rotation() {
        let (mut camera, mut trackball) = rig();
        trackball.touch_start(1, Vec2::new(300.0, 300.0));
        trackball.touch_start(2, Vec2::new(500.0, 300.0));
        trackball.touch_end(2);
        assert_eq!(trackball.gesture_state(), GestureState::Idle);

        let position = camera.position;
        trackball.update(&mut camera);
        assert!((camera.position - position).length() < 1e-4);
    }

    #[test]
    fn straight_down_view_survives_rotation() {
        let mut camera = Camera::new(Vec3::new(0.0, 1000.0, 0.0));
        let mut trackball = Trackball::new(&mut camera, Viewport::from_size(800.0, 600.0));

        // Eye is parallel to world-up; the pitch axis degenerates and the
        // step must not produce NaN.
        drag(
            &mut trackball,
            MouseButton::Left,
            Vec2::new(400.0, 300.0),
            Vec2::new(400.0, 400.0),
        );
        trackball.update(&mut camera);
        assert!(camera.position.is_finite());
        assert!(camera.up.is_finite());
    }
}
