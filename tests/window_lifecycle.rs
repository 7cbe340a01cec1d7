use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use stereoview::geometry::RectI;
use stereoview::monitor::{Monitor, StaticMonitorRegistry};
use stereoview::window::Window;
use stereoview::window::attributes::WindowAttributes;
use stereoview::window::events::{MouseButton, WindowEvent, keys};
use stereoview::window::platform::{
    HeadlessBackend, HeadlessFailure, HeadlessState, PlatformEvent,
};
use stereoview::WindowError;

fn dual_monitors() -> StaticMonitorRegistry {
    StaticMonitorRegistry::new(vec![
        Monitor::new(0, RectI::from_size(0, 0, 1920, 1080), "DEL4099"),
        Monitor::new(1, RectI::from_size(1920, 0, 1920, 1080), "ZMT1900"),
    ])
}

fn new_window() -> Window {
    let _ = env_logger::builder().is_test(true).try_init();
    Window::new(
        WindowAttributes::default(),
        RectI::from_size(100, 100, 800, 600),
        dual_monitors(),
        None,
    )
}

fn wait_until(deadline: Duration, mut cond: impl FnMut() -> bool) -> bool {
    let start = Instant::now();
    while start.elapsed() < deadline {
        if cond() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(5));
    }
    cond()
}

fn wait_state(
    state: &Arc<Mutex<HeadlessState>>,
    cond: impl Fn(&HeadlessState) -> bool + Copy,
) -> bool {
    wait_until(Duration::from_secs(2), || {
        cond(&state.lock().expect("state lock"))
    })
}

#[test]
fn create_runs_gl_callback_after_windows_exist() {
    let backend = HeadlessBackend::new();
    let state = backend.state_handle();
    let gl_created = Arc::new(AtomicBool::new(false));
    let gl_flag = gl_created.clone();

    let mut window = new_window();
    window
        .create(Box::new(backend), || {
            gl_flag.store(true, Ordering::SeqCst);
            Ok(())
        })
        .expect("create");

    assert!(gl_created.load(Ordering::SeqCst));
    assert!(wait_state(&state, |st| st.created && st.master_visible));

    // The window thread reports its initial geometry exactly once.
    let mut drained = Vec::new();
    assert!(wait_until(Duration::from_secs(2), || {
        window.process_events(&mut drained);
        drained.contains(&WindowEvent::Resize)
    }));

    window.close();
    assert!(state.lock().expect("state lock").destroyed);
}

#[test]
fn platform_failure_fails_create_without_gl() {
    let backend = HeadlessBackend::new().with_failure(HeadlessFailure::MasterCreation);
    let gl_created = Arc::new(AtomicBool::new(false));
    let gl_flag = gl_created.clone();

    let mut window = new_window();
    let err = window
        .create(Box::new(backend), || {
            gl_flag.store(true, Ordering::SeqCst);
            Ok(())
        })
        .expect_err("creation must fail");

    assert!(matches!(err, WindowError::MasterCreation(_)));
    assert!(!gl_created.load(Ordering::SeqCst));
}

#[test]
fn gl_failure_tears_the_window_down() {
    let backend = HeadlessBackend::new();
    let state = backend.state_handle();

    let mut window = new_window();
    let err = window
        .create(Box::new(backend), || {
            Err(WindowError::GlContext("no usable pixel format".into()))
        })
        .expect_err("gl failure must propagate");

    assert!(matches!(err, WindowError::GlContext(_)));
    assert!(state.lock().expect("state lock").destroyed);
}

#[test]
fn scripted_input_reaches_the_event_drain() {
    let backend = HeadlessBackend::new();
    let feed = backend.event_feed();

    let mut window = new_window();
    window.create(Box::new(backend), || Ok(())).expect("create");

    {
        let mut feed = feed.lock().expect("feed lock");
        feed.push_back(PlatformEvent::KeyDown(keys::F2));
        feed.push_back(PlatformEvent::MouseButton {
            x: 400,
            y: 300,
            button: MouseButton::Left,
            pressed: true,
        });
        feed.push_back(PlatformEvent::MouseButton {
            x: 400,
            y: 300,
            button: MouseButton::Left,
            pressed: false,
        });
    }

    let mut collected = Vec::new();
    let mut drained = Vec::new();
    assert!(wait_until(Duration::from_secs(2), || {
        window.process_events(&mut drained);
        collected.append(&mut drained);
        collected
            .iter()
            .any(|event| matches!(event, WindowEvent::MouseUp { .. }))
    }));

    let down = collected
        .iter()
        .find_map(|event| match event {
            WindowEvent::MouseDown { point, button } => Some((*point, *button)),
            _ => None,
        })
        .expect("mouse down drained");
    assert_eq!(down.1, MouseButton::Left);
    assert!((down.0.x - 0.5).abs() < 1e-9);
    assert!((down.0.y - 0.5).abs() < 1e-9);

    assert!(window.with_keys(|map| map.is_pressed(keys::F2)));
    window.close();
}

#[test]
fn fullscreen_switch_is_reported_and_applied() {
    let backend = HeadlessBackend::new();

    let mut window = new_window();
    window.create(Box::new(backend), || Ok(())).expect("create");

    window.set_fullscreen(true);
    assert!(window.is_fullscreen());
    // Window sits on monitor 0; fullscreen covers that monitor.
    assert_eq!(window.placement(), RectI::from_size(0, 0, 1920, 1080));

    let mut collected = Vec::new();
    let mut drained = Vec::new();
    assert!(wait_until(Duration::from_secs(2), || {
        window.process_events(&mut drained);
        collected.append(&mut drained);
        collected.contains(&WindowEvent::FullscreenSwitch)
    }));
    window.close();
}

#[test]
fn cursor_signals_run_on_the_window_thread() {
    let backend = HeadlessBackend::new();
    let state = backend.state_handle();

    let mut window = new_window();
    window.create(Box::new(backend), || Ok(())).expect("create");

    window.hide_cursor();
    window.hide_cursor();
    window.show_cursor();
    assert!(wait_state(&state, |st| st.cursor_counter == -1));
    window.close();
}
