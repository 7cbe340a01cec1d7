use std::time::{Duration, Instant};

use stereoview::geometry::RectI;
use stereoview::monitor::Monitor;
use stereoview::output::device::DeviceKind;
use stereoview::output::program::NullGl;
use stereoview::output::{Eye, InstanceRegistry, StereoOutput};
use stereoview::settings::Settings;
use stereoview::window::events::keys;
use stereoview::window::platform::{HeadlessBackend, PlatformEvent};

fn monitors() -> Vec<Monitor> {
    vec![
        Monitor::new(0, RectI::from_size(0, 0, 1920, 1080), "DEL4099"),
        Monitor::new(1, RectI::from_size(1920, 0, 1920, 1080), "ZMT1900"),
    ]
}

fn new_output(settings: Settings) -> StereoOutput {
    let _ = env_logger::builder().is_test(true).try_init();
    StereoOutput::new(
        settings,
        monitors(),
        Box::new(NullGl::new()),
        &InstanceRegistry::default(),
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

#[test]
fn mono_and_stereo_frames_drive_the_expected_eyes() {
    let mut output = new_output(Settings::ephemeral());
    output
        .create(Box::new(HeadlessBackend::new()))
        .expect("create");

    let mut eyes = Vec::new();
    output
        .render_frame(&mut |eye| eyes.push(eye))
        .expect("mono frame");
    assert_eq!(eyes, vec![Eye::Left]);

    eyes.clear();
    output.set_stereo_source(true);
    output
        .render_frame(&mut |eye| eyes.push(eye))
        .expect("stereo frame");
    assert_eq!(eyes, vec![Eye::Left, Eye::Right]);

    output.close();
}

#[test]
fn device_hotkey_switches_the_active_device() {
    let mut output = new_output(Settings::ephemeral());
    let backend = HeadlessBackend::new();
    let feed = backend.event_feed();
    output.create(Box::new(backend)).expect("create");
    assert_eq!(output.device(), DeviceKind::Row);

    feed.lock()
        .expect("feed lock")
        .push_back(PlatformEvent::KeyDown(keys::F3));

    let mut drained = Vec::new();
    assert!(wait_until(Duration::from_secs(2), || {
        output.process_events(&mut drained);
        output.device() == DeviceKind::Chess
    }));

    // The hotkey is consumed; it must not re-trigger on the next drain.
    output.process_events(&mut drained);
    assert_eq!(output.device(), DeviceKind::Chess);
    assert!(!output.window().with_keys(|map| map.is_pressed(keys::F3)));

    output.close();
}

#[test]
fn ed_code_shows_the_strip_then_hides_it() {
    let mut settings = Settings::ephemeral();
    settings.set("deviceId", "RowED");
    let mut output = new_output(settings);
    let backend = HeadlessBackend::new();
    let state = backend.state_handle();
    output.create(Box::new(backend)).expect("create");
    output.set_stereo_source(true);

    // First stereo frame starts the activation code; the strip appears in
    // the slave window.
    output.render_frame(&mut |_| {}).expect("frame");
    assert!(wait_until(Duration::from_secs(2), || {
        state.lock().expect("state lock").slave_visible
    }));

    // Frames within the code window keep the strip up.
    output.render_frame(&mut |_| {}).expect("frame");
    assert!(state.lock().expect("state lock").slave_visible);

    // Once the code window elapses the strip hides again.
    std::thread::sleep(Duration::from_millis(600));
    output.render_frame(&mut |_| {}).expect("frame");
    assert!(wait_until(Duration::from_secs(2), || {
        !state.lock().expect("state lock").slave_visible
    }));

    output.close();
}

#[test]
fn exit_drains_the_deactivation_code_before_returning() {
    let mut settings = Settings::ephemeral();
    settings.set("deviceId", "RowED");
    let mut output = new_output(settings);
    let backend = HeadlessBackend::new();
    let state = backend.state_handle();
    output.create(Box::new(backend)).expect("create");
    output.set_stereo_source(true);

    // Activate the glasses and let the activation code complete.
    output.render_frame(&mut |_| {}).expect("frame");
    std::thread::sleep(Duration::from_millis(600));
    output.render_frame(&mut |_| {}).expect("frame");

    output.window().request_exit();
    let started = Instant::now();
    let mut drained = Vec::new();
    output.process_events(&mut drained);

    // The drain holds the deactivation code on screen for its full window.
    assert!(started.elapsed() >= Duration::from_millis(400));
    assert!(wait_until(Duration::from_secs(2), || {
        !state.lock().expect("state lock").slave_visible
    }));

    output.close();
}

#[test]
fn settings_survive_a_close_and_reopen() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("interlace.json");

    let mut output = new_output(Settings::open(path.clone()));
    output
        .create(Box::new(HeadlessBackend::new()))
        .expect("create");
    output.set_device(DeviceKind::Chess);
    output.params.reverse.set_value(true);
    output.close();

    let reloaded = Settings::open(path);
    assert_eq!(
        reloaded.get_opt::<String>("deviceId").as_deref(),
        Some("Chess")
    );
    assert!(reloaded.get_bool("reverse", false));
    assert!(reloaded.get_rect("windowPos").is_some());
}
