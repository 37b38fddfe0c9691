//! Process-wide instance lifecycle.
//!
//! Everything here touches the global instance, so it runs as one test in
//! its own binary.


use std::io::Cursor;
use std::os::raw::c_void;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use test_helpers::{init_test_logging, user_data};
use vlc_bridge::stream::{media_open_cb, media_read_cb, media_seek_cb};
use vlc_bridge::{
    sys, BridgeError, EventId, EventKind, Instance, InstanceConfig, LoopbackBackend, MediaStream,
    ObjectId,
};

#[test]
fn test_init_release_reinit() {
    init_test_logging();

    // Nothing installed yet
    assert!(matches!(vlc_bridge::current(), Err(BridgeError::NotInitialized)));
    vlc_bridge::release().expect("Release without init must be a no-op");
    let event = sys::libvlc_event_t::empty(sys::libvlc_MediaPlayerPlaying);
    unsafe {
        vlc_bridge::event_dispatch(&event, user_data(EventId::new(1)));
    }
    let opaque = ObjectId::new(1).as_opaque();
    let mut data: *mut c_void = std::ptr::null_mut();
    let mut size = 0u64;
    let mut buf = [0u8; 8];
    unsafe {
        assert_eq!(media_open_cb(opaque, &mut data, &mut size), 1);
        assert_eq!(media_read_cb(opaque, buf.as_mut_ptr(), buf.len()), -1);
        assert_eq!(media_seek_cb(opaque, 0), -1);
    }

    // First init installs, the second returns the same instance
    let hook_calls = Arc::new(AtomicUsize::new(0));
    let counter = hook_calls.clone();
    let backend = Arc::new(LoopbackBackend::new());
    let first = Instance::builder()
        .config(InstanceConfig::new().with_slow_callback_threshold(None))
        .backend(backend.clone())
        .on_native_thread(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        })
        .init()
        .expect("Failed to initialize");
    assert!(first.is_current());

    let ignored = Arc::new(LoopbackBackend::new());
    let second = vlc_bridge::init(InstanceConfig::default(), ignored).unwrap();
    assert_eq!(second.generation(), first.generation());
    assert_eq!(vlc_bridge::current().unwrap().generation(), first.generation());

    // Hook runs once per native thread
    let player = first.event_manager(backend.new_manager());
    let calls = Arc::new(AtomicUsize::new(0));
    let delivered = calls.clone();
    let id = player
        .attach(
            EventKind::PlayerVout,
            move |_, _| {
                delivered.fetch_add(1, Ordering::SeqCst);
            },
            None,
        )
        .unwrap();

    for _ in 0..3 {
        let event = sys::libvlc_event_t::empty(sys::libvlc_MediaPlayerVout);
        unsafe { backend.emit_on_worker(player.handle(), event) };
    }
    backend.flush();
    assert_eq!(calls.load(Ordering::SeqCst), 3);
    assert_eq!(hook_calls.load(Ordering::SeqCst), 1);

    backend.emit_empty(player.handle(), sys::libvlc_MediaPlayerVout);
    backend.emit_empty(player.handle(), sys::libvlc_MediaPlayerVout);
    assert_eq!(calls.load(Ordering::SeqCst), 5);
    assert_eq!(hook_calls.load(Ordering::SeqCst), 2);

    // Streams resolve through the installed instance
    let stream = MediaStream::register(&first, Cursor::new(b"lifecycle".to_vec())).unwrap();
    let media = stream.create_media().unwrap();
    assert_eq!(backend.read_media(media.native(), 4).as_deref(), Some(&b"cycle"[..]));
    drop(media);

    // Release invalidates every facade
    vlc_bridge::release().expect("Release failed");
    assert!(first.is_released());
    assert!(!first.is_current());
    assert!(matches!(vlc_bridge::current(), Err(BridgeError::NotInitialized)));
    assert!(first.events().is_empty());
    assert!(first.objects().is_empty());

    assert!(matches!(
        player.attach(EventKind::PlayerVout, |_, _| {}, None),
        Err(BridgeError::NotInitialized)
    ));
    assert!(matches!(player.detach([id]), Err(BridgeError::NotInitialized)));
    assert!(matches!(stream.duplicate(), Err(BridgeError::NotInitialized)));
    assert!(player.registrations().is_empty());

    // Release detached the live registration natively
    assert_eq!(backend.attachments_on(player.handle()), 0);
    assert_eq!(backend.emit_empty(player.handle(), sys::libvlc_MediaPlayerVout), 0);
    assert_eq!(calls.load(Ordering::SeqCst), 5);
    drop(stream);
    vlc_bridge::release().expect("Second release must be a no-op");

    // A fresh init gets a fresh generation and fresh registries
    let backend = Arc::new(LoopbackBackend::new());
    let reinit = vlc_bridge::init(InstanceConfig::default(), backend.clone()).unwrap();
    assert_ne!(reinit.generation(), first.generation());
    assert!(reinit.events().is_empty());
    assert!(first.events().is_empty());

    let player = reinit.event_manager(backend.new_manager());
    let id = player.attach(EventKind::PlayerPaused, |_, _| {}, None).unwrap();
    assert!(reinit.events().contains(id));

    // A pending native error surfaces on release
    player.detach([id]).unwrap();
    backend.set_last_error("vout display went away");
    match vlc_bridge::release() {
        Err(BridgeError::Native(message)) => assert_eq!(message, "vout display went away"),
        other => panic!("Unexpected release result: {:?}", other),
    }
    assert!(matches!(vlc_bridge::current(), Err(BridgeError::NotInitialized)));

    // Native players can outlive the instance; release detaches them
    let backend = Arc::new(LoopbackBackend::new());
    let old = vlc_bridge::init(InstanceConfig::default(), backend.clone()).unwrap();
    let old_player = old.event_manager(backend.new_manager());
    let old_id = old_player.attach(EventKind::PlayerPlaying, |_, _| {}, None).unwrap();
    let old_sub = old_player.subscribe(EventKind::PlayerStopped).unwrap();
    assert_eq!(backend.attachment_count(), 2);
    vlc_bridge::release().unwrap();
    assert_eq!(backend.attachment_count(), 0);
    drop(old_sub);

    // Tokens never repeat across instances
    let renewed = vlc_bridge::init(InstanceConfig::default(), backend.clone()).unwrap();
    let new_player = renewed.event_manager(backend.new_manager());
    let hits = Arc::new(AtomicUsize::new(0));
    let counter = hits.clone();
    let new_id = new_player
        .attach(
            EventKind::PlayerPlaying,
            move |_, _| {
                counter.fetch_add(1, Ordering::SeqCst);
            },
            None,
        )
        .unwrap();
    assert!(new_id > old_id);

    // A late event from the old player still carrying its old token
    let event = sys::libvlc_event_t::empty(sys::libvlc_MediaPlayerPlaying);
    unsafe { vlc_bridge::event_dispatch(&event, user_data(old_id)) };
    assert_eq!(backend.emit_empty(old_player.handle(), sys::libvlc_MediaPlayerPlaying), 0);
    assert_eq!(hits.load(Ordering::SeqCst), 0);

    assert_eq!(backend.emit_empty(new_player.handle(), sys::libvlc_MediaPlayerPlaying), 1);
    assert_eq!(hits.load(Ordering::SeqCst), 1);

    vlc_bridge::release().unwrap();
    assert_eq!(backend.attachment_count(), 0);
}
