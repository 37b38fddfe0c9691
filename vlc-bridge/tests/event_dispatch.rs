//! End-to-end dispatch through the `extern "C"` trampoline.
//!
//! Events are fired by the loopback backend exactly as libvlc fires them:
//! through the registered function pointer with the token as user data.


use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use test_helpers::{list_item_event, shared_instance, user_data};
use vlc_bridge::{sys, BridgeError, EventId, EventKind, EventPayload, NativeRef};

#[test]
fn test_list_item_added_reaches_callback() {
    let (instance, backend) = shared_instance();
    let list = instance.event_manager(backend.new_manager());
    let received = Arc::new(Mutex::new(Vec::new()));
    let sink = received.clone();

    let id = list
        .attach(
            EventKind::MediaListItemAdded,
            move |event, _| sink.lock().unwrap().push(event.clone()),
            None,
        )
        .expect("Failed to attach");

    let event = list_item_event(sys::libvlc_MediaListItemAdded, 0xABC0, 4);
    assert_eq!(unsafe { backend.emit(list.handle(), &event) }, 1);

    let received = received.lock().unwrap();
    assert_eq!(received.len(), 1);
    assert_eq!(received[0].kind, EventKind::MediaListItemAdded);
    assert_eq!(
        received[0].payload,
        EventPayload::ListItem {
            media: NativeRef::from_addr(0xABC0),
            index: 4
        }
    );

    list.detach([id]).unwrap();
}

#[test]
fn test_detach_is_idempotent_and_stops_delivery() {
    let (instance, backend) = shared_instance();
    let player = instance.event_manager(backend.new_manager());
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = calls.clone();

    let id = player
        .attach(
            EventKind::PlayerEndReached,
            move |_, _| {
                counter.fetch_add(1, Ordering::SeqCst);
            },
            None,
        )
        .unwrap();

    backend.emit_empty(player.handle(), sys::libvlc_MediaPlayerEndReached);
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    player.detach([id]).unwrap();
    player.detach([id]).unwrap();
    // Never attached at all
    player.detach([EventId::new(u64::MAX)]).unwrap();

    assert_eq!(backend.attachments_on(player.handle()), 0);
    assert!(player.registrations().is_empty());
    assert_eq!(backend.emit_empty(player.handle(), sys::libvlc_MediaPlayerEndReached), 0);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[test]
fn test_trampoline_with_stale_token_is_a_noop() {
    let (instance, backend) = shared_instance();
    let player = instance.event_manager(backend.new_manager());
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = calls.clone();

    let id = player
        .attach(
            EventKind::PlayerPlaying,
            move |_, _| {
                counter.fetch_add(1, Ordering::SeqCst);
            },
            None,
        )
        .unwrap();
    player.detach([id]).unwrap();

    // A late native event still carrying the old token
    let event = sys::libvlc_event_t::empty(sys::libvlc_MediaPlayerPlaying);
    unsafe {
        vlc_bridge::event_dispatch(&event, user_data(id));
        vlc_bridge::event_dispatch(&event, std::ptr::null_mut());
        vlc_bridge::event_dispatch(std::ptr::null(), user_data(id));
    }
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[test]
fn test_callback_may_attach_from_inside_dispatch() {
    let (instance, backend) = shared_instance();
    let player = instance.event_manager(backend.new_manager());
    let inner_calls = Arc::new(AtomicUsize::new(0));
    let inner_id = Arc::new(Mutex::new(None));

    let manager = player.clone();
    let slot = inner_id.clone();
    let counter = inner_calls.clone();
    let outer = player
        .attach(
            EventKind::PlayerOpening,
            move |_, _| {
                let counter = counter.clone();
                let id = manager
                    .attach(
                        EventKind::PlayerBuffering,
                        move |_, _| {
                            counter.fetch_add(1, Ordering::SeqCst);
                        },
                        None,
                    )
                    .expect("Reentrant attach failed");
                *slot.lock().unwrap() = Some(id);
            },
            None,
        )
        .unwrap();

    backend.emit_empty(player.handle(), sys::libvlc_MediaPlayerOpening);
    let inner = inner_id.lock().unwrap().expect("Inner attach did not run");
    assert_ne!(inner, outer);

    backend.emit_empty(player.handle(), sys::libvlc_MediaPlayerBuffering);
    assert_eq!(inner_calls.load(Ordering::SeqCst), 1);

    player.detach([outer, inner]).unwrap();
    assert_eq!(backend.attachments_on(player.handle()), 0);
}

#[test]
fn test_callback_may_detach_itself() {
    let (instance, backend) = shared_instance();
    let player = instance.event_manager(backend.new_manager());
    let own_id: Arc<Mutex<Option<EventId>>> = Arc::new(Mutex::new(None));
    let completed = Arc::new(AtomicUsize::new(0));

    let manager = player.clone();
    let slot = own_id.clone();
    let counter = completed.clone();
    let id = player
        .attach(
            EventKind::PlayerStopped,
            move |_, _| {
                if let Some(id) = *slot.lock().unwrap() {
                    manager.detach([id]).expect("Self detach failed");
                }
                // The in-flight invocation keeps running after detaching
                counter.fetch_add(1, Ordering::SeqCst);
            },
            None,
        )
        .unwrap();
    *own_id.lock().unwrap() = Some(id);

    backend.emit_empty(player.handle(), sys::libvlc_MediaPlayerStopped);
    backend.emit_empty(player.handle(), sys::libvlc_MediaPlayerStopped);

    assert_eq!(completed.load(Ordering::SeqCst), 1);
    assert!(!instance.events().contains(id));
    assert_eq!(backend.attachments_on(player.handle()), 0);
}

#[test]
fn test_failed_attach_leaves_no_trace() {
    let (instance, backend) = shared_instance();
    let media = instance.event_manager(backend.new_manager());

    backend.fail_next_attach(media.handle(), "event type not supported");
    let result = media.attach(EventKind::MediaStateChanged, |_, _| {}, None);

    match result {
        Err(BridgeError::AttachFailed { kind, message }) => {
            assert_eq!(kind, EventKind::MediaStateChanged);
            assert_eq!(message, "event type not supported");
        }
        other => panic!("Unexpected attach result: {:?}", other),
    }
    assert!(media.registrations().is_empty());
    assert_eq!(backend.attachments_on(media.handle()), 0);
}

#[test]
fn test_events_from_native_worker_thread() {
    let (instance, backend) = shared_instance();
    let player = instance.event_manager(backend.new_manager());
    let threads = Arc::new(Mutex::new(Vec::new()));
    let sink = threads.clone();

    let id = player
        .attach(
            EventKind::PlayerTimeChanged,
            move |event, _| {
                let name = std::thread::current().name().map(str::to_string);
                sink.lock().unwrap().push((name, event.payload.clone()));
            },
            None,
        )
        .unwrap();

    for ms in [10, 20, 30] {
        let mut event = sys::libvlc_event_t::empty(sys::libvlc_MediaPlayerTimeChanged);
        event.u.time_changed = sys::libvlc_time_changed_t { value: ms };
        unsafe { backend.emit_on_worker(player.handle(), event) };
    }
    backend.flush();

    let threads = threads.lock().unwrap();
    assert_eq!(threads.len(), 3);
    for (name, _) in threads.iter() {
        assert_eq!(name.as_deref(), Some("vlc-loopback-native"));
    }
    // Per-thread ordering is preserved
    let times: Vec<_> = threads.iter().map(|(_, payload)| payload.clone()).collect();
    assert_eq!(
        times,
        vec![EventPayload::Time(10), EventPayload::Time(20), EventPayload::Time(30)]
    );

    player.detach([id]).unwrap();
}

#[test]
fn test_panicking_callback_does_not_poison_dispatch() {
    let (instance, backend) = shared_instance();
    let player = instance.event_manager(backend.new_manager());
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = calls.clone();

    let failing = player
        .attach(EventKind::PlayerEncounteredError, |_, _| panic!("callback bug"), None)
        .unwrap();
    let healthy = player
        .attach(
            EventKind::PlayerEncounteredError,
            move |_, _| {
                counter.fetch_add(1, Ordering::SeqCst);
            },
            None,
        )
        .unwrap();

    assert_eq!(backend.emit_empty(player.handle(), sys::libvlc_MediaPlayerEncounteredError), 2);
    assert_eq!(backend.emit_empty(player.handle(), sys::libvlc_MediaPlayerEncounteredError), 2);
    assert_eq!(calls.load(Ordering::SeqCst), 2);

    player.detach([failing, healthy]).unwrap();
}

#[test]
fn test_subscription_hands_events_to_consumer_thread() {
    let (instance, backend) = shared_instance();
    let list = instance.event_manager(backend.new_manager());
    let subscription = list.subscribe(EventKind::MediaListItemDeleted).unwrap();

    let consumer = std::thread::spawn(move || {
        subscription
            .timeout_iter(Duration::from_secs(2))
            .take(2)
            .map(|event| event.payload)
            .collect::<Vec<_>>()
    });

    for index in 0..2 {
        let event = list_item_event(sys::libvlc_MediaListItemDeleted, 0x10, index);
        unsafe { backend.emit_on_worker(list.handle(), event) };
    }
    backend.flush();

    let payloads = consumer.join().unwrap();
    assert_eq!(
        payloads,
        vec![
            EventPayload::ListItem { media: NativeRef::from_addr(0x10), index: 0 },
            EventPayload::ListItem { media: NativeRef::from_addr(0x10), index: 1 },
        ]
    );
    // The subscription was dropped with the consumer thread
    assert_eq!(backend.attachments_on(list.handle()), 0);
}
