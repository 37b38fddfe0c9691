//! vlc-sys: raw libvlc 3.x declarations
//!
//! Only the surface the event bridge touches is declared here: the event
//! structure and its payload union, the event manager attach/detach pair,
//! the error message accessors, instance creation, renderer item retention
//! and callback-backed media. The `extern "C"` block is compiled only with
//! the `link` feature so the bridge can be built and tested without a system
//! libvlc.

// Names mirror vlc/vlc.h.
#![allow(non_camel_case_types, non_upper_case_globals)]

use std::os::raw::{c_char, c_float, c_int, c_uchar, c_void};

// ============================================================================
// Opaque handles
// ============================================================================

macro_rules! opaque {
    ($($name:ident),* $(,)?) => {
        $(
            #[repr(C)]
            pub struct $name {
                _private: [u8; 0],
            }
        )*
    };
}

opaque!(
    libvlc_instance_t,
    libvlc_event_manager_t,
    libvlc_media_t,
    libvlc_renderer_item_t,
    libvlc_renderer_discoverer_t,
);

/// Event type discriminant as it appears in `libvlc_event_t::type_`.
pub type libvlc_event_type_t = c_int;

/// Milliseconds, as used by time/length events.
pub type libvlc_time_t = i64;

// ============================================================================
// Event payload union (libvlc 3.x layout)
// ============================================================================

#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct libvlc_media_meta_changed_t {
    pub meta_type: c_int,
}

#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct libvlc_media_item_t {
    pub item: *mut libvlc_media_t,
}

#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct libvlc_media_duration_changed_t {
    pub new_duration: i64,
}

#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct libvlc_int_changed_t {
    pub value: c_int,
}

#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct libvlc_float_changed_t {
    pub value: c_float,
}

#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct libvlc_time_changed_t {
    pub value: libvlc_time_t,
}

#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct libvlc_media_list_item_t {
    pub item: *mut libvlc_media_t,
    pub index: c_int,
}

#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct libvlc_string_t {
    pub psz: *const c_char,
}

#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct libvlc_es_changed_t {
    pub i_type: c_int,
    pub i_id: c_int,
}

#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct libvlc_vlm_media_event_t {
    pub psz_media_name: *const c_char,
    pub psz_instance_name: *const c_char,
}

#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct libvlc_renderer_item_event_t {
    pub item: *mut libvlc_renderer_item_t,
}

/// The `u` member of `libvlc_event_t`.
///
/// Field names group the C union members by shape; the per-kind mapping
/// lives with the decoder in the bridge crate.
#[repr(C)]
#[derive(Clone, Copy)]
pub union libvlc_event_u {
    pub media_meta_changed: libvlc_media_meta_changed_t,
    pub media_item: libvlc_media_item_t,
    pub media_duration_changed: libvlc_media_duration_changed_t,
    pub int_changed: libvlc_int_changed_t,
    pub float_changed: libvlc_float_changed_t,
    pub time_changed: libvlc_time_changed_t,
    pub media_list_item: libvlc_media_list_item_t,
    pub string: libvlc_string_t,
    pub es_changed: libvlc_es_changed_t,
    pub vlm_media_event: libvlc_vlm_media_event_t,
    pub renderer_item: libvlc_renderer_item_event_t,
}

#[repr(C)]
#[derive(Clone, Copy)]
pub struct libvlc_event_t {
    pub type_: libvlc_event_type_t,
    pub p_obj: *mut c_void,
    pub u: libvlc_event_u,
}

impl libvlc_event_t {
    /// An event of the given type with a zeroed payload.
    pub fn empty(type_: libvlc_event_type_t) -> Self {
        Self {
            type_,
            p_obj: std::ptr::null_mut(),
            // The two-pointer member is the widest one, so this clears the union.
            u: libvlc_event_u {
                vlm_media_event: libvlc_vlm_media_event_t {
                    psz_media_name: std::ptr::null(),
                    psz_instance_name: std::ptr::null(),
                },
            },
        }
    }
}

/// Signature libvlc expects for event callbacks.
pub type libvlc_callback_t =
    Option<unsafe extern "C" fn(p_event: *const libvlc_event_t, p_data: *mut c_void)>;

// ============================================================================
// Callback-backed media (libvlc_media_new_callbacks)
// ============================================================================

pub type libvlc_media_open_cb = Option<
    unsafe extern "C" fn(opaque: *mut c_void, datap: *mut *mut c_void, sizep: *mut u64) -> c_int,
>;
pub type libvlc_media_read_cb =
    Option<unsafe extern "C" fn(opaque: *mut c_void, buf: *mut c_uchar, len: usize) -> isize>;
pub type libvlc_media_seek_cb = Option<unsafe extern "C" fn(opaque: *mut c_void, offset: u64) -> c_int>;
pub type libvlc_media_close_cb = Option<unsafe extern "C" fn(opaque: *mut c_void)>;

// ============================================================================
// Event type constants
// ============================================================================

pub const libvlc_MediaMetaChanged: libvlc_event_type_t = 0x000;
pub const libvlc_MediaSubItemAdded: libvlc_event_type_t = 0x001;
pub const libvlc_MediaDurationChanged: libvlc_event_type_t = 0x002;
pub const libvlc_MediaParsedChanged: libvlc_event_type_t = 0x003;
pub const libvlc_MediaFreed: libvlc_event_type_t = 0x004;
pub const libvlc_MediaStateChanged: libvlc_event_type_t = 0x005;
pub const libvlc_MediaSubItemTreeAdded: libvlc_event_type_t = 0x006;

pub const libvlc_MediaPlayerMediaChanged: libvlc_event_type_t = 0x100;
pub const libvlc_MediaPlayerNothingSpecial: libvlc_event_type_t = 0x101;
pub const libvlc_MediaPlayerOpening: libvlc_event_type_t = 0x102;
pub const libvlc_MediaPlayerBuffering: libvlc_event_type_t = 0x103;
pub const libvlc_MediaPlayerPlaying: libvlc_event_type_t = 0x104;
pub const libvlc_MediaPlayerPaused: libvlc_event_type_t = 0x105;
pub const libvlc_MediaPlayerStopped: libvlc_event_type_t = 0x106;
pub const libvlc_MediaPlayerForward: libvlc_event_type_t = 0x107;
pub const libvlc_MediaPlayerBackward: libvlc_event_type_t = 0x108;
pub const libvlc_MediaPlayerEndReached: libvlc_event_type_t = 0x109;
pub const libvlc_MediaPlayerEncounteredError: libvlc_event_type_t = 0x10A;
pub const libvlc_MediaPlayerTimeChanged: libvlc_event_type_t = 0x10B;
pub const libvlc_MediaPlayerPositionChanged: libvlc_event_type_t = 0x10C;
pub const libvlc_MediaPlayerSeekableChanged: libvlc_event_type_t = 0x10D;
pub const libvlc_MediaPlayerPausableChanged: libvlc_event_type_t = 0x10E;
pub const libvlc_MediaPlayerTitleChanged: libvlc_event_type_t = 0x10F;
pub const libvlc_MediaPlayerSnapshotTaken: libvlc_event_type_t = 0x110;
pub const libvlc_MediaPlayerLengthChanged: libvlc_event_type_t = 0x111;
pub const libvlc_MediaPlayerVout: libvlc_event_type_t = 0x112;
pub const libvlc_MediaPlayerScrambledChanged: libvlc_event_type_t = 0x113;
pub const libvlc_MediaPlayerESAdded: libvlc_event_type_t = 0x114;
pub const libvlc_MediaPlayerESDeleted: libvlc_event_type_t = 0x115;
pub const libvlc_MediaPlayerESSelected: libvlc_event_type_t = 0x116;
pub const libvlc_MediaPlayerCorked: libvlc_event_type_t = 0x117;
pub const libvlc_MediaPlayerUncorked: libvlc_event_type_t = 0x118;
pub const libvlc_MediaPlayerMuted: libvlc_event_type_t = 0x119;
pub const libvlc_MediaPlayerUnmuted: libvlc_event_type_t = 0x11A;
pub const libvlc_MediaPlayerAudioVolume: libvlc_event_type_t = 0x11B;
pub const libvlc_MediaPlayerAudioDevice: libvlc_event_type_t = 0x11C;
pub const libvlc_MediaPlayerChapterChanged: libvlc_event_type_t = 0x11D;

pub const libvlc_MediaListItemAdded: libvlc_event_type_t = 0x200;
pub const libvlc_MediaListWillAddItem: libvlc_event_type_t = 0x201;
pub const libvlc_MediaListItemDeleted: libvlc_event_type_t = 0x202;
pub const libvlc_MediaListWillDeleteItem: libvlc_event_type_t = 0x203;
pub const libvlc_MediaListEndReached: libvlc_event_type_t = 0x204;

pub const libvlc_MediaListViewItemAdded: libvlc_event_type_t = 0x300;
pub const libvlc_MediaListViewWillAddItem: libvlc_event_type_t = 0x301;
pub const libvlc_MediaListViewItemDeleted: libvlc_event_type_t = 0x302;
pub const libvlc_MediaListViewWillDeleteItem: libvlc_event_type_t = 0x303;

pub const libvlc_MediaListPlayerPlayed: libvlc_event_type_t = 0x400;
pub const libvlc_MediaListPlayerNextItemSet: libvlc_event_type_t = 0x401;
pub const libvlc_MediaListPlayerStopped: libvlc_event_type_t = 0x402;

pub const libvlc_MediaDiscovererStarted: libvlc_event_type_t = 0x500;
pub const libvlc_MediaDiscovererEnded: libvlc_event_type_t = 0x501;
pub const libvlc_RendererDiscovererItemAdded: libvlc_event_type_t = 0x502;
pub const libvlc_RendererDiscovererItemDeleted: libvlc_event_type_t = 0x503;

pub const libvlc_VlmMediaAdded: libvlc_event_type_t = 0x600;
pub const libvlc_VlmMediaRemoved: libvlc_event_type_t = 0x601;
pub const libvlc_VlmMediaChanged: libvlc_event_type_t = 0x602;
pub const libvlc_VlmMediaInstanceStarted: libvlc_event_type_t = 0x603;
pub const libvlc_VlmMediaInstanceStopped: libvlc_event_type_t = 0x604;
pub const libvlc_VlmMediaInstanceStatusInit: libvlc_event_type_t = 0x605;
pub const libvlc_VlmMediaInstanceStatusOpening: libvlc_event_type_t = 0x606;
pub const libvlc_VlmMediaInstanceStatusPlaying: libvlc_event_type_t = 0x607;
pub const libvlc_VlmMediaInstanceStatusPause: libvlc_event_type_t = 0x608;
pub const libvlc_VlmMediaInstanceStatusEnd: libvlc_event_type_t = 0x609;
pub const libvlc_VlmMediaInstanceStatusError: libvlc_event_type_t = 0x60A;

// ============================================================================
// Functions
// ============================================================================

#[cfg(feature = "link")]
#[link(name = "vlc")]
extern "C" {
    pub fn libvlc_new(argc: c_int, argv: *const *const c_char) -> *mut libvlc_instance_t;
    pub fn libvlc_release(p_instance: *mut libvlc_instance_t);
    pub fn libvlc_set_user_agent(
        p_instance: *mut libvlc_instance_t,
        name: *const c_char,
        http: *const c_char,
    );

    pub fn libvlc_errmsg() -> *const c_char;
    pub fn libvlc_clearerr();

    pub fn libvlc_event_attach(
        p_event_manager: *mut libvlc_event_manager_t,
        i_event_type: libvlc_event_type_t,
        f_callback: libvlc_callback_t,
        user_data: *mut c_void,
    ) -> c_int;
    pub fn libvlc_event_detach(
        p_event_manager: *mut libvlc_event_manager_t,
        i_event_type: libvlc_event_type_t,
        f_callback: libvlc_callback_t,
        p_user_data: *mut c_void,
    );

    pub fn libvlc_renderer_item_hold(p_item: *mut libvlc_renderer_item_t) -> *mut libvlc_renderer_item_t;
    pub fn libvlc_renderer_item_release(p_item: *mut libvlc_renderer_item_t);

    pub fn libvlc_media_new_callbacks(
        instance: *mut libvlc_instance_t,
        open_cb: libvlc_media_open_cb,
        read_cb: libvlc_media_read_cb,
        seek_cb: libvlc_media_seek_cb,
        close_cb: libvlc_media_close_cb,
        opaque: *mut c_void,
    ) -> *mut libvlc_media_t;
    pub fn libvlc_media_release(p_md: *mut libvlc_media_t);
}
