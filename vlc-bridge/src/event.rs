//! Decoded native events
//!
//! libvlc passes every event as a `libvlc_event_t` whose `u` member is a
//! union keyed by the event type. [`decode`] reads exactly the member the
//! libvlc 3.x headers associate with each [`EventKind`] and copies it into an
//! owned [`Event`], so callbacks never touch the raw union.

use std::ffi::CStr;
use std::os::raw::{c_char, c_void};

use vlc_sys as sys;

use crate::event_kind::EventKind;

/// Address of a native object carried by an event
///
/// Only valid for the duration of the callback unless the object was
/// explicitly retained (renderer items are held by
/// [`RendererDiscovery`](crate::RendererDiscovery)).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NativeRef(usize);

impl NativeRef {
    /// The null reference
    pub const NULL: NativeRef = NativeRef(0);

    pub fn from_ptr<T>(ptr: *const T) -> Self {
        Self(ptr as usize)
    }

    pub fn from_addr(addr: usize) -> Self {
        Self(addr)
    }

    pub fn addr(&self) -> usize {
        self.0
    }

    pub fn is_null(&self) -> bool {
        self.0 == 0
    }

    /// Reinterpret as a typed native pointer
    pub fn as_ptr<T>(&self) -> *mut T {
        self.0 as *mut T
    }
}

impl std::fmt::Display for NativeRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}

/// Event-specific data extracted from the native payload union
#[derive(Debug, Clone, PartialEq)]
pub enum EventPayload {
    /// The kind carries no data
    None,
    /// `libvlc_meta_t` of the changed field
    MetaChanged(i32),
    /// A media object (sub item added, media freed, player media changed,
    /// next list item set)
    Media(NativeRef),
    /// Duration in milliseconds
    Duration(i64),
    /// `libvlc_media_parsed_status_t`
    ParsedStatus(i32),
    /// `libvlc_state_t`
    State(i32),
    /// Cache fill percentage
    Buffering(f32),
    /// Playback time in milliseconds
    Time(i64),
    /// Media length in milliseconds
    Length(i64),
    /// Position in the range 0.0..=1.0
    Position(f32),
    /// Seekable, pausable or scrambled flag
    Flag(bool),
    /// Title or chapter number
    Index(i32),
    /// Number of video outputs
    VoutCount(i32),
    /// Path of the written snapshot
    Snapshot(Option<String>),
    /// Elementary stream added, deleted or selected
    ElementaryStream { track_type: i32, id: i32 },
    /// Audio volume
    Volume(f32),
    /// Audio output device identifier
    AudioDevice(Option<String>),
    /// Media list mutation
    ListItem { media: NativeRef, index: i32 },
    /// Renderer item added or deleted
    Renderer(NativeRef),
    /// VLM media or instance change
    Vlm {
        media_name: Option<String>,
        instance_name: Option<String>,
    },
}

/// An owned, decoded native event
#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    /// Kind the callback was registered for
    pub kind: EventKind,
    /// Object that emitted the event
    pub source: NativeRef,
    /// Kind-specific data
    pub payload: EventPayload,
}

impl Event {
    pub fn new(kind: EventKind, payload: EventPayload) -> Self {
        Self {
            kind,
            source: NativeRef::NULL,
            payload,
        }
    }
}

/// Decode a native event as `kind`
///
/// # Safety
///
/// `raw` must have been produced by libvlc (or an equivalent emitter) for an
/// event of type `kind`, and any string pointers inside its payload must be
/// valid NUL-terminated strings or null.
pub unsafe fn decode(kind: EventKind, raw: &sys::libvlc_event_t) -> Event {
    use EventKind::*;

    let u = &raw.u;
    let payload = match kind {
        MediaMetaChanged => EventPayload::MetaChanged(u.media_meta_changed.meta_type),
        MediaSubItemAdded | MediaSubItemTreeAdded | MediaFreed | PlayerMediaChanged
        | ListPlayerNextItemSet => EventPayload::Media(NativeRef::from_ptr(u.media_item.item)),
        MediaDurationChanged => EventPayload::Duration(u.media_duration_changed.new_duration),
        MediaParsedChanged => EventPayload::ParsedStatus(u.int_changed.value),
        MediaStateChanged => EventPayload::State(u.int_changed.value),

        PlayerBuffering => EventPayload::Buffering(u.float_changed.value),
        PlayerTimeChanged => EventPayload::Time(u.time_changed.value),
        PlayerLengthChanged => EventPayload::Length(u.time_changed.value),
        PlayerPositionChanged => EventPayload::Position(u.float_changed.value),
        PlayerSeekableChanged | PlayerPausableChanged | PlayerScrambledChanged => {
            EventPayload::Flag(u.int_changed.value != 0)
        }
        PlayerTitleChanged | PlayerChapterChanged => EventPayload::Index(u.int_changed.value),
        PlayerVout => EventPayload::VoutCount(u.int_changed.value),
        PlayerSnapshotTaken => EventPayload::Snapshot(owned_string(u.string.psz)),
        PlayerEsAdded | PlayerEsDeleted | PlayerEsSelected => EventPayload::ElementaryStream {
            track_type: u.es_changed.i_type,
            id: u.es_changed.i_id,
        },
        PlayerAudioVolume => EventPayload::Volume(u.float_changed.value),
        PlayerAudioDevice => EventPayload::AudioDevice(owned_string(u.string.psz)),

        MediaListItemAdded
        | MediaListWillAddItem
        | MediaListItemDeleted
        | MediaListWillDeleteItem
        | MediaListViewItemAdded
        | MediaListViewWillAddItem
        | MediaListViewItemDeleted
        | MediaListViewWillDeleteItem => EventPayload::ListItem {
            media: NativeRef::from_ptr(u.media_list_item.item),
            index: u.media_list_item.index,
        },

        RendererDiscovererItemAdded | RendererDiscovererItemDeleted => {
            EventPayload::Renderer(NativeRef::from_ptr(u.renderer_item.item))
        }

        VlmMediaAdded
        | VlmMediaRemoved
        | VlmMediaChanged
        | VlmMediaInstanceStarted
        | VlmMediaInstanceStopped
        | VlmMediaInstanceStatusInit
        | VlmMediaInstanceStatusOpening
        | VlmMediaInstanceStatusPlaying
        | VlmMediaInstanceStatusPause
        | VlmMediaInstanceStatusEnd
        | VlmMediaInstanceStatusError => EventPayload::Vlm {
            media_name: owned_string(u.vlm_media_event.psz_media_name),
            instance_name: owned_string(u.vlm_media_event.psz_instance_name),
        },

        PlayerNothingSpecial
        | PlayerOpening
        | PlayerPlaying
        | PlayerPaused
        | PlayerStopped
        | PlayerForward
        | PlayerBackward
        | PlayerEndReached
        | PlayerEncounteredError
        | PlayerCorked
        | PlayerUncorked
        | PlayerMuted
        | PlayerUnmuted
        | MediaListEndReached
        | ListPlayerPlayed
        | ListPlayerStopped
        | MediaDiscovererStarted
        | MediaDiscovererEnded => EventPayload::None,
    };

    Event {
        kind,
        source: NativeRef::from_ptr(raw.p_obj as *const c_void),
        payload,
    }
}

unsafe fn owned_string(ptr: *const c_char) -> Option<String> {
    if ptr.is_null() {
        return None;
    }
    Some(CStr::from_ptr(ptr).to_string_lossy().into_owned())
}
