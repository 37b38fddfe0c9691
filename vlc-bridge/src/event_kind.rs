//! Semantic event kinds and their native codes
//!
//! Codes are the libvlc 3.x constants, preserved verbatim in both directions.

use vlc_sys as sys;

/// Range of the event code space an [`EventKind`] belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventCategory {
    /// 0x000-0x0FF
    Media,
    /// 0x100-0x1FF
    Player,
    /// 0x200-0x2FF
    MediaList,
    /// 0x300-0x3FF, deprecated by libvlc
    MediaListView,
    /// 0x400-0x4FF
    ListPlayer,
    /// 0x500-0x5FF
    Discoverer,
    /// 0x600-0x6FF
    Vlm,
}

impl EventCategory {
    /// Category owning a raw code, if it falls in a known range
    pub fn of_code(code: i32) -> Option<Self> {
        match code {
            0x000..=0x0FF => Some(Self::Media),
            0x100..=0x1FF => Some(Self::Player),
            0x200..=0x2FF => Some(Self::MediaList),
            0x300..=0x3FF => Some(Self::MediaListView),
            0x400..=0x4FF => Some(Self::ListPlayer),
            0x500..=0x5FF => Some(Self::Discoverer),
            0x600..=0x6FF => Some(Self::Vlm),
            _ => None,
        }
    }
}

macro_rules! event_kinds {
    ($($variant:ident => $code:path),* $(,)?) => {
        /// A native event the bridge can attach to
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum EventKind {
            $($variant,)*
        }

        impl EventKind {
            /// Every known kind, in code order
            pub const ALL: &'static [EventKind] = &[$(EventKind::$variant,)*];

            /// The native event code
            pub fn code(self) -> i32 {
                match self {
                    $(EventKind::$variant => $code,)*
                }
            }

            /// Map a native code back to its kind
            pub fn from_code(code: i32) -> Option<Self> {
                match code {
                    $(c if c == $code => Some(EventKind::$variant),)*
                    _ => None,
                }
            }
        }
    };
}

event_kinds! {
    MediaMetaChanged => sys::libvlc_MediaMetaChanged,
    MediaSubItemAdded => sys::libvlc_MediaSubItemAdded,
    MediaDurationChanged => sys::libvlc_MediaDurationChanged,
    MediaParsedChanged => sys::libvlc_MediaParsedChanged,
    MediaFreed => sys::libvlc_MediaFreed,
    MediaStateChanged => sys::libvlc_MediaStateChanged,
    MediaSubItemTreeAdded => sys::libvlc_MediaSubItemTreeAdded,

    PlayerMediaChanged => sys::libvlc_MediaPlayerMediaChanged,
    PlayerNothingSpecial => sys::libvlc_MediaPlayerNothingSpecial,
    PlayerOpening => sys::libvlc_MediaPlayerOpening,
    PlayerBuffering => sys::libvlc_MediaPlayerBuffering,
    PlayerPlaying => sys::libvlc_MediaPlayerPlaying,
    PlayerPaused => sys::libvlc_MediaPlayerPaused,
    PlayerStopped => sys::libvlc_MediaPlayerStopped,
    PlayerForward => sys::libvlc_MediaPlayerForward,
    PlayerBackward => sys::libvlc_MediaPlayerBackward,
    PlayerEndReached => sys::libvlc_MediaPlayerEndReached,
    PlayerEncounteredError => sys::libvlc_MediaPlayerEncounteredError,
    PlayerTimeChanged => sys::libvlc_MediaPlayerTimeChanged,
    PlayerPositionChanged => sys::libvlc_MediaPlayerPositionChanged,
    PlayerSeekableChanged => sys::libvlc_MediaPlayerSeekableChanged,
    PlayerPausableChanged => sys::libvlc_MediaPlayerPausableChanged,
    PlayerTitleChanged => sys::libvlc_MediaPlayerTitleChanged,
    PlayerSnapshotTaken => sys::libvlc_MediaPlayerSnapshotTaken,
    PlayerLengthChanged => sys::libvlc_MediaPlayerLengthChanged,
    PlayerVout => sys::libvlc_MediaPlayerVout,
    PlayerScrambledChanged => sys::libvlc_MediaPlayerScrambledChanged,
    PlayerEsAdded => sys::libvlc_MediaPlayerESAdded,
    PlayerEsDeleted => sys::libvlc_MediaPlayerESDeleted,
    PlayerEsSelected => sys::libvlc_MediaPlayerESSelected,
    PlayerCorked => sys::libvlc_MediaPlayerCorked,
    PlayerUncorked => sys::libvlc_MediaPlayerUncorked,
    PlayerMuted => sys::libvlc_MediaPlayerMuted,
    PlayerUnmuted => sys::libvlc_MediaPlayerUnmuted,
    PlayerAudioVolume => sys::libvlc_MediaPlayerAudioVolume,
    PlayerAudioDevice => sys::libvlc_MediaPlayerAudioDevice,
    PlayerChapterChanged => sys::libvlc_MediaPlayerChapterChanged,

    MediaListItemAdded => sys::libvlc_MediaListItemAdded,
    MediaListWillAddItem => sys::libvlc_MediaListWillAddItem,
    MediaListItemDeleted => sys::libvlc_MediaListItemDeleted,
    MediaListWillDeleteItem => sys::libvlc_MediaListWillDeleteItem,
    MediaListEndReached => sys::libvlc_MediaListEndReached,

    MediaListViewItemAdded => sys::libvlc_MediaListViewItemAdded,
    MediaListViewWillAddItem => sys::libvlc_MediaListViewWillAddItem,
    MediaListViewItemDeleted => sys::libvlc_MediaListViewItemDeleted,
    MediaListViewWillDeleteItem => sys::libvlc_MediaListViewWillDeleteItem,

    ListPlayerPlayed => sys::libvlc_MediaListPlayerPlayed,
    ListPlayerNextItemSet => sys::libvlc_MediaListPlayerNextItemSet,
    ListPlayerStopped => sys::libvlc_MediaListPlayerStopped,

    MediaDiscovererStarted => sys::libvlc_MediaDiscovererStarted,
    MediaDiscovererEnded => sys::libvlc_MediaDiscovererEnded,
    RendererDiscovererItemAdded => sys::libvlc_RendererDiscovererItemAdded,
    RendererDiscovererItemDeleted => sys::libvlc_RendererDiscovererItemDeleted,

    VlmMediaAdded => sys::libvlc_VlmMediaAdded,
    VlmMediaRemoved => sys::libvlc_VlmMediaRemoved,
    VlmMediaChanged => sys::libvlc_VlmMediaChanged,
    VlmMediaInstanceStarted => sys::libvlc_VlmMediaInstanceStarted,
    VlmMediaInstanceStopped => sys::libvlc_VlmMediaInstanceStopped,
    VlmMediaInstanceStatusInit => sys::libvlc_VlmMediaInstanceStatusInit,
    VlmMediaInstanceStatusOpening => sys::libvlc_VlmMediaInstanceStatusOpening,
    VlmMediaInstanceStatusPlaying => sys::libvlc_VlmMediaInstanceStatusPlaying,
    VlmMediaInstanceStatusPause => sys::libvlc_VlmMediaInstanceStatusPause,
    VlmMediaInstanceStatusEnd => sys::libvlc_VlmMediaInstanceStatusEnd,
    VlmMediaInstanceStatusError => sys::libvlc_VlmMediaInstanceStatusError,
}

impl EventKind {
    /// The code range this kind belongs to
    pub fn category(self) -> EventCategory {
        // Every declared code lies in one of the ranges.
        EventCategory::of_code(self.code()).unwrap_or(EventCategory::Media)
    }
}

impl TryFrom<i32> for EventKind {
    type Error = i32;

    fn try_from(code: i32) -> Result<Self, Self::Error> {
        EventKind::from_code(code).ok_or(code)
    }
}

impl From<EventKind> for i32 {
    fn from(kind: EventKind) -> Self {
        kind.code()
    }
}
