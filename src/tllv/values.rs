//! Fixed lookup tables for enumerated record fields.
//!
//! Every wire value is widened to `u64` before lookup so one marker type,
//! [`Enumerant`], covers 4- and 8-byte fields alike.

/// Enumerations decoded from a big-endian wire value.
pub trait WireEnum: Sized + Copy {
    fn from_raw(raw: u64) -> Option<Self>;
    fn description(self) -> &'static str;
}

/// A decoded enumerated field: either a known table entry or the raw value
/// that matched nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Enumerant<T> {
    Known(T),
    Unrecognized(u64),
}

impl<T: WireEnum> Enumerant<T> {
    pub fn from_raw(raw: u64) -> Self {
        match T::from_raw(raw) {
            Some(v) => Self::Known(v),
            None => Self::Unrecognized(raw),
        }
    }

    pub fn known(self) -> Option<T> {
        match self {
            Self::Known(v) => Some(v),
            Self::Unrecognized(_) => None,
        }
    }

    pub fn is_recognized(self) -> bool {
        matches!(self, Self::Known(_))
    }
}

macro_rules! wire_enum {
    (
        $(#[$meta:meta])*
        pub enum $name:ident: $raw:ty {
            $($variant:ident = $value:literal => $desc:literal,)+
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum $name {
            $($variant,)+
        }

        impl $name {
            pub const fn raw(self) -> $raw {
                match self {
                    $(Self::$variant => $value,)+
                }
            }
        }

        impl WireEnum for $name {
            fn from_raw(raw: u64) -> Option<Self> {
                $(
                    if raw == Self::$variant.raw() as u64 {
                        return Some(Self::$variant);
                    }
                )+
                None
            }

            fn description(self) -> &'static str {
                match self {
                    $(Self::$variant => $desc,)+
                }
            }
        }
    };
}

wire_enum! {
    /// Where the decrypted content is going to be played.
    pub enum StreamingTarget: u64 {
        AirPlay = 0xabb0256a31843974 => "Content will be sent by AirPlay to an Apple TV box or FPS-enabled TV or STB",
        DigitalAvAdapter = 0x5f9c8132b59f2fde => "Content will be sent to an Apple digital AV adapter",
    }
}

/// Description used when the streaming indicator names no external target.
pub const LOCAL_PLAYBACK: &str = "Content playback will occur on the requesting device";

wire_enum! {
    pub enum PlaybackState: u32 {
        ReadyToStart = 0xf4dee5a2 => "State 1: the device is ready to start playing; the CKC must contain a valid content key",
        PlayingOrPaused = 0xa5d6739e => "State 2: the stream is playing or paused; the CKC must contain a rent/lease response but no content key is needed",
        LeaseExpiring = 0x4f834330 => "State 3: the stream is playing but the lease is about to expire; the CKC must contain a valid content key",
    }
}

wire_enum! {
    pub enum DeviceType: u64 {
        Mac = 0x358c41b1ec78f599 => "Mac",
        AppleTv = 0xc1500767c86c1fae => "Apple TV, TV, STB",
        IosDevice = 0x8551fd5e31f479b3 => "iPhone, iPad, iPod",
        Watch = 0x5da86ac0c57155dc => "Apple Watch",
    }
}

wire_enum! {
    pub enum DeviceClass: u32 {
        Unknown = 0 => "Unknown",
        AppleLiving = 1 => "Apple Living",
        AppleMobile = 2 => "Apple Mobile",
        AppleDesktop = 3 => "Apple Desktop",
        AppleSpatial = 4 => "Apple Spatial",
        AppleUnknown = 127 => "Apple Unknown",
        PartnerLiving = 128 => "Partner Living",
        PartnerUnknown = 255 => "Partner Unknown",
    }
}

wire_enum! {
    pub enum SecurityLevel: u64 {
        Audio = 0x17d99d574eed567d => "Audio",
        Baseline = 0x32f0004966a5c4f8 => "Baseline",
        Main = 0x4e7fd92421d588b4 => "Main",
    }
}

wire_enum! {
    pub enum HdcpRequirement: u64 {
        NotRequired = 0xef72894ca7895b78 => "HDCP not required",
        Type0 = 0x40791ac78bd5c571 => "HDCP Type 0 is required",
        Type1 = 0x285a0863bba8e1d3 => "HDCP Type 1 is required",
    }
}

wire_enum! {
    pub enum KeyDurationType: u32 {
        Lease = 0x1a4bde7e => "Content key valid for lease only",
        Rental = 0x3dfe45a0 => "Content key valid for rental only",
        LeaseAndRental = 0x27b59bde => "Content key valid for both lease and rental",
        Persistence = 0x3df2d9fb => "Content key can be persisted with unlimited validity duration",
        PersistenceAndDuration = 0x18f06048 => "Content key can be persisted; validity is limited to the rental duration",
    }
}

/// Bits of the low word of the capabilities record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CapabilityFlag {
    HdcpType1Enforcement,
    OfflineKey,
    CheckIn,
    OfflineKeyV2,
    SecurityLevelBaseline,
    SecurityLevelMain,
}

impl CapabilityFlag {
    pub const ALL: [Self; 6] = [
        Self::HdcpType1Enforcement,
        Self::OfflineKey,
        Self::CheckIn,
        Self::OfflineKeyV2,
        Self::SecurityLevelBaseline,
        Self::SecurityLevelMain,
    ];

    pub const fn bit(self) -> u32 {
        match self {
            Self::HdcpType1Enforcement => 0,
            Self::OfflineKey => 1,
            Self::CheckIn => 2,
            Self::OfflineKeyV2 => 3,
            Self::SecurityLevelBaseline => 4,
            Self::SecurityLevelMain => 5,
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            Self::HdcpType1Enforcement => "HDCP type 1 enforcement",
            Self::OfflineKey => "offline key",
            Self::CheckIn => "check-in (secure delete)",
            Self::OfflineKeyV2 => "offline key TLLV v2",
            Self::SecurityLevelBaseline => "enforcement of security level Baseline",
            Self::SecurityLevelMain => "enforcement of security level Main",
        }
    }
}

/// Bits of the flags word of an offline-sync v2 record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SyncFlag {
    SyncRequested,
    InvalidationRequested,
    DeleteAllRequested,
    Succeeded,
    KeyNotFound,
    KeyExpired,
}

impl SyncFlag {
    pub const ALL: [Self; 6] = [
        Self::SyncRequested,
        Self::InvalidationRequested,
        Self::DeleteAllRequested,
        Self::Succeeded,
        Self::KeyNotFound,
        Self::KeyExpired,
    ];

    pub const fn bit(self) -> u32 {
        match self {
            Self::SyncRequested => 0,
            Self::InvalidationRequested => 1,
            Self::DeleteAllRequested => 2,
            Self::Succeeded => 16,
            Self::KeyNotFound => 17,
            Self::KeyExpired => 18,
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            Self::SyncRequested => "The client requested a sync",
            Self::InvalidationRequested => "The client requested a secure invalidation",
            Self::DeleteAllRequested => "The client requested a `Delete all` operation",
            Self::Succeeded => "The requested operation was successful",
            Self::KeyNotFound => "The provided persistent key was not found or is invalid",
            Self::KeyExpired => {
                "The provided persistent key is valid, but expired by the time of the request"
            }
        }
    }
}

/// Flags from `ALL` whose bit is set in `word`.
pub(crate) fn flags_in<F: Copy>(all: &[F], bit: impl Fn(F) -> u32, word: u64) -> Vec<F> {
    all.iter().copied().filter(|f| word & (1u64 << bit(*f)) != 0).collect()
}
