use super::registry::{self, RecordKind};
use super::values::{
    CapabilityFlag, DeviceClass, DeviceType, Enumerant, HdcpRequirement, KeyDurationType,
    PlaybackState, SecurityLevel, StreamingTarget, SyncFlag, WireEnum, flags_in,
};
use super::{LengthRule, RecordError};

pub const SESSION_KEY_R1_LEN: usize = 0x70;
pub const SESSION_KEY_IV_LEN: usize = 16;
pub const SESSION_KEY_PAYLOAD_LEN: usize = 96;
pub const INTEGRITY_LEN: usize = 16;
pub const R1_LEN: usize = 44;
pub const R2_LEN: usize = 21;
pub const MAX_KEY_FORMATS: u32 = 64;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionKeyR1 {
    pub iv: [u8; SESSION_KEY_IV_LEN],
    pub encrypted_payload: [u8; SESSION_KEY_PAYLOAD_LEN],
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MediaPlaybackState {
    /// Seconds since the Unix epoch.
    pub creation_date: u32,
    pub state: PlaybackState,
    pub session_id: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capabilities {
    pub high: u64,
    pub low: u64,
}

impl Capabilities {
    pub fn supports(&self, flag: CapabilityFlag) -> bool {
        self.low & (1u64 << flag.bit()) != 0
    }

    pub fn supported(&self) -> Vec<CapabilityFlag> {
        flags_in(&CapabilityFlag::ALL, CapabilityFlag::bit, self.low)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OfflineSync {
    /// No offline operation requested.
    V0,
    V1 {
        content_id: [u8; 16],
        duration_to_expiry: u32,
    },
    V2 {
        server_challenge: [u8; 8],
        flags: u64,
        title_id: [u8; 16],
        duration_to_expiry: u32,
        invalidated_records: Vec<[u8; 16]>,
    },
}

impl OfflineSync {
    pub fn version(&self) -> u32 {
        match self {
            Self::V0 => 0,
            Self::V1 { .. } => 1,
            Self::V2 { .. } => 2,
        }
    }

    pub fn flags(&self) -> Vec<SyncFlag> {
        match self {
            Self::V2 { flags, .. } => flags_in(&SyncFlag::ALL, SyncFlag::bit, *flags),
            _ => Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceInfo {
    pub device_type: Enumerant<DeviceType>,
    pub os_version: [u8; 4],
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SecurityLevelReport {
    V1 {
        level: Enumerant<SecurityLevel>,
        kdl_version: u32,
    },
    Unsupported {
        version: u32,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceIdentity {
    pub fpdi_version: u32,
    pub device_class: Enumerant<DeviceClass>,
    pub vendor_hash: u64,
    pub product_hash: u64,
    pub fp_version_ree: u32,
    pub fp_version_tee: u32,
    /// Only meaningful for Apple devices (`fpdi_version <= 127`).
    pub os_version: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SupportedKeyFormats {
    V1 { formats: Vec<u64> },
    Unsupported { version: u32 },
}

impl SupportedKeyFormats {
    pub fn formats(&self) -> &[u64] {
        match self {
            Self::V1 { formats } => formats,
            Self::Unsupported { .. } => &[],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VmDeviceInfoV1 {
    pub host_device_class: Enumerant<DeviceClass>,
    pub host_os_version: u32,
    pub host_vm_protocol_version: u32,
    pub guest_device_class: Enumerant<DeviceClass>,
    pub guest_os_version: u32,
    pub guest_vm_protocol_version: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VmDeviceInformation {
    V1(VmDeviceInfoV1),
    Unsupported { version: u32 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContentKeyDuration {
    pub lease_duration: u32,
    pub rental_duration: u32,
    pub key_type: KeyDurationType,
    pub reserved: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HdcpEnforcement {
    pub requirement: HdcpRequirement,
    pub reserved: [u8; 8],
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SecurityLevelRequired {
    pub version: u32,
    pub level: Enumerant<SecurityLevel>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OfflineKey {
    V1 {
        stream_id: [u8; 16],
        storage_duration: u32,
        playback_duration: u32,
    },
    V2 {
        stream_id: [u8; 16],
        storage_duration: u32,
        playback_duration: u32,
        title_id: [u8; 16],
    },
    Unsupported {
        version: u32,
    },
}

/// Typed interpretation of one record value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordValue {
    SessionKeyR1(SessionKeyR1),
    SessionKeyR1Integrity([u8; INTEGRITY_LEN]),
    AntiReplaySeed([u8; 16]),
    R2([u8; R2_LEN]),
    ReturnRequest(Vec<u64>),
    AssetId(Vec<u8>),
    TransactionId(u64),
    ProtocolVersionsSupported(Vec<u32>),
    ProtocolVersionUsed(u32),
    StreamingIndicator(Enumerant<StreamingTarget>),
    MediaPlaybackState(MediaPlaybackState),
    Capabilities(Capabilities),
    OfflineSync(OfflineSync),
    DeviceInfo(DeviceInfo),
    SecurityLevelReport(SecurityLevelReport),
    KextDenyList(u32),
    DeviceIdentity(DeviceIdentity),
    SupportedKeyFormats(SupportedKeyFormats),
    VmDeviceInformation(VmDeviceInformation),
    EncryptedContentKey(Vec<u8>),
    R1([u8; R1_LEN]),
    ContentKeyDuration(ContentKeyDuration),
    HdcpEnforcement(HdcpEnforcement),
    SecurityLevelRequired(SecurityLevelRequired),
    OfflineKey(OfflineKey),
    /// Unregistered tag; the raw value is kept as-is.
    Opaque(Vec<u8>),
}

impl RecordValue {
    pub fn kind(&self) -> RecordKind {
        match self {
            Self::SessionKeyR1(_) => RecordKind::SessionKeyR1,
            Self::SessionKeyR1Integrity(_) => RecordKind::SessionKeyR1Integrity,
            Self::AntiReplaySeed(_) => RecordKind::AntiReplaySeed,
            Self::R2(_) => RecordKind::R2,
            Self::ReturnRequest(_) => RecordKind::ReturnRequest,
            Self::AssetId(_) => RecordKind::AssetId,
            Self::TransactionId(_) => RecordKind::TransactionId,
            Self::ProtocolVersionsSupported(_) => RecordKind::ProtocolVersionsSupported,
            Self::ProtocolVersionUsed(_) => RecordKind::ProtocolVersionUsed,
            Self::StreamingIndicator(_) => RecordKind::StreamingIndicator,
            Self::MediaPlaybackState(_) => RecordKind::MediaPlaybackState,
            Self::Capabilities(_) => RecordKind::Capabilities,
            Self::OfflineSync(_) => RecordKind::OfflineSync,
            Self::DeviceInfo(_) => RecordKind::DeviceInfo,
            Self::SecurityLevelReport(_) => RecordKind::SecurityLevelReport,
            Self::KextDenyList(_) => RecordKind::KextDenyList,
            Self::DeviceIdentity(_) => RecordKind::DeviceIdentity,
            Self::SupportedKeyFormats(_) => RecordKind::SupportedKeyFormats,
            Self::VmDeviceInformation(_) => RecordKind::VmDeviceInformation,
            Self::EncryptedContentKey(_) => RecordKind::EncryptedContentKey,
            Self::R1(_) => RecordKind::R1,
            Self::ContentKeyDuration(_) => RecordKind::ContentKeyDuration,
            Self::HdcpEnforcement(_) => RecordKind::HdcpEnforcement,
            Self::SecurityLevelRequired(_) => RecordKind::SecurityLevelRequired,
            Self::OfflineKey(_) => RecordKind::OfflineKey,
            Self::Opaque(_) => RecordKind::Opaque,
        }
    }
}

/// Decode `value` with the routine registered for `tag`.
pub fn decode(tag: u64, value: &[u8]) -> Result<RecordValue, RecordError> {
    (registry::lookup(tag).decode)(value)
}

// Length rules

fn exactly(value: &[u8], n: usize) -> Result<(), RecordError> {
    check(value, LengthRule::Exactly(n), value.len() == n)
}

fn at_least(value: &[u8], n: usize) -> Result<(), RecordError> {
    check(value, LengthRule::AtLeast(n), value.len() >= n)
}

fn multiple_of(value: &[u8], n: usize) -> Result<(), RecordError> {
    check(value, LengthRule::MultipleOf(n), value.len() % n == 0)
}

fn check(value: &[u8], rule: LengthRule, ok: bool) -> Result<(), RecordError> {
    if ok {
        Ok(())
    } else {
        Err(RecordError::Length {
            expected: rule,
            actual: value.len(),
        })
    }
}

// Big-endian field readers. Callers validate the length first; these still
// refuse to read past the end.

fn array_at<const N: usize>(value: &[u8], offset: usize) -> Result<[u8; N], RecordError> {
    value
        .get(offset..offset + N)
        .and_then(|s| s.try_into().ok())
        .ok_or(RecordError::Truncated { offset })
}

fn u32_at(value: &[u8], offset: usize) -> Result<u32, RecordError> {
    array_at(value, offset).map(u32::from_be_bytes)
}

fn u64_at(value: &[u8], offset: usize) -> Result<u64, RecordError> {
    array_at(value, offset).map(u64::from_be_bytes)
}

fn known<T: WireEnum>(field: &'static str, raw: u64) -> Result<T, RecordError> {
    T::from_raw(raw).ok_or(RecordError::UnrecognizedValue { field, value: raw })
}

fn reserved_zero(bytes: &[u8]) -> Result<(), RecordError> {
    if bytes.iter().all(|b| *b == 0) {
        Ok(())
    } else {
        Err(RecordError::ReservedNotZero)
    }
}

// Decode routines, one per registered tag.

pub(crate) fn decode_session_key_r1(value: &[u8]) -> Result<RecordValue, RecordError> {
    exactly(value, SESSION_KEY_R1_LEN)?;
    Ok(RecordValue::SessionKeyR1(SessionKeyR1 {
        iv: array_at(value, 0)?,
        encrypted_payload: array_at(value, SESSION_KEY_IV_LEN)?,
    }))
}

pub(crate) fn decode_session_key_r1_integrity(value: &[u8]) -> Result<RecordValue, RecordError> {
    exactly(value, INTEGRITY_LEN)?;
    Ok(RecordValue::SessionKeyR1Integrity(array_at(value, 0)?))
}

pub(crate) fn decode_anti_replay_seed(value: &[u8]) -> Result<RecordValue, RecordError> {
    exactly(value, 16)?;
    Ok(RecordValue::AntiReplaySeed(array_at(value, 0)?))
}

pub(crate) fn decode_r2(value: &[u8]) -> Result<RecordValue, RecordError> {
    exactly(value, R2_LEN)?;
    Ok(RecordValue::R2(array_at(value, 0)?))
}

pub(crate) fn decode_return_request(value: &[u8]) -> Result<RecordValue, RecordError> {
    multiple_of(value, 8)?;
    let tags = value
        .chunks_exact(8)
        .map(|c| u64_at(c, 0))
        .collect::<Result<_, _>>()?;
    Ok(RecordValue::ReturnRequest(tags))
}

pub(crate) fn decode_asset_id(value: &[u8]) -> Result<RecordValue, RecordError> {
    check(value, LengthRule::Between(2, 200), (2..=200).contains(&value.len()))?;
    Ok(RecordValue::AssetId(value.to_vec()))
}

pub(crate) fn decode_transaction_id(value: &[u8]) -> Result<RecordValue, RecordError> {
    exactly(value, 8)?;
    Ok(RecordValue::TransactionId(u64_at(value, 0)?))
}

pub(crate) fn decode_protocol_versions_supported(value: &[u8]) -> Result<RecordValue, RecordError> {
    multiple_of(value, 4)?;
    let versions = value
        .chunks_exact(4)
        .map(|c| u32_at(c, 0))
        .collect::<Result<_, _>>()?;
    Ok(RecordValue::ProtocolVersionsSupported(versions))
}

pub(crate) fn decode_protocol_version_used(value: &[u8]) -> Result<RecordValue, RecordError> {
    exactly(value, 4)?;
    Ok(RecordValue::ProtocolVersionUsed(u32_at(value, 0)?))
}

pub(crate) fn decode_streaming_indicator(value: &[u8]) -> Result<RecordValue, RecordError> {
    exactly(value, 8)?;
    Ok(RecordValue::StreamingIndicator(Enumerant::from_raw(u64_at(value, 0)?)))
}

pub(crate) fn decode_media_playback_state(value: &[u8]) -> Result<RecordValue, RecordError> {
    exactly(value, 16)?;
    Ok(RecordValue::MediaPlaybackState(MediaPlaybackState {
        creation_date: u32_at(value, 0)?,
        state: known("playback state", u32_at(value, 4)? as u64)?,
        session_id: u64_at(value, 8)?,
    }))
}

pub(crate) fn decode_capabilities(value: &[u8]) -> Result<RecordValue, RecordError> {
    exactly(value, 16)?;
    Ok(RecordValue::Capabilities(Capabilities {
        high: u64_at(value, 0)?,
        low: u64_at(value, 8)?,
    }))
}

pub(crate) fn decode_offline_sync(value: &[u8]) -> Result<RecordValue, RecordError> {
    at_least(value, 4)?;
    let sync = match u32_at(value, 0)? {
        0 => OfflineSync::V0,
        1 => {
            exactly(value, 28)?;
            reserved_zero(&value[4..8])?;
            OfflineSync::V1 {
                content_id: array_at(value, 8)?,
                duration_to_expiry: u32_at(value, 24)?,
            }
        }
        2 => {
            at_least(value, 48)?;
            reserved_zero(&value[4..8])?;
            let count = u32_at(value, 44)? as usize;
            exactly(value, 48 + 16 * count)?;
            let invalidated_records = value[48..]
                .chunks_exact(16)
                .map(|c| array_at(c, 0))
                .collect::<Result<_, _>>()?;
            OfflineSync::V2 {
                server_challenge: array_at(value, 8)?,
                flags: u64_at(value, 16)?,
                title_id: array_at(value, 24)?,
                duration_to_expiry: u32_at(value, 40)?,
                invalidated_records,
            }
        }
        version => return Err(RecordError::UnsupportedVersion(version)),
    };
    Ok(RecordValue::OfflineSync(sync))
}

pub(crate) fn decode_device_info(value: &[u8]) -> Result<RecordValue, RecordError> {
    exactly(value, 16)?;
    Ok(RecordValue::DeviceInfo(DeviceInfo {
        device_type: Enumerant::from_raw(u64_at(value, 0)?),
        os_version: array_at(value, 8)?,
    }))
}

pub(crate) fn decode_security_level_report(value: &[u8]) -> Result<RecordValue, RecordError> {
    exactly(value, 20)?;
    let report = match u32_at(value, 0)? {
        1 => {
            reserved_zero(&value[4..8])?;
            SecurityLevelReport::V1 {
                level: Enumerant::from_raw(u64_at(value, 8)?),
                kdl_version: u32_at(value, 16)?,
            }
        }
        version => SecurityLevelReport::Unsupported { version },
    };
    Ok(RecordValue::SecurityLevelReport(report))
}

pub(crate) fn decode_kext_deny_list(value: &[u8]) -> Result<RecordValue, RecordError> {
    exactly(value, 4)?;
    Ok(RecordValue::KextDenyList(u32_at(value, 0)?))
}

pub(crate) fn decode_device_identity(value: &[u8]) -> Result<RecordValue, RecordError> {
    at_least(value, 36)?;
    Ok(RecordValue::DeviceIdentity(DeviceIdentity {
        fpdi_version: u32_at(value, 0)?,
        device_class: Enumerant::from_raw(u32_at(value, 4)? as u64),
        vendor_hash: u64_at(value, 8)?,
        product_hash: u64_at(value, 16)?,
        fp_version_ree: u32_at(value, 24)?,
        fp_version_tee: u32_at(value, 28)?,
        os_version: u32_at(value, 32)?,
    }))
}

pub(crate) fn decode_supported_key_formats(value: &[u8]) -> Result<RecordValue, RecordError> {
    at_least(value, 4)?;
    let formats = match u32_at(value, 0)? {
        1 => {
            at_least(value, 12)?;
            let count = u32_at(value, 8)?;
            if count >= MAX_KEY_FORMATS {
                return Err(RecordError::TooManyEntries {
                    count,
                    max: MAX_KEY_FORMATS - 1,
                });
            }
            exactly(value, 12 + 8 * count as usize)?;
            let formats = value[12..]
                .chunks_exact(8)
                .map(|c| u64_at(c, 0))
                .collect::<Result<_, _>>()?;
            SupportedKeyFormats::V1 { formats }
        }
        version => SupportedKeyFormats::Unsupported { version },
    };
    Ok(RecordValue::SupportedKeyFormats(formats))
}

pub(crate) fn decode_vm_device_information(value: &[u8]) -> Result<RecordValue, RecordError> {
    at_least(value, 4)?;
    let info = match u32_at(value, 0)? {
        1 => {
            at_least(value, 28)?;
            VmDeviceInformation::V1(VmDeviceInfoV1 {
                host_device_class: Enumerant::from_raw(u32_at(value, 4)? as u64),
                host_os_version: u32_at(value, 8)?,
                host_vm_protocol_version: u32_at(value, 12)?,
                guest_device_class: Enumerant::from_raw(u32_at(value, 16)? as u64),
                guest_os_version: u32_at(value, 20)?,
                guest_vm_protocol_version: u32_at(value, 24)?,
            })
        }
        version => VmDeviceInformation::Unsupported { version },
    };
    Ok(RecordValue::VmDeviceInformation(info))
}

pub(crate) fn decode_encrypted_content_key(value: &[u8]) -> Result<RecordValue, RecordError> {
    Ok(RecordValue::EncryptedContentKey(value.to_vec()))
}

pub(crate) fn decode_r1(value: &[u8]) -> Result<RecordValue, RecordError> {
    exactly(value, R1_LEN)?;
    Ok(RecordValue::R1(array_at(value, 0)?))
}

pub(crate) fn decode_content_key_duration(value: &[u8]) -> Result<RecordValue, RecordError> {
    exactly(value, 16)?;
    Ok(RecordValue::ContentKeyDuration(ContentKeyDuration {
        lease_duration: u32_at(value, 0)?,
        rental_duration: u32_at(value, 4)?,
        key_type: known("key type", u32_at(value, 8)? as u64)?,
        reserved: u32_at(value, 12)?,
    }))
}

pub(crate) fn decode_hdcp_enforcement(value: &[u8]) -> Result<RecordValue, RecordError> {
    exactly(value, 16)?;
    Ok(RecordValue::HdcpEnforcement(HdcpEnforcement {
        requirement: known("HDCP requirement", u64_at(value, 0)?)?,
        reserved: array_at(value, 8)?,
    }))
}

pub(crate) fn decode_security_level_required(value: &[u8]) -> Result<RecordValue, RecordError> {
    exactly(value, 16)?;
    Ok(RecordValue::SecurityLevelRequired(SecurityLevelRequired {
        version: u32_at(value, 0)?,
        level: Enumerant::from_raw(u64_at(value, 8)?),
    }))
}

pub(crate) fn decode_offline_key(value: &[u8]) -> Result<RecordValue, RecordError> {
    at_least(value, 4)?;
    let version = u32_at(value, 0)?;
    let key = match version {
        1 | 2 => {
            exactly(value, if version == 1 { 32 } else { 48 })?;
            reserved_zero(&value[4..8])?;
            let stream_id = array_at(value, 8)?;
            let storage_duration = u32_at(value, 24)?;
            let playback_duration = u32_at(value, 28)?;
            if version == 1 {
                OfflineKey::V1 {
                    stream_id,
                    storage_duration,
                    playback_duration,
                }
            } else {
                OfflineKey::V2 {
                    stream_id,
                    storage_duration,
                    playback_duration,
                    title_id: array_at(value, 32)?,
                }
            }
        }
        version => OfflineKey::Unsupported { version },
    };
    Ok(RecordValue::OfflineKey(key))
}

pub(crate) fn decode_opaque(value: &[u8]) -> Result<RecordValue, RecordError> {
    Ok(RecordValue::Opaque(value.to_vec()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tllv::registry::*;

    fn be32(v: u32) -> [u8; 4] {
        v.to_be_bytes()
    }

    #[test]
    fn session_key_splits_iv_and_payload() {
        let mut value = vec![0xAAu8; 16];
        value.extend_from_slice(&[0xBBu8; 96]);
        let RecordValue::SessionKeyR1(sk) = decode(TAG_SESSION_KEY_R1, &value).unwrap() else {
            panic!("wrong variant")
        };
        assert_eq!(sk.iv, [0xAA; 16]);
        assert_eq!(sk.encrypted_payload, [0xBB; 96]);
    }

    #[test]
    fn exact_length_violation_is_rejected() {
        let err = decode(TAG_SESSION_KEY_R1_INTEGRITY, &[0u8; 15]).unwrap_err();
        assert!(matches!(
            err,
            RecordError::Length { expected: LengthRule::Exactly(16), actual: 15 }
        ));
        assert!(decode(TAG_SESSION_KEY_R1, &[0u8; 111]).is_err());
    }

    #[test]
    fn return_request_lists_tags() {
        let mut value = TAG_R2.to_be_bytes().to_vec();
        value.extend_from_slice(&TAG_ASSET_ID.to_be_bytes());
        assert_eq!(
            decode(TAG_RETURN_REQUEST, &value).unwrap(),
            RecordValue::ReturnRequest(vec![TAG_R2, TAG_ASSET_ID])
        );
        assert!(decode(TAG_RETURN_REQUEST, &value[..12]).is_err());
    }

    #[test]
    fn asset_id_bounds() {
        assert!(decode(TAG_ASSET_ID, b"a").is_err());
        assert!(decode(TAG_ASSET_ID, &[b'x'; 201]).is_err());
        assert_eq!(
            decode(TAG_ASSET_ID, b"twelve").unwrap(),
            RecordValue::AssetId(b"twelve".to_vec())
        );
    }

    #[test]
    fn protocol_versions_supported_stride() {
        let value = [be32(1), be32(2)].concat();
        assert_eq!(
            decode(TAG_PROTOCOL_VERSIONS_SUPPORTED, &value).unwrap(),
            RecordValue::ProtocolVersionsSupported(vec![1, 2])
        );
        assert!(decode(TAG_PROTOCOL_VERSIONS_SUPPORTED, &value[..7]).is_err());
    }

    #[test]
    fn streaming_indicator_unknown_value_is_kept() {
        let v = decode(TAG_STREAMING_INDICATOR, &7u64.to_be_bytes()).unwrap();
        assert_eq!(v, RecordValue::StreamingIndicator(Enumerant::Unrecognized(7)));
    }

    #[test]
    fn media_playback_state_requires_known_state() {
        let mut value = be32(1_700_000_000).to_vec();
        value.extend_from_slice(&be32(0xa5d6739e));
        value.extend_from_slice(&42u64.to_be_bytes());
        let RecordValue::MediaPlaybackState(mps) =
            decode(TAG_MEDIA_PLAYBACK_STATE, &value).unwrap()
        else {
            panic!("wrong variant")
        };
        assert_eq!(mps.state, PlaybackState::PlayingOrPaused);
        assert_eq!(mps.session_id, 42);

        value[4..8].copy_from_slice(&be32(0xdeadbeef));
        assert!(matches!(
            decode(TAG_MEDIA_PLAYBACK_STATE, &value),
            Err(RecordError::UnrecognizedValue { value: 0xdeadbeef, .. })
        ));
    }

    #[test]
    fn capabilities_bits() {
        let mut value = [0u8; 16];
        value[15] = 0b0010_1001;
        let RecordValue::Capabilities(caps) = decode(TAG_CAPABILITIES, &value).unwrap() else {
            panic!("wrong variant")
        };
        assert!(caps.supports(CapabilityFlag::HdcpType1Enforcement));
        assert!(caps.supports(CapabilityFlag::OfflineKeyV2));
        assert!(!caps.supports(CapabilityFlag::OfflineKey));
        assert_eq!(caps.supported().len(), 3);
    }

    #[test]
    fn offline_sync_versions() {
        assert_eq!(
            decode(TAG_OFFLINE_SYNC, &be32(0)).unwrap(),
            RecordValue::OfflineSync(OfflineSync::V0)
        );

        let mut v1 = be32(1).to_vec();
        v1.extend_from_slice(&[0; 4]);
        v1.extend_from_slice(&[0x11; 16]);
        v1.extend_from_slice(&be32(3600));
        let RecordValue::OfflineSync(sync) = decode(TAG_OFFLINE_SYNC, &v1).unwrap() else {
            panic!("wrong variant")
        };
        assert_eq!(
            sync,
            OfflineSync::V1 { content_id: [0x11; 16], duration_to_expiry: 3600 }
        );

        v1[5] = 1;
        assert!(matches!(decode(TAG_OFFLINE_SYNC, &v1), Err(RecordError::ReservedNotZero)));

        assert!(matches!(
            decode(TAG_OFFLINE_SYNC, &be32(3)),
            Err(RecordError::UnsupportedVersion(3))
        ));
    }

    #[test]
    fn offline_sync_v2_invalidated_records() {
        let mut v2 = be32(2).to_vec();
        v2.extend_from_slice(&[0; 4]);
        v2.extend_from_slice(&[0x22; 8]);
        v2.extend_from_slice(&(1u64 << 16 | 1).to_be_bytes());
        v2.extend_from_slice(&[0x33; 16]);
        v2.extend_from_slice(&be32(60));
        v2.extend_from_slice(&be32(2));
        v2.extend_from_slice(&[0x44; 16]);
        v2.extend_from_slice(&[0x55; 16]);
        let RecordValue::OfflineSync(sync) = decode(TAG_OFFLINE_SYNC, &v2).unwrap() else {
            panic!("wrong variant")
        };
        assert_eq!(sync.flags(), vec![SyncFlag::SyncRequested, SyncFlag::Succeeded]);
        let OfflineSync::V2 { invalidated_records, .. } = sync else {
            panic!("wrong version")
        };
        assert_eq!(invalidated_records, vec![[0x44; 16], [0x55; 16]]);

        // declared count disagrees with the value length
        assert!(decode(TAG_OFFLINE_SYNC, &v2[..v2.len() - 16]).is_err());
    }

    #[test]
    fn supported_key_formats_v1_and_bounds() {
        let mut value = be32(1).to_vec();
        value.extend_from_slice(&[0; 4]);
        value.extend_from_slice(&be32(2));
        value.extend_from_slice(&TAG_ENCRYPTED_CK.to_be_bytes());
        value.extend_from_slice(&9u64.to_be_bytes());
        let RecordValue::SupportedKeyFormats(formats) =
            decode(TAG_SUPPORTED_KEY_FORMATS, &value).unwrap()
        else {
            panic!("wrong variant")
        };
        assert_eq!(formats.formats(), &[TAG_ENCRYPTED_CK, 9]);

        let mut too_many = be32(1).to_vec();
        too_many.extend_from_slice(&[0; 4]);
        too_many.extend_from_slice(&be32(64));
        too_many.extend_from_slice(&vec![0u8; 64 * 8]);
        assert!(matches!(
            decode(TAG_SUPPORTED_KEY_FORMATS, &too_many),
            Err(RecordError::TooManyEntries { count: 64, .. })
        ));

        assert_eq!(
            decode(TAG_SUPPORTED_KEY_FORMATS, &be32(7)).unwrap(),
            RecordValue::SupportedKeyFormats(SupportedKeyFormats::Unsupported { version: 7 })
        );
    }

    #[test]
    fn vm_device_information_unknown_version_is_minimal() {
        assert_eq!(
            decode(TAG_VM_DEVICE_INFORMATION, &be32(5)).unwrap(),
            RecordValue::VmDeviceInformation(VmDeviceInformation::Unsupported { version: 5 })
        );
        let value = [
            be32(1),
            be32(2),
            be32(0x0e00),
            be32(1),
            be32(99),
            be32(0x0f00),
            be32(1),
        ]
        .concat();
        let RecordValue::VmDeviceInformation(VmDeviceInformation::V1(info)) =
            decode(TAG_VM_DEVICE_INFORMATION, &value).unwrap()
        else {
            panic!("wrong variant")
        };
        assert_eq!(info.host_device_class, Enumerant::Known(DeviceClass::AppleMobile));
        assert_eq!(info.guest_device_class, Enumerant::Unrecognized(99));
    }

    #[test]
    fn content_key_duration_rejects_unknown_key_type() {
        let mut value = [be32(0), be32(86400), be32(0x3dfe45a0), be32(0x86d34a3a)].concat();
        let RecordValue::ContentKeyDuration(d) =
            decode(TAG_CONTENT_KEY_DURATION, &value).unwrap()
        else {
            panic!("wrong variant")
        };
        assert_eq!(d.key_type, KeyDurationType::Rental);

        value[8..12].copy_from_slice(&be32(1));
        assert!(matches!(
            decode(TAG_CONTENT_KEY_DURATION, &value),
            Err(RecordError::UnrecognizedValue { field: "key type", value: 1 })
        ));
    }

    #[test]
    fn offline_key_versions() {
        let mut v1 = be32(1).to_vec();
        v1.extend_from_slice(&[0; 4]);
        v1.extend_from_slice(&[0x66; 16]);
        v1.extend_from_slice(&be32(100));
        v1.extend_from_slice(&be32(200));
        assert_eq!(
            decode(TAG_OFFLINE_KEY, &v1).unwrap(),
            RecordValue::OfflineKey(OfflineKey::V1 {
                stream_id: [0x66; 16],
                storage_duration: 100,
                playback_duration: 200,
            })
        );
        // v2 needs the 16-byte title id
        let mut v2 = v1.clone();
        v2[3] = 2;
        assert!(decode(TAG_OFFLINE_KEY, &v2).is_err());
        v2.extend_from_slice(&[0x77; 16]);
        let RecordValue::OfflineKey(OfflineKey::V2 { title_id, .. }) =
            decode(TAG_OFFLINE_KEY, &v2).unwrap()
        else {
            panic!("wrong variant")
        };
        assert_eq!(title_id, [0x77; 16]);
        assert_eq!(
            decode(TAG_OFFLINE_KEY, &be32(9)).unwrap(),
            RecordValue::OfflineKey(OfflineKey::Unsupported { version: 9 })
        );
    }

    #[test]
    fn unknown_tag_is_opaque() {
        let v = decode(0x1111_2222_3333_4444, b"\x01\x02\x03").unwrap();
        assert_eq!(v, RecordValue::Opaque(vec![1, 2, 3]));
        assert_eq!(v.kind(), RecordKind::Opaque);
    }
}
