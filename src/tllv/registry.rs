use super::RecordError;
use super::record::{self, RecordValue};

pub const TAG_SESSION_KEY_R1: u64 = 0x3d1a10b8bffac2ec;
pub const TAG_SESSION_KEY_R1_INTEGRITY: u64 = 0xb349d4809e910687;
pub const TAG_ANTI_REPLAY_SEED: u64 = 0x89c90f12204106b2;
pub const TAG_R2: u64 = 0x71b5595ac1521133;
pub const TAG_RETURN_REQUEST: u64 = 0x19f9d4e5ab7609cb;
pub const TAG_ASSET_ID: u64 = 0x1bf7f53f5d5d5a1f;
pub const TAG_TRANSACTION_ID: u64 = 0x47aa7ad3440577de;
pub const TAG_PROTOCOL_VERSIONS_SUPPORTED: u64 = 0x67b8fb79ecce1a13;
pub const TAG_PROTOCOL_VERSION_USED: u64 = 0x5d81bcbcc7f61703;
pub const TAG_STREAMING_INDICATOR: u64 = 0xabb0256a31843974;
pub const TAG_MEDIA_PLAYBACK_STATE: u64 = 0xeb8efdf2b25ab3a0;
pub const TAG_CAPABILITIES: u64 = 0x9c02af3253c07fb2;
pub const TAG_OFFLINE_SYNC: u64 = 0x77966de1dc1083ad;
pub const TAG_DEVICE_INFO: u64 = 0xd43fc6abc596aae7;
pub const TAG_SECURITY_LEVEL_REPORT: u64 = 0xb18ee16ea50f6c02;
pub const TAG_KEXT_DENY_LIST: u64 = 0x70eca6573388e329;
pub const TAG_DEVICE_IDENTITY: u64 = 0x94c17cd676c69b59;
pub const TAG_SUPPORTED_KEY_FORMATS: u64 = 0x8d8e84fa6cc35eb7;
pub const TAG_VM_DEVICE_INFORMATION: u64 = 0x756440e240499f70;
pub const TAG_ENCRYPTED_CK: u64 = 0x58b38165af0e3d5a;
pub const TAG_R1: u64 = 0xea74c4645d5efee9;
pub const TAG_CONTENT_KEY_DURATION: u64 = 0x47acf6a418cd091a;
pub const TAG_HDCP_ENFORCEMENT: u64 = 0x2e52f1530d8ddb4a;
pub const TAG_SECURITY_LEVEL_REQUIRED: u64 = 0x644cb1dac0313250;
pub const TAG_OFFLINE_KEY: u64 = 0x6375d9727060218c;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecordKind {
    SessionKeyR1,
    SessionKeyR1Integrity,
    AntiReplaySeed,
    R2,
    ReturnRequest,
    AssetId,
    TransactionId,
    ProtocolVersionsSupported,
    ProtocolVersionUsed,
    StreamingIndicator,
    MediaPlaybackState,
    Capabilities,
    OfflineSync,
    DeviceInfo,
    SecurityLevelReport,
    KextDenyList,
    DeviceIdentity,
    SupportedKeyFormats,
    VmDeviceInformation,
    EncryptedContentKey,
    R1,
    ContentKeyDuration,
    HdcpEnforcement,
    SecurityLevelRequired,
    OfflineKey,
    Opaque,
}

/// Which message a record type belongs in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Sent by the client inside an SPC.
    Request,
    /// Sent by the server inside a CKC.
    Response,
    /// Unregistered tag; could be either.
    Either,
}

pub type DecodeFn = fn(&[u8]) -> Result<RecordValue, RecordError>;

pub struct TagDescriptor {
    pub tag: u64,
    pub kind: RecordKind,
    pub name: &'static str,
    /// Symbolic field name used for lookups in a `RecordSet`.
    pub field: &'static str,
    /// Message kind the tag may occur in. A response tag inside an SPC is
    /// kept but logged.
    pub direction: Direction,
    pub decode: DecodeFn,
}

impl std::fmt::Debug for TagDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TagDescriptor")
            .field("tag", &format_args!("{:#018x}", self.tag))
            .field("kind", &self.kind)
            .field("field", &self.field)
            .finish()
    }
}

macro_rules! descriptor {
    ($tag:expr, $kind:ident, $name:literal, $field:literal, $dir:ident, $decode:path $(,)?) => {
        TagDescriptor {
            tag: $tag,
            kind: RecordKind::$kind,
            name: $name,
            field: $field,
            direction: Direction::$dir,
            decode: $decode,
        }
    };
}

static REGISTRY: [TagDescriptor; 25] = [
    descriptor!(
        TAG_SESSION_KEY_R1,
        SessionKeyR1,
        "[SK..R1]",
        "sk_r1",
        Request,
        record::decode_session_key_r1,
    ),
    descriptor!(
        TAG_SESSION_KEY_R1_INTEGRITY,
        SessionKeyR1Integrity,
        "[SK..R1] integrity",
        "sk_r1_integrity",
        Request,
        record::decode_session_key_r1_integrity,
    ),
    descriptor!(
        TAG_ANTI_REPLAY_SEED,
        AntiReplaySeed,
        "Anti-replay seed",
        "ar_seed",
        Request,
        record::decode_anti_replay_seed,
    ),
    descriptor!(TAG_R2, R2, "R2", "r2", Request, record::decode_r2),
    descriptor!(
        TAG_RETURN_REQUEST,
        ReturnRequest,
        "Return Request",
        "return_request",
        Request,
        record::decode_return_request,
    ),
    descriptor!(TAG_ASSET_ID, AssetId, "Asset ID", "asset_id", Request, record::decode_asset_id),
    descriptor!(
        TAG_TRANSACTION_ID,
        TransactionId,
        "Transaction ID",
        "transaction_id",
        Request,
        record::decode_transaction_id,
    ),
    descriptor!(
        TAG_PROTOCOL_VERSIONS_SUPPORTED,
        ProtocolVersionsSupported,
        "Protocol Versions Supported",
        "protocol_versions_supported",
        Request,
        record::decode_protocol_versions_supported,
    ),
    descriptor!(
        TAG_PROTOCOL_VERSION_USED,
        ProtocolVersionUsed,
        "Protocol Versions Used",
        "protocol_versions_used",
        Request,
        record::decode_protocol_version_used,
    ),
    descriptor!(
        TAG_STREAMING_INDICATOR,
        StreamingIndicator,
        "Streaming Indicator",
        "streaming_indicator",
        Request,
        record::decode_streaming_indicator,
    ),
    descriptor!(
        TAG_MEDIA_PLAYBACK_STATE,
        MediaPlaybackState,
        "Media Playback State",
        "media_playback_state",
        Request,
        record::decode_media_playback_state,
    ),
    descriptor!(
        TAG_CAPABILITIES,
        Capabilities,
        "Capabilities",
        "capabilities",
        Request,
        record::decode_capabilities,
    ),
    descriptor!(
        TAG_OFFLINE_SYNC,
        OfflineSync,
        "Offline Sync",
        "offline_sync",
        Request,
        record::decode_offline_sync,
    ),
    descriptor!(
        TAG_DEVICE_INFO,
        DeviceInfo,
        "Client Device Info",
        "device_info",
        Request,
        record::decode_device_info,
    ),
    descriptor!(
        TAG_SECURITY_LEVEL_REPORT,
        SecurityLevelReport,
        "Security Level Report",
        "security_level_report",
        Request,
        record::decode_security_level_report,
    ),
    descriptor!(
        TAG_KEXT_DENY_LIST,
        KextDenyList,
        "Kext Deny List",
        "kext_deny_list",
        Request,
        record::decode_kext_deny_list,
    ),
    descriptor!(
        TAG_DEVICE_IDENTITY,
        DeviceIdentity,
        "Client Device Identity",
        "device_identity",
        Request,
        record::decode_device_identity,
    ),
    descriptor!(
        TAG_SUPPORTED_KEY_FORMATS,
        SupportedKeyFormats,
        "Supported Key Formats",
        "supported_key_formats",
        Request,
        record::decode_supported_key_formats,
    ),
    descriptor!(
        TAG_VM_DEVICE_INFORMATION,
        VmDeviceInformation,
        "VM Device Information",
        "vm_device_information",
        Request,
        record::decode_vm_device_information,
    ),
    descriptor!(
        TAG_ENCRYPTED_CK,
        EncryptedContentKey,
        "Encrypted CK",
        "encrypted_ck",
        Response,
        record::decode_encrypted_content_key,
    ),
    descriptor!(TAG_R1, R1, "R1", "r1", Response, record::decode_r1),
    descriptor!(
        TAG_CONTENT_KEY_DURATION,
        ContentKeyDuration,
        "Content Key Duration",
        "content_key_duration",
        Response,
        record::decode_content_key_duration,
    ),
    descriptor!(
        TAG_HDCP_ENFORCEMENT,
        HdcpEnforcement,
        "HDCP Enforcement",
        "hdcp_enforcement",
        Response,
        record::decode_hdcp_enforcement,
    ),
    descriptor!(
        TAG_SECURITY_LEVEL_REQUIRED,
        SecurityLevelRequired,
        "Security Level Required",
        "security_level_required",
        Response,
        record::decode_security_level_required,
    ),
    descriptor!(
        TAG_OFFLINE_KEY,
        OfflineKey,
        "Offline Key",
        "offline_key",
        Response,
        record::decode_offline_key,
    ),
];

static OPAQUE: TagDescriptor = TagDescriptor {
    tag: 0,
    kind: RecordKind::Opaque,
    name: "Unknown",
    field: "unknown",
    direction: Direction::Either,
    decode: record::decode_opaque,
};

/// Descriptor for `tag`. Unregistered tags get the opaque descriptor, never an error.
pub fn lookup(tag: u64) -> &'static TagDescriptor {
    REGISTRY.iter().find(|d| d.tag == tag).unwrap_or(&OPAQUE)
}

/// Descriptor registered under a symbolic field name, if any.
pub fn lookup_field(field: &str) -> Option<&'static TagDescriptor> {
    REGISTRY.iter().find(|d| d.field == field)
}

pub fn is_registered(tag: u64) -> bool {
    lookup(tag).kind != RecordKind::Opaque
}

pub fn descriptors() -> impl Iterator<Item = &'static TagDescriptor> {
    REGISTRY.iter()
}
