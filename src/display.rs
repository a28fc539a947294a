//! Human-readable rendering of decoded SPCs.

use std::fmt::{self, Display, Formatter};

use crate::kex::{DerivedSession, IntegrityCheck};
use crate::spc::SpcEnvelope;
use crate::tllv::record::{
    OfflineKey, OfflineSync, RecordValue, SecurityLevelReport, SupportedKeyFormats,
    VmDeviceInformation,
};
use crate::tllv::registry;
use crate::tllv::values::{Enumerant, LOCAL_PLAYBACK, StreamingTarget, WireEnum};
use crate::tllv::{RecordSet, TaggedRecord};

/// Hex dump in rows of `cols` bytes, four-byte groups, each row prefixed by
/// `indent` tabs. The last row is padded with `--`; an empty buffer prints `--`.
pub fn format_hex(bytes: &[u8], indent: usize, cols: usize) -> String {
    let cols = cols.max(1);
    let prefix = "\t".repeat(indent);
    let mut cells: Vec<String> = bytes.iter().map(|b| format!("{b:02x}")).collect();
    if cells.is_empty() {
        cells.push("--".into());
    }
    let rows = cells.len().div_ceil(cols);
    cells.resize(rows * cols, "--".into());

    let mut out = String::new();
    for row in cells.chunks(cols) {
        out.push_str(&prefix);
        for (i, cell) in row.iter().enumerate() {
            if i > 0 && i % 4 == 0 {
                out.push(' ');
            }
            out.push_str(cell);
        }
        out.push('\n');
    }
    out
}

pub fn describe<T: WireEnum>(value: Enumerant<T>) -> String {
    match value {
        Enumerant::Known(v) => v.description().to_string(),
        Enumerant::Unrecognized(raw) => format!("unrecognized ({raw:#x})"),
    }
}

fn streaming(value: Enumerant<StreamingTarget>) -> String {
    match value {
        Enumerant::Known(v) => v.description().to_string(),
        Enumerant::Unrecognized(raw) => format!("{LOCAL_PLAYBACK} ({raw:#x})"),
    }
}

impl Display for SpcEnvelope {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        writeln!(f, "SPC version: {}", self.version.number())?;
        write!(f, "IV:\n{}", format_hex(&self.iv, 1, 16))?;
        write!(f, "Wrapped key:\n{}", format_hex(&self.encrypted_key, 1, 16))?;
        write!(f, "Certificate hash:\n{}", format_hex(&self.cert_hash, 1, 20))?;
        writeln!(f, "Payload length: {}", self.payload.len())
    }
}

impl Display for TaggedRecord {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        writeln!(f, "{} ({:#018x})", self.name(), self.tag())?;
        writeln!(f, "\tblock length: {}  value length: {}", self.block_len(), self.value().len())?;
        write!(f, "\tvalue:\n{}", format_hex(self.value(), 2, 16))?;
        write_decoded(f, self.decoded())
    }
}

fn write_decoded(f: &mut Formatter<'_>, value: &RecordValue) -> fmt::Result {
    match value {
        RecordValue::SessionKeyR1(sk) => {
            write!(f, "\tIV:\n{}", format_hex(&sk.iv, 2, 16))?;
            write!(f, "\tencrypted payload:\n{}", format_hex(&sk.encrypted_payload, 2, 16))
        }
        RecordValue::ReturnRequest(tags) => {
            for tag in tags {
                writeln!(f, "\trequested: {} ({tag:#018x})", registry::lookup(*tag).name)?;
            }
            Ok(())
        }
        RecordValue::AssetId(id) => match std::str::from_utf8(id) {
            Ok(s) => writeln!(f, "\tasset id: {s}"),
            Err(_) => Ok(()),
        },
        RecordValue::TransactionId(id) => writeln!(f, "\ttransaction id: {id:#018x}"),
        RecordValue::ProtocolVersionsSupported(v) => writeln!(f, "\tversions: {v:?}"),
        RecordValue::ProtocolVersionUsed(v) => writeln!(f, "\tversion: {v}"),
        RecordValue::StreamingIndicator(s) => writeln!(f, "\t{}", streaming(*s)),
        RecordValue::MediaPlaybackState(m) => {
            writeln!(f, "\tcreation date: {} (unix)", m.creation_date)?;
            writeln!(f, "\t{}", m.state.description())?;
            writeln!(f, "\tsession id: {:#018x}", m.session_id)
        }
        RecordValue::Capabilities(c) => {
            writeln!(f, "\thigh: {:#018x}  low: {:#018x}", c.high, c.low)?;
            for flag in c.supported() {
                writeln!(f, "\tsupports {}", flag.description())?;
            }
            Ok(())
        }
        RecordValue::OfflineSync(sync) => {
            writeln!(f, "\tversion: {}", sync.version())?;
            match sync {
                OfflineSync::V0 => Ok(()),
                OfflineSync::V1 { content_id, duration_to_expiry } => {
                    writeln!(f, "\tcontent id: {}", hex::encode(content_id))?;
                    writeln!(f, "\tduration to expiry: {duration_to_expiry}s")
                }
                OfflineSync::V2 {
                    server_challenge,
                    title_id,
                    duration_to_expiry,
                    invalidated_records,
                    ..
                } => {
                    writeln!(f, "\tserver challenge: {}", hex::encode(server_challenge))?;
                    for flag in sync.flags() {
                        writeln!(f, "\t{}", flag.description())?;
                    }
                    writeln!(f, "\ttitle id: {}", hex::encode(title_id))?;
                    writeln!(f, "\tduration to expiry: {duration_to_expiry}s")?;
                    for id in invalidated_records {
                        writeln!(f, "\tinvalidated: {}", hex::encode(id))?;
                    }
                    Ok(())
                }
            }
        }
        RecordValue::DeviceInfo(d) => {
            writeln!(f, "\tdevice type: {}", describe(d.device_type))?;
            let v = d.os_version;
            writeln!(f, "\tOS version: {}.{}.{}", v[1], v[2], v[3])
        }
        RecordValue::SecurityLevelReport(r) => match r {
            SecurityLevelReport::V1 { level, kdl_version } => {
                writeln!(f, "\tsecurity level: {}", describe(*level))?;
                writeln!(f, "\tKDL version: {kdl_version}")
            }
            SecurityLevelReport::Unsupported { version } => {
                writeln!(f, "\tversion: {version} (unsupported)")
            }
        },
        RecordValue::KextDenyList(v) => writeln!(f, "\tdeny list version: {v}"),
        RecordValue::DeviceIdentity(d) => {
            writeln!(f, "\tFPDI version: {}", d.fpdi_version)?;
            writeln!(f, "\tdevice class: {}", describe(d.device_class))?;
            writeln!(f, "\tvendor hash: {:#018x}", d.vendor_hash)?;
            writeln!(f, "\tproduct hash: {:#018x}", d.product_hash)?;
            writeln!(
                f,
                "\tFP version REE: {:#010x}  TEE: {:#010x}",
                d.fp_version_ree,
                d.fp_version_tee
            )?;
            if d.fpdi_version <= 127 {
                writeln!(f, "\tOS version: {:#010x}", d.os_version)?;
            }
            Ok(())
        }
        RecordValue::SupportedKeyFormats(s) => match s {
            SupportedKeyFormats::V1 { formats } => {
                for kf in formats {
                    writeln!(f, "\tformat: {} ({kf:#018x})", registry::lookup(*kf).name)?;
                }
                Ok(())
            }
            SupportedKeyFormats::Unsupported { version } => {
                writeln!(f, "\tversion: {version} (unsupported)")
            }
        },
        RecordValue::VmDeviceInformation(vm) => match vm {
            VmDeviceInformation::V1(i) => {
                writeln!(
                    f,
                    "\thost: {} OS {:#010x} VM protocol {}",
                    describe(i.host_device_class),
                    i.host_os_version,
                    i.host_vm_protocol_version
                )?;
                writeln!(
                    f,
                    "\tguest: {} OS {:#010x} VM protocol {}",
                    describe(i.guest_device_class),
                    i.guest_os_version,
                    i.guest_vm_protocol_version
                )
            }
            VmDeviceInformation::Unsupported { version } => {
                writeln!(f, "\tversion: {version} (unsupported)")
            }
        },
        RecordValue::ContentKeyDuration(d) => {
            writeln!(f, "\tlease: {}s  rental: {}s", d.lease_duration, d.rental_duration)?;
            writeln!(f, "\t{}", d.key_type.description())
        }
        RecordValue::HdcpEnforcement(h) => writeln!(f, "\t{}", h.requirement.description()),
        RecordValue::SecurityLevelRequired(s) => {
            writeln!(f, "\tsecurity level: {}", describe(s.level))
        }
        RecordValue::OfflineKey(k) => match k {
            OfflineKey::V1 { stream_id, storage_duration, playback_duration } => {
                writeln!(f, "\tstream id: {}", hex::encode(stream_id))?;
                writeln!(f, "\tstorage: {storage_duration}s  playback: {playback_duration}s")
            }
            OfflineKey::V2 { stream_id, storage_duration, playback_duration, title_id } => {
                writeln!(f, "\tstream id: {}", hex::encode(stream_id))?;
                writeln!(f, "\ttitle id: {}", hex::encode(title_id))?;
                writeln!(f, "\tstorage: {storage_duration}s  playback: {playback_duration}s")
            }
            OfflineKey::Unsupported { version } => {
                writeln!(f, "\tversion: {version} (unsupported)")
            }
        },
        RecordValue::SessionKeyR1Integrity(_)
        | RecordValue::AntiReplaySeed(_)
        | RecordValue::R2(_)
        | RecordValue::EncryptedContentKey(_)
        | RecordValue::R1(_)
        | RecordValue::Opaque(_) => Ok(()),
    }
}

impl Display for RecordSet {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        for r in self {
            write!(f, "{r}")?;
        }
        Ok(())
    }
}

impl Display for DerivedSession {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "HU:\n{}", format_hex(&self.hu, 1, 20))?;
        write!(f, "R1:\n{}", format_hex(&self.r1, 1, 16))?;
        match self.integrity {
            IntegrityCheck::Verified => writeln!(f, "[SK..R1] integrity: verified"),
            IntegrityCheck::Unchecked => {
                writeln!(f, "[SK..R1] integrity: not verified by authority")
            }
            IntegrityCheck::Absent => Ok(()),
        }
    }
}
