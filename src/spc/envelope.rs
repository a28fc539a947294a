use base64::Engine;
use base64::engine::general_purpose::STANDARD;

use super::SpcError;

pub const HEADER_LEN: usize = 24;
pub const IV_LEN: usize = 16;
pub const CERT_HASH_LEN: usize = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpcVersion {
    /// 1024-bit RSA key wrap, OAEP with SHA-1.
    V1,
    /// 2048-bit RSA key wrap, OAEP with SHA-256.
    V2,
}

impl SpcVersion {
    pub fn from_wire(raw: u32) -> Result<Self, SpcError> {
        match raw {
            1 => Ok(Self::V1),
            2 => Ok(Self::V2),
            other => Err(SpcError::UnsupportedVersion(other)),
        }
    }

    pub const fn number(self) -> u32 {
        match self {
            Self::V1 => 1,
            Self::V2 => 2,
        }
    }

    /// Size of the wrapped key field, equal to the RSA modulus size.
    pub const fn wrapped_key_len(self) -> usize {
        match self {
            Self::V1 => 128,
            Self::V2 => 256,
        }
    }

    pub const fn rsa_bits(self) -> usize {
        self.wrapped_key_len() * 8
    }

    const fn cert_hash_offset(self) -> usize {
        HEADER_LEN + self.wrapped_key_len()
    }

    const fn payload_len_offset(self) -> usize {
        self.cert_hash_offset() + CERT_HASH_LEN
    }

    /// Offset of the first ciphertext byte.
    pub const fn payload_offset(self) -> usize {
        self.payload_len_offset() + 4
    }
}

/// The fixed-layout outer message, still encrypted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpcEnvelope {
    pub version: SpcVersion,
    pub iv: [u8; IV_LEN],
    pub encrypted_key: Vec<u8>,
    pub cert_hash: [u8; CERT_HASH_LEN],
    pub payload: Vec<u8>,
}

impl SpcEnvelope {
    /// Parse a binary SPC. The payload length field must account for every
    /// remaining byte.
    pub fn parse(bytes: &[u8]) -> Result<Self, SpcError> {
        if bytes.len() < HEADER_LEN {
            return Err(SpcError::Truncated {
                needed: HEADER_LEN,
                actual: bytes.len(),
            });
        }
        let version = SpcVersion::from_wire(u32::from_be_bytes([
            bytes[0], bytes[1], bytes[2], bytes[3],
        ]))?;
        if bytes[4..8] != [0u8; 4] {
            return Err(SpcError::ReservedNotZero);
        }

        let payload_offset = version.payload_offset();
        if bytes.len() < payload_offset {
            return Err(SpcError::Truncated {
                needed: payload_offset,
                actual: bytes.len(),
            });
        }

        let hash_at = version.cert_hash_offset();
        let len_at = version.payload_len_offset();
        let declared = u32::from_be_bytes([
            bytes[len_at],
            bytes[len_at + 1],
            bytes[len_at + 2],
            bytes[len_at + 3],
        ]) as usize;
        let actual = bytes.len() - payload_offset;
        if declared != actual {
            return Err(SpcError::PayloadLength { declared, actual });
        }

        let mut iv = [0u8; IV_LEN];
        iv.copy_from_slice(&bytes[8..HEADER_LEN]);
        let mut cert_hash = [0u8; CERT_HASH_LEN];
        cert_hash.copy_from_slice(&bytes[hash_at..len_at]);

        Ok(Self {
            version,
            iv,
            encrypted_key: bytes[HEADER_LEN..hash_at].to_vec(),
            cert_hash,
            payload: bytes[payload_offset..].to_vec(),
        })
    }

    /// Accept raw binary, falling back to standard base64 (whitespace
    /// ignored) when the raw bytes are not a well-formed envelope.
    pub fn ingest(input: &[u8]) -> Result<Self, SpcError> {
        let raw_err = match Self::parse(input) {
            Ok(env) => return Ok(env),
            Err(e) => e,
        };

        let text: Vec<u8> = input
            .iter()
            .copied()
            .filter(|b| !b.is_ascii_whitespace())
            .collect();
        match STANDARD.decode(&text) {
            Ok(decoded) => {
                tracing::debug!(len = decoded.len(), "input decoded as base64");
                Self::parse(&decoded)
            }
            Err(_) => {
                tracing::debug!(error = %raw_err, "raw parse failed and input is not base64");
                Err(raw_err)
            }
        }
    }

    /// Inverse of [`SpcEnvelope::parse`].
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.version.payload_offset() + self.payload.len());
        out.extend_from_slice(&self.version.number().to_be_bytes());
        out.extend_from_slice(&[0u8; 4]);
        out.extend_from_slice(&self.iv);
        out.extend_from_slice(&self.encrypted_key);
        out.extend_from_slice(&self.cert_hash);
        out.extend_from_slice(&(self.payload.len() as u32).to_be_bytes());
        out.extend_from_slice(&self.payload);
        out
    }
}
