//! CID (Content Identifier) utilities
//!
//! Creates content-addressed identifiers using BLAKE3

use cid::{Cid, Version};
use multihash_codetable::{Code, MultihashDigest};

/// Supported IPLD codecs
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum CidCodec {
    /// Raw binary data (0x55)
    #[default]
    Raw,
    /// DAG-CBOR (0x71)
    DagCbor,
}

impl CidCodec {
    /// Get the multicodec code
    pub fn code(&self) -> u64 {
        match self {
            CidCodec::Raw => 0x55,
            CidCodec::DagCbor => 0x71,
        }
    }

    /// Parse from multicodec code
    pub fn from_code(code: u64) -> Option<Self> {
        match code {
            0x55 => Some(CidCodec::Raw),
            0x71 => Some(CidCodec::DagCbor),
            _ => None,
        }
    }

    /// Get a human-readable name
    pub fn name(&self) -> &'static str {
        match self {
            CidCodec::Raw => "raw",
            CidCodec::DagCbor => "dag-cbor",
        }
    }
}

/// Create a CID from data using a BLAKE3 multihash
pub fn create_cid(data: &[u8], codec: CidCodec) -> Cid {
    Cid::new_v1(codec.code(), Code::Blake3_256.digest(data))
}

/// Verify that data matches a CID
pub fn verify_cid(data: &[u8], cid: &Cid) -> bool {
    match CidCodec::from_code(cid.codec()) {
        Some(codec) if cid.version() == Version::V1 => create_cid(data, codec) == *cid,
        _ => false,
    }
}

/// Parse a CID from a string
pub fn parse_cid(s: &str) -> Result<Cid, crate::BlockStoreError> {
    s.parse()
        .map_err(|e: cid::Error| crate::BlockStoreError::InvalidCid(e.to_string()))
}

/// Get the codec of a CID
pub fn get_codec(cid: &Cid) -> Option<CidCodec> {
    CidCodec::from_code(cid.codec())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(CidCodec::Raw, 0x55, "raw")]
    #[case(CidCodec::DagCbor, 0x71, "dag-cbor")]
    fn test_codec_codes(#[case] codec: CidCodec, #[case] code: u64, #[case] name: &str) {
        assert_eq!(codec.code(), code);
        assert_eq!(codec.name(), name);
        assert_eq!(CidCodec::from_code(code), Some(codec));
    }

    #[test]
    fn test_create_cid() {
        let cid = create_cid(b"Hello, World!", CidCodec::Raw);

        assert_eq!(cid.version(), Version::V1);
        assert_eq!(cid.codec(), CidCodec::Raw.code());
    }

    #[test]
    fn test_cid_consistency() {
        let cid1 = create_cid(b"test data", CidCodec::DagCbor);
        let cid2 = create_cid(b"test data", CidCodec::DagCbor);

        assert_eq!(cid1, cid2);
    }

    #[test]
    fn test_codec_changes_cid() {
        let raw = create_cid(b"same bytes", CidCodec::Raw);
        let cbor = create_cid(b"same bytes", CidCodec::DagCbor);

        assert_ne!(raw, cbor);
        assert_eq!(get_codec(&cbor), Some(CidCodec::DagCbor));
    }

    #[test]
    fn test_verify_cid() {
        let data = b"verify me";
        let cid = create_cid(data, CidCodec::Raw);

        assert!(verify_cid(data, &cid));
        assert!(!verify_cid(b"wrong data", &cid));
    }

    #[test]
    fn test_parse_cid() {
        let cid = create_cid(b"test", CidCodec::Raw);
        let parsed = parse_cid(&cid.to_string()).unwrap();

        assert_eq!(cid, parsed);
        assert!(parse_cid("not-a-cid").is_err());
    }
}
