//! Tag-based dispatch from raw TLV bytes to typed records.

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::airties::{self, AirtiesTlvId, AIRTIES_OUI};
use crate::buffer::ByteBuffer;
use crate::error::{Result, TlvError};
use crate::ieee1905::{self, TlvType};
use crate::record::{Record, RecordCore};
use crate::wfa_map;

/// 8-bit tag and 16-bit length preceding every CMDU TLV.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TlvHeader {
    /// TLV type
    pub tag: u8,
    /// Payload length
    pub length: u16,
}

impl TlvHeader {
    /// Encoded header size
    pub const SIZE: usize = 3;

    /// Header plus payload.
    pub fn total_len(&self) -> usize {
        Self::SIZE + self.length as usize
    }
}

/// Read the TLV header at the start of `bytes`.
pub fn peek_header(bytes: &[u8]) -> Result<TlvHeader> {
    if bytes.len() < TlvHeader::SIZE {
        return Err(TlvError::Truncated);
    }
    Ok(TlvHeader {
        tag: bytes[0],
        length: u16::from_be_bytes([bytes[1], bytes[2]]),
    })
}

type Constructor = fn(&ByteBuffer, usize) -> Result<ParsedTlv>;

fn parse_as<R>(buf: &ByteBuffer, at: usize) -> Result<ParsedTlv>
where
    R: Record,
    ParsedTlv: From<R>,
{
    R::parse(buf, at).map(ParsedTlv::from)
}

macro_rules! tlv_kinds {
    ($( $(#[$doc:meta])* $variant:ident($ty:ty) ),* $(,)?) => {
        /// Record kinds the dispatcher knows how to parse
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(rename_all = "snake_case")]
        pub enum TlvKind {
            $( $(#[$doc])* $variant, )*
        }

        /// A parsed record of any known kind
        #[derive(Debug)]
        pub enum ParsedTlv {
            $( $(#[$doc])* $variant($ty), )*
        }

        $(
            impl From<$ty> for ParsedTlv {
                fn from(record: $ty) -> Self {
                    ParsedTlv::$variant(record)
                }
            }
        )*

        impl ParsedTlv {
            /// Kind of the record.
            pub fn kind(&self) -> TlvKind {
                match self {
                    $( ParsedTlv::$variant(_) => TlvKind::$variant, )*
                }
            }

            /// Core of the record.
            pub fn core(&self) -> &RecordCore {
                match self {
                    $( ParsedTlv::$variant(record) => record.core(), )*
                }
            }
        }

        impl TlvKind {
            /// Every kind, in dispatch-table order.
            pub const ALL: &'static [TlvKind] = &[ $( TlvKind::$variant, )* ];

            fn constructor(self) -> Constructor {
                match self {
                    $( TlvKind::$variant => parse_as::<$ty>, )*
                }
            }
        }
    };
}

tlv_kinds! {
    /// IEEE 1905.1 end of message
    EndOfMessage(ieee1905::EndOfMessage),
    /// IEEE 1905.1 autoconfig frequency band
    AutoconfigFreqBand(ieee1905::AutoconfigFreqBand),
    /// IEEE 1905.1 vendor specific with an unrecognized payload
    VendorSpecific(ieee1905::VendorSpecific),
    /// Multi-AP supported service
    SupportedService(wfa_map::SupportedService),
    /// Multi-AP client association control request
    ClientAssociationControlRequest(wfa_map::ClientAssociationControlRequest),
    /// AirTies message type marker
    AirtiesMsgType(airties::AirtiesMsgType),
    /// AirTies device info
    AirtiesDeviceInfo(airties::DeviceInfo),
    /// AirTies device metrics
    AirtiesDeviceMetrics(airties::DeviceMetrics),
    /// AirTies version reporting
    AirtiesVersionReporting(airties::VersionReporting),
}

impl fmt::Display for TlvKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Work out which record kind the TLV at the start of `bytes` is.
///
/// Vendor specific TLVs are told apart by their OUI and, for AirTies, by
/// the 16-bit vendor TLV id following it.
pub fn classify(bytes: &[u8]) -> Result<TlvKind> {
    let header = peek_header(bytes)?;
    if let Ok(tag) = wfa_map::TlvType::try_from(header.tag) {
        return Ok(match tag {
            wfa_map::TlvType::SupportedService => TlvKind::SupportedService,
            wfa_map::TlvType::ClientAssociationControlRequest => {
                TlvKind::ClientAssociationControlRequest
            }
        });
    }
    match TlvType::try_from(header.tag)? {
        TlvType::EndOfMessage => Ok(TlvKind::EndOfMessage),
        TlvType::AutoconfigFreqBand => Ok(TlvKind::AutoconfigFreqBand),
        TlvType::VendorSpecific => {
            let end = bytes.len().min(header.total_len());
            Ok(classify_vendor(&bytes[TlvHeader::SIZE..end]))
        }
    }
}

fn classify_vendor(payload: &[u8]) -> TlvKind {
    if payload.len() < 3 || payload[..3] != AIRTIES_OUI.0 {
        return TlvKind::VendorSpecific;
    }
    if payload.len() == 3 {
        return TlvKind::AirtiesMsgType;
    }
    if payload.len() < 5 {
        return TlvKind::VendorSpecific;
    }
    match AirtiesTlvId::try_from(u16::from_be_bytes([payload[3], payload[4]])) {
        Ok(AirtiesTlvId::DeviceInfo) => TlvKind::AirtiesDeviceInfo,
        Ok(AirtiesTlvId::DeviceMetrics) => TlvKind::AirtiesDeviceMetrics,
        Ok(AirtiesTlvId::VersionReporting) => TlvKind::AirtiesVersionReporting,
        _ => TlvKind::VendorSpecific,
    }
}

/// Parse the TLV at `at` as whatever record kind its header names.
pub fn parse_any(buf: &ByteBuffer, at: usize) -> Result<ParsedTlv> {
    if at >= buf.tail() {
        return Err(TlvError::Truncated);
    }
    let available = buf.tail() - at;
    let kind = buf.with_slice(at, available, classify)?;
    debug!(offset = at, kind = %kind, "dispatching tlv");
    (kind.constructor())(buf, at)
}

impl ParsedTlv {
    /// Encoded size of the record.
    pub fn len(&self) -> usize {
        self.core().len()
    }

    /// True for a record with no bytes, which a parsed TLV never is.
    pub fn is_empty(&self) -> bool {
        self.core().is_empty()
    }

    /// Name/value pairs of the record's fields, for display.
    pub fn describe(&self) -> Vec<(&'static str, String)> {
        let mut out = Vec::new();
        match self {
            ParsedTlv::EndOfMessage(_) => {}
            ParsedTlv::AutoconfigFreqBand(tlv) => {
                let band = match tlv.value() {
                    Ok(band) => format!("{band:?}"),
                    Err(_) => format!("{:#x}", tlv.raw_value()),
                };
                out.push(("value", band));
            }
            ParsedTlv::VendorSpecific(tlv) => {
                out.push(("vendor_oui", tlv.vendor_oui().to_string()));
            }
            ParsedTlv::SupportedService(tlv) => {
                let services: Vec<String> = tlv
                    .raw_services()
                    .into_iter()
                    .map(|raw| match wfa_map::Service::try_from(raw) {
                        Ok(service) => format!("{service:?}"),
                        Err(_) => format!("{raw:#x}"),
                    })
                    .collect();
                out.push(("supported_service_list", services.join(",")));
            }
            ParsedTlv::ClientAssociationControlRequest(tlv) => {
                out.push(("bssid_to_block_client", tlv.bssid_to_block_client().to_string()));
                let control = match tlv.association_control() {
                    Ok(control) => format!("{control:?}"),
                    Err(err) => err.to_string(),
                };
                out.push(("association_control", control));
                out.push(("validity_period_sec", tlv.validity_period_sec().to_string()));
                let stations: Vec<String> = tlv.sta_list().iter().map(|m| m.to_string()).collect();
                out.push(("sta_list", stations.join(",")));
            }
            ParsedTlv::AirtiesMsgType(tlv) => {
                out.push(("vendor_oui", tlv.vendor_oui().to_string()));
            }
            ParsedTlv::AirtiesDeviceInfo(tlv) => {
                out.push(("boot_id", tlv.boot_id().to_string()));
                out.push(("client_id", tlv.client_id()));
                out.push(("client_secret_length", tlv.client_secret().len().to_string()));
                out.push(("flags1", format!("{:?}", tlv.flags1())));
                out.push(("flags2", format!("{:?}", tlv.flags2())));
            }
            ParsedTlv::AirtiesDeviceMetrics(tlv) => {
                out.push(("uptime_to_boot", tlv.uptime_to_boot().to_string()));
                out.push(("cpu_loadtime_platform", tlv.cpu_loadtime_platform().to_string()));
                out.push(("cpu_temperature", tlv.cpu_temperature().to_string()));
                out.push(("platform_totalmemory", tlv.platform_totalmemory().to_string()));
                out.push(("platform_freememory", tlv.platform_freememory().to_string()));
                out.push(("platform_cachedmemory", tlv.platform_cachedmemory().to_string()));
                for radio in tlv.radios() {
                    out.push((
                        "radio",
                        format!("{} {}C", radio.radio_id(), radio.radio_temperature()),
                    ));
                }
            }
            ParsedTlv::AirtiesVersionReporting(tlv) => {
                out.push(("em_agent_version", format!("{:#010x}", tlv.em_agent_version())));
                for feature in tlv.features() {
                    out.push(("feature_info", format!("{:#010x}", feature.feature_info())));
                }
            }
        }
        out
    }
}
