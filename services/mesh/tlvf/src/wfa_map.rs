//! Wi-Fi Alliance Multi-AP (EasyMesh) TLVs.

use serde::{Deserialize, Serialize};

use crate::error::{Result, TlvError};
use crate::field::MacAddr;
use crate::record::{Record, RecordCore, Slot, Tlv};
use crate::var::VarArray;
use crate::{fixed_fields, record_core};

/// Multi-AP TLV types known to this crate
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TlvType {
    /// Services a device supports
    SupportedService = 0x80,
    /// Block or unblock clients on a BSS
    ClientAssociationControlRequest = 0x9D,
}

impl TryFrom<u8> for TlvType {
    type Error = TlvError;

    fn try_from(value: u8) -> std::result::Result<Self, Self::Error> {
        match value {
            0x80 => Ok(TlvType::SupportedService),
            0x9D => Ok(TlvType::ClientAssociationControlRequest),
            _ => Err(TlvError::UnknownTag(value as u16)),
        }
    }
}

/// A Multi-AP service
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Service {
    /// Multi-AP controller
    MultiApController = 0x00,
    /// Multi-AP agent
    MultiApAgent = 0x01,
    /// EasyMesh AP controller
    EmApController = 0xA0,
    /// EasyMesh AP agent
    EmApAgent = 0xA1,
}

impl TryFrom<u8> for Service {
    type Error = TlvError;

    fn try_from(value: u8) -> std::result::Result<Self, Self::Error> {
        match value {
            0x00 => Ok(Service::MultiApController),
            0x01 => Ok(Service::MultiApAgent),
            0xA0 => Ok(Service::EmApController),
            0xA1 => Ok(Service::EmApAgent),
            _ => Err(TlvError::InvalidValue {
                field: "supported_service_list",
                value: value as u32,
            }),
        }
    }
}

/// Supported service TLV.
#[derive(Debug)]
pub struct SupportedService {
    core: RecordCore,
    supported_service_list: VarArray<u8>,
}

impl Record for SupportedService {
    const NAME: &'static str = "wfa_map::SupportedService";

    fn initial_size() -> usize {
        1 + 2 + 1
    }

    fn init(mut core: RecordCore) -> Result<Self> {
        core.tag(Self::TYPE_TAG as u8)?;
        core.length()?;
        let list_length = core.field::<u8>("supported_service_list_length")?;
        let supported_service_list =
            VarArray::with_prefix(&mut core, "supported_service_list", 0, list_length)?;
        Ok(Self {
            core,
            supported_service_list,
        })
    }

    record_core!();

    fn swap_fields(&mut self) {}
}

impl Tlv for SupportedService {
    const TYPE_TAG: u16 = TlvType::SupportedService as u16;
}

impl SupportedService {
    /// Allocate the service list and fill it.
    pub fn set_services(&mut self, services: &[Service]) -> Result<()> {
        let raw: Vec<u8> = services.iter().map(|s| *s as u8).collect();
        self.supported_service_list.set(&mut self.core, &raw)
    }

    /// Services as carried on the wire.
    pub fn raw_services(&self) -> Vec<u8> {
        self.supported_service_list.to_vec(&self.core)
    }

    /// Services carried by the TLV. Fails on the first unknown value.
    pub fn services(&self) -> Result<Vec<Service>> {
        self.raw_services()
            .into_iter()
            .map(Service::try_from)
            .collect()
    }
}

/// Association control action
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AssociationControl {
    /// Block for the validity period
    Block = 0x0,
    /// Lift a block
    Unblock = 0x1,
    /// Block with an explicit timeout
    TimedBlock = 0x2,
    /// Block until unblocked
    IndefiniteBlock = 0x3,
}

impl TryFrom<u8> for AssociationControl {
    type Error = TlvError;

    fn try_from(value: u8) -> std::result::Result<Self, Self::Error> {
        match value {
            0x0 => Ok(AssociationControl::Block),
            0x1 => Ok(AssociationControl::Unblock),
            0x2 => Ok(AssociationControl::TimedBlock),
            0x3 => Ok(AssociationControl::IndefiniteBlock),
            _ => Err(TlvError::InvalidValue {
                field: "association_control",
                value: value as u32,
            }),
        }
    }
}

/// Client association control request TLV.
#[derive(Debug)]
pub struct ClientAssociationControlRequest {
    core: RecordCore,
    bssid_to_block_client: Slot<MacAddr>,
    association_control: Slot<u8>,
    validity_period_sec: Slot<u16>,
    sta_list: VarArray<MacAddr>,
}

impl Record for ClientAssociationControlRequest {
    const NAME: &'static str = "wfa_map::ClientAssociationControlRequest";

    fn initial_size() -> usize {
        1 + 2 + 6 + 1 + 2 + 1
    }

    fn init(mut core: RecordCore) -> Result<Self> {
        core.tag(Self::TYPE_TAG as u8)?;
        core.length()?;
        let bssid_to_block_client = core.field("bssid_to_block_client")?;
        let association_control = core.field("association_control")?;
        let validity_period_sec = core.field("validity_period_sec")?;
        let sta_list_length = core.field::<u8>("sta_list_length")?;
        let sta_list = VarArray::with_prefix(&mut core, "sta_list", 0, sta_list_length)?;
        Ok(Self {
            core,
            bssid_to_block_client,
            association_control,
            validity_period_sec,
            sta_list,
        })
    }

    record_core!();

    fn swap_fields(&mut self) {
        self.core.swap(self.validity_period_sec);
    }
}

impl Tlv for ClientAssociationControlRequest {
    const TYPE_TAG: u16 = TlvType::ClientAssociationControlRequest as u16;
}

impl ClientAssociationControlRequest {
    fixed_fields! {
        /// BSS the request applies to
        bssid_to_block_client / set_bssid_to_block_client: MacAddr;
        /// Validity of a block, in seconds
        validity_period_sec / set_validity_period_sec: u16;
    }

    /// Requested action.
    pub fn association_control(&self) -> Result<AssociationControl> {
        AssociationControl::try_from(self.core.get(self.association_control))
    }

    /// Set the requested action.
    pub fn set_association_control(&mut self, control: AssociationControl) -> Result<()> {
        self.core.set(self.association_control, control as u8)
    }

    /// Allocate the station list and fill it.
    pub fn set_sta_list(&mut self, stations: &[MacAddr]) -> Result<()> {
        self.sta_list.set(&mut self.core, stations)
    }

    /// Grow the station list by `count` zeroed entries.
    pub fn alloc_sta_list(&mut self, count: usize) -> Result<()> {
        self.sta_list.allocate(&mut self.core, count)
    }

    /// Overwrite one station of an allocated list.
    pub fn set_sta(&mut self, idx: usize, sta: MacAddr) -> Result<()> {
        self.sta_list.set_at(&mut self.core, idx, sta)
    }

    /// Stations the request applies to.
    pub fn sta_list(&self) -> Vec<MacAddr> {
        self.sta_list.to_vec(&self.core)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ByteBuffer;

    #[test]
    fn test_supported_service_roundtrip() {
        let buf = ByteBuffer::with_capacity(32);
        let mut tlv = SupportedService::build(&buf).unwrap();
        tlv.set_services(&[Service::MultiApAgent, Service::EmApAgent])
            .unwrap();
        tlv.finalize().unwrap();
        assert_eq!(
            buf.to_bytes().as_ref(),
            &[0x80, 0x00, 0x03, 0x02, 0x01, 0xa1]
        );

        let parsed = SupportedService::parse(&buf, 0).unwrap();
        assert_eq!(
            parsed.services().unwrap(),
            vec![Service::MultiApAgent, Service::EmApAgent]
        );
    }

    #[test]
    fn test_unknown_service_value() {
        let parsed = SupportedService::parse_bytes(&[0x80, 0x00, 0x02, 0x01, 0x55]).unwrap();
        assert_eq!(parsed.raw_services(), vec![0x55]);
        assert!(matches!(
            parsed.services(),
            Err(TlvError::InvalidValue { value: 0x55, .. })
        ));
    }

    #[test]
    fn test_association_control_request() {
        let bssid: MacAddr = "02:00:00:00:01:00".parse().unwrap();
        let sta: MacAddr = "aa:bb:cc:dd:ee:ff".parse().unwrap();

        let buf = ByteBuffer::with_capacity(64);
        let mut tlv = ClientAssociationControlRequest::build(&buf).unwrap();
        tlv.set_bssid_to_block_client(bssid).unwrap();
        tlv.set_association_control(AssociationControl::TimedBlock)
            .unwrap();
        tlv.set_validity_period_sec(300).unwrap();
        tlv.alloc_sta_list(1).unwrap();
        tlv.set_sta(0, sta).unwrap();
        tlv.finalize().unwrap();

        let wire = buf.to_bytes();
        assert_eq!(&wire[..3], &[0x9d, 0x00, 0x10]);
        assert_eq!(&wire[10..12], &300u16.to_be_bytes());

        let parsed = ClientAssociationControlRequest::parse_bytes(&wire).unwrap();
        assert_eq!(parsed.bssid_to_block_client(), bssid);
        assert_eq!(
            parsed.association_control(),
            Ok(AssociationControl::TimedBlock)
        );
        assert_eq!(parsed.validity_period_sec(), 300);
        assert_eq!(parsed.sta_list(), vec![sta]);
    }
}
