//! AirTies vendor-specific TLVs.
//!
//! Every TLV here is an IEEE 1905.1 vendor specific TLV (type `0x0B`)
//! carrying the AirTies OUI followed by a 16-bit vendor TLV id, except
//! [`AirtiesMsgType`] which carries the OUI alone.

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

use crate::error::{Result, TlvError};
use crate::field::{MacAddr, VendorOui};
use crate::ieee1905;
use crate::list::RecordList;
use crate::record::{Record, RecordCore, Slot, Tlv};
use crate::var::VarField;
use crate::{fixed_fields, flags_field, record_core};

/// AirTies organizationally unique identifier
pub const AIRTIES_OUI: VendorOui = VendorOui::from_u32(0xFC4188);

/// Vendor TLV ids defined by AirTies
#[repr(u16)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AirtiesTlvId {
    /// Message type marker
    MsgType = 0x1,
    /// Feature profile
    FeatureProfile = 0x2,
    /// Device identity
    DeviceInfo = 0x3,
    /// Platform metrics
    DeviceMetrics = 0x4,
    /// Reboot request
    RebootRequest = 0x5,
    /// LED status
    LedStatus = 0xD,
    /// Service status
    ServiceStatus = 0xE,
    /// Ethernet interface
    EthernetInterface = 0xF,
    /// Ethernet statistics
    EthernetStats = 0x10,
    /// Non-1905 neighbor device list
    Non1905NeighborDeviceList = 0x11,
    /// 1905 neighbor device list
    NeighborDeviceList1905 = 0x12,
    /// Radio capability
    RadioCapability = 0x13,
    /// Version reporting
    VersionReporting = 0x15,
}

impl TryFrom<u16> for AirtiesTlvId {
    type Error = TlvError;

    fn try_from(value: u16) -> std::result::Result<Self, Self::Error> {
        match value {
            0x1 => Ok(AirtiesTlvId::MsgType),
            0x2 => Ok(AirtiesTlvId::FeatureProfile),
            0x3 => Ok(AirtiesTlvId::DeviceInfo),
            0x4 => Ok(AirtiesTlvId::DeviceMetrics),
            0x5 => Ok(AirtiesTlvId::RebootRequest),
            0xD => Ok(AirtiesTlvId::LedStatus),
            0xE => Ok(AirtiesTlvId::ServiceStatus),
            0xF => Ok(AirtiesTlvId::EthernetInterface),
            0x10 => Ok(AirtiesTlvId::EthernetStats),
            0x11 => Ok(AirtiesTlvId::Non1905NeighborDeviceList),
            0x12 => Ok(AirtiesTlvId::NeighborDeviceList1905),
            0x13 => Ok(AirtiesTlvId::RadioCapability),
            0x15 => Ok(AirtiesTlvId::VersionReporting),
            _ => Err(TlvError::InvalidValue {
                field: "tlv_id",
                value: value as u32,
            }),
        }
    }
}

/// Size of type, length, OUI and vendor TLV id.
const VENDOR_HEADER_SIZE: usize = 1 + 2 + 3 + 2;

/// Slots of the common vendor header.
#[derive(Debug, Clone, Copy)]
struct VendorHeader {
    vendor_oui: Slot<VendorOui>,
    tlv_id: Slot<u16>,
}

impl VendorHeader {
    fn layout(core: &mut RecordCore, id: AirtiesTlvId) -> Result<Self> {
        core.tag(ieee1905::TlvType::VendorSpecific as u8)?;
        core.length()?;
        let vendor_oui = core.field_with("vendor_oui", AIRTIES_OUI)?;
        let tlv_id = core.field_with("tlv_id", id as u16)?;
        Ok(Self { vendor_oui, tlv_id })
    }

    fn swap(&self, core: &RecordCore) {
        core.swap(self.tlv_id);
    }
}

macro_rules! vendor_header_accessors {
    () => {
        /// OUI carried by the TLV
        pub fn vendor_oui(&self) -> VendorOui {
            self.core.get(self.header.vendor_oui)
        }

        /// Vendor TLV id carried by the TLV
        pub fn tlv_id(&self) -> u16 {
            self.core.get(self.header.tlv_id)
        }
    };
}

/// Message type TLV marking a CMDU as carrying AirTies extensions.
#[derive(Debug)]
pub struct AirtiesMsgType {
    core: RecordCore,
    vendor_oui: Slot<VendorOui>,
}

impl Record for AirtiesMsgType {
    const NAME: &'static str = "airties::AirtiesMsgType";

    fn initial_size() -> usize {
        1 + 2 + 3
    }

    fn init(mut core: RecordCore) -> Result<Self> {
        core.tag(Self::TYPE_TAG as u8)?;
        core.length()?;
        let vendor_oui = core.field_with("vendor_oui", AIRTIES_OUI)?;
        Ok(Self { core, vendor_oui })
    }

    record_core!();

    fn swap_fields(&mut self) {}
}

impl Tlv for AirtiesMsgType {
    const TYPE_TAG: u16 = ieee1905::TlvType::VendorSpecific as u16;
}

impl AirtiesMsgType {
    fixed_fields! {
        /// OUI carried by the TLV
        vendor_oui / set_vendor_oui: VendorOui;
    }
}

/// Per-radio entry of [`DeviceMetrics`].
#[derive(Debug)]
pub struct RadioInfo {
    core: RecordCore,
    radio_id: Slot<MacAddr>,
    radio_temperature: Slot<u8>,
}

impl Record for RadioInfo {
    const NAME: &'static str = "airties::RadioInfo";

    fn initial_size() -> usize {
        6 + 1
    }

    fn init(mut core: RecordCore) -> Result<Self> {
        let radio_id = core.field("radio_id")?;
        let radio_temperature = core.field("radio_temperature")?;
        Ok(Self {
            core,
            radio_id,
            radio_temperature,
        })
    }

    record_core!();

    fn swap_fields(&mut self) {}
}

impl RadioInfo {
    fixed_fields! {
        /// Radio unique identifier
        radio_id / set_radio_id: MacAddr;
        /// Radio temperature in degrees Celsius
        radio_temperature / set_radio_temperature: u8;
    }
}

/// Device metrics TLV.
#[derive(Debug)]
pub struct DeviceMetrics {
    core: RecordCore,
    header: VendorHeader,
    uptime_to_boot: Slot<u32>,
    cpu_loadtime_platform: Slot<u8>,
    cpu_temperature: Slot<u8>,
    platform_totalmemory: Slot<u32>,
    platform_freememory: Slot<u32>,
    platform_cachedmemory: Slot<u32>,
    radio_list: RecordList<RadioInfo>,
}

impl Record for DeviceMetrics {
    const NAME: &'static str = "airties::DeviceMetrics";

    fn initial_size() -> usize {
        VENDOR_HEADER_SIZE + 4 + 1 + 1 + 4 + 4 + 4 + 1
    }

    fn init(mut core: RecordCore) -> Result<Self> {
        let header = VendorHeader::layout(&mut core, AirtiesTlvId::DeviceMetrics)?;
        let uptime_to_boot = core.field("uptime_to_boot")?;
        let cpu_loadtime_platform = core.field("cpu_loadtime_platform")?;
        let cpu_temperature = core.field("cpu_temperature")?;
        let platform_totalmemory = core.field("platform_totalmemory")?;
        let platform_freememory = core.field("platform_freememory")?;
        let platform_cachedmemory = core.field("platform_cachedmemory")?;
        let num_of_radios = core.field::<u8>("num_of_radios")?;
        let radio_list = RecordList::layout(&mut core, "radio_list", 0, num_of_radios)?;
        Ok(Self {
            core,
            header,
            uptime_to_boot,
            cpu_loadtime_platform,
            cpu_temperature,
            platform_totalmemory,
            platform_freememory,
            platform_cachedmemory,
            radio_list,
        })
    }

    record_core!();

    fn swap_fields(&mut self) {
        self.header.swap(&self.core);
        self.core.swap(self.uptime_to_boot);
        self.core.swap(self.platform_totalmemory);
        self.core.swap(self.platform_freememory);
        self.core.swap(self.platform_cachedmemory);
        self.radio_list.swap_all();
    }
}

impl Tlv for DeviceMetrics {
    const TYPE_TAG: u16 = ieee1905::TlvType::VendorSpecific as u16;
}

impl DeviceMetrics {
    vendor_header_accessors!();

    fixed_fields! {
        /// Seconds since boot
        uptime_to_boot / set_uptime_to_boot: u32;
        /// CPU load in percent
        cpu_loadtime_platform / set_cpu_loadtime_platform: u8;
        /// CPU temperature in degrees Celsius
        cpu_temperature / set_cpu_temperature: u8;
        /// Total memory in KiB
        platform_totalmemory / set_platform_totalmemory: u32;
        /// Free memory in KiB
        platform_freememory / set_platform_freememory: u32;
        /// Cached memory in KiB
        platform_cachedmemory / set_platform_cachedmemory: u32;
    }

    /// Number of radio entries.
    pub fn num_of_radios(&self) -> usize {
        self.radio_list.len()
    }

    /// Open a slot for a new radio entry.
    pub fn create_radio(&mut self) -> Result<RadioInfo> {
        self.radio_list.create_element(&mut self.core)
    }

    /// Commit the radio entry returned by [`DeviceMetrics::create_radio`].
    pub fn add_radio(&mut self, radio: RadioInfo) -> Result<()> {
        self.radio_list.add_element(&mut self.core, radio)
    }

    /// Radio entries.
    pub fn radios(&self) -> &RecordList<RadioInfo> {
        &self.radio_list
    }

    /// Radio entries, mutably.
    pub fn radios_mut(&mut self) -> &mut RecordList<RadioInfo> {
        &mut self.radio_list
    }
}

bitflags! {
    /// Product class bits of [`DeviceInfo`]
    #[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
    pub struct DeviceInfoFlags1: u8 {
        /// Device is a gateway
        const GATEWAY_PRODUCT_CLASS = 1 << 7;
        /// Device is an extender
        const EXTENDER_PRODUCT_CLASS = 1 << 6;
        /// Device is a set-top box
        const STB_PRODUCT_CLASS = 1 << 5;
    }
}

bitflags! {
    /// Role bits of [`DeviceInfo`]
    #[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
    pub struct DeviceInfoFlags2: u8 {
        /// Device indicates its role
        const DEVICE_ROLE_INDICATION = 1 << 7;
    }
}

flags_field!(DeviceInfoFlags1, u8);
flags_field!(DeviceInfoFlags2, u8);

/// Device info TLV.
///
/// `client_id` must be allocated before `client_secret`.
#[derive(Debug)]
pub struct DeviceInfo {
    core: RecordCore,
    header: VendorHeader,
    boot_id: Slot<u32>,
    client_id: VarField,
    client_secret: VarField,
    flags1: Slot<DeviceInfoFlags1>,
    flags2: Slot<DeviceInfoFlags2>,
}

impl Record for DeviceInfo {
    const NAME: &'static str = "airties::DeviceInfo";

    fn initial_size() -> usize {
        VENDOR_HEADER_SIZE + 4 + 1 + 1 + 1 + 1
    }

    fn init(mut core: RecordCore) -> Result<Self> {
        let header = VendorHeader::layout(&mut core, AirtiesTlvId::DeviceInfo)?;
        let boot_id = core.field("boot_id")?;
        let client_id_length = core.field::<u8>("client_id_length")?;
        let client_id = VarField::with_prefix(&mut core, "client_id", 0, client_id_length)?;
        let client_secret_length = core.field::<u8>("client_secret_length")?;
        let client_secret =
            VarField::with_prefix(&mut core, "client_secret", 1, client_secret_length)?;
        let flags1 = core.field("flags1")?;
        let flags2 = core.field("flags2")?;
        Ok(Self {
            core,
            header,
            boot_id,
            client_id,
            client_secret,
            flags1,
            flags2,
        })
    }

    record_core!();

    fn swap_fields(&mut self) {
        self.header.swap(&self.core);
        self.core.swap(self.boot_id);
    }
}

impl Tlv for DeviceInfo {
    const TYPE_TAG: u16 = ieee1905::TlvType::VendorSpecific as u16;
}

impl DeviceInfo {
    vendor_header_accessors!();

    fixed_fields! {
        /// Boot counter
        boot_id / set_boot_id: u32;
        /// Product class
        flags1 / set_flags1: DeviceInfoFlags1;
        /// Role indication
        flags2 / set_flags2: DeviceInfoFlags2;
    }

    /// Client id, cut at the first NUL.
    pub fn client_id(&self) -> String {
        self.client_id.as_str(&self.core)
    }

    /// Allocate and store the client id.
    pub fn set_client_id(&mut self, id: &str) -> Result<()> {
        self.client_id.set_str(&mut self.core, id)
    }

    /// Client secret, cut at the first NUL.
    pub fn client_secret(&self) -> String {
        self.client_secret.as_str(&self.core)
    }

    /// Allocate and store the client secret.
    pub fn set_client_secret(&mut self, secret: &str) -> Result<()> {
        self.client_secret.set_str(&mut self.core, secret)
    }
}

/// Feature entry of [`VersionReporting`].
#[derive(Debug)]
pub struct LocalInterfaceInfo {
    core: RecordCore,
    feature_info: Slot<u32>,
}

impl Record for LocalInterfaceInfo {
    const NAME: &'static str = "airties::LocalInterfaceInfo";

    fn initial_size() -> usize {
        4
    }

    fn init(mut core: RecordCore) -> Result<Self> {
        let feature_info = core.field("feature_info")?;
        Ok(Self { core, feature_info })
    }

    record_core!();

    fn swap_fields(&mut self) {
        self.core.swap(self.feature_info);
    }
}

impl LocalInterfaceInfo {
    fixed_fields! {
        /// Feature bitmap
        feature_info / set_feature_info: u32;
    }
}

/// Version reporting TLV. The feature list is counted by a 16-bit field.
#[derive(Debug)]
pub struct VersionReporting {
    core: RecordCore,
    header: VendorHeader,
    em_agent_version: Slot<u32>,
    em_agent_feature_list_length: Slot<u16>,
    em_agent_feature_list: RecordList<LocalInterfaceInfo, u16>,
}

impl Record for VersionReporting {
    const NAME: &'static str = "airties::VersionReporting";

    fn initial_size() -> usize {
        VENDOR_HEADER_SIZE + 4 + 2
    }

    fn init(mut core: RecordCore) -> Result<Self> {
        let header = VendorHeader::layout(&mut core, AirtiesTlvId::VersionReporting)?;
        let em_agent_version = core.field("em_agent_version")?;
        let em_agent_feature_list_length = core.field("em_agent_feature_list_length")?;
        let em_agent_feature_list = RecordList::layout(
            &mut core,
            "em_agent_feature_list",
            0,
            em_agent_feature_list_length,
        )?;
        Ok(Self {
            core,
            header,
            em_agent_version,
            em_agent_feature_list_length,
            em_agent_feature_list,
        })
    }

    record_core!();

    fn swap_fields(&mut self) {
        self.header.swap(&self.core);
        self.core.swap(self.em_agent_version);
        self.core.swap(self.em_agent_feature_list_length);
        self.em_agent_feature_list.swap_all();
    }
}

impl Tlv for VersionReporting {
    const TYPE_TAG: u16 = ieee1905::TlvType::VendorSpecific as u16;
}

impl VersionReporting {
    vendor_header_accessors!();

    fixed_fields! {
        /// EasyMesh agent version
        em_agent_version / set_em_agent_version: u32;
    }

    /// Open a slot for a new feature entry.
    pub fn create_feature(&mut self) -> Result<LocalInterfaceInfo> {
        self.em_agent_feature_list.create_element(&mut self.core)
    }

    /// Commit the entry returned by [`VersionReporting::create_feature`].
    pub fn add_feature(&mut self, feature: LocalInterfaceInfo) -> Result<()> {
        self.em_agent_feature_list.add_element(&mut self.core, feature)
    }

    /// Feature entries.
    pub fn features(&self) -> &RecordList<LocalInterfaceInfo, u16> {
        &self.em_agent_feature_list
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ByteBuffer;

    #[test]
    fn test_device_metrics_build() {
        let buf = ByteBuffer::with_capacity(128);
        let mut tlv = DeviceMetrics::build(&buf).unwrap();
        tlv.set_uptime_to_boot(3600).unwrap();
        tlv.set_cpu_loadtime_platform(12).unwrap();
        tlv.set_platform_totalmemory(0x0001_0000).unwrap();

        for (i, temp) in [41u8, 43].iter().enumerate() {
            let mut radio = tlv.create_radio().unwrap();
            radio.set_radio_id(MacAddr([0, 0, 0, 0, 0, i as u8])).unwrap();
            radio.set_radio_temperature(*temp).unwrap();
            tlv.add_radio(radio).unwrap();
        }
        tlv.finalize().unwrap();

        let wire = buf.to_bytes();
        assert_eq!(wire.len(), DeviceMetrics::initial_size() + 2 * 7);
        assert_eq!(&wire[..8], &[0x0b, 0x00, 0x26, 0xfc, 0x41, 0x88, 0x00, 0x04]);
        assert_eq!(&wire[8..12], &3600u32.to_be_bytes());

        let parsed = DeviceMetrics::parse_bytes(&wire).unwrap();
        assert_eq!(parsed.tlv_id(), AirtiesTlvId::DeviceMetrics as u16);
        assert_eq!(parsed.uptime_to_boot(), 3600);
        assert_eq!(parsed.platform_totalmemory(), 0x0001_0000);
        assert_eq!(parsed.num_of_radios(), 2);
        let temps: Vec<u8> = parsed.radios().iter().map(RadioInfo::radio_temperature).collect();
        assert_eq!(temps, vec![41, 43]);
    }

    #[test]
    fn test_device_info_ordered_strings() {
        let buf = ByteBuffer::with_capacity(128);
        let mut tlv = DeviceInfo::build(&buf).unwrap();
        tlv.set_flags1(DeviceInfoFlags1::EXTENDER_PRODUCT_CLASS).unwrap();
        tlv.set_client_id("agent-7").unwrap();
        tlv.set_client_secret("s3cret").unwrap();
        assert_eq!(tlv.flags1(), DeviceInfoFlags1::EXTENDER_PRODUCT_CLASS);
        assert_eq!(
            tlv.set_client_id("again"),
            Err(TlvError::OrderingViolation {
                field: "client_id",
                locked: 1
            })
        );
        tlv.finalize().unwrap();

        let parsed = DeviceInfo::parse(&buf, 0).unwrap();
        assert_eq!(parsed.client_id(), "agent-7");
        assert_eq!(parsed.client_secret(), "s3cret");
        assert_eq!(parsed.flags1(), DeviceInfoFlags1::EXTENDER_PRODUCT_CLASS);
        assert_eq!(parsed.flags2(), DeviceInfoFlags2::empty());
    }

    #[test]
    fn test_version_reporting_u16_count() {
        let buf = ByteBuffer::with_capacity(64);
        let mut tlv = VersionReporting::build(&buf).unwrap();
        tlv.set_em_agent_version(0x0203_0000).unwrap();
        let mut feature = tlv.create_feature().unwrap();
        feature.set_feature_info(0xa5a5_0001).unwrap();
        tlv.add_feature(feature).unwrap();
        tlv.finalize().unwrap();

        let wire = buf.to_bytes();
        assert_eq!(&wire[12..14], &[0x00, 0x01]);

        let parsed = VersionReporting::parse_bytes(&wire).unwrap();
        assert_eq!(parsed.em_agent_version(), 0x0203_0000);
        let infos: Vec<u32> = parsed.features().iter().map(LocalInterfaceInfo::feature_info).collect();
        assert_eq!(infos, vec![0xa5a5_0001]);
    }

    #[test]
    fn test_msg_type_defaults_to_airties_oui() {
        let buf = ByteBuffer::with_capacity(8);
        let mut tlv = AirtiesMsgType::build(&buf).unwrap();
        tlv.finalize().unwrap();
        assert_eq!(buf.to_bytes().as_ref(), &[0x0b, 0x00, 0x03, 0xfc, 0x41, 0x88]);
    }
}
