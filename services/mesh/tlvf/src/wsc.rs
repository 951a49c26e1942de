//! Wi-Fi Simple Configuration attributes.
//!
//! WSC attributes use a 16-bit type and a 16-bit length, both big-endian.

use crate::error::Result;
use crate::record::{Record, RecordCore, Slot, Tlv};
use crate::var::VarField;
use crate::{fixed_fields, record_core};

/// WSC vendor extension attribute type
pub const ATTR_VENDOR_EXTENSION: u16 = 0x1049;

/// Wi-Fi Alliance vendor id carried in vendor extensions
pub const WFA_VENDOR_ID: [u8; 3] = [0x00, 0x37, 0x2A];

/// Vendor extension attribute.
///
/// `vendor_data` has no prefix of its own: it runs to the end of the
/// attribute's declared length.
#[derive(Debug)]
pub struct VendorExtension {
    core: RecordCore,
    vendor_id_0: Slot<u8>,
    vendor_id_1: Slot<u8>,
    vendor_id_2: Slot<u8>,
    vendor_data: VarField,
}

impl Record for VendorExtension {
    const NAME: &'static str = "wsc::VendorExtension";

    fn initial_size() -> usize {
        2 + 2 + 3
    }

    fn init(mut core: RecordCore) -> Result<Self> {
        core.tag(Self::TYPE_TAG)?;
        core.length()?;
        let vendor_id_0 = core.field_with("vendor_id_0", WFA_VENDOR_ID[0])?;
        let vendor_id_1 = core.field_with("vendor_id_1", WFA_VENDOR_ID[1])?;
        let vendor_id_2 = core.field_with("vendor_id_2", WFA_VENDOR_ID[2])?;
        let vendor_data = VarField::remainder(&mut core, "vendor_data", 0)?;
        Ok(Self {
            core,
            vendor_id_0,
            vendor_id_1,
            vendor_id_2,
            vendor_data,
        })
    }

    record_core!();

    fn swap_fields(&mut self) {}
}

impl Tlv for VendorExtension {
    const TYPE_TAG: u16 = ATTR_VENDOR_EXTENSION;
}

impl VendorExtension {
    fixed_fields! {
        /// First byte of the vendor id
        vendor_id_0 / set_vendor_id_0: u8;
        /// Second byte of the vendor id
        vendor_id_1 / set_vendor_id_1: u8;
        /// Third byte of the vendor id
        vendor_id_2 / set_vendor_id_2: u8;
    }

    /// The three vendor id bytes.
    pub fn vendor_id(&self) -> [u8; 3] {
        [self.vendor_id_0(), self.vendor_id_1(), self.vendor_id_2()]
    }

    /// Vendor data bytes.
    pub fn vendor_data(&self) -> Vec<u8> {
        self.vendor_data.bytes(&self.core)
    }

    /// Length of the vendor data.
    pub fn vendor_data_length(&self) -> usize {
        self.vendor_data.len()
    }

    /// Allocate and copy in the vendor data.
    pub fn set_vendor_data(&mut self, data: &[u8]) -> Result<()> {
        self.vendor_data.set_bytes(&mut self.core, data)
    }

    /// Grow the vendor data by `count` zeroed bytes.
    pub fn alloc_vendor_data(&mut self, count: usize) -> Result<()> {
        self.vendor_data.allocate(&mut self.core, count)
    }
}
