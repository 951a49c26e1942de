//! IEEE 1905.1 TLVs.

use serde::{Deserialize, Serialize};

use crate::error::{Result, TlvError};
use crate::field::VendorOui;
use crate::record::{Record, RecordCore, Slot, Tlv};
use crate::{fixed_fields, record_core};

/// IEEE 1905.1 TLV types known to this crate
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TlvType {
    /// Terminates every CMDU
    EndOfMessage = 0x00,
    /// Vendor-defined payload prefixed by an OUI
    VendorSpecific = 0x0B,
    /// Frequency band of an autoconfiguration search
    AutoconfigFreqBand = 0x10,
}

impl TryFrom<u8> for TlvType {
    type Error = TlvError;

    fn try_from(value: u8) -> std::result::Result<Self, Self::Error> {
        match value {
            0x00 => Ok(TlvType::EndOfMessage),
            0x0B => Ok(TlvType::VendorSpecific),
            0x10 => Ok(TlvType::AutoconfigFreqBand),
            _ => Err(TlvError::UnknownTag(value as u16)),
        }
    }
}

/// Frequency band carried by [`AutoconfigFreqBand`]
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FreqBand {
    /// 2.4 GHz
    Band2_4Ghz = 0x0,
    /// 5 GHz
    Band5Ghz = 0x1,
    /// 60 GHz
    Band60Ghz = 0x2,
    /// 6 GHz
    Band6Ghz = 0x3,
}

impl TryFrom<u8> for FreqBand {
    type Error = TlvError;

    fn try_from(value: u8) -> std::result::Result<Self, Self::Error> {
        match value {
            0x0 => Ok(FreqBand::Band2_4Ghz),
            0x1 => Ok(FreqBand::Band5Ghz),
            0x2 => Ok(FreqBand::Band60Ghz),
            0x3 => Ok(FreqBand::Band6Ghz),
            _ => Err(TlvError::InvalidValue {
                field: "value",
                value: value as u32,
            }),
        }
    }
}

/// End of message TLV: a bare header with an empty payload.
#[derive(Debug)]
pub struct EndOfMessage {
    core: RecordCore,
}

impl Record for EndOfMessage {
    const NAME: &'static str = "ieee1905::EndOfMessage";

    fn initial_size() -> usize {
        1 + 2
    }

    fn init(mut core: RecordCore) -> Result<Self> {
        core.tag(Self::TYPE_TAG as u8)?;
        core.length()?;
        Ok(Self { core })
    }

    record_core!();

    fn swap_fields(&mut self) {}
}

impl Tlv for EndOfMessage {
    const TYPE_TAG: u16 = TlvType::EndOfMessage as u16;
}

/// Autoconfig frequency band TLV.
#[derive(Debug)]
pub struct AutoconfigFreqBand {
    core: RecordCore,
    value: Slot<u8>,
}

impl Record for AutoconfigFreqBand {
    const NAME: &'static str = "ieee1905::AutoconfigFreqBand";

    fn initial_size() -> usize {
        1 + 2 + 1
    }

    fn init(mut core: RecordCore) -> Result<Self> {
        core.tag(Self::TYPE_TAG as u8)?;
        core.length()?;
        let value = core.field("value")?;
        Ok(Self { core, value })
    }

    record_core!();

    fn swap_fields(&mut self) {}
}

impl Tlv for AutoconfigFreqBand {
    const TYPE_TAG: u16 = TlvType::AutoconfigFreqBand as u16;
}

impl AutoconfigFreqBand {
    /// Band as carried on the wire, without range checking.
    pub fn raw_value(&self) -> u8 {
        self.core.get(self.value)
    }

    /// Band carried by the TLV.
    pub fn value(&self) -> Result<FreqBand> {
        FreqBand::try_from(self.raw_value())
    }

    /// Set the band.
    pub fn set_value(&mut self, band: FreqBand) -> Result<()> {
        self.core.set(self.value, band as u8)
    }
}

/// Vendor specific TLV.
///
/// The vendor payload after the OUI is an inner record attached with
/// [`VendorSpecific::attach_payload`]. It is built in a reservation at the
/// tail of the buffer; whatever it leaves unused is given back when this
/// TLV is finalized.
#[derive(Debug)]
pub struct VendorSpecific {
    core: RecordCore,
    vendor_oui: Slot<VendorOui>,
}

impl Record for VendorSpecific {
    const NAME: &'static str = "ieee1905::VendorSpecific";

    fn initial_size() -> usize {
        1 + 2 + 3
    }

    fn init(mut core: RecordCore) -> Result<Self> {
        core.tag(Self::TYPE_TAG as u8)?;
        core.length()?;
        let vendor_oui = core.field("vendor_oui")?;
        Ok(Self { core, vendor_oui })
    }

    record_core!();

    fn swap_fields(&mut self) {}
}

impl Tlv for VendorSpecific {
    const TYPE_TAG: u16 = TlvType::VendorSpecific as u16;
}

impl VendorSpecific {
    fixed_fields! {
        /// Organization owning the payload format
        vendor_oui / set_vendor_oui: VendorOui;
    }

    /// Reserve `reserve` bytes (every free byte when `None`) and build the
    /// vendor payload `I` in them.
    pub fn attach_payload<I: Record>(&mut self, reserve: Option<usize>) -> Result<()> {
        self.core.attach_inner::<I>(reserve)
    }

    /// The attached payload.
    pub fn payload<I: Record>(&self) -> Option<&I> {
        self.core.inner::<I>()
    }

    /// The attached payload, mutably.
    pub fn payload_mut<I: Record>(&mut self) -> Option<&mut I> {
        self.core.inner_mut::<I>()
    }

    /// Parse the payload of a received TLV as `I`.
    pub fn parse_payload<I: Record>(&mut self) -> Result<I> {
        self.core.parse_inner::<I>()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ByteBuffer, Mode};

    #[test]
    fn test_freq_band_build() {
        let buf = ByteBuffer::with_capacity(16);
        let mut tlv = AutoconfigFreqBand::build(&buf).unwrap();
        tlv.set_value(FreqBand::Band5Ghz).unwrap();
        tlv.finalize().unwrap();
        assert_eq!(buf.to_bytes().as_ref(), &[0x10, 0x00, 0x01, 0x01]);
    }

    #[test]
    fn test_freq_band_invalid_value() {
        let tlv = AutoconfigFreqBand::parse_bytes(&[0x10, 0x00, 0x01, 0x07]).unwrap();
        assert_eq!(tlv.raw_value(), 7);
        assert_eq!(
            tlv.value(),
            Err(TlvError::InvalidValue {
                field: "value",
                value: 7
            })
        );
    }

    #[test]
    fn test_end_of_message() {
        let buf = ByteBuffer::with_capacity(3);
        let mut eom = EndOfMessage::build(&buf).unwrap();
        eom.finalize().unwrap();
        assert_eq!(buf.to_bytes().as_ref(), &[0x00, 0x00, 0x00]);
        assert_eq!(eom.mode(), Mode::Finalized);
    }

    #[test]
    fn test_vendor_specific_with_payload() {
        let buf = ByteBuffer::with_capacity(64);
        let mut tlv = VendorSpecific::build(&buf).unwrap();
        tlv.set_vendor_oui(VendorOui::from_u32(0x00_90_4c)).unwrap();
        tlv.attach_payload::<AutoconfigFreqBand>(None).unwrap();
        assert_eq!(buf.len(), 64);

        tlv.payload_mut::<AutoconfigFreqBand>()
            .unwrap()
            .set_value(FreqBand::Band6Ghz)
            .unwrap();
        tlv.finalize().unwrap();

        assert_eq!(
            buf.to_bytes().as_ref(),
            &[0x0b, 0x00, 0x07, 0x00, 0x90, 0x4c, 0x10, 0x00, 0x01, 0x03]
        );
        assert_eq!(
            tlv.payload::<AutoconfigFreqBand>().map(|p| p.mode()),
            Some(Mode::Finalized)
        );
    }

    #[test]
    fn test_vendor_specific_parse_payload() {
        let wire = [0x0b, 0x00, 0x07, 0x00, 0x90, 0x4c, 0x10, 0x00, 0x01, 0x00];
        let mut tlv = VendorSpecific::parse_bytes(&wire).unwrap();
        assert_eq!(tlv.vendor_oui(), VendorOui::from_u32(0x00_90_4c));
        let band = tlv.parse_payload::<AutoconfigFreqBand>().unwrap();
        assert_eq!(band.value(), Ok(FreqBand::Band2_4Ghz));
    }

    #[test]
    fn test_tlv_type_lookup() {
        assert_eq!(TlvType::try_from(0x0b), Ok(TlvType::VendorSpecific));
        assert_eq!(TlvType::try_from(0x55), Err(TlvError::UnknownTag(0x55)));
    }
}
