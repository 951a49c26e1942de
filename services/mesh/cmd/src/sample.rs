//! Sample records for every TLV family the codec knows.

use bytes::Bytes;
use clap::ValueEnum;

use mesh_tlvf::airties::{
    AirtiesMsgType, DeviceInfo, DeviceInfoFlags1, DeviceInfoFlags2, DeviceMetrics,
    VersionReporting,
};
use mesh_tlvf::ieee1905::{AutoconfigFreqBand, FreqBand};
use mesh_tlvf::wfa_map::{AssociationControl, ClientAssociationControlRequest, Service, SupportedService};
use mesh_tlvf::wsc::VendorExtension;
use mesh_tlvf::{ByteBuffer, MacAddr, Record, Result};

/// Record kinds `tlvf sample` can build
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SampleKind {
    FreqBand,
    SupportedService,
    AssociationControl,
    AirtiesMsgType,
    DeviceInfo,
    DeviceMetrics,
    VersionReporting,
    VendorExtension,
}

fn emit<T: Record>(buf: &ByteBuffer, fill: impl FnOnce(&mut T) -> Result<()>) -> Result<()> {
    let mut tlv = T::build(buf)?;
    fill(&mut tlv)?;
    tlv.finalize()
}

const SAMPLE_BSSID: MacAddr = MacAddr([0x02, 0x00, 0x00, 0x00, 0x01, 0x00]);

/// Build one record of `kind` in a buffer of `capacity` bytes.
pub fn build_sample(kind: SampleKind, capacity: usize) -> Result<Bytes> {
    let buf = ByteBuffer::with_capacity(capacity);
    match kind {
        SampleKind::FreqBand => {
            emit::<AutoconfigFreqBand>(&buf, |tlv| tlv.set_value(FreqBand::Band5Ghz))?
        }
        SampleKind::SupportedService => emit::<SupportedService>(&buf, |tlv| {
            tlv.set_services(&[Service::MultiApAgent, Service::EmApAgent])
        })?,
        SampleKind::AssociationControl => {
            emit::<ClientAssociationControlRequest>(&buf, |tlv| {
                tlv.set_bssid_to_block_client(SAMPLE_BSSID)?;
                tlv.set_association_control(AssociationControl::TimedBlock)?;
                tlv.set_validity_period_sec(60)?;
                tlv.set_sta_list(&[MacAddr([0x02, 0, 0, 0, 0x02, 0x01])])
            })?
        }
        SampleKind::AirtiesMsgType => emit::<AirtiesMsgType>(&buf, |_| Ok(()))?,
        SampleKind::DeviceInfo => emit::<DeviceInfo>(&buf, |tlv| {
            tlv.set_boot_id(1)?;
            tlv.set_client_id("agent-1")?;
            tlv.set_client_secret("secret")?;
            tlv.set_flags1(DeviceInfoFlags1::EXTENDER_PRODUCT_CLASS)?;
            tlv.set_flags2(DeviceInfoFlags2::DEVICE_ROLE_INDICATION)
        })?,
        SampleKind::DeviceMetrics => emit::<DeviceMetrics>(&buf, |tlv| {
            tlv.set_uptime_to_boot(3600)?;
            tlv.set_cpu_loadtime_platform(7)?;
            tlv.set_cpu_temperature(55)?;
            tlv.set_platform_totalmemory(262_144)?;
            tlv.set_platform_freememory(131_072)?;
            let mut radio = tlv.create_radio()?;
            radio.set_radio_id(SAMPLE_BSSID)?;
            radio.set_radio_temperature(48)?;
            tlv.add_radio(radio)
        })?,
        SampleKind::VersionReporting => emit::<VersionReporting>(&buf, |tlv| {
            tlv.set_em_agent_version(0x0002_0001)?;
            let mut feature = tlv.create_feature()?;
            feature.set_feature_info(0x0000_0003)?;
            tlv.add_feature(feature)
        })?,
        SampleKind::VendorExtension => {
            emit::<VendorExtension>(&buf, |attr| attr.set_vendor_data(&[0x00, 0x01, 0x20]))?
        }
    }
    Ok(buf.freeze())
}

#[cfg(test)]
mod tests {
    use super::*;
    use mesh_tlvf::{classify, TlvError, TlvKind};

    #[test]
    fn test_every_cmdu_sample_classifies() {
        let expected = [
            (SampleKind::FreqBand, TlvKind::AutoconfigFreqBand),
            (SampleKind::SupportedService, TlvKind::SupportedService),
            (SampleKind::AssociationControl, TlvKind::ClientAssociationControlRequest),
            (SampleKind::AirtiesMsgType, TlvKind::AirtiesMsgType),
            (SampleKind::DeviceInfo, TlvKind::AirtiesDeviceInfo),
            (SampleKind::DeviceMetrics, TlvKind::AirtiesDeviceMetrics),
            (SampleKind::VersionReporting, TlvKind::AirtiesVersionReporting),
        ];
        for (kind, tlv_kind) in expected {
            let bytes = build_sample(kind, 256).unwrap();
            assert_eq!(classify(&bytes), Ok(tlv_kind), "{:?}", kind);
        }
    }

    #[test]
    fn test_vendor_extension_sample() {
        let bytes = build_sample(SampleKind::VendorExtension, 64).unwrap();
        assert_eq!(hex::encode(&bytes), "1049000600372a000120");
    }

    #[test]
    fn test_sample_too_large_for_capacity() {
        assert!(matches!(
            build_sample(SampleKind::DeviceMetrics, 8),
            Err(TlvError::BufferTooSmall { .. })
        ));
    }
}
