//! Decoding hex input into printable TLV summaries.

use anyhow::{Context, Result};
use serde::Serialize;
use std::fmt::Write;

use mesh_tlvf::{peek_header, MessageReader, ParsedTlv, TlvKind};

/// One named field of a decoded TLV
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldValue {
    pub name: &'static str,
    pub value: String,
}

/// Everything printed for one TLV
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TlvSummary {
    pub offset: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind: Option<TlvKind>,
    pub tag: Option<u8>,
    pub length: Option<u16>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<FieldValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Decode a hex dump. Whitespace, `:` and `-` separators and a leading
/// `0x` are accepted.
pub fn parse_hex(input: &str) -> Result<Vec<u8>> {
    let trimmed = input.trim();
    let trimmed = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
        .unwrap_or(trimmed);
    let digits: String = trimmed
        .chars()
        .filter(|c| !c.is_whitespace() && *c != ':' && *c != '-')
        .collect();
    hex::decode(&digits).context("input is not a valid hex dump")
}

/// Walk a CMDU payload and summarize each TLV. Undecodable TLVs are kept
/// as summaries carrying the error.
pub fn summarize(data: &[u8]) -> Vec<TlvSummary> {
    let mut reader = MessageReader::new(data);
    let mut summaries = Vec::new();

    loop {
        let offset = reader.offset();
        let Some(item) = reader.next() else {
            break;
        };
        let header = peek_header(&data[offset..]).ok();
        let mut summary = TlvSummary {
            offset,
            kind: None,
            tag: header.map(|h| h.tag),
            length: header.map(|h| h.length),
            fields: Vec::new(),
            error: None,
        };
        match item {
            Ok(tlv) => {
                crate::component_debug!("decode", offset, kind = %tlv.kind(), "decoded tlv");
                summary.kind = Some(tlv.kind());
                summary.fields = fields_of(&tlv);
            }
            Err(err) => {
                crate::component_warn!("decode", offset, "tlv not decoded: {}", err);
                summary.error = Some(err.to_string());
            }
        }
        summaries.push(summary);
    }

    let trailing = data.len().saturating_sub(reader.offset());
    if trailing > 0 {
        crate::component_debug!("decode", trailing, "bytes after end of message ignored");
    }
    summaries
}

fn fields_of(tlv: &ParsedTlv) -> Vec<FieldValue> {
    tlv.describe()
        .into_iter()
        .map(|(name, value)| FieldValue { name, value })
        .collect()
}

/// Human readable rendering, one header line per TLV and one line per field.
pub fn render_text(summaries: &[TlvSummary]) -> String {
    let mut out = String::new();
    for (idx, summary) in summaries.iter().enumerate() {
        let kind = summary
            .kind
            .map(|k| k.to_string())
            .unwrap_or_else(|| "?".to_string());
        let _ = write!(out, "[{}] offset={} {}", idx, summary.offset, kind);
        if let (Some(tag), Some(length)) = (summary.tag, summary.length) {
            let _ = write!(out, " tag={:#04x} length={}", tag, length);
        }
        out.push('\n');
        for field in &summary.fields {
            let _ = writeln!(out, "    {}: {}", field.name, field.value);
        }
        if let Some(error) = &summary.error {
            let _ = writeln!(out, "    error: {}", error);
        }
    }
    out
}
