use std::io::Cursor;
use std::io::Read;

use dart_persistence::CorpCodeEntry;

use crate::EdsClientError;
use crate::EdsResult;

/// Unwraps the corp-code ZIP payload and parses the single embedded XML
/// document. EDS returns a `<result><status/><message/><list>...</list></result>`
/// document; there is no XML parser in the surrounding workspace, so this
/// follows the same hand-rolled tag-scanning technique the bank-statement
/// OFX parser uses rather than pull in an unrelated crate.
pub fn decode_corp_code_archive(zip_bytes: &[u8]) -> EdsResult<Vec<CorpCodeEntry>> {
    let mut archive = zip::ZipArchive::new(Cursor::new(zip_bytes))
        .map_err(|err| EdsClientError::TransientParsing(format!("invalid zip archive: {err}")))?;
    if archive.is_empty() {
        return Err(EdsClientError::TransientParsing(
            "corp-code archive contained no entries".into(),
        ));
    }
    let mut xml = String::new();
    {
        let mut entry = archive
            .by_index(0)
            .map_err(|err| EdsClientError::TransientParsing(format!("unreadable zip entry: {err}")))?;
        entry
            .read_to_string(&mut xml)
            .map_err(|err| EdsClientError::TransientParsing(format!("non-utf8 archive entry: {err}")))?;
    }
    parse_corp_code_xml(&xml)
}

fn parse_corp_code_xml(xml: &str) -> EdsResult<Vec<CorpCodeEntry>> {
    let status = extract_element(xml, "status");
    if let Some(status) = status.as_deref()
        && status != "000"
    {
        let message = extract_element(xml, "message").unwrap_or_default();
        return Err(EdsClientError::ExternalSourceError(format!(
            "corp-code archive status {status}: {message}"
        )));
    }

    let mut entries = Vec::new();
    let mut rest = xml;
    while let Some(start) = rest.find("<list>") {
        let Some(end_rel) = rest[start..].find("</list>") else {
            break;
        };
        let block = &rest[start + "<list>".len()..start + end_rel];
        entries.push(CorpCodeEntry {
            corp_code: extract_element(block, "corp_code").unwrap_or_default(),
            corp_name: extract_element(block, "corp_name").unwrap_or_default(),
            corp_name_eng: extract_element(block, "corp_eng_name").filter(|v| !v.is_empty()),
            stock_code: extract_element(block, "stock_code").filter(|v| !v.is_empty()),
            modify_date: extract_element(block, "modify_date").unwrap_or_default(),
        });
        rest = &rest[start + end_rel + "</list>".len()..];
    }
    Ok(entries)
}

fn extract_element(xml: &str, tag: &str) -> Option<String> {
    let open = format!("<{tag}>");
    let close = format!("</{tag}>");
    let start = xml.find(&open)? + open.len();
    let end = xml[start..].find(&close)? + start;
    Some(xml[start..end].trim().to_owned())
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use pretty_assertions::assert_eq;
    use zip::write::FileOptions;

    use super::*;

    fn build_archive(xml: &str) -> Vec<u8> {
        let mut buffer = Cursor::new(Vec::new());
        {
            let mut writer = zip::ZipWriter::new(&mut buffer);
            let options: FileOptions<()> =
                FileOptions::default().compression_method(zip::CompressionMethod::Stored);
            writer.start_file("CORPCODE.xml", options).unwrap();
            writer.write_all(xml.as_bytes()).unwrap();
            writer.finish().unwrap();
        }
        buffer.into_inner()
    }

    #[test]
    fn decodes_entries_from_a_zipped_xml_document() {
        let xml = r#"<?xml version="1.0" encoding="UTF-8"?>
<result>
  <status>000</status>
  <message>정상</message>
  <list>
    <corp_code>00126380</corp_code>
    <corp_name>삼성전자(주)</corp_name>
    <corp_eng_name>Samsung Electronics Co Ltd</corp_eng_name>
    <stock_code>005930</stock_code>
    <modify_date>20240101</modify_date>
  </list>
  <list>
    <corp_code>00164779</corp_code>
    <corp_name>삼성에스디아이(주)</corp_name>
    <corp_eng_name></corp_eng_name>
    <stock_code></stock_code>
    <modify_date>20231215</modify_date>
  </list>
</result>"#;
        let bytes = build_archive(xml);
        let entries = decode_corp_code_archive(&bytes).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].corp_code, "00126380");
        assert_eq!(entries[0].stock_code.as_deref(), Some("005930"));
        assert_eq!(entries[1].stock_code, None);
    }

    #[test]
    fn non_ok_status_surfaces_as_external_source_error() {
        let xml = "<result><status>013</status><message>인증키 오류</message></result>";
        let bytes = build_archive(xml);
        let err = decode_corp_code_archive(&bytes).unwrap_err();
        assert!(matches!(err, EdsClientError::ExternalSourceError(_)));
    }
}
