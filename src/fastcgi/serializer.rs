//! Serialization of FastCGI messages
//!
//! This client never pads: every header it writes says `paddingLength = 0`.

use crate::errors::{Result, Violation};
use crate::fastcgi::{Params, Role, record_kind, MAX_CONTENT_LENGTH,
                     MANAGEMENT_ID};

use byteorder::{BigEndian, WriteBytesExt};

use std::io::Write;

/// Largest length a name-value prefix can carry (31 bits)
const MAX_NAME_VALUE_LENGTH: usize = 0x7FFF_FFFF;

/// Set on the first byte of a four-byte length prefix
const LONG_LENGTH_FLAG: u32 = 0x8000_0000;

/// Writes a header from its bits
///
/// Nothing is written when `content_length` doesn't fit the 16-bit field.
fn write_header<W: Write>(mut output: W, kind: u8, id: u16,
                          content_length: usize)
                          -> Result<()>
{
    if content_length > MAX_CONTENT_LENGTH {
        return Err(Violation::ContentTooLong(content_length).into());
    }

    output.write_all(&[super::VERSION, kind])?;
    output.write_u16::<BigEndian>(id)?;
    output.write_u16::<BigEndian>(content_length as u16)?;
    output.write_u8(0)?; // padding length
    output.write_u8(0)?; // reserved byte

    Ok(())
}

/// Writes one record: header, then the content verbatim
pub fn write_record<W: Write>(mut output: W, kind: u8, id: u16,
                              content: &[u8])
                              -> Result<()>
{
    write_header(&mut output, kind, id, content.len())?;
    output.write_all(content)?;

    Ok(())
}

/// Encodes one record into a fresh buffer
pub fn encode_record(kind: u8, id: u16, content: &[u8]) -> Result<Vec<u8>> {
    let mut record = Vec::with_capacity(super::HEADER_LEN + content.len());
    write_record(&mut record, kind, id, content)?;
    Ok(record)
}

/// Computes the number of bytes a name or value will take up on the wire once
/// serialized into the FastCGI name-value pair format
pub fn name_length(val: &[u8]) -> usize {
    let length = val.len();
    let length_length = if length > 127 { 4 } else { 1 };

    length + length_length
}

/// Writes a single length prefix: one byte below 128, four with the top bit
/// set otherwise
fn write_length<W: Write>(mut output: W, length: usize) -> Result<()> {
    if length > MAX_NAME_VALUE_LENGTH {
        return Err(Violation::NameValueTooLong(length).into());
    }

    if length > 127 {
        output.write_u32::<BigEndian>(length as u32 | LONG_LENGTH_FLAG)?;
    }
    else {
        output.write_u8(length as u8)?;
    }

    Ok(())
}

/// Writes a name-value pair to the stream
pub fn write_name_val_pair<W: Write>(mut output: W, name: &[u8], val: &[u8])
                                     -> Result<()>
{
    write_length(&mut output, name.len())?;
    write_length(&mut output, val.len())?;

    output.write_all(name)?;
    output.write_all(val)?;

    Ok(())
}

/// Encodes one name-value pair into a fresh buffer
pub fn encode_name_value(name: &[u8], value: &[u8]) -> Result<Vec<u8>> {
    let mut pair = Vec::with_capacity(name_length(name) + name_length(value));
    write_name_val_pair(&mut pair, name, value)?;
    Ok(pair)
}

/// Write a `BeginRequest` record
pub fn begin_request<W: Write>(output: W, id: u16, role: Role, flags: u8)
                               -> Result<()>
{
    let mut body = Vec::with_capacity(8);
    body.write_u16::<BigEndian>(role.to_protocol_number())?;
    body.write_u8(flags)?;
    body.write_all(&[0; 5])?; // reserved

    write_record(output, record_kind::BEGIN_REQUEST, id, &body)
}

/// Write a whole stream: as many records as `content` needs, then the
/// stream-terminating empty record
///
/// Streams are boundary agnostic, so content over 65535 bytes is carried by
/// consecutive records rather than refused.
pub fn stream<W: Write>(mut output: W, kind: u8, id: u16, content: &[u8])
                        -> Result<()>
{
    for chunk in content.chunks(MAX_CONTENT_LENGTH) {
        write_record(&mut output, kind, id, chunk)?;
    }

    write_record(&mut output, kind, id, &[])
}

/// Write a stream of parameters
///
/// This will automatically emit the stream-terminating empty record as well.
pub fn params<W: Write>(output: W, id: u16, params: &Params) -> Result<()> {
    let content_length = params.iter()
        .map(|(name, value)| name_length(name) + name_length(value))
        .sum();

    let mut content = Vec::with_capacity(content_length);
    for (name, value) in params {
        write_name_val_pair(&mut content, name, value)?;
    }

    stream(output, record_kind::PARAMS, id, &content)
}

/// Write the FCGI_STDIN stream, sentinel included
pub fn stdin<W: Write>(output: W, id: u16, content: &[u8]) -> Result<()> {
    stream(output, record_kind::STDIN, id, content)
}

/// Writes a `GetValues` record to the output stream
pub fn get_values<W: Write>(output: W, get_for: &[&[u8]]) -> Result<()> {
    let mut content = Vec::new();
    for &name in get_for {
        write_name_val_pair(&mut content, name, &[])?;
    }

    write_record(output, record_kind::GET_VALUES, MANAGEMENT_ID, &content)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::errors::Error;
    use crate::fastcgi::flags;

    fn assert_too_long(result: Result<()>, expected: usize) {
        match result {
            Err(Error::ProtocolViolation(Violation::ContentTooLong(len))) =>
                assert_eq!(len, expected),
            other => panic!("{:?}", other)
        }
    }

    #[test]
    fn header_layout() {
        let record = encode_record(record_kind::STDOUT, 0x0102, b"hello")
            .unwrap();

        assert_eq!(record, b"\x01\x06\x01\x02\x00\x05\x00\x00hello");
    }

    #[test]
    fn content_length_is_big_endian() {
        let content = vec![7u8; 0x1234];
        let record = encode_record(record_kind::STDIN, 1, &content).unwrap();

        assert_eq!(&record[4 .. 6], &[0x12, 0x34]);
        assert_eq!(record.len(), 8 + 0x1234);
    }

    #[test]
    fn accepts_maximum_content() {
        let content = vec![0u8; MAX_CONTENT_LENGTH];
        let record = encode_record(record_kind::STDIN, 1, &content).unwrap();

        assert_eq!(&record[4 .. 6], &[0xFF, 0xFF]);
    }

    #[test]
    fn oversize_record_writes_nothing() {
        let content = vec![0u8; MAX_CONTENT_LENGTH + 1];
        let mut out = Vec::new();

        assert_too_long(write_record(&mut out, record_kind::STDOUT, 1,
                                     &content),
                        MAX_CONTENT_LENGTH + 1);
        assert!(out.is_empty());
    }

    #[test]
    fn short_name_value() {
        assert_eq!(encode_name_value(b"HOST", b"localhost").unwrap(),
                   b"\x04\x09HOSTlocalhost");
    }

    #[test]
    fn long_lengths_set_high_bit() {
        let name = vec![b'N'; 130];
        let value = vec![b'V'; 128];
        let pair = encode_name_value(&name, &value).unwrap();

        assert_eq!(&pair[.. 8], &[0x80, 0, 0, 0x82, 0x80, 0, 0, 0x80]);
        assert_eq!(pair.len(), 8 + 130 + 128);
    }

    #[test]
    fn length_127_stays_short() {
        let pair = encode_name_value(&[b'a'; 127], b"").unwrap();
        assert_eq!(&pair[.. 2], &[127, 0]);
    }

    #[test]
    fn name_length_matches_encoding() {
        for &len in &[0usize, 1, 127, 128, 300] {
            let val = vec![0u8; len];
            let pair = encode_name_value(&val, b"").unwrap();
            assert_eq!(pair.len(), name_length(&val) + 1);
        }
    }

    #[test]
    fn begin_request_for_responder() {
        let mut out = Vec::new();
        begin_request(&mut out, 1, Role::Responder, 0).unwrap();

        assert_eq!(out, [1, 1, 0, 1, 0, 8, 0, 0,
                         0, 1, 0, 0, 0, 0, 0, 0]);
    }

    #[test]
    fn begin_request_keeps_flags() {
        let mut out = Vec::new();
        begin_request(&mut out, 7, Role::Filter, flags::KEEP_CONN).unwrap();

        assert_eq!(&out[8 ..], &[0, 3, 1, 0, 0, 0, 0, 0]);
    }

    #[test]
    fn empty_stream_is_just_the_terminator() {
        let mut out = Vec::new();
        stdin(&mut out, 1, b"").unwrap();

        assert_eq!(out, [1, 5, 0, 1, 0, 0, 0, 0]);
    }

    #[test]
    fn large_stream_is_split() {
        let content = vec![b'z'; MAX_CONTENT_LENGTH + 10];
        let mut out = Vec::new();
        stdin(&mut out, 1, &content).unwrap();

        // two data records and the terminator
        assert_eq!(out.len(), 3 * 8 + content.len());
        assert_eq!(&out[.. 8], &[1, 5, 0, 1, 0xFF, 0xFF, 0, 0]);
        let second = 8 + MAX_CONTENT_LENGTH;
        assert_eq!(&out[second .. second + 8], &[1, 5, 0, 1, 0, 10, 0, 0]);
        assert_eq!(&out[out.len() - 8 ..], &[1, 5, 0, 1, 0, 0, 0, 0]);
    }

    #[test]
    fn params_stream() {
        let params: Params = vec![("B", "2"), ("A", "1")].into_iter().collect();
        let mut out = Vec::new();
        super::params(&mut out, 1, &params).unwrap();

        assert_eq!(out, [1, 4, 0, 1, 0, 8, 0, 0,
                         1, 1, b'A', b'1', 1, 1, b'B', b'2',
                         1, 4, 0, 1, 0, 0, 0, 0]);
    }

    #[test]
    fn get_values_record() {
        let mut out = Vec::new();
        get_values(&mut out, &[b"FCGI_MAX_REQS"]).unwrap();

        let mut expected = vec![1, 9, 0, 0, 0, 15, 0, 0, 13, 0];
        expected.extend_from_slice(b"FCGI_MAX_REQS");
        assert_eq!(out, expected);
    }
}
