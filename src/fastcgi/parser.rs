use super::*;
use crate::errors::{Error, Result, Violation};

use nom::IResult;
use nom::bytes::complete::take;
use nom::combinator::{all_consuming, map};
use nom::multi::many0;
use nom::number::complete::{be_u8, be_u16, be_u32};
use nom::sequence::{pair, terminated, tuple};

/// Parses the eight header bytes
pub fn header(input: &[u8]) -> IResult<&[u8], Header> {
    map(
        tuple((be_u8, be_u8, be_u16, be_u16, be_u8, be_u8)),
        |(version, kind, id, content_length, padding_length, reserved)|
        Header {
            version: version,
            kind: kind,
            id: id,
            content_length: content_length,
            padding_length: padding_length,
            reserved: reserved
        }
    )(input)
}

/// Decodes a header out of a buffer that holds at least eight bytes
///
/// This does no I/O. Being handed a short buffer is a bug in the caller,
/// reported as `MalformedHeader`.
pub fn decode_header(bytes: &[u8]) -> Result<Header> {
    if bytes.len() < HEADER_LEN {
        return Err(Error::MalformedHeader);
    }

    header(bytes)
        .map(|(_, hdr)| hdr)
        .map_err(|_| Error::MalformedHeader)
}

/// Parses a whole record: header, content, then the padding (dropped)
pub fn raw_record(input: &[u8]) -> IResult<&[u8], (Header, &[u8])> {
    let (input, hdr) = header(input)?;

    map(
        terminated(take(hdr.content_length as usize),
                   take(hdr.padding_length as usize)),
        move |content| (hdr, content)
    )(input)
}

/// Parses a whole record with its content decoded
///
/// Returns the unconsumed input alongside the record. A record whose content
/// doesn't decode for its type is reported as an error.
pub fn record(input: &[u8]) -> Result<(&[u8], Record)> {
    let (rest, (hdr, body)) = match raw_record(input) {
        Ok(parsed) => parsed,
        Err(_) => return Err(truncation(input))
    };

    let record = Record {
        id: hdr.id,
        content: content(hdr.kind, body)?
    };

    Ok((rest, record))
}

/// Names the part of a record that `input` stops short in
fn truncation(input: &[u8]) -> Error {
    match decode_header(input) {
        Err(_) => Error::TruncatedHeader,
        Ok(hdr) if input.len() - HEADER_LEN < hdr.content_length as usize =>
            Error::TruncatedContent,
        Ok(_) => Error::TruncatedPadding
    }
}

/// Decodes record content according to its type
pub fn content(kind: u8, body: &[u8]) -> Result<Content> {
    let parsed = match kind {
        record_kind::BEGIN_REQUEST => begin_request(body)
            .map(|(_, begin)| begin)
            .map_err(|_| Error::from(Violation::MalformedBeginRequest))?,
        record_kind::ABORT_REQUEST => Content::AbortRequest,
        record_kind::END_REQUEST => Content::EndRequest(end_request(body)?),
        record_kind::PARAMS => Content::Params(Vec::from(body)),
        record_kind::STDIN => Content::Stdin(Vec::from(body)),
        record_kind::STDOUT => Content::Stdout(Vec::from(body)),
        record_kind::STDERR => Content::Stderr(Vec::from(body)),
        record_kind::DATA => Content::Data(Vec::from(body)),
        record_kind::GET_VALUES =>
            Content::GetValues(decode_name_value_pairs(body)?),
        record_kind::GET_VALUES_RESULT =>
            Content::GetValuesResult(decode_name_value_pairs(body)?),
        record_kind::UNKNOWN_TYPE => match be_u8::<_, ()>(body) {
            Ok((_, unknown)) => Content::UnknownType(unknown),
            Err(_) => Content::UnknownType(0)
        },
        other => Content::Unrecognized(other, Vec::from(body))
    };

    Ok(parsed)
}

fn begin_request(input: &[u8]) -> IResult<&[u8], Content> {
    map(
        tuple((be_u16, be_u8, take(5usize))),
        |(role, flags, _)| Content::BeginRequest(BeginRequest {
            role: Role::from_protocol_number(role),
            flags: flags
        })
    )(input)
}

/// Parses an end-request body up to the protocol status
///
/// The three reserved bytes after it are not required.
pub fn end_request_body(input: &[u8]) -> IResult<&[u8], EndRequest> {
    map(
        pair(be_u32, be_u8),
        |(app_status, protocol_status)| EndRequest {
            app_status: app_status,
            protocol_status: ProtocolStatus::from_protocol_number(protocol_status)
        }
    )(input)
}

pub fn end_request(body: &[u8]) -> Result<EndRequest> {
    end_request_body(body)
        .map(|(_, end)| end)
        .map_err(|_| Violation::MalformedEndRequest.into())
}

/// A name or value length: one byte, or four with the top bit flagging them
fn length(input: &[u8]) -> IResult<&[u8], u32> {
    match input.first() {
        Some(&b) if b >> 7 == 1 => map(be_u32, |l: u32| l & 0x7FFF_FFFF)(input),
        _ => map(be_u8, u32::from)(input)
    }
}

pub fn name_value_pair(input: &[u8]) -> IResult<&[u8], NameValuePair> {
    let (input, name_length) = length(input)?;
    let (input, value_length) = length(input)?;

    map(
        pair(take(name_length as usize), take(value_length as usize)),
        |(name, value): (&[u8], &[u8])| NameValuePair {
            name: Vec::from(name),
            value: Vec::from(value)
        }
    )(input)
}

pub fn name_value_pairs(input: &[u8]) -> IResult<&[u8], Vec<NameValuePair>> {
    many0(name_value_pair)(input)
}

/// Decodes a buffer holding nothing but name-value pairs
pub fn decode_name_value_pairs(input: &[u8]) -> Result<Vec<NameValuePair>> {
    all_consuming(name_value_pairs)(input)
        .map(|(_, pairs)| pairs)
        .map_err(|_| Violation::MalformedNameValue.into())
}

/// The inverse of `serializer::encode_name_value` for a single pair
pub fn decode_name_value(input: &[u8]) -> Result<(NameValuePair, &[u8])> {
    name_value_pair(input)
        .map(|(rest, nv)| (nv, rest))
        .map_err(|_| Violation::MalformedNameValue.into())
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::fastcgi::serializer::{encode_name_value, encode_record};

    const ALL_KINDS: [u8; 11] = [
        record_kind::BEGIN_REQUEST, record_kind::ABORT_REQUEST,
        record_kind::END_REQUEST, record_kind::PARAMS, record_kind::STDIN,
        record_kind::STDOUT, record_kind::STDERR, record_kind::DATA,
        record_kind::GET_VALUES, record_kind::GET_VALUES_RESULT,
        record_kind::UNKNOWN_TYPE
    ];

    #[test]
    fn stdout_hello() {
        let input = [1, 6, 0, 1, 0, 5, 0, 0, b'h', b'e', b'l', b'l', b'o'];

        let hdr = decode_header(&input[.. 8]).unwrap();
        assert_eq!(hdr, Header {
            version: 1,
            kind: record_kind::STDOUT,
            id: 1,
            content_length: 5,
            padding_length: 0,
            reserved: 0
        });

        let (rest, rec) = record(&input[..]).unwrap();
        assert!(rest.is_empty());
        assert_eq!(rec, Record {
            id: 1,
            content: Content::Stdout(Vec::from(&b"hello"[..]))
        });
    }

    #[test]
    fn short_header_is_malformed() {
        match decode_header(&[1, 6, 0, 1]) {
            Err(Error::MalformedHeader) => (),
            other => panic!("{:?}", other)
        }
    }

    #[test]
    fn header_survives_encoding_for_every_kind() {
        let contents: [&[u8]; 3] = [b"", b"some content", &[0u8; 300]];

        for &kind in &ALL_KINDS {
            for &content in &contents {
                let bytes = encode_record(kind, 1, content).unwrap();
                let hdr = decode_header(&bytes).unwrap();

                assert_eq!(hdr.kind, kind);
                assert_eq!(hdr.id, 1);
                assert_eq!(hdr.version, VERSION);
                assert_eq!(hdr.content_length as usize, content.len());
                assert_eq!(hdr.padding_length, 0);
                assert_eq!(&bytes[HEADER_LEN ..], content);
            }
        }
    }

    #[test]
    fn padding_is_skipped() {
        let input = [1, 6, 0, 1, 0, 2, 3, 0, b'h', b'i', 0, 0, 0,
                     1, 7, 0, 1, 0, 0, 0, 0];

        let (rest, rec) = record(&input[..]).unwrap();
        assert_eq!(rec.content, Content::Stdout(Vec::from(&b"hi"[..])));
        assert_eq!(rest, &[1, 7, 0, 1, 0, 0, 0, 0]);
    }

    #[test]
    fn begin_request() {
        let input = [01, 01, 00, 01, 00, 08, 00, 00, 00, 01, 00, 00, 00, 00,
                     00, 00];

        let (_, result) = record(&input[..]).unwrap();
        assert_eq!(
            result,
            Record {
                id: 1,
                content: Content::BeginRequest(BeginRequest {
                    role: Role::Responder,
                    flags: 0
                })
            }
        );
    }

    #[test]
    fn end_request() {
        let input = [1, 3, 0, 1, 0, 8, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0];

        let (_, result) = record(&input[..]).unwrap();
        assert_eq!(
            result,
            Record {
                id: 1,
                content: Content::EndRequest(EndRequest {
                    app_status: 0,
                    protocol_status: ProtocolStatus::RequestComplete
                })
            }
        );
    }

    #[test]
    fn end_request_status_and_app_status() {
        let body = [0, 0, 1, 0, 2, 0, 0, 0];
        let end = super::end_request(&body).unwrap();

        assert_eq!(end.app_status, 256);
        assert_eq!(end.protocol_status, ProtocolStatus::Overloaded);
    }

    #[test]
    fn truncated_end_request_body() {
        match super::end_request(&[0, 0, 0, 0]) {
            Err(Error::ProtocolViolation(Violation::MalformedEndRequest)) => (),
            other => panic!("{:?}", other)
        }
    }

    #[test]
    fn params_empty() {
        let input = [1, 4, 0, 1, 0, 0, 0, 0];

        let (_, result) = record(&input[..]).unwrap();
        assert_eq!(result, Record { id: 1, content: Content::Params(vec![]) });
    }

    #[test]
    fn record_short_content() {
        let input = [1, 6, 0, 1, 0, 9, 0, 0, b'a'];

        match record(&input[..]) {
            Err(Error::TruncatedContent) => (),
            other => panic!("{:?}", other)
        }
    }

    #[test]
    fn record_short_padding() {
        let input = [1, 6, 0, 1, 0, 2, 4, 0, b'h', b'i', 0];

        match record(&input[..]) {
            Err(Error::TruncatedPadding) => (),
            other => panic!("{:?}", other)
        }
    }

    #[test]
    fn record_short_header() {
        match record(&[1, 6, 0][..]) {
            Err(Error::TruncatedHeader) => (),
            other => panic!("{:?}", other)
        }
    }

    #[test]
    fn unrecognized_kind_is_kept() {
        let input = [1, 42, 0, 1, 0, 1, 0, 0, 9];

        let (_, result) = record(&input[..]).unwrap();
        assert_eq!(result.content, Content::Unrecognized(42, vec![9]));
    }

    #[test]
    fn name_value_lengths_across_the_boundary() {
        for &len in &[0usize, 1, 127, 128, 129, 16384] {
            let name: Vec<u8> = (0 .. len).map(|i| (i % 251) as u8).collect();
            let value = vec![b'v'; len];

            let encoded = encode_name_value(&name, &value).unwrap();
            let (pair, rest) = decode_name_value(&encoded).unwrap();

            assert!(rest.is_empty());
            assert_eq!(pair.name, name);
            assert_eq!(pair.value, value);
        }
    }

    #[test]
    fn mixed_length_prefixes() {
        let value = vec![b'x'; 200];
        let encoded = encode_name_value(b"SHORT", &value).unwrap();
        let (pair, _) = decode_name_value(&encoded).unwrap();

        assert_eq!(pair.name, b"SHORT");
        assert_eq!(pair.value.len(), 200);
    }

    #[test]
    fn get_values_result_pairs() {
        let mut body = encode_name_value(b"FCGI_MAX_CONNS", b"10").unwrap();
        body.extend(encode_name_value(b"FCGI_MPXS_CONNS", b"0").unwrap());

        match content(record_kind::GET_VALUES_RESULT, &body).unwrap() {
            Content::GetValuesResult(pairs) => {
                assert_eq!(pairs.len(), 2);
                assert_eq!(pairs[0].name, b"FCGI_MAX_CONNS");
                assert_eq!(pairs[0].value, b"10");
                assert_eq!(pairs[1].value, b"0");
            },
            other => panic!("{:?}", other)
        }
    }

    #[test]
    fn trailing_garbage_in_pairs() {
        let mut body = encode_name_value(b"A", b"1").unwrap();
        body.push(5); // a name length with no name behind it

        match decode_name_value_pairs(&body) {
            Err(Error::ProtocolViolation(Violation::MalformedNameValue)) => (),
            other => panic!("{:?}", other)
        }
    }
}
