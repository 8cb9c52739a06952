//! Parsers for CGI/1.1 responses

use crate::cgi::{Status, Header, DocumentHeaders};

use nom::IResult;
use nom::bytes::complete::{tag, take_till, take_till1, take_while,
                           take_while_m_n};
use nom::character::complete::line_ending;
use nom::character::is_digit;
use nom::combinator::{map, map_res, opt, rest};
use nom::multi::many0;
use nom::sequence::{terminated, tuple};

use std::str::{self, FromStr};

fn cr_or_lf(x: u8) -> bool {
    x == b'\n' || x == b'\r'
}

fn lwsp(x: u8) -> bool {
    x == b' ' || x == b'\t'
}

fn code(input: &[u8]) -> IResult<&[u8], u16> {
    map_res(
        map_res(take_while_m_n(3, 3, is_digit), str::from_utf8),
        FromStr::from_str
    )(input)
}

/// The content of a `Status:` header: `200 OK`
pub fn status(input: &[u8]) -> IResult<&[u8], Status> {
    map(
        tuple((code, opt(tag(" ")), rest)),
        |(code, _, phrase): (u16, _, &[u8])| Status {
            code: code,
            reason_phrase: Vec::from(phrase)
        }
    )(input)
}

/// One `Name: content` line, line ending included
pub fn header(input: &[u8]) -> IResult<&[u8], Header> {
    map(
        tuple((
            take_till1(|b: u8| b == b':' || cr_or_lf(b)),
            tag(":"),
            take_while(lwsp),
            take_till(cr_or_lf),
            line_ending
        )),
        |(name, _, _, content, _): (&[u8], _, _, &[u8], _)| Header {
            name: Vec::from(name),
            content: Vec::from(content)
        }
    )(input)
}

/// Header lines up to and including the blank line
pub fn headers(input: &[u8]) -> IResult<&[u8], Vec<Header>> {
    terminated(many0(header), line_ending)(input)
}

/// Splits a CGI document into its headers and the remaining body
pub fn document(input: &[u8]) -> IResult<&[u8], DocumentHeaders> {
    let (body, hdrs) = headers(input)?;
    let mut doc = DocumentHeaders::default();

    for hdr in hdrs {
        if hdr.name.eq_ignore_ascii_case(b"Status") {
            match status(&hdr.content) {
                Ok((_, s)) => doc.status = Some(s),
                Err(_) => warn!("Ignoring unparseable Status header"),
            }
        }
        else if hdr.name.eq_ignore_ascii_case(b"Content-Type") {
            doc.content_type = Some(hdr.content);
        }
        else if hdr.name.eq_ignore_ascii_case(b"Location") {
            doc.location = Some(hdr.content);
        }
        else {
            doc.headers.push(hdr);
        }
    }

    Ok((body, doc))
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn header_works() {
        let input: &[u8] = b"Foo: bar\r\n\r\n";
        let expected = Header {
            name: Vec::from(&b"Foo"[..]),
            content: Vec::from(&b"bar"[..])
        };

        let (rest, res) = header(input).unwrap();
        assert_eq!(expected, res);
        assert_eq!(b"\r\n", rest);
    }

    #[test]
    fn header_empty_content() {
        let (_, res) = header(b"X-Empty:\n").unwrap();
        assert_eq!(res.name, b"X-Empty");
        assert!(res.content.is_empty());
    }

    #[test]
    fn test_headers() {
        let input: &[u8] = b"Foo: bar\r\nBaz: buz\r\n\r\n";

        let expected = vec![
            Header {
                name: Vec::from(&b"Foo"[..]),
                content: Vec::from(&b"bar"[..])
            },
            Header {
                name: Vec::from(&b"Baz"[..]),
                content: Vec::from(&b"buz"[..])
            }
        ];
        let (rest, hdrs) = headers(input).unwrap();
        assert_eq!(expected, hdrs);
        assert_eq!(b"", rest);
    }

    #[test]
    fn status_line() {
        let (_, s) = status(b"404 Not Found").unwrap();
        assert_eq!(s, Status {
            code: 404,
            reason_phrase: Vec::from(&b"Not Found"[..])
        });
        assert!(status(b"4x4 Nope").is_err());
    }

    #[test]
    fn no_blank_line_is_an_error() {
        assert!(document(b"Content-Type: text/plain\r\n").is_err());
        assert!(document(b"just some bytes").is_err());
    }

    #[test]
    fn redirect_defaults_to_302() {
        let (body, doc) = document(b"Location: /elsewhere\n\n").unwrap();

        assert!(body.is_empty());
        assert_eq!(doc.location, Some(Vec::from(&b"/elsewhere"[..])));
        assert_eq!(doc.effective_status(), 302);
    }

    #[test]
    fn document_on_captured_traffic() {
        let input: &[u8] = b"X-Powered-By: PHP/7.4.3\r\nStatus: 201 Created\r\ncontent-type: text/html; charset=UTF-8\r\n\r\n<!DOCTYPE html>\n<p>values\x00</p>\r\n\r\n";

        let (body, doc) = document(input).unwrap();
        assert_eq!(doc, DocumentHeaders {
            status: Some(Status {
                code: 201,
                reason_phrase: Vec::from(&b"Created"[..])
            }),
            content_type: Some(Vec::from(&b"text/html; charset=UTF-8"[..])),
            location: None,
            headers: vec![
                Header {
                    name: Vec::from(&b"X-Powered-By"[..]),
                    content: Vec::from(&b"PHP/7.4.3"[..])
                }
            ]
        });
        assert_eq!(body, &b"<!DOCTYPE html>\n<p>values\x00</p>\r\n\r\n"[..]);
        assert_eq!(doc.effective_status(), 201);
    }
}
