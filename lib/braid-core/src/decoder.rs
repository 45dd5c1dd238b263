//! Body decoding: raw bytes to text.

use crate::{Error, Response, Result};

/// Turns a response's raw body into its text form.
///
/// The client calls the decoder once per response, and only when the
/// response carries no error yet.
pub trait Decoder: Send + Sync + 'static {
    /// Decode the body of `response`.
    ///
    /// # Errors
    ///
    /// Returns a decode error if the body cannot be represented as text.
    fn decode(&self, response: &Response) -> Result<String>;
}

/// Default decoder honoring the `charset` parameter of `Content-Type`.
///
/// UTF-8 is assumed when no charset is declared. `us-ascii` is decoded as
/// UTF-8, `iso-8859-1` maps every byte to the code point of the same value.
#[derive(Debug, Clone, Copy, Default)]
pub struct TextDecoder;

impl TextDecoder {
    fn charset(content_type: &str) -> Option<String> {
        content_type
            .split(';')
            .skip(1)
            .filter_map(|param| param.split_once('='))
            .find(|(name, _)| name.trim().eq_ignore_ascii_case("charset"))
            .map(|(_, value)| value.trim().trim_matches('"').to_ascii_lowercase())
    }
}

impl Decoder for TextDecoder {
    fn decode(&self, response: &Response) -> Result<String> {
        let body = response.body();
        let charset = response.header("content-type").and_then(Self::charset);

        match charset.as_deref() {
            None | Some("utf-8" | "utf8" | "us-ascii" | "ascii") => {
                String::from_utf8(body.to_vec()).map_err(|err| Error::decode(err.to_string()))
            }
            Some("iso-8859-1" | "latin1" | "latin-1") => {
                Ok(body.iter().map(|&byte| char::from(byte)).collect())
            }
            Some(other) => Err(Error::UnsupportedCharset(other.to_string())),
        }
    }
}
