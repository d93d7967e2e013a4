use crate::error::{DecodeError, Error, Result};
use std::collections::HashMap;
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FileFormat {
    Text,
    Pdf,
    Docx,
}

impl FileFormat {
    /// Pick the format from the file name's extension, case-insensitively.
    pub fn from_name(name: &str) -> Result<Self> {
        let ext = Path::new(name)
            .extension()
            .and_then(|s| s.to_str())
            .map(str::to_ascii_lowercase);
        match ext.as_deref() {
            Some("txt") => Ok(FileFormat::Text),
            Some("pdf") => Ok(FileFormat::Pdf),
            Some("docx") => Ok(FileFormat::Docx),
            _ => Err(Error::UnsupportedFormat(name.to_string())),
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            FileFormat::Text => "txt",
            FileFormat::Pdf => "pdf",
            FileFormat::Docx => "docx",
        }
    }
}

/// Turns raw file bytes into plain text.
pub trait Decoder: Send + Sync {
    fn decode(&self, bytes: &[u8]) -> std::result::Result<String, DecodeError>;
}

/// UTF-8 text; invalid sequences become U+FFFD.
pub struct TextDecoder;

impl Decoder for TextDecoder {
    fn decode(&self, bytes: &[u8]) -> std::result::Result<String, DecodeError> {
        Ok(String::from_utf8_lossy(bytes).into_owned())
    }
}

/// Decoders by format. Only plain text is built in; PDF and Word extraction
/// are registered by the embedding application.
pub struct DecoderRegistry {
    decoders: HashMap<FileFormat, Box<dyn Decoder>>,
}

impl Default for DecoderRegistry {
    fn default() -> Self {
        let mut registry = Self::empty();
        registry.register(FileFormat::Text, TextDecoder);
        registry
    }
}

impl DecoderRegistry {
    pub fn new() -> Self { Self::default() }

    pub fn empty() -> Self {
        Self { decoders: HashMap::new() }
    }

    pub fn register<D: Decoder + 'static>(&mut self, format: FileFormat, decoder: D) {
        self.decoders.insert(format, Box::new(decoder));
    }

    pub fn supports(&self, name: &str) -> bool {
        FileFormat::from_name(name).is_ok_and(|f| self.decoders.contains_key(&f))
    }

    /// Decode the contents of the file called `name`.
    pub fn decode(&self, name: &str, bytes: &[u8]) -> Result<String> {
        let format = FileFormat::from_name(name)?;
        let decoder = self
            .decoders
            .get(&format)
            .ok_or_else(|| Error::UnsupportedFormat(name.to_string()))?;
        decoder
            .decode(bytes)
            .map_err(|source| Error::DecodeFailure { name: name.to_string(), source })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Broken;

    impl Decoder for Broken {
        fn decode(&self, _: &[u8]) -> std::result::Result<String, DecodeError> {
            Err("not a pdf".into())
        }
    }

    #[test]
    fn format_from_extension() {
        assert_eq!(FileFormat::from_name("notes.TXT").unwrap(), FileFormat::Text);
        assert_eq!(FileFormat::from_name("dir/report.pdf").unwrap(), FileFormat::Pdf);
        assert_eq!(FileFormat::from_name("cv.docx").unwrap(), FileFormat::Docx);
        assert!(matches!(FileFormat::from_name("image.png"), Err(Error::UnsupportedFormat(_))));
        assert!(matches!(FileFormat::from_name("README"), Err(Error::UnsupportedFormat(_))));
    }

    #[test]
    fn text_is_decoded_lossily() {
        let registry = DecoderRegistry::new();
        assert_eq!(registry.decode("a.txt", b"hello").unwrap(), "hello");
        assert_eq!(registry.decode("a.txt", &[b'o', b'k', 0xff]).unwrap(), "ok\u{fffd}");
    }

    #[test]
    fn unregistered_format_is_unsupported() {
        let registry = DecoderRegistry::new();
        assert!(!registry.supports("a.pdf"));
        assert!(matches!(registry.decode("a.pdf", b"%PDF"), Err(Error::UnsupportedFormat(n)) if n == "a.pdf"));
    }

    #[test]
    fn decoder_errors_name_the_file() {
        let mut registry = DecoderRegistry::new();
        registry.register(FileFormat::Pdf, Broken);
        assert!(registry.supports("a.pdf"));
        match registry.decode("a.pdf", b"junk") {
            Err(err @ Error::DecodeFailure { .. }) => {
                assert_eq!(err.to_string(), "failed to decode a.pdf: not a pdf");
                let source = std::error::Error::source(&err).expect("decoder error kept as source");
                assert_eq!(source.to_string(), "not a pdf");
            }
            other => panic!("unexpected {other:?}"),
        }
    }
}
