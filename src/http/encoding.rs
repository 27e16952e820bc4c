//! Response compression
//!
//! `Accept-Encoding` negotiation and gzip/brotli encoders for static files.

use flate2::write::GzEncoder;
use flate2::Compression;
use std::io::{self, Write};

/// Brotli quality used for on-the-fly compression (0-11)
const BROTLI_QUALITY: u32 = 5;
const BROTLI_WINDOW: u32 = 22;
const BROTLI_BUFFER: usize = 4096;

/// Content encodings the server can produce
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Encoding {
    Brotli,
    Gzip,
}

impl Encoding {
    /// `Content-Encoding` header value
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Brotli => "br",
            Self::Gzip => "gzip",
        }
    }

    /// Compress a complete body
    pub fn encode(self, data: &[u8]) -> io::Result<Vec<u8>> {
        match self {
            Self::Gzip => {
                let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
                encoder.write_all(data)?;
                encoder.finish()
            }
            Self::Brotli => {
                let mut writer = brotli::CompressorWriter::new(
                    Vec::new(),
                    BROTLI_BUFFER,
                    BROTLI_QUALITY,
                    BROTLI_WINDOW,
                );
                writer.write_all(data)?;
                // into_inner finishes the stream
                Ok(writer.into_inner())
            }
        }
    }
}

/// Parsed Accept-Encoding entry with quality value
#[derive(Debug, Clone, PartialEq)]
struct AcceptEncoding {
    coding: String,
    quality: f32,
}

impl AcceptEncoding {
    /// Parses an entry such as `gzip;q=0.8` or `br`
    fn parse(entry: &str) -> Option<Self> {
        let mut parts = entry.split(';');
        let coding = parts.next()?.trim().to_ascii_lowercase();
        if coding.is_empty() {
            return None;
        }

        let quality = parts
            .filter_map(|p| p.trim().strip_prefix("q="))
            .find_map(|q| q.trim().parse::<f32>().ok())
            .unwrap_or(1.0);

        Some(Self { coding, quality })
    }
}

/// Pick the encoding for a response
///
/// Brotli wins over gzip at equal quality when `allow_brotli` is set.
/// Entries with `q=0` are refused; `*` stands for any coding not listed.
pub fn negotiate(accept_encoding: Option<&str>, allow_brotli: bool) -> Option<Encoding> {
    let header = accept_encoding?;
    let entries: Vec<AcceptEncoding> = header.split(',').filter_map(AcceptEncoding::parse).collect();

    let quality_of = |name: &str| {
        entries
            .iter()
            .find(|e| e.coding == name)
            .or_else(|| entries.iter().find(|e| e.coding == "*"))
            .map_or(0.0, |e| e.quality)
    };

    let mut candidates = Vec::with_capacity(2);
    if allow_brotli {
        candidates.push((Encoding::Brotli, quality_of("br")));
    }
    candidates.push((Encoding::Gzip, quality_of("gzip")));

    // Stable max: earlier candidates win ties
    candidates
        .into_iter()
        .filter(|(_, q)| *q > 0.0)
        .fold(None, |best: Option<(Encoding, f32)>, (enc, q)| match best {
            Some((_, best_q)) if best_q >= q => best,
            _ => Some((enc, q)),
        })
        .map(|(enc, _)| enc)
}
