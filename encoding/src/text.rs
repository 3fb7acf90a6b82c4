//! This module contains reusable components for encoding and decoding text in DICOM
//! data structures, including support for character repertoires.
//!
//! The character sets supported are enumerated by [`Encoding`].
//! A data set declares its character set in the
//! Specific Character Set (0008,0005) attribute,
//! as one or more defined terms.
//! When more than one term is declared,
//! values may switch between character sets with ISO 2022 escape sequences
//! ("code extensions"),
//! which are honored by [`convert_to_utf8`] for the most common designations.

use encoding::all::{
    GB18030, GBK, ISO_2022_JP, ISO_8859_1, ISO_8859_2, ISO_8859_3, ISO_8859_4, ISO_8859_5,
    ISO_8859_6, ISO_8859_7, ISO_8859_8, WINDOWS_1254, WINDOWS_31J, WINDOWS_874, WINDOWS_949,
};
use encoding::{DecoderTrap, EncoderTrap, EncodingRef};
use snafu::{Backtrace, Snafu};
use std::fmt;
use std::str::FromStr;

/// The escape character which starts an ISO 2022 escape sequence.
const ESC: u8 = 0x1B;

/// Error type for an unrecognized encoding name.
#[derive(Debug, Snafu)]
#[snafu(display("Unknown text encoding `{}`", name))]
pub struct UnknownEncodingError {
    name: String,
    backtrace: Backtrace,
}

/// An enum type for all supported character sets.
#[derive(Debug, Copy, Clone, Eq, Hash, PartialEq, PartialOrd, Ord)]
pub enum Encoding {
    /// **ISO-IR 6**: the default character repertoire.
    Ascii,
    /// **ISO-IR 192**: Unicode in UTF-8.
    Utf8,
    /// **ISO-IR 100** (ISO-8859-1): Latin alphabet no. 1, Western Europe.
    Latin1,
    /// **ISO-IR 101** (ISO-8859-2): Latin alphabet no. 2, Central/Eastern Europe.
    Latin2,
    /// **ISO-IR 109** (ISO-8859-3): Latin alphabet no. 3, South Europe.
    Latin3,
    /// **ISO-IR 110** (ISO-8859-4): Latin alphabet no. 4, North Europe.
    Latin4,
    /// **ISO-IR 148** (ISO-8859-9): Latin alphabet no. 5, Turkish.
    Latin5,
    /// **ISO-IR 144** (ISO-8859-5): Latin/Cyrillic.
    Cyrillic,
    /// **ISO-IR 127** (ISO-8859-6): Latin/Arabic.
    Arabic,
    /// **ISO-IR 126** (ISO-8859-7): Latin/Greek.
    Greek,
    /// **ISO-IR 138** (ISO-8859-8): Latin/Hebrew.
    Hebrew,
    /// **ISO-IR 166** (TIS 620-2533): Thai.
    Thai,
    /// **ISO-IR 13** (JIS X 0201): Japanese katakana and romaji.
    Japanese,
    /// **ISO 2022 IR 87** (JIS X 0208): Japanese kanji.
    JapaneseKanji,
    /// **ISO 2022 IR 149** (KS X 1001): Korean.
    Korean,
    /// **GB18030**: Chinese.
    Chinese,
    /// **ISO 2022 IR 58** (GB 2312): Simplified Chinese.
    SimplifiedChinese,
}

impl Encoding {
    /// All supported encodings.
    pub const ALL: [Encoding; 17] = [
        Encoding::Ascii,
        Encoding::Utf8,
        Encoding::Latin1,
        Encoding::Latin2,
        Encoding::Latin3,
        Encoding::Latin4,
        Encoding::Latin5,
        Encoding::Cyrillic,
        Encoding::Arabic,
        Encoding::Greek,
        Encoding::Hebrew,
        Encoding::Thai,
        Encoding::Japanese,
        Encoding::JapaneseKanji,
        Encoding::Korean,
        Encoding::Chinese,
        Encoding::SimplifiedChinese,
    ];

    /// Obtain the encoding identified by a single defined term
    /// of the Specific Character Set (0008,0005) attribute.
    ///
    /// ```
    /// # use dcmbridge_encoding::text::Encoding;
    /// assert_eq!(Encoding::from_defined_term("ISO_IR 100"), Some(Encoding::Latin1));
    /// assert_eq!(Encoding::from_defined_term("ISO 2022 IR 100"), Some(Encoding::Latin1));
    /// assert_eq!(Encoding::from_defined_term("ISO_IR 999"), None);
    /// ```
    pub fn from_defined_term(term: &str) -> Option<Self> {
        use self::Encoding::*;
        match term.trim() {
            "ISO_IR 6" | "ISO_IR_6" | "ISO 2022 IR 6" => Some(Ascii),
            "ISO_IR 192" | "ISO_IR_192" => Some(Utf8),
            "ISO_IR 100" | "ISO_IR_100" | "ISO 2022 IR 100" => Some(Latin1),
            "ISO_IR 101" | "ISO_IR_101" | "ISO 2022 IR 101" => Some(Latin2),
            "ISO_IR 109" | "ISO_IR_109" | "ISO 2022 IR 109" => Some(Latin3),
            "ISO_IR 110" | "ISO_IR_110" | "ISO 2022 IR 110" => Some(Latin4),
            "ISO_IR 148" | "ISO_IR_148" | "ISO 2022 IR 148" => Some(Latin5),
            "ISO_IR 144" | "ISO_IR_144" | "ISO 2022 IR 144" => Some(Cyrillic),
            "ISO_IR 127" | "ISO_IR_127" | "ISO 2022 IR 127" => Some(Arabic),
            "ISO_IR 126" | "ISO_IR_126" | "ISO 2022 IR 126" => Some(Greek),
            "ISO_IR 138" | "ISO_IR_138" | "ISO 2022 IR 138" => Some(Hebrew),
            "ISO_IR 166" | "ISO_IR_166" | "ISO 2022 IR 166" => Some(Thai),
            "ISO_IR 13" | "ISO_IR_13" | "ISO 2022 IR 13" => Some(Japanese),
            "ISO 2022 IR 87" => Some(JapaneseKanji),
            "ISO 2022 IR 149" => Some(Korean),
            "GB18030" => Some(Chinese),
            "GBK" | "ISO 2022 IR 58" => Some(SimplifiedChinese),
            _ => None,
        }
    }

    /// Obtain the defined term to declare this encoding
    /// in the Specific Character Set (0008,0005) attribute.
    pub fn defined_term(self) -> &'static str {
        use self::Encoding::*;
        match self {
            Ascii => "ISO_IR 6",
            Utf8 => "ISO_IR 192",
            Latin1 => "ISO_IR 100",
            Latin2 => "ISO_IR 101",
            Latin3 => "ISO_IR 109",
            Latin4 => "ISO_IR 110",
            Latin5 => "ISO_IR 148",
            Cyrillic => "ISO_IR 144",
            Arabic => "ISO_IR 127",
            Greek => "ISO_IR 126",
            Hebrew => "ISO_IR 138",
            Thai => "ISO_IR 166",
            Japanese => "ISO_IR 13",
            JapaneseKanji => "ISO 2022 IR 87",
            Korean => "ISO 2022 IR 149",
            Chinese => "GB18030",
            SimplifiedChinese => "ISO 2022 IR 58",
        }
    }

    /// The canonical name of the encoding, as accepted by `FromStr`.
    pub fn name(self) -> &'static str {
        use self::Encoding::*;
        match self {
            Ascii => "Ascii",
            Utf8 => "Utf8",
            Latin1 => "Latin1",
            Latin2 => "Latin2",
            Latin3 => "Latin3",
            Latin4 => "Latin4",
            Latin5 => "Latin5",
            Cyrillic => "Cyrillic",
            Arabic => "Arabic",
            Greek => "Greek",
            Hebrew => "Hebrew",
            Thai => "Thai",
            Japanese => "Japanese",
            JapaneseKanji => "JapaneseKanji",
            Korean => "Korean",
            Chinese => "Chinese",
            SimplifiedChinese => "SimplifiedChinese",
        }
    }

    /// The codec for single-byte and multi-byte character sets.
    /// ASCII and UTF-8 are handled directly.
    fn codec(self) -> Option<EncodingRef> {
        use self::Encoding::*;
        let codec: EncodingRef = match self {
            Ascii | Utf8 => return None,
            Latin1 => ISO_8859_1,
            Latin2 => ISO_8859_2,
            Latin3 => ISO_8859_3,
            Latin4 => ISO_8859_4,
            Latin5 => WINDOWS_1254,
            Cyrillic => ISO_8859_5,
            Arabic => ISO_8859_6,
            Greek => ISO_8859_7,
            Hebrew => ISO_8859_8,
            Thai => WINDOWS_874,
            Japanese => WINDOWS_31J,
            JapaneseKanji => ISO_2022_JP,
            Korean => WINDOWS_949,
            Chinese => GB18030,
            SimplifiedChinese => GBK,
        };
        Some(codec)
    }

    /// Decode raw text in this encoding.
    ///
    /// Decoding never fails:
    /// invalid sequences are replaced,
    /// and in ASCII every byte outside the printable range
    /// (other than tabs, line breaks, form feeds and escapes) is dropped.
    pub fn decode(self, text: &[u8]) -> String {
        match self {
            Encoding::Ascii => text
                .iter()
                .filter(|b| is_kept_ascii(**b))
                .map(|b| char::from(*b))
                .collect(),
            Encoding::Utf8 => String::from_utf8_lossy(text).into_owned(),
            _ => match self.codec() {
                Some(codec) => codec
                    .decode(text, DecoderTrap::Replace)
                    .unwrap_or_else(|_| String::from_utf8_lossy(text).into_owned()),
                None => String::from_utf8_lossy(text).into_owned(),
            },
        }
    }

    /// Encode text into this encoding.
    ///
    /// Characters which the encoding cannot represent are skipped.
    pub fn encode(self, text: &str) -> Vec<u8> {
        match self {
            Encoding::Ascii => text
                .chars()
                .filter(|c| c.is_ascii() && is_kept_ascii(*c as u8))
                .map(|c| c as u8)
                .collect(),
            Encoding::Utf8 => text.as_bytes().to_vec(),
            _ => match self.codec() {
                Some(codec) => codec
                    .encode(text, EncoderTrap::Ignore)
                    .unwrap_or_else(|_| Encoding::Ascii.encode(text)),
                None => text.as_bytes().to_vec(),
            },
        }
    }
}

impl fmt::Display for Encoding {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Parse an encoding from its canonical name, such as `Latin1` or `Utf8`.
impl FromStr for Encoding {
    type Err = UnknownEncodingError;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        Encoding::ALL
            .iter()
            .copied()
            .find(|e| e.name() == name)
            .ok_or_else(|| UnknownEncodingSnafu { name }.build())
    }
}

fn is_kept_ascii(b: u8) -> bool {
    matches!(b, 0x20..=0x7E | b'\t' | b'\n' | b'\r' | 0x0C | ESC)
}

/// Decode raw text in the given encoding into UTF-8.
///
/// With code extensions,
/// ISO 2022 escape sequences in the text switch the character set
/// used for the bytes that follow them.
/// The initial character set is restored at each value delimiter.
pub fn convert_to_utf8(text: &[u8], encoding: Encoding, has_code_extensions: bool) -> String {
    if has_code_extensions && text.contains(&ESC) {
        decode_with_escapes(text, encoding)
    } else {
        encoding.decode(text)
    }
}

/// Encode UTF-8 text into the given encoding.
pub fn convert_from_utf8(text: &str, encoding: Encoding) -> Vec<u8> {
    encoding.encode(text)
}

/// A character set designated by an escape sequence.
#[derive(Debug, Copy, Clone, PartialEq)]
enum Designation {
    /// Decode with this encoding.
    Plain(Encoding),
    /// Decode with this encoding, keeping the escape sequence
    /// since the codec interprets it.
    WithEscape(Encoding),
}

fn designation(escape: &[u8]) -> Option<Designation> {
    use self::Designation::*;
    use self::Encoding::*;
    let d = match escape {
        b"(B" | b"(J" => Plain(Ascii),
        b")I" => Plain(Japanese),
        b"$B" | b"$@" => WithEscape(JapaneseKanji),
        b"$)C" => Plain(Korean),
        b"$)A" => Plain(SimplifiedChinese),
        b"-A" => Plain(Latin1),
        b"-B" => Plain(Latin2),
        b"-C" => Plain(Latin3),
        b"-D" => Plain(Latin4),
        b"-M" => Plain(Latin5),
        b"-L" => Plain(Cyrillic),
        b"-G" => Plain(Arabic),
        b"-F" => Plain(Greek),
        b"-H" => Plain(Hebrew),
        b"-T" => Plain(Thai),
        _ => return None,
    };
    Some(d)
}

fn decode_segment(out: &mut String, segment: &[u8], escape: &[u8], designation: Designation) {
    if segment.is_empty() {
        return;
    }
    match designation {
        Designation::Plain(encoding) => out.push_str(&encoding.decode(segment)),
        Designation::WithEscape(encoding) => {
            let mut buf = Vec::with_capacity(escape.len() + 1 + segment.len());
            buf.push(ESC);
            buf.extend_from_slice(escape);
            buf.extend_from_slice(segment);
            out.push_str(&encoding.decode(&buf));
        }
    }
}

fn decode_with_escapes(text: &[u8], initial: Encoding) -> String {
    let mut out = String::with_capacity(text.len());
    let mut current = Designation::Plain(initial);
    let mut escape: &[u8] = &[];
    let mut start = 0;
    let mut i = 0;
    while i < text.len() {
        match text[i] {
            ESC => {
                decode_segment(&mut out, &text[start..i], escape, current);
                // intermediate bytes, then one final byte
                let mut end = i + 1;
                while end < text.len() && (0x20..=0x2F).contains(&text[end]) {
                    end += 1;
                }
                let end = (end + 1).min(text.len());
                escape = &text[i + 1..end];
                if let Some(d) = designation(escape) {
                    current = d;
                }
                i = end;
                start = end;
            }
            b'\\' | b'\r' | b'\n' => {
                decode_segment(&mut out, &text[start..i], escape, current);
                out.push(char::from(text[i]));
                current = Designation::Plain(initial);
                escape = &[];
                i += 1;
                start = i;
            }
            _ => i += 1,
        }
    }
    decode_segment(&mut out, &text[start..], escape, current);
    out
}

/// The result of a text validation procedure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum TextValidationOutcome {
    /// The text is fully valid and can be safely decoded.
    Ok,
    /// The text cannot be decoded.
    NotOk,
}

/// Check whether the given byte slice contains only valid characters for a
/// Date value representation, including date ranges.
pub fn validate_da(text: &[u8]) -> TextValidationOutcome {
    if text.iter().cloned().all(|c| match c {
        b'\\' | b'.' | b'-' | b' ' => true,
        c => c.is_ascii_digit(),
    }) {
        TextValidationOutcome::Ok
    } else {
        TextValidationOutcome::NotOk
    }
}

/// Check whether the given byte slice contains only valid characters for a
/// Time value representation.
pub fn validate_tm(text: &[u8]) -> TextValidationOutcome {
    if text.iter().cloned().all(|c| match c {
        b'\\' | b'.' | b'-' | b' ' | b':' => true,
        c => c.is_ascii_digit(),
    }) {
        TextValidationOutcome::Ok
    } else {
        TextValidationOutcome::NotOk
    }
}

/// Check whether the given byte slice contains only valid characters for a
/// Date Time value representation.
pub fn validate_dt(text: &[u8]) -> TextValidationOutcome {
    if text.iter().cloned().all(|c| match c {
        b'.' | b'-' | b'+' | b' ' | b'\\' => true,
        c => c.is_ascii_digit(),
    }) {
        TextValidationOutcome::Ok
    } else {
        TextValidationOutcome::NotOk
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_codec(encoding: Encoding, string: &str, bytes: &[u8]) {
        assert_eq!(encoding.encode(string), bytes);
        assert_eq!(encoding.decode(bytes), string);
    }

    #[test]
    fn iso_ir_6_baseline() {
        test_codec(Encoding::Ascii, "Smith^John", b"Smith^John");
    }

    #[test]
    fn ascii_strips_other_characters() {
        assert_eq!(Encoding::Ascii.decode(b"Sim\xF5es^Jo\x00ao"), "Simes^Joao");
        assert_eq!(Encoding::Ascii.encode("Simões"), b"Simes");
        assert_eq!(Encoding::Ascii.decode(b"line\r\nbreak"), "line\r\nbreak");
    }

    #[test]
    fn iso_ir_192_baseline() {
        test_codec(Encoding::Utf8, "Simões^John", "Simões^John".as_bytes());
        test_codec(Encoding::Utf8, "Иванков^Андрей", "Иванков^Андрей".as_bytes());
    }

    #[test]
    fn iso_ir_100_baseline() {
        test_codec(Encoding::Latin1, "Simões^João", b"Sim\xF5es^Jo\xE3o");
        test_codec(Encoding::Latin1, "Günther^Hans", b"G\xfcnther^Hans");
        test_codec(Encoding::Latin1, "é", b"\xE9");
    }

    #[test]
    fn iso_ir_101_baseline() {
        test_codec(Encoding::Latin2, "Günther^Hans", b"G\xfcnther^Hans");
    }

    #[test]
    fn iso_ir_144_baseline() {
        test_codec(
            Encoding::Cyrillic,
            "Иванков^Андрей",
            b"\xb8\xd2\xd0\xdd\xda\xde\xd2^\xb0\xdd\xd4\xe0\xd5\xd9",
        );
    }

    #[test]
    fn iso_ir_126_baseline() {
        test_codec(Encoding::Greek, "Διονυσιος", b"\xc4\xe9\xef\xed\xf5\xf3\xe9\xef\xf2");
    }

    #[test]
    fn unrepresentable_characters_are_skipped() {
        assert_eq!(Encoding::Latin1.encode("a€b"), b"ab");
    }

    #[test]
    fn defined_terms_round_trip() {
        for encoding in Encoding::ALL {
            assert_eq!(
                Encoding::from_defined_term(encoding.defined_term()),
                Some(encoding)
            );
            assert_eq!(encoding.name().parse::<Encoding>().unwrap(), encoding);
        }
        assert!("Latin9".parse::<Encoding>().is_err());
    }

    #[test]
    fn code_extensions_switch_g1() {
        // ISO 2022 IR 100 with an explicit G1 designation
        let text = b"\x1b-AJos\xe9\\Ren\xe9";
        assert_eq!(convert_to_utf8(text, Encoding::Latin1, true), "José\\René");
    }

    #[test]
    fn code_extensions_japanese() {
        // Yamada^Tarou=山田^太郎 in ISO 2022 IR 87
        let text = b"Yamada^Tarou=\x1b$B;3ED\x1b(B^\x1b$BB@O:\x1b(B";
        assert_eq!(
            convert_to_utf8(text, Encoding::Ascii, true),
            "Yamada^Tarou=山田^太郎"
        );
    }

    #[test]
    fn code_extensions_korean() {
        // Hong^Gildong=洪^吉洞 in ISO 2022 IR 149
        let text = b"Hong^Gildong=\x1b$)C\xfb\xf3^\x1b$)C\xd1\xce\xd4\xd7";
        assert_eq!(convert_to_utf8(text, Encoding::Ascii, true), "Hong^Gildong=洪^吉洞");
    }

    #[test]
    fn escapes_without_code_extensions_are_kept() {
        let text = b"A\x1b-AB";
        assert_eq!(convert_to_utf8(text, Encoding::Latin1, false), "A\u{1b}-AB");
    }

    #[test]
    fn temporal_validation() {
        assert_eq!(validate_da(b"20240131"), TextValidationOutcome::Ok);
        assert_eq!(validate_da(b"20240101-20241231"), TextValidationOutcome::Ok);
        assert_eq!(validate_da(b"2024-Jan"), TextValidationOutcome::NotOk);
        assert_eq!(validate_tm(b"101010.5"), TextValidationOutcome::Ok);
        assert_eq!(validate_tm(b"noon"), TextValidationOutcome::NotOk);
        assert_eq!(validate_dt(b"20240131101010+0100"), TextValidationOutcome::Ok);
    }
}
