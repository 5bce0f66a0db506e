/// Lowercases a byte using simple ASCII case folding: `A`-`Z` map to
/// `a`-`z`, every other byte (including extended Windows-1252 characters)
/// passes through unchanged. This is the folding used to build path lookup
/// keys, deliberately narrower than Unicode case folding.
pub fn ascii_fold_lower(byte: u8) -> u8 {
    if byte.is_ascii_uppercase() {
        byte + (b'a' - b'A')
    } else {
        byte
    }
}

/// Applies [`ascii_fold_lower`] to every byte of `s`, returning a new
/// `String`.
///
/// Folds on the raw byte slice rather than `char`s: casting a folded byte
/// straight to `char` would reinterpret bytes above 0x7f as Latin-1
/// codepoints and re-encode them as multi-byte UTF-8, corrupting any
/// extended character `s` contains.
pub fn ascii_fold_lower_str(s: &str) -> String {
    let bytes: Vec<u8> = s.bytes().map(ascii_fold_lower).collect();
    String::from_utf8(bytes).expect("ASCII-range folding preserves UTF-8 validity")
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_ascii_fold_lower_basic() {
        assert_eq!(ascii_fold_lower(b'A'), b'a');
        assert_eq!(ascii_fold_lower(b'Z'), b'z');
        assert_eq!(ascii_fold_lower(b'a'), b'a');
        assert_eq!(ascii_fold_lower(b'9'), b'9');
    }

    #[test]
    fn test_ascii_fold_lower_leaves_extended_bytes_alone() {
        assert_eq!(ascii_fold_lower(0xDF), 0xDF);
    }

    #[test]
    fn test_ascii_fold_lower_str() {
        assert_eq!(
            ascii_fold_lower_str("\\Media\\Video.WMV"),
            "\\media\\video.wmv"
        );
    }

    #[test]
    fn test_ascii_fold_lower_str_preserves_extended_utf8() {
        assert_eq!(ascii_fold_lower_str("CAFÉ.TXT"), "cafÉ.txt");
    }
}
