// Windows-1251 encoding of receipt text
//
// The printer runs a single-byte code page; everything outside it prints as
// '?'. Only the slice of cp1251 that receipts actually use is mapped: ASCII,
// the contiguous Cyrillic block and the Ukrainian/Belarusian letters that
// live in the punctuation area.

/// Encode one char; None when the code page has no slot for it.
pub fn encode_char(c: char) -> Option<u8> {
    let cp = c as u32;
    if cp < 0x80 {
        return Some(cp as u8);
    }
    // А..я is contiguous in cp1251
    if (0x0410..=0x044F).contains(&cp) {
        return Some((0xC0 + (cp - 0x0410)) as u8);
    }
    match c {
        'Ё' => Some(0xA8),
        'ё' => Some(0xB8),
        'Ґ' => Some(0xA5),
        'ґ' => Some(0xB4),
        'Є' => Some(0xAA),
        'є' => Some(0xBA),
        'І' => Some(0xB2),
        'і' => Some(0xB3),
        'Ї' => Some(0xAF),
        'ї' => Some(0xBF),
        'Ў' => Some(0xA1),
        'ў' => Some(0xA2),
        '№' => Some(0xB9),
        '«' => Some(0xAB),
        '»' => Some(0xBB),
        '–' => Some(0x96),
        '—' => Some(0x97),
        _ => None,
    }
}

/// Encode a string with '?' replacement for unmapped characters.
pub fn encode(s: &str) -> Vec<u8> {
    s.chars().map(|c| encode_char(c).unwrap_or(b'?')).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ascii_passes_through() {
        assert_eq!(encode("E1 - OK 32:35"), b"E1 - OK 32:35".to_vec());
    }

    #[test]
    fn cyrillic_block_is_contiguous() {
        assert_eq!(encode_char('А'), Some(0xC0));
        assert_eq!(encode_char('Я'), Some(0xDF));
        assert_eq!(encode_char('а'), Some(0xE0));
        assert_eq!(encode_char('я'), Some(0xFF));
    }

    #[test]
    fn ukrainian_letters_map_into_the_punctuation_area() {
        assert_eq!(encode("Їжак"), vec![0xAF, 0xE6, 0xE0, 0xEA]);
        assert_eq!(encode_char('і'), Some(0xB3));
        assert_eq!(encode_char('є'), Some(0xBA));
    }

    #[test]
    fn unmapped_chars_become_question_marks() {
        assert_eq!(encode("☃"), vec![b'?']);
        assert_eq!(encode("漢"), vec![b'?']);
    }
}
