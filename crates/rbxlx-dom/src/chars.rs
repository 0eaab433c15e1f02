/// Whether `ch` matches the XML 1.0 `Char` production. Everything else,
/// including most C0 controls, cannot appear in a document even inside CDATA
/// or as a character reference.
pub fn is_xml_char(ch: char) -> bool {
    matches!(
        ch,
        '\t' | '\n' | '\r' | '\u{20}'..='\u{D7FF}' | '\u{E000}'..='\u{FFFD}' | '\u{10000}'..='\u{10FFFF}'
    )
}

/// Byte offset and value of the first character XML cannot carry.
pub fn find_invalid_char(text: &str) -> Option<(usize, char)> {
    text.char_indices().find(|(_, ch)| !is_xml_char(*ch))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_whitespace_and_printable_text() {
        assert_eq!(find_invalid_char("local a = 1\r\n\treturn 'ü✓'"), None);
    }

    #[test]
    fn reports_first_control_character() {
        assert_eq!(
            find_invalid_char("print(\"\u{1b}[31mred\")\u{c}"),
            Some((7, '\u{1b}'))
        );
        assert_eq!(find_invalid_char("\u{0}"), Some((0, '\u{0}')));
    }

    #[test]
    fn rejects_non_characters() {
        assert!(!is_xml_char('\u{FFFE}'));
        assert!(!is_xml_char('\u{FFFF}'));
        assert!(is_xml_char('\u{10FFFF}'));
    }
}
