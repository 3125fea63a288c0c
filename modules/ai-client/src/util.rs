/// The first `max_chars` characters of `s`, cut on a character boundary.
pub fn take_chars(s: &str, max_chars: usize) -> &str {
    match s.char_indices().nth(max_chars) {
        Some((end, _)) => &s[..end],
        None => s,
    }
}

/// Prompt asking an assistant to research `keyword`, localized for Japanese.
pub fn search_prompt(keyword: &str, lang: &str) -> String {
    if lang == "ja" {
        format!("「{keyword}」について、最新の情報を検索して詳しく教えてください。")
    } else {
        format!("Search the web for up-to-date information about \"{keyword}\" and summarize what you find, citing your sources.")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn take_chars_counts_characters_not_bytes() {
        let text = "天気予報です";
        assert_eq!(take_chars(text, 2), "天気");
    }

    #[test]
    fn take_chars_within_bounds() {
        assert_eq!(take_chars("Hello", 100), "Hello");
        assert_eq!(take_chars("", 3), "");
    }

    #[test]
    fn prompt_is_localized() {
        assert!(search_prompt("天気", "ja").contains("「天気」"));
        assert!(search_prompt("weather", "en").contains("\"weather\""));
    }
}
