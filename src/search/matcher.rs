use crate::types::MatchMode;

/// Word characters for whole-word boundaries.
pub fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

/// One output char per input char so offsets line up between the original and folded text.
/// Whitespace of any kind becomes a plain space so phrases match across line breaks.
pub fn fold_chars(text: &str, case_sensitive: bool) -> Vec<char> {
    text.chars()
        .map(|c| {
            if c.is_whitespace() {
                ' '
            } else if case_sensitive {
                c
            } else {
                c.to_lowercase().next().unwrap_or(c)
            }
        })
        .collect()
}

pub fn is_whole_word(haystack: &[char], start: usize, len: usize) -> bool {
    let before_ok = start == 0 || !is_word_char(haystack[start - 1]);
    let end = start + len;
    let after_ok = end >= haystack.len() || !is_word_char(haystack[end]);
    before_ok && after_ok
}

/// Start offsets of non-overlapping occurrences of `needle`, scanning left to right.
pub fn find_occurrences(haystack: &[char], needle: &[char], mode: MatchMode) -> Vec<usize> {
    let mut hits = Vec::new();
    let n = needle.len();
    if n == 0 || n > haystack.len() {
        return hits;
    }

    let mut i = 0;
    while i + n <= haystack.len() {
        if haystack[i..i + n] == *needle
            && (mode == MatchMode::Substring || is_whole_word(haystack, i, n))
        {
            hits.push(i);
            i += n;
        } else {
            i += 1;
        }
    }
    hits
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chars(s: &str) -> Vec<char> {
        s.chars().collect()
    }

    #[test]
    fn substring_and_whole_word() {
        let hay = fold_chars("Cat catalog, the cat_s and CAT.", false);
        let needle = chars("cat");
        assert_eq!(find_occurrences(&hay, &needle, MatchMode::Substring), vec![0, 4, 17, 27]);
        assert_eq!(find_occurrences(&hay, &needle, MatchMode::WholeWord), vec![0, 27]);
    }

    #[test]
    fn folding_keeps_offsets_aligned() {
        let text = "Straße İstanbul\nnext";
        let folded = fold_chars(text, false);
        assert_eq!(folded.len(), text.chars().count());
        assert_eq!(folded[7], 'i');
        assert_eq!(folded[15], ' ');
    }

    #[test]
    fn occurrences_do_not_overlap() {
        let hay = chars("aaaa");
        assert_eq!(find_occurrences(&hay, &chars("aa"), MatchMode::Substring), vec![0, 2]);
    }

    #[test]
    fn empty_or_long_needles_never_match() {
        let hay = chars("abc");
        assert!(find_occurrences(&hay, &[], MatchMode::Substring).is_empty());
        assert!(find_occurrences(&hay, &chars("abcd"), MatchMode::Substring).is_empty());
    }
}
