// src/search.rs

//! Case-insensitive matchers for recipe search

/// True iff `pattern`'s characters appear in `word`, in order
///
/// Matching ignores case and need not be contiguous; each character of
/// `word` is used at most once. An empty pattern always matches.
pub fn subsequence_match(word: &str, pattern: &str) -> bool {
    let mut wanted = pattern.chars().flat_map(char::to_lowercase).peekable();
    for c in word.chars().flat_map(char::to_lowercase) {
        match wanted.peek() {
            Some(&next) if next == c => {
                wanted.next();
            }
            Some(_) => {}
            None => break,
        }
    }
    wanted.peek().is_none()
}

/// True iff `pattern` occurs in `word`, ignoring case
pub fn substring_match(word: &str, pattern: &str) -> bool {
    word.to_lowercase().contains(&pattern.to_lowercase())
}

/// Query words that occur in at least one haystack entry, in query order
pub fn matching_words(haystack: &[String], words: &[String]) -> Vec<String> {
    words
        .iter()
        .filter(|word| haystack.iter().any(|entry| substring_match(entry, word)))
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_subsequence_match() {
        assert!(subsequence_match("Hello World!", "hwor"));
        assert!(subsequence_match("Hello World!", "HeWd"));
        assert!(!subsequence_match("Hello World!", "Good"));
        assert!(!subsequence_match("abc", "abcd"));
        assert!(!subsequence_match("ab", "aab"));
        assert!(subsequence_match("anything", ""));
    }

    #[test]
    fn test_substring_match() {
        assert!(substring_match("Hello World!", "hello"));
        assert!(substring_match("Hello World!", "Hello"));
        assert!(!substring_match("Hello World!", "HelloW"));
        assert!(substring_match("Hello World!", "O W"));
    }

    #[test]
    fn test_matching_words() {
        let haystack = vec![
            "ag: Grep like tool optimized for speed".to_string(),
            "vim: The classic mode based terminal editor.".to_string(),
        ];
        let words = vec!["vim".to_string(), "emacs".to_string(), "GREP".to_string()];
        assert_eq!(matching_words(&haystack, &words), vec!["vim", "GREP"]);
    }
}
