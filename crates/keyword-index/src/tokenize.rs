/// Lower-case, split on non-alphanumeric, additionally split identifier
/// words at camelCase boundaries and underscores (`getUserById` →
/// `get`,`user`,`by`,`id`). Tokens shorter than two characters are dropped.
#[must_use]
pub fn tokenize(text: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    for word in text.split(|c: char| !c.is_alphanumeric()) {
        if word.is_empty() {
            continue;
        }
        for piece in split_camel_and_snake(word) {
            let lower = piece.to_lowercase();
            if lower.chars().count() >= 2 {
                tokens.push(lower);
            }
        }
    }
    tokens
}

fn split_camel_and_snake(word: &str) -> Vec<String> {
    // Underscores already act as hard splits via the non-alphanumeric
    // split in `tokenize`, so this only needs to handle camelCase runs.
    let mut pieces = Vec::new();
    let mut current = String::new();
    let chars: Vec<char> = word.chars().collect();

    for (i, &c) in chars.iter().enumerate() {
        let boundary = i > 0
            && ((c.is_uppercase() && chars[i - 1].is_lowercase())
                || (c.is_uppercase()
                    && i + 1 < chars.len()
                    && chars[i + 1].is_lowercase()
                    && chars[i - 1].is_uppercase()));
        if boundary && !current.is_empty() {
            pieces.push(std::mem::take(&mut current));
        }
        current.push(c);
    }
    if !current.is_empty() {
        pieces.push(current);
    }
    pieces
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_camel_case() {
        assert_eq!(
            tokenize("getUserById"),
            vec!["get", "user", "by", "id"]
        );
    }

    #[test]
    fn splits_snake_case_and_lowercases() {
        assert_eq!(tokenize("fetch_account_Identifier"), vec!["fetch", "account", "identifier"]);
    }

    #[test]
    fn drops_tokens_shorter_than_two_chars() {
        assert_eq!(tokenize("a b cd"), vec!["cd"]);
    }

    #[test]
    fn splits_on_punctuation() {
        assert_eq!(tokenize("foo.bar()"), vec!["foo", "bar"]);
    }
}
