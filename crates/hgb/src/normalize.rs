//! Canonical comparison keys of dossier titles.
//!
//! Titles of the land register are typed by hand and vary in case,
//! spacing and abbreviations ("Petersgraben Th. v. 20 n. 18" and
//! "Petersgraben Theil von 20 neben 18" denote the same thing). The
//! [normalize] function maps such variants onto a common key:
//!
//! * the title is composed to Unicode NFC and lower-cased,
//! * `ß` is written as `ss`,
//! * `,` and `/` become tokens of their own,
//! * known abbreviations are expanded (see [expand]),
//! * remaining punctuation is removed and whitespace collapsed.
//!
//! The function is idempotent: applying it to a key returns the key.

use unicode_normalization::UnicodeNormalization;

/// Expands a single (lower-case) token, if it is a known
/// abbreviation. None of the expansions is an abbreviation itself.
#[inline]
pub fn expand(token: &str) -> Option<&'static str> {
    match token {
        "th" | "th." | "t." | "tv." | "tl." | "thl." => Some("theil"),
        "v" | "v." => Some("von"),
        "n." => Some("neben"),
        "u." => Some("und"),
        "str." => Some("strasse"),
        "g." => Some("gasse"),
        _ => None,
    }
}

#[derive(Debug, PartialEq)]
enum Token {
    Word(String),
    Comma,
    Slash,
}

fn tokenize(s: &str) -> Vec<Token> {
    let mut tokens = vec![];

    for chunk in s.split_whitespace() {
        let mut word = String::new();

        for c in chunk.chars() {
            match c {
                ',' | ';' | '/' => {
                    if !word.is_empty() {
                        tokens.push(Token::Word(std::mem::take(
                            &mut word,
                        )));
                    }

                    tokens.push(if c == '/' {
                        Token::Slash
                    } else {
                        Token::Comma
                    });
                }
                _ => word.push(c),
            }
        }

        if !word.is_empty() {
            tokens.push(Token::Word(word));
        }
    }

    tokens
}

/// Removes punctuation from a word, keeping inner hyphens.
fn clean(word: &str) -> String {
    let word: String = word
        .chars()
        .filter(|c| c.is_alphanumeric() || *c == '-')
        .collect();

    word.trim_matches('-').to_string()
}

/// Returns the normalized comparison key of a title.
pub fn normalize(title: &str) -> String {
    let lower = title.to_lowercase().replace('ß', "ss");
    let lower = lower.nfc().collect::<String>();

    let mut out = String::with_capacity(lower.len());
    for token in tokenize(&lower) {
        match token {
            Token::Comma => {
                if !out.is_empty() && !out.ends_with(',') {
                    out.push(',');
                }
            }
            Token::Slash => {
                if !out.is_empty() && !out.ends_with('/') {
                    out.push('/');
                }
            }
            Token::Word(word) => {
                let word = match expand(&word) {
                    Some(expanded) => expanded.to_string(),
                    None => {
                        let word = clean(&word);
                        expand(&word).map(str::to_string).unwrap_or(word)
                    }
                };

                if word.is_empty() {
                    continue;
                }

                if !out.is_empty() && !out.ends_with('/') {
                    out.push(' ');
                }

                out.push_str(&word);
            }
        }
    }

    out.trim_end_matches([',', '/']).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_case_and_whitespace() {
        assert_eq!(normalize("  Eisengasse   21 "), "eisengasse 21");
        assert_eq!(normalize("EISENGASSE 21"), "eisengasse 21");
        assert_eq!(normalize("Eisengasse\t21"), normalize("eisengasse 21"));
    }

    #[test]
    fn normalize_abbreviations() {
        assert_eq!(
            normalize("Petersgraben Th. v. 20 n. 18"),
            "petersgraben theil von 20 neben 18"
        );
        assert_eq!(
            normalize("Petersgraben Theil von 20 neben 18"),
            "petersgraben theil von 20 neben 18"
        );
        assert_eq!(normalize("Spalen Tv. 3"), "spalen theil 3");
        assert_eq!(normalize("Freie Str. 5"), "freie strasse 5");
    }

    #[test]
    fn normalize_separators() {
        assert_eq!(normalize("Gerbergasse 34/ 36"), "gerbergasse 34/36");
        assert_eq!(normalize("Gerbergasse 34 / 36"), "gerbergasse 34/36");
        assert_eq!(normalize("Eisengasse 64,66"), "eisengasse 64, 66");
        assert_eq!(normalize("Eisengasse 64 , 66"), "eisengasse 64, 66");
        assert_eq!(normalize("Rheinsprung 7."), "rheinsprung 7");
    }

    #[test]
    fn normalize_umlauts() {
        assert_eq!(normalize("Münsterplatz 1"), "münsterplatz 1");
        assert_eq!(
            normalize("Mu\u{0308}nsterplatz 1"),
            normalize("Münsterplatz 1")
        );
        assert_eq!(normalize("Große Gasse"), "grosse gasse");
    }

    #[test]
    fn normalize_idempotent() {
        let titles = [
            "Petersgraben Th. v. 20 n. 18",
            "Gerbergasse 34/ 36",
            "Eisengasse 64, 66 u. 68",
            "St. Johanns-Vorstadt 3",
            "Marktplatz Theil von Th. v. 9",
            "Eisengasse Bank vor 26",
            " , / ",
            "",
            "Blumenrain 11 a.",
            "Spalenberg 12/, 14",
            "Hutgasse (Th) 4",
        ];

        for title in titles {
            let key = normalize(title);
            assert_eq!(normalize(&key), key, "title = {title:?}");
        }
    }

    #[test]
    fn normalize_empty() {
        assert_eq!(normalize(""), "");
        assert_eq!(normalize(" . , / "), "");
    }
}
