use std::fmt::{self, Display};

use crate::normalize::normalize;

/// Words that, when following the street name, mark the title as a
/// special structure ("Eisengasse Bank vor 26"). The street of such a
/// title is its first word only.
const SPECIAL: [&str; 6] =
    ["vor", "unter", "bei", "alt", "abgebrochen", "innerhalb"];

/// The address of a dossier as given by its title.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Address {
    /// The (normalized) street name.
    pub street: String,

    /// The house numbers covered by the dossier.
    pub numbers: Vec<String>,

    /// Set if the dossier covers only a part of this house number
    /// ("Theil von 20").
    pub part_of: Option<String>,

    /// Remaining text of the title that isn't part of the address.
    pub postfix: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
enum Item<'a> {
    Number(&'a str),
    Word(&'a str),
    Sep,
}

#[inline]
fn is_number(s: &str) -> bool {
    let digits = s.chars().take_while(char::is_ascii_digit).count();
    digits > 0
        && s.len() - digits <= 1
        && s[digits..].chars().all(|c| c.is_ascii_lowercase())
}

fn lex(key: &str) -> Vec<Item<'_>> {
    let mut items = vec![];
    for chunk in key.split_whitespace() {
        let mut rest = chunk;
        while !rest.is_empty() {
            let end = rest.find([',', '/']).unwrap_or(rest.len());
            let piece = &rest[..end];

            if !piece.is_empty() {
                items.push(if is_number(piece) {
                    Item::Number(piece)
                } else {
                    Item::Word(piece)
                });
            }

            if end < rest.len() {
                items.push(Item::Sep);
                rest = &rest[end + 1..];
            } else {
                rest = "";
            }
        }
    }

    items
}

/// Parses a list of house numbers from the front of `items`. Single
/// letters following a number belong to the number ("11 a" → "11a").
/// Returns the numbers and the number of consumed items.
fn numbers(items: &[Item]) -> (Vec<String>, usize) {
    let mut result: Vec<String> = vec![];
    let mut pos = 0;

    while let Some(Item::Number(n)) = items.get(pos) {
        let mut number = n.to_string();
        pos += 1;

        if let Some(Item::Word(w)) = items.get(pos) {
            if w.len() == 1 && w.chars().all(|c| c.is_ascii_lowercase()) {
                number.push_str(w);
                pos += 1;
            }
        }

        if !result.contains(&number) {
            result.push(number);
        }

        match (items.get(pos), items.get(pos + 1)) {
            (Some(Item::Sep), Some(Item::Number(_))) => pos += 1,
            (Some(Item::Word("und")), Some(Item::Number(_))) => pos += 1,
            _ => break,
        }
    }

    (result, pos)
}

fn join(items: &[Item]) -> Option<String> {
    let mut out = String::new();
    for item in items {
        match item {
            Item::Sep => out.push(','),
            Item::Number(s) | Item::Word(s) => {
                if !out.is_empty() {
                    out.push(' ');
                }
                out.push_str(s);
            }
        }
    }

    let out = out.trim_matches([',', ' ']).to_string();
    if out.is_empty() { None } else { Some(out) }
}

impl Address {
    /// Parses the address of a raw dossier title.
    pub fn parse(title: &str) -> Self {
        Self::from_key(&normalize(title))
    }

    /// Parses the address of a normalized title.
    pub fn from_key(key: &str) -> Self {
        let items = lex(key);

        let pos = items
            .iter()
            .position(|item| {
                !matches!(item, Item::Word(w) if *w != "theil")
            })
            .unwrap_or(items.len());

        let words: Vec<&str> = items[..pos]
            .iter()
            .filter_map(|item| match item {
                Item::Word(w) => Some(*w),
                _ => None,
            })
            .collect();

        if words.iter().skip(1).any(|w| SPECIAL.contains(w)) {
            return Self {
                street: words[0].to_string(),
                postfix: join(&items[1..]),
                ..Default::default()
            };
        }

        let mut address = Self {
            street: words.join(" "),
            ..Default::default()
        };

        let rest = &items[pos..];
        match rest.first() {
            Some(Item::Number(_)) => {
                let (numbers, n) = numbers(rest);
                address.numbers = numbers;
                address.postfix = join(&rest[n..]);
            }
            Some(Item::Word("theil")) => {
                let mut skip = 0;
                while let Some(Item::Word(w)) = rest.get(skip) {
                    if *w == "theil" || *w == "von" {
                        skip += 1;
                    } else {
                        break;
                    }
                }

                let (mut numbers, n) = numbers(&rest[skip..]);
                let mut tail = &rest[skip + n..];

                // trailing numbers, e.g. "Theil von 3 neben 5 und 7"
                if let Some(idx) = tail
                    .iter()
                    .rposition(|item| *item == Item::Word("und"))
                {
                    let (more, m) = self::numbers(&tail[idx + 1..]);
                    if !more.is_empty() && idx + 1 + m == tail.len() {
                        for number in more {
                            if !numbers.contains(&number) {
                                numbers.push(number);
                            }
                        }
                        tail = &tail[..idx];
                    }
                }

                address.part_of = numbers.first().cloned();
                address.numbers = numbers;
                address.postfix = join(tail);
            }
            _ => {
                address.postfix = join(rest);
            }
        }

        address
    }

    /// Returns true if the dossier covers the given house number.
    #[inline]
    pub fn has_number(&self, number: &str) -> bool {
        self.numbers.iter().any(|n| n == number)
    }

    /// Returns true if the house numbers are equal to the given set,
    /// regardless of their order.
    pub fn has_numbers(&self, numbers: &[String]) -> bool {
        self.numbers.len() == numbers.len()
            && numbers.iter().all(|n| self.has_number(n))
    }
}

impl Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.street)?;
        if let Some(ref part_of) = self.part_of {
            write!(f, " theil von {part_of}")?;
            let rest: Vec<_> = self
                .numbers
                .iter()
                .filter(|n| *n != part_of)
                .cloned()
                .collect();
            if !rest.is_empty() {
                write!(f, " und {}", rest.join(", "))?;
            }
        } else if !self.numbers.is_empty() {
            write!(f, " {}", self.numbers.join(", "))?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn numbers(address: &Address) -> Vec<&str> {
        address.numbers.iter().map(String::as_str).collect()
    }

    #[test]
    fn parse_single_number() {
        let address = Address::parse("Eisengasse 21");
        assert_eq!(address.street, "eisengasse");
        assert_eq!(numbers(&address), vec!["21"]);
        assert_eq!(address.part_of, None);
        assert_eq!(address.postfix, None);
    }

    #[test]
    fn parse_number_lists() {
        let address = Address::parse("Eisengasse 64, 66");
        assert_eq!(numbers(&address), vec!["64", "66"]);

        let address = Address::parse("Gerbergasse 34/ 36");
        assert_eq!(numbers(&address), vec!["34", "36"]);

        let address = Address::parse("St. Johanns-Vorstadt 3 u. 5");
        assert_eq!(address.street, "st johanns-vorstadt");
        assert_eq!(numbers(&address), vec!["3", "5"]);
    }

    #[test]
    fn parse_letter_suffix() {
        let address = Address::parse("Blumenrain 11 a");
        assert_eq!(numbers(&address), vec!["11a"]);

        let address = Address::parse("Blumenrain 11a");
        assert_eq!(numbers(&address), vec!["11a"]);
    }

    #[test]
    fn parse_part_of() {
        let address = Address::parse("Petersgraben Th. v. 20 neben 18");
        assert_eq!(address.street, "petersgraben");
        assert_eq!(numbers(&address), vec!["20"]);
        assert_eq!(address.part_of.as_deref(), Some("20"));
        assert_eq!(address.postfix.as_deref(), Some("neben 18"));

        let address = Address::parse("Spalenberg Theil von 3 neben 5 u. 7");
        assert_eq!(numbers(&address), vec!["3", "7"]);
        assert_eq!(address.part_of.as_deref(), Some("3"));
        assert_eq!(address.postfix.as_deref(), Some("neben 5"));

        let address = Address::parse("Marktplatz Theil von Th. v. 9");
        assert_eq!(address.street, "marktplatz");
        assert_eq!(numbers(&address), vec!["9"]);
        assert_eq!(address.part_of.as_deref(), Some("9"));
    }

    #[test]
    fn parse_special_structure() {
        let address = Address::parse("Eisengasse Bank vor 26");
        assert_eq!(address.street, "eisengasse");
        assert!(address.numbers.is_empty());
        assert_eq!(address.postfix.as_deref(), Some("bank vor 26"));
    }

    #[test]
    fn parse_without_numbers() {
        let address = Address::parse("Kornhaus");
        assert_eq!(address.street, "kornhaus");
        assert!(address.numbers.is_empty());
        assert_eq!(address.postfix, None);

        let address = Address::parse("");
        assert_eq!(address, Address::default());
    }

    #[test]
    fn parse_postfix_after_numbers() {
        let address = Address::parse("Eisengasse 21 Hinterhaus");
        assert_eq!(numbers(&address), vec!["21"]);
        assert_eq!(address.postfix.as_deref(), Some("hinterhaus"));
    }

    #[test]
    fn has_numbers_ignores_order() {
        let address = Address::parse("Eisengasse 64, 66");
        assert!(address.has_numbers(&["66".into(), "64".into()]));
        assert!(!address.has_numbers(&["64".into()]));
        assert!(address.has_number("66"));
    }

    #[test]
    fn display_address() {
        assert_eq!(
            Address::parse("Eisengasse 64, 66").to_string(),
            "eisengasse 64, 66"
        );
        assert_eq!(
            Address::parse("Petersgraben Th. v. 20 n. 18").to_string(),
            "petersgraben theil von 20"
        );
    }
}
