//! Tag text normalization.
//!
//! ## Pipeline
//!
//! Raw page text goes through NFKC normalization (full-width `＃` and
//! friends collapse to their ASCII forms), loses at most one leading `#`,
//! and has `*` escaped so it cannot act as a search wildcard. An empty
//! result means "do not look this up".
//!
//! ## The plain-name rule
//!
//! Falling back from wiki aliases to a direct tag-name search is only
//! safe when the text could actually be a tag name: printable ASCII
//! excluding `%`, `*` and `,`. [`is_plain_tag_name`] is that rule.

use std::sync::OnceLock;

use regex::Regex;
use unicode_normalization::UnicodeNormalization;

/// Normalize raw page text into booru search form.
pub fn normalize_tag(raw: &str) -> String {
    let normalized: String = raw.trim().nfkc().collect();
    let stripped = normalized.strip_prefix('#').unwrap_or(&normalized);
    stripped.replace('*', "\\*")
}

/// Whether `text` may be used in a direct tag-name search: printable
/// ASCII excluding `%`, `*` and `,`.
pub fn is_plain_tag_name(text: &str) -> bool {
    static PLAIN: OnceLock<Regex> = OnceLock::new();
    let re = PLAIN.get_or_init(|| {
        Regex::new(r"^[\x20-\x24\x26-\x29\x2B\x2D-\x7F]+$").unwrap()
    });
    re.is_match(text)
}

/// Celebration-hashtag suffixes stripped before lookup, tried in order.
fn hashtag_suffixes() -> &'static [Regex] {
    static SUFFIXES: OnceLock<Vec<Regex>> = OnceLock::new();
    SUFFIXES.get_or_init(|| {
        [
            r"生誕祭\d*$",
            r"誕生祭\d*$",
            r"版もうひとつの深夜の真剣お絵描き60分一本勝負(?:_\d+$|$)",
            r"版深夜の真剣お絵描き60分一本勝負(?:_\d+$|$)",
            r"深夜の真剣お絵描き60分一本勝負(?:_\d+$|$)",
            r"版深夜のお絵描き60分一本勝負(?:_\d+$|$)",
            r"版真剣お絵描き60分一本勝(?:_\d+$|$)",
            r"版お絵描き60分一本勝負(?:_\d+$|$)",
        ]
        .iter()
        .map(|p| Regex::new(p).unwrap())
        .collect()
    })
}

/// Strip a known celebration suffix from a hashtag name.
///
/// The first matching suffix wins. If stripping would leave nothing the
/// original name is kept.
pub fn normalize_hashtag(name: &str) -> String {
    for re in hashtag_suffixes() {
        let stripped = re.replace(name, "");
        if stripped != name {
            if !stripped.is_empty() {
                return stripped.into_owned();
            }
            break;
        }
    }
    name.to_string()
}
