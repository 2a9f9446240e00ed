/// Small text and URL helpers shared by the page parsers.
use url::Url;

/// Mojibake sequences the listing site serves when UTF-8 text has been run
/// through a Windows-1252 round trip, paired with their intended characters.
const MOJIBAKE: &[(&str, &str)] = &[
    ("\u{e2}\u{20ac}\u{2122}", "'"),
    ("\u{e2}\u{20ac}\u{153}", "\u{201c}"),
    ("\u{e2}\u{20ac}\u{9d}", "\u{201d}"),
    ("\u{e2}\u{20ac}\u{201c}", "\u{2013}"),
    ("\u{e2}\u{20ac}\u{201d}", "\u{2014}"),
    ("\u{e2}\u{20ac}\u{a6}", "\u{2026}"),
    ("\u{c3}\u{a9}", "\u{e9}"),
    ("\u{c3}\u{a8}", "\u{e8}"),
];

/// Repair common encoding damage and normalize whitespace in scraped text.
pub fn fix_text(text: &str) -> String {
    let mut fixed = text.replace('\u{a0}', " ");
    for (broken, repaired) in MOJIBAKE {
        if fixed.contains(broken) {
            fixed = fixed.replace(broken, repaired);
        }
    }
    fixed.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Resolve `href` against `base`, falling back to the raw value when the
/// base itself does not parse. Listing pages mix absolute and relative links.
pub fn absolute_url(base: &str, href: &str) -> String {
    match Url::parse(base).and_then(|b| b.join(href)) {
        Ok(resolved) => resolved.to_string(),
        Err(_) => href.to_string(),
    }
}

/// Host (netloc) of a URL, or `None` when it does not parse as absolute.
pub fn host_of(url: &str) -> Option<String> {
    Url::parse(url).ok()?.host_str().map(str::to_string)
}
