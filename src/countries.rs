use once_cell::sync::Lazy;
use std::collections::HashMap;

pub const DEFAULT_FLAG: &str = "🏳️";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Country {
    pub flag: &'static str,
    pub location: &'static str,
}

// (ISO code, flag, location label)
const COUNTRY_TABLE: &[(&str, &str, &str)] = &[
    ("NL", "🇳🇱", "netherlands"),
    ("DE", "🇩🇪", "germany"),
    ("FI", "🇫🇮", "finland"),
    ("US", "🇺🇸", "usa"),
    ("GB", "🇬🇧", "uk"),
    ("JP", "🇯🇵", "japan"),
    ("RU", "🇷🇺", "russia"),
    ("FR", "🇫🇷", "france"),
    ("SE", "🇸🇪", "sweden"),
    ("CA", "🇨🇦", "canada"),
    ("AU", "🇦🇺", "australia"),
    ("SG", "🇸🇬", "singapore"),
    ("KR", "🇰🇷", "south-korea"),
    ("TR", "🇹🇷", "turkey"),
    ("PL", "🇵🇱", "poland"),
    ("CZ", "🇨🇿", "czech-republic"),
    ("AT", "🇦🇹", "austria"),
    ("CH", "🇨🇭", "switzerland"),
    ("IT", "🇮🇹", "italy"),
    ("ES", "🇪🇸", "spain"),
    ("IE", "🇮🇪", "ireland"),
    ("NO", "🇳🇴", "norway"),
    ("DK", "🇩🇰", "denmark"),
    ("LT", "🇱🇹", "lithuania"),
    ("LV", "🇱🇻", "latvia"),
    ("EE", "🇪🇪", "estonia"),
    ("RO", "🇷🇴", "romania"),
    ("BG", "🇧🇬", "bulgaria"),
    ("UA", "🇺🇦", "ukraine"),
    ("KZ", "🇰🇿", "kazakhstan"),
    ("IN", "🇮🇳", "india"),
    ("BR", "🇧🇷", "brazil"),
    ("HK", "🇭🇰", "hong-kong"),
    ("TW", "🇹🇼", "taiwan"),
    ("IL", "🇮🇱", "israel"),
    ("MD", "🇲🇩", "moldova"),
    ("GE", "🇬🇪", "georgia"),
    ("AM", "🇦🇲", "armenia"),
    ("AZ", "🇦🇿", "azerbaijan"),
];

static COUNTRIES: Lazy<HashMap<&'static str, Country>> = Lazy::new(|| {
    COUNTRY_TABLE
        .iter()
        .map(|&(code, flag, location)| (code, Country { flag, location }))
        .collect()
});

/// Lookup is case-sensitive: the panel reports upper-case ISO codes.
pub fn lookup(code: &str) -> Option<Country> {
    COUNTRIES.get(code).copied()
}

pub fn flag(code: &str) -> &'static str {
    lookup(code).map(|c| c.flag).unwrap_or(DEFAULT_FLAG)
}

/// Location label for `code`, falling back to the lower-cased code itself.
pub fn location(code: &str) -> String {
    match lookup(code) {
        Some(country) => country.location.to_string(),
        None => code.to_lowercase(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_codes_resolve() {
        assert_eq!(flag("DE"), "🇩🇪");
        assert_eq!(location("DE"), "germany");
        assert_eq!(location("KR"), "south-korea");
    }

    #[test]
    fn unknown_codes_fall_back() {
        for code in ["XX", "ZZ", "Qa", "de"] {
            assert_eq!(flag(code), DEFAULT_FLAG);
            assert_eq!(location(code), code.to_lowercase());
        }
    }

    #[test]
    fn table_has_no_duplicate_codes() {
        assert_eq!(COUNTRIES.len(), COUNTRY_TABLE.len());
    }
}
