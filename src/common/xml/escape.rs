use aho_corasick::AhoCorasick;
use once_cell::sync::Lazy;

// Static initialization: automatons are built only once, thread-safe
static ATTR_ESCAPER: Lazy<AhoCorasick> = Lazy::new(|| {
    AhoCorasick::builder()
        .build(["&", "<", ">", "\"", "\t", "\n", "\r"])
        .expect("Failed to build XML attribute escaper")
});

static TEXT_ESCAPER: Lazy<AhoCorasick> = Lazy::new(|| {
    AhoCorasick::builder()
        .build(["&", "<", ">", "\r"])
        .expect("Failed to build XML text escaper")
});

/// Escape a string for use inside a double-quoted attribute value.
///
/// Whitespace control characters are written as character references so that
/// attribute value normalization does not fold them on the next read.
///
/// # Examples
///
/// ```
/// use litchi_builder::common::xml::escape_attr;
/// assert_eq!(escape_attr("a & b"), "a &amp; b");
/// assert_eq!(escape_attr("\"x\"\n"), "&quot;x&quot;&#xA;");
/// ```
#[inline]
pub fn escape_attr(s: &str) -> String {
    ATTR_ESCAPER.replace_all(
        s,
        &["&amp;", "&lt;", "&gt;", "&quot;", "&#x9;", "&#xA;", "&#xD;"],
    )
}

/// Escape a string for use as element text content.
///
/// # Examples
///
/// ```
/// use litchi_builder::common::xml::escape_text;
/// assert_eq!(escape_text("<tag> & \"q\""), "&lt;tag&gt; &amp; \"q\"");
/// ```
#[inline]
pub fn escape_text(s: &str) -> String {
    TEXT_ESCAPER.replace_all(s, &["&amp;", "&lt;", "&gt;", "&#xD;"])
}

/// Resolve the name of a general entity reference (the part between `&` and `;`).
///
/// Handles the five predefined entities plus decimal and hexadecimal character
/// references. Returns `None` for anything else.
///
/// # Examples
///
/// ```
/// use litchi_builder::common::xml::resolve_entity;
/// assert_eq!(resolve_entity("amp"), Some('&'));
/// assert_eq!(resolve_entity("#10"), Some('\n'));
/// assert_eq!(resolve_entity("#x263A"), Some('\u{263A}'));
/// assert_eq!(resolve_entity("nbsp"), None);
/// ```
pub fn resolve_entity(name: &str) -> Option<char> {
    match name {
        "amp" => Some('&'),
        "lt" => Some('<'),
        "gt" => Some('>'),
        "quot" => Some('"'),
        "apos" => Some('\''),
        _ => {
            let reference = name.strip_prefix('#')?;
            let code = match reference.strip_prefix(['x', 'X']) {
                Some(hex) => u32::from_str_radix(hex, 16).ok()?,
                None => reference.parse::<u32>().ok()?,
            };
            char::from_u32(code)
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_attr_all_specials() {
        assert_eq!(escape_attr("<&>\"\t\r"), "&lt;&amp;&gt;&quot;&#x9;&#xD;");
        assert_eq!(escape_attr("plain"), "plain");
    }

    #[test]
    fn test_escape_text_keeps_quotes() {
        assert_eq!(escape_text("it's \"fine\""), "it's \"fine\"");
        assert_eq!(escape_text("a<b"), "a&lt;b");
    }

    #[test]
    fn test_resolve_entity_invalid() {
        assert_eq!(resolve_entity("#"), None);
        assert_eq!(resolve_entity("#xZZ"), None);
        assert_eq!(resolve_entity("#xD800"), None);
    }
}
