use std::sync::OnceLock;

use regex::Regex;

pub trait StripHtml {
    fn strip_html(&self) -> String;
}

// <b>chat</b>&nbsp;noir -> chat noir
impl StripHtml for str {
    fn strip_html(&self) -> String {
        static BREAKS: OnceLock<Regex> = OnceLock::new();
        static TAGS: OnceLock<Regex> = OnceLock::new();

        let breaks = BREAKS
            .get_or_init(|| Regex::new(r"(?i)<br\s*/?>|</(?:p|div|li)\s*>").expect("valid regex"));
        let tags = TAGS.get_or_init(|| Regex::new(r"(?s)<[^>]*>").expect("valid regex"));

        let text = breaks.replace_all(self, "\n");
        let text = tags.replace_all(&text, "");
        decode_entities(&text).trim().to_string()
    }
}

/// Implement the trait for `String` by forwarding the method to `str`
impl StripHtml for String {
    fn strip_html(&self) -> String {
        self.as_str().strip_html()
    }
}

fn decode_entities(text: &str) -> String {
    static ENTITY: OnceLock<Regex> = OnceLock::new();
    let re = ENTITY
        .get_or_init(|| Regex::new(r"&(#[0-9]+|#[xX][0-9a-fA-F]+|[a-zA-Z]+);").expect("valid regex"));

    re.replace_all(text, |captures: &regex::Captures| {
        let entity = &captures[1];
        let decoded = if let Some(hex) = entity.strip_prefix("#x").or(entity.strip_prefix("#X")) {
            u32::from_str_radix(hex, 16).ok().and_then(char::from_u32)
        } else if let Some(dec) = entity.strip_prefix('#') {
            dec.parse::<u32>().ok().and_then(char::from_u32)
        } else {
            match entity {
                "amp" => Some('&'),
                "lt" => Some('<'),
                "gt" => Some('>'),
                "quot" => Some('"'),
                "apos" => Some('\''),
                "nbsp" => Some(' '),
                _ => None,
            }
        };

        match decoded {
            Some(c) => c.to_string(),
            None => captures[0].to_string(),
        }
    })
    .into_owned()
}

/// Escapes `&`, `<` and `>` so a file name can sit inside markup. Quotes are left alone.
pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

pub fn split_tags(content: &str) -> Vec<String> {
    content.split_whitespace().map(|tag| tag.to_string()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_html() {
        assert_eq!("<b>chat</b>&nbsp;noir".strip_html(), "chat noir");
        assert_eq!("one<br>two<br />three".strip_html(), "one\ntwo\nthree");
        assert_eq!("<div>a</div><div>b</div>".strip_html(), "a\nb");
        assert_eq!("Tom &amp; Jerry &lt;3".strip_html(), "Tom & Jerry <3");
        assert_eq!("caf&#233; &#x263A;".strip_html(), "café ☺");
        assert_eq!("&unknown; stays".strip_html(), "&unknown; stays");
        assert_eq!("plain".to_string().strip_html(), "plain");
    }

    #[test]
    fn test_escape_html() {
        assert_eq!(escape_html("a&b<c>\"d\""), "a&amp;b&lt;c&gt;\"d\"");
    }

    #[test]
    fn test_split_tags() {
        assert_eq!(split_tags("  noun\tfood\nfrench "), vec!["noun", "food", "french"]);
        assert!(split_tags("   ").is_empty());
    }
}
