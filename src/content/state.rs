use crate::post::{PostState, Visibility};

/// Reads the visibility directive from the first line of a post, e.g. `<!-- public -->`.
///
/// Only a first line opening an HTML comment counts. Keywords are plain
/// substrings checked in the fixed order public, private, delete; the first one
/// found wins even if the line names several. Anything else falls back to `default_state`.
pub fn classify(raw_content: &str, default_state: PostState) -> Visibility {
    const KEYWORDS: [(&str, Visibility); 3] = [
        ("public", Visibility::Public),
        ("private", Visibility::Private),
        ("delete", Visibility::Delete),
    ];

    let first_line = raw_content
        .trim_start_matches('\u{feff}')
        .lines()
        .next()
        .unwrap_or("")
        .trim_start();

    if !first_line.starts_with("<!--") {
        return default_state.into();
    }

    KEYWORDS.iter()
        .find(|(keyword, _)| first_line.contains(*keyword))
        .map(|(_, visibility)| *visibility)
        .unwrap_or_else(|| default_state.into())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_keyword() {
        assert_eq!(classify("<!-- public -->\n# T", PostState::Private), Visibility::Public);
        assert_eq!(classify("<!-- private -->\n# T", PostState::Public), Visibility::Private);
        assert_eq!(classify("<!-- delete -->\n# T", PostState::Public), Visibility::Delete);
    }

    #[test]
    fn test_priority_order() {
        assert_eq!(classify("<!-- delete public -->", PostState::Private), Visibility::Public);
        assert_eq!(classify("<!-- delete, private -->", PostState::Public), Visibility::Private);
        assert_eq!(classify("<!-- private or public -->", PostState::Private), Visibility::Public);
    }

    #[test]
    fn test_unknown_directive_uses_default() {
        assert_eq!(classify("<!-- draft -->\n# T", PostState::Private), Visibility::Private);
        assert_eq!(classify("<!-- draft -->\n# T", PostState::Public), Visibility::Public);
    }

    #[test]
    fn test_only_first_line_counts() {
        assert_eq!(classify("# T\n<!-- delete -->", PostState::Public), Visibility::Public);
        assert_eq!(classify("public\n<!-- private -->", PostState::Private), Visibility::Private);
        assert_eq!(classify("", PostState::Private), Visibility::Private);
    }

    #[test]
    fn test_keywords_inside_words() {
        assert_eq!(classify("<!-- publicly visible -->", PostState::Private), Visibility::Public);
        assert_eq!(classify("<!-- private_draft -->", PostState::Public), Visibility::Private);
        assert_eq!(classify("<!-- undelete -->", PostState::Public), Visibility::Delete);
        assert_eq!(classify("<!--state:public-->", PostState::Private), Visibility::Public);
        assert_eq!(classify("<!-- Public -->", PostState::Private), Visibility::Private);
    }

    #[test]
    fn test_leading_bom_and_crlf() {
        assert_eq!(classify("\u{feff}<!-- delete -->\r\n# T", PostState::Public), Visibility::Delete);
    }
}
