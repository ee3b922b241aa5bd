use tl::{HTMLTag, NodeHandle, Parser, ParserOptions};

/// Display metadata scraped from a rendered post.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Metadata {
    pub title: String,
    pub excerpt_html: String,
    pub banner_path: String,
}

#[derive(Default)]
struct Found {
    title: Option<String>,
    excerpt_html: Option<String>,
    banner_path: Option<String>,
}

impl Found {
    fn complete(&self) -> bool {
        self.title.is_some() && self.excerpt_html.is_some() && self.banner_path.is_some()
    }
}

/// Walks the document in order and answers three independent questions:
/// the text of the first `h1`, the first `p` without an image inside, and the
/// `src` of the first `img` anywhere.
pub fn extract(rendered_html: &str) -> Metadata {
    let Ok(dom) = tl::parse(rendered_html, ParserOptions::default()) else {
        return Metadata::default();
    };

    let parser = dom.parser();
    let mut found = Found::default();
    for handle in dom.children() {
        visit(*handle, parser, &mut found);
        if found.complete() {
            break;
        }
    }

    Metadata {
        title: found.title.unwrap_or_default(),
        excerpt_html: found.excerpt_html.unwrap_or_default(),
        banner_path: found.banner_path.unwrap_or_default(),
    }
}

fn tag_is(tag: &HTMLTag, name: &str) -> bool {
    tag.name().as_utf8_str().eq_ignore_ascii_case(name)
}

fn visit(handle: NodeHandle, parser: &Parser, found: &mut Found) {
    let Some(tag) = handle.get(parser).and_then(|node| node.as_tag()) else {
        return;
    };

    if found.title.is_none() && tag_is(tag, "h1") {
        found.title = Some(decode_entities(tag.inner_text(parser).trim()));
    } else if found.excerpt_html.is_none() && tag_is(tag, "p") && !contains_image(tag, parser) {
        found.excerpt_html = Some(tag.raw().as_utf8_str().trim().to_string());
    } else if found.banner_path.is_none() && tag_is(tag, "img") {
        let src = tag.attributes()
            .get("src")
            .flatten()
            .map(|src| src.as_utf8_str().to_string())
            .unwrap_or_default();
        found.banner_path = Some(decode_entities(&src));
    }

    for child in tag.children().top().iter() {
        if found.complete() {
            return;
        }
        visit(*child, parser, found);
    }
}

fn contains_image(tag: &HTMLTag, parser: &Parser) -> bool {
    tag.children().top().iter().any(|child| {
        match child.get(parser).and_then(|node| node.as_tag()) {
            Some(child_tag) => tag_is(child_tag, "img") || contains_image(child_tag, parser),
            None => false,
        }
    })
}

/// The renderer escapes these five; anything else is left untouched.
fn decode_entities(text: &str) -> String {
    if !text.contains('&') {
        return text.to_string();
    }

    text.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&amp;", "&")
}
