use std::io;
use std::io::ErrorKind;

use markdown::{CompileOptions, Options};

/// Turns a post's markdown into HTML.
pub trait MarkdownRenderer {
    fn render(&self, md_text: &str) -> io::Result<String>;
}

/// GitHub flavoured markdown. Raw HTML passes through untouched, so the
/// visibility directive ends up as an HTML comment and README style
/// `<p><img ...></p>` blocks keep their images.
#[derive(Default, Clone)]
pub struct GfmRenderer {}

impl MarkdownRenderer for GfmRenderer {
    fn render(&self, md_text: &str) -> io::Result<String> {
        let options = Options {
            compile: CompileOptions {
                allow_dangerous_html: true,
                ..CompileOptions::gfm()
            },
            ..Options::gfm()
        };

        match markdown::to_html_with_options(md_text, &options) {
            Ok(x) => Ok(x),
            Err(e) => Err(io::Error::new(ErrorKind::InvalidInput, e.reason.as_str())),
        }
    }
}
