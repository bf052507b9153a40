use pulldown_cmark::{CowStr, Event, Options, Parser, Tag};

#[macro_export]
macro_rules! include_res {
    (bytes, $p:expr) => {
        include_bytes!(concat!(env!("CARGO_MANIFEST_DIR"), "/res", $p))
    };
    (str, $p:expr) => {
        include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/res", $p))
    };
}

/// Makes user text safe to drop into a template, placeholders included.
pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            '{' => out.push_str("&#123;"),
            '}' => out.push_str("&#125;"),
            _ => out.push(c),
        }
    }
    out
}

/// Whether a link target is a web or mail address, or a path on this site.
/// Browsers ignore whitespace and control characters inside a scheme, so they are dropped first.
fn safe_url(url: &str) -> bool {
    let url: String = url
        .chars()
        .filter(|c| !c.is_ascii_whitespace() && !c.is_ascii_control())
        .collect::<String>()
        .to_ascii_lowercase();

    let has_scheme = url.split(['/', '?', '#']).next().is_some_and(|head| head.contains(':'));
    !has_scheme || ["http:", "https:", "mailto:"].iter().any(|scheme| url.starts_with(scheme))
}

fn neutralize(dest_url: CowStr<'_>) -> CowStr<'_> {
    if safe_url(&dest_url) { dest_url } else { CowStr::Borrowed("#") }
}

/// Markdown to HTML. Raw HTML in the source is shown as text, never rendered,
/// and links or images with any other scheme than http(s) or mailto point nowhere.
pub fn markdown(text: &str) -> String {
    let parser = Parser::new_ext(text, Options::ENABLE_STRIKETHROUGH)
        .map(|event| match event {
            Event::Html(html) | Event::InlineHtml(html) => Event::Text(html),
            Event::Start(Tag::Link { link_type, dest_url, title, id }) => {
                Event::Start(Tag::Link { link_type, dest_url: neutralize(dest_url), title, id })
            }
            Event::Start(Tag::Image { link_type, dest_url, title, id }) => {
                Event::Start(Tag::Image { link_type, dest_url: neutralize(dest_url), title, id })
            }
            _ => event,
        });

    let mut html_output = String::new();
    pulldown_cmark::html::push_html(&mut html_output, parser);
    html_output
}
