//! Markdown rendering for note-type bookmarks.
//!
//! Notes are stored as plain markdown on the backend, while Pocket readers
//! expect an HTML article body. [`render`] bridges the two.

use pulldown_cmark::{html, Options, Parser};

/// Render markdown into an HTML fragment.
///
/// Tables, strikethrough and task lists are enabled so that notes written
/// with GitHub-flavoured habits come out the way their authors expect.
pub fn render(markdown: &str) -> String {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_TABLES);
    options.insert(Options::ENABLE_STRIKETHROUGH);
    options.insert(Options::ENABLE_TASKLISTS);

    let parser = Parser::new_ext(markdown, options);
    let mut out = String::with_capacity(markdown.len() * 3 / 2);
    html::push_html(&mut out, parser);
    out
}
