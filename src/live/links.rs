use log::debug;
use scraper::{Html, Selector};

/// Substring an anchor target must contain to count as the watch link
pub const WATCH_MARKER: &str = "watch";

/// Return the `href` of the first anchor, in document order, whose target
/// mentions [`WATCH_MARKER`].
pub fn find_watch_link(html: &str) -> Option<String> {
    let selector = Selector::parse("a[href]").ok()?;
    let document = Html::parse_document(html);

    let link = document
        .select(&selector)
        .filter_map(|anchor| anchor.value().attr("href"))
        .find(|href| href.contains(WATCH_MARKER))
        .map(str::to_string);

    match &link {
        Some(href) => debug!("Watch link found: {}", href),
        None => debug!("No anchor pointing to a watch page"),
    }

    link
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_matching_anchor_wins() {
        let html = r#"<html><body>
            <a href="https://www.youtube.com/channel/abc">channel</a>
            <a href="https://www.youtube.com/redirect?u=https%3A%2F%2Fwww.youtube.com%2Fwatch%3Fv%3DFIRST">first</a>
            <a href="https://www.youtube.com/redirect?u=https%3A%2F%2Fwww.youtube.com%2Fwatch%3Fv%3DSECOND">second</a>
        </body></html>"#;

        let link = find_watch_link(html).unwrap();
        assert!(link.ends_with("FIRST"));
    }

    #[test]
    fn test_anchors_without_href_are_ignored() {
        let html = r#"<a name="watch">anchor</a><a href="/watch?v=1">ok</a>"#;
        assert_eq!(find_watch_link(html).as_deref(), Some("/watch?v=1"));
    }

    #[test]
    fn test_no_watch_anchor() {
        let html = r#"<p>Hello</p><a href="https://example.com/settings">settings</a>"#;
        assert_eq!(find_watch_link(html), None);
    }

    #[test]
    fn test_empty_and_broken_markup() {
        assert_eq!(find_watch_link(""), None);
        assert_eq!(find_watch_link("<div><a"), None);
    }
}
