//! Remote item URIs: rewriting into local paths and desktop-client links

use std::borrow::Cow;
use std::fmt::Display;

const GROUPS_MARKER: &str = "zotero.org/groups/";
const ITEMS_MARKER: &str = "/items/";

/// Translate `http://zotero.org/groups/<lib>/items/<key>` into `/<lib>/item/<key>`
///
/// Anything that does not look like a group item URI is returned unchanged.
pub fn translate_zotero_uri(uri: &str) -> Cow<'_, str> {
    let Some(start) = uri.rfind(GROUPS_MARKER) else {
        return Cow::Borrowed(uri);
    };
    let rest = &uri[start + GROUPS_MARKER.len()..];
    let Some(split) = rest.find(ITEMS_MARKER) else {
        return Cow::Borrowed(uri);
    };

    let library = &rest[..split];
    let key = &rest[split + ITEMS_MARKER.len()..];
    Cow::Owned(format!("/{library}/item/{key}"))
}

/// Canonical remote URI of a group item, as found in `relations`
pub fn group_item_uri(library: impl Display, key: impl Display) -> String {
    format!("http://{GROUPS_MARKER}{library}{ITEMS_MARKER}{key}")
}

/// Desktop-client link opening a PDF attachment at an annotation
pub fn open_pdf_uri(
    library: impl Display,
    attachment: impl Display,
    page_label: Option<&str>,
    annotation: impl Display,
) -> String {
    match page_label {
        Some(page) => format!(
            "zotero://open-pdf/groups/{library}/items/{attachment}?page={page}&annotation={annotation}"
        ),
        None => format!(
            "zotero://open-pdf/groups/{library}/items/{attachment}?annotation={annotation}"
        ),
    }
}
