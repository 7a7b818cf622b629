use crate::catalog::CatalogEntry;
use crate::QUERY_PLACEHOLDER;
use url::Url;

/// Build the destination for `entry` with the query text left after the bang.
///
/// Returns `None` when the template, or the URL produced from it, is not an
/// absolute URL.
pub fn synthesize(entry: &CatalogEntry, remainder: &str) -> Option<String> {
    if remainder.is_empty() && entry.open_base_url {
        let base = Url::parse(&entry.template).ok()?;
        let origin = base.origin();
        if !origin.is_tuple() {
            return None;
        }
        return Some(origin.ascii_serialization());
    }

    let query = if entry.encode_query {
        urlencoding::encode(remainder)
    } else {
        remainder.into()
    };
    let target = entry.template.replace(QUERY_PLACEHOLDER, &query);
    // Validate without normalising so unencoded queries stay literal.
    Url::parse(&target).ok()?;
    Some(target)
}
