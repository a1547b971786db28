//! Request path helpers

use url::form_urlencoded;

/// Appends form-encoded query parameters to a path that may already carry a
/// query string. An empty parameter list leaves the path unchanged.
///
/// ```
/// use conduit_client::http::path::append_query_params;
///
/// assert_eq!(append_query_params("/world/test", [("q2", "foo")]), "/world/test?q2=foo");
/// assert_eq!(
///     append_query_params("/world/test?q1=foo", [("q2", "foo")]),
///     "/world/test?q1=foo&q2=foo"
/// );
/// ```
pub fn append_query_params<I, K, V>(path: &str, params: I) -> String
where
    I: IntoIterator<Item = (K, V)>,
    K: AsRef<str>,
    V: AsRef<str>,
{
    let query = form_urlencoded::Serializer::new(String::new())
        .extend_pairs(params)
        .finish();
    if query.is_empty() {
        return path.to_owned();
    }

    let (path, fragment) = match path.split_once('#') {
        Some((path, fragment)) => (path, Some(fragment)),
        None => (path, None),
    };

    let mut out = String::with_capacity(path.len() + query.len() + 2);
    out.push_str(path);
    match path.find('?') {
        None => out.push('?'),
        Some(i) if i + 1 == path.len() || path.ends_with('&') => {}
        Some(_) => out.push('&'),
    }
    out.push_str(&query);

    if let Some(fragment) = fragment {
        out.push('#');
        out.push_str(fragment);
    }
    out
}

/// Joins two path segments with exactly one slash between them.
///
/// A second segment starting with `?` is appended as is.
pub fn concat_paths(first: &str, second: &str) -> String {
    if second.is_empty() {
        return first.to_owned();
    }
    if first.is_empty() || first == "/" {
        return if second.starts_with('/') {
            second.to_owned()
        } else {
            format!("/{second}")
        };
    }

    match (first.ends_with('/'), second.starts_with('/')) {
        (true, true) => format!("{first}{}", &second[1..]),
        (true, false) => format!("{first}{second}"),
        (false, true) => format!("{first}{second}"),
        (false, false) if second.starts_with('?') => format!("{first}{second}"),
        (false, false) => format!("{first}/{second}"),
    }
}
