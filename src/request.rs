//! Query strings and request URLs for the remote user service.

pub const QUERY_PREPEND: &str = "?";
pub const QUERY_JOIN: &str = "&";
pub const QUERY_ASSIGN: &str = "=";

/// Path under the host where user resources live.
pub const USERS_PATH: &str = "/users/";

/// Marks `urlencoding` escapes that URI component encoding leaves literal.
const UNRESERVED_MARKS: [(&str, &str); 5] = [("%21", "!"), ("%27", "'"), ("%28", "("), ("%29", ")"), ("%2A", "*")];

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RestMethod {
    Get,
    Post,
    Put,
    Delete,
}

impl RestMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            RestMethod::Get => "GET",
            RestMethod::Post => "POST",
            RestMethod::Put => "PUT",
            RestMethod::Delete => "DELETE",
        }
    }
}

/// `?k1=v1&k2=v2` in input order, keys and values percent-encoded separately.
/// Empty input gives an empty string.
pub fn encode_query<K, V>(params: &[(K, V)]) -> String
where
    K: AsRef<str>,
    V: AsRef<str>,
{
    if params.is_empty() {
        return String::new();
    }
    let pairs: Vec<String> = params
        .iter()
        .map(|(k, v)| {
            format!(
                "{}{}{}",
                encode_component(k.as_ref()),
                QUERY_ASSIGN,
                encode_component(v.as_ref())
            )
        })
        .collect();
    format!("{}{}", QUERY_PREPEND, pairs.join(QUERY_JOIN))
}

/// Percent-encode everything except letters, digits and `-_.!~*'()`.
fn encode_component(raw: &str) -> String {
    let mut out = urlencoding::encode(raw).into_owned();
    // A literal `%` always encodes as `%25`, so these triplets can only come from the marks.
    for (escaped, mark) in UNRESERVED_MARKS {
        if out.contains(escaped) {
            out = out.replace(escaped, mark);
        }
    }
    out
}

/// Drop one trailing `/` from a host.
pub fn sanitise_host(host: &str) -> &str {
    host.strip_suffix('/').unwrap_or(host)
}

/// `host + "/users/" + query`.
pub fn user_request_url(host: &str, query: &str) -> String {
    format!("{}{}{}", sanitise_host(host), USERS_PATH, query)
}
