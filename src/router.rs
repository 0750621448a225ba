//! Resource address routing: `devices` and `devices/{id}`, optionally as full content URIs.

use crate::error::{ConfigError, RegistryError};
use regex::Regex;
use std::fmt;

/// Path segment of the devices collection; also the table name.
pub const DEVICES_PATH: &str = "devices";

pub const CONTENT_SCHEME: &str = "content://";

/// MIME type of the devices collection.
pub const CONTENT_TYPE: &str = "vnd.android.cursor.dir/vnd.suchagit.android2cloud.device";

/// MIME type of a single device.
pub const CONTENT_ITEM_TYPE: &str = "vnd.android.cursor.item/vnd.suchagit.android2cloud.device";

/// A resolved address: the whole collection or one device by id.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Route {
    Collection,
    Item(i64),
}

impl Route {
    pub fn path(&self) -> String {
        match self {
            Route::Collection => DEVICES_PATH.to_string(),
            Route::Item(id) => format!("{}/{}", DEVICES_PATH, id),
        }
    }

    pub fn content_uri(&self, authority: &str) -> String {
        format!("{}{}/{}", CONTENT_SCHEME, authority, self.path())
    }

    pub fn content_type(&self) -> &'static str {
        match self {
            Route::Collection => CONTENT_TYPE,
            Route::Item(_) => CONTENT_ITEM_TYPE,
        }
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.path())
    }
}

#[derive(Clone, Copy, Debug)]
enum RouteKind {
    Collection,
    Item,
}

/// Ordered matcher table. The collection pattern is tried first; the item
/// pattern requires a trailing numeric segment.
#[derive(Clone, Debug)]
pub struct AddressRouter {
    authority: String,
    matchers: Vec<(Regex, RouteKind)>,
}

impl AddressRouter {
    pub fn new(authority: &str) -> Result<Self, ConfigError> {
        let prefix = format!("(?:{}{}/)?", regex::escape(CONTENT_SCHEME), regex::escape(authority));
        let patterns = [
            (format!("^{}{}$", prefix, DEVICES_PATH), RouteKind::Collection),
            (format!(r"^{}{}/(\d+)$", prefix, DEVICES_PATH), RouteKind::Item),
        ];
        let mut matchers = Vec::with_capacity(patterns.len());
        for (pattern, kind) in patterns {
            let re = Regex::new(&pattern)
                .map_err(|e| ConfigError::Validation(format!("invalid address pattern for {}: {}", authority, e)))?;
            matchers.push((re, kind));
        }
        Ok(AddressRouter {
            authority: authority.to_string(),
            matchers,
        })
    }

    pub fn authority(&self) -> &str {
        &self.authority
    }

    pub fn resolve(&self, address: &str) -> Result<Route, RegistryError> {
        for (re, kind) in &self.matchers {
            let Some(caps) = re.captures(address) else { continue };
            return match kind {
                RouteKind::Collection => Ok(Route::Collection),
                RouteKind::Item => caps
                    .get(1)
                    .and_then(|m| m.as_str().parse::<i64>().ok())
                    .map(Route::Item)
                    .ok_or_else(|| RegistryError::InvalidAddress(address.to_string())),
            };
        }
        Err(RegistryError::InvalidAddress(address.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DEFAULT_AUTHORITY;

    fn router() -> AddressRouter {
        AddressRouter::new(DEFAULT_AUTHORITY).unwrap()
    }

    #[test]
    fn resolves_collection_and_item() {
        let r = router();
        assert_eq!(r.resolve("devices").unwrap(), Route::Collection);
        assert_eq!(r.resolve("devices/42").unwrap(), Route::Item(42));
        assert_eq!(r.resolve("devices/0").unwrap(), Route::Item(0));
    }

    #[test]
    fn rejects_malformed_addresses() {
        let r = router();
        for bad in ["devices/", "device/42", "devices/abc", "devices/4/2", "devices/-1", "", "/devices", "devicesX"] {
            assert!(
                matches!(r.resolve(bad), Err(RegistryError::InvalidAddress(_))),
                "{} should not resolve",
                bad
            );
        }
    }

    #[test]
    fn rejects_ids_that_overflow() {
        assert!(matches!(
            router().resolve("devices/99999999999999999999"),
            Err(RegistryError::InvalidAddress(_))
        ));
    }

    #[test]
    fn resolves_content_uris_for_own_authority_only() {
        let r = router();
        let base = format!("content://{}/devices", DEFAULT_AUTHORITY);
        assert_eq!(r.resolve(&base).unwrap(), Route::Collection);
        assert_eq!(r.resolve(&format!("{}/7", base)).unwrap(), Route::Item(7));
        assert!(r.resolve("content://org.example.other/devices").is_err());
    }

    #[test]
    fn authority_dots_are_literal() {
        let r = AddressRouter::new("a.b").unwrap();
        assert!(r.resolve("content://a.b/devices").is_ok());
        assert!(r.resolve("content://aXb/devices").is_err());
    }

    #[test]
    fn routes_render_paths_uris_and_types() {
        assert_eq!(Route::Collection.path(), "devices");
        assert_eq!(Route::Item(3).to_string(), "devices/3");
        assert_eq!(Route::Item(3).content_uri("org.example"), "content://org.example/devices/3");
        assert_eq!(Route::Collection.content_type(), CONTENT_TYPE);
        assert_eq!(Route::Item(3).content_type(), CONTENT_ITEM_TYPE);
    }
}
