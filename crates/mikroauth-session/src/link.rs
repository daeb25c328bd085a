//! The incoming-link surface: where a magic link's parameters are read from.
//!
//! A magic link lands the user on some location carrying `token` and
//! `email` query parameters. What "location" means depends on the host: a
//! browser address bar, a deep link handed to a desktop app, a URL pasted
//! into a CLI. [`Location`] abstracts over that, and [`UrlLocation`] covers
//! the common case of a plain URL.

use std::sync::{Mutex, PoisonError};

use url::Url;

/// Query parameter carrying the magic-link token.
pub const TOKEN_PARAM: &str = "token";

/// Query parameter carrying the recipient email.
pub const EMAIL_PARAM: &str = "email";

/// A location-like context the host exposes.
///
/// Methods take `&self` because the location is shared state owned by the
/// host; implementations use interior mutability for
/// [`remove_query_params`](Self::remove_query_params).
pub trait Location: Send + Sync {
    /// Returns the value of a query parameter. Missing and empty values
    /// both count as absent.
    fn query_param(&self, name: &str) -> Option<String>;

    /// Removes the named parameters from the visible location, without a
    /// navigation or reload. Other parameters and the fragment are kept.
    fn remove_query_params(&self, names: &[&str]);
}

/// A [`Location`] backed by a [`Url`].
#[derive(Debug)]
pub struct UrlLocation {
    url: Mutex<Url>,
}

impl UrlLocation {
    /// Wraps an already-parsed URL.
    pub fn new(url: Url) -> Self {
        Self {
            url: Mutex::new(url),
        }
    }

    /// Parses `input` as an absolute URL.
    pub fn parse(input: &str) -> Result<Self, url::ParseError> {
        Url::parse(input).map(Self::new)
    }

    /// Returns a copy of the current URL.
    pub fn current(&self) -> Url {
        self.url.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }
}

impl Location for UrlLocation {
    fn query_param(&self, name: &str) -> Option<String> {
        let url = self.url.lock().unwrap_or_else(PoisonError::into_inner);
        url.query_pairs()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.into_owned())
            .filter(|value| !value.is_empty())
    }

    fn remove_query_params(&self, names: &[&str]) {
        let mut url = self.url.lock().unwrap_or_else(PoisonError::into_inner);

        let kept: Vec<(String, String)> = url
            .query_pairs()
            .filter(|(key, _)| {
                let key: &str = key;
                !names.contains(&key)
            })
            .map(|(key, value)| (key.into_owned(), value.into_owned()))
            .collect();

        if kept.is_empty() {
            url.set_query(None);
        } else {
            url.query_pairs_mut()
                .clear()
                .extend_pairs(kept.iter().map(|(k, v)| (k.as_str(), v.as_str())));
        }
    }
}
