// Copyright (c) 2016 Anatoly Ikorsky
//
// Licensed under the Apache License, Version 2.0
// <LICENSE-APACHE or http://www.apache.org/licenses/LICENSE-2.0> or the MIT
// license <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. All files in the project carrying such notice may not be copied,
// modified, or distributed except according to those terms.

use serde::Serialize;

use std::collections::BTreeMap;

/// Ssl Options.
///
/// Built from `ssl_*` connection URL parameters, e.g. `ssl_ca=/etc/ca.pem` sets
/// [`TlsOptions::ca`]. Parameters other than the five known ones are kept in
/// [`TlsOptions::extra`] under their stripped name.
///
/// ```
/// # use mysqldb_dialect::TlsOptions;
/// let tls = TlsOptions::default()
///     .with_ca(Some("/path/to/ca.pem"))
///     .with_cipher(Some("DHE-RSA-AES256-SHA"));
/// assert_eq!(tls.ca(), Some("/path/to/ca.pem"));
/// ```
#[derive(Debug, Clone, Eq, PartialEq, Hash, Default, Serialize)]
pub struct TlsOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    ca: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    cert: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    capath: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    cipher: Option<String>,
    #[serde(flatten)]
    extra: BTreeMap<String, String>,
}

impl TlsOptions {
    /// Path to the certificate authority file.
    pub fn with_ca<T: Into<String>>(mut self, ca: Option<T>) -> Self {
        self.ca = ca.map(Into::into);
        self
    }

    /// Path to the client private key.
    pub fn with_key<T: Into<String>>(mut self, key: Option<T>) -> Self {
        self.key = key.map(Into::into);
        self
    }

    /// Path to the client certificate.
    pub fn with_cert<T: Into<String>>(mut self, cert: Option<T>) -> Self {
        self.cert = cert.map(Into::into);
        self
    }

    /// Directory of trusted CA certificates.
    pub fn with_capath<T: Into<String>>(mut self, capath: Option<T>) -> Self {
        self.capath = capath.map(Into::into);
        self
    }

    /// Permitted ciphers.
    pub fn with_cipher<T: Into<String>>(mut self, cipher: Option<T>) -> Self {
        self.cipher = cipher.map(Into::into);
        self
    }

    pub fn ca(&self) -> Option<&str> {
        self.ca.as_deref()
    }

    pub fn key(&self) -> Option<&str> {
        self.key.as_deref()
    }

    pub fn cert(&self) -> Option<&str> {
        self.cert.as_deref()
    }

    pub fn capath(&self) -> Option<&str> {
        self.capath.as_deref()
    }

    pub fn cipher(&self) -> Option<&str> {
        self.cipher.as_deref()
    }

    /// Unrecognized `ssl_*` parameters, prefix stripped.
    pub fn extra(&self) -> &BTreeMap<String, String> {
        &self.extra
    }

    /// Looks an option up by its stripped name.
    pub fn get(&self, name: &str) -> Option<&str> {
        match name {
            "ca" => self.ca(),
            "key" => self.key(),
            "cert" => self.cert(),
            "capath" => self.capath(),
            "cipher" => self.cipher(),
            _ => self.extra.get(name).map(String::as_str),
        }
    }

    pub(crate) fn set(&mut self, name: &str, value: String) {
        match name {
            "ca" => self.ca = Some(value),
            "key" => self.key = Some(value),
            "cert" => self.cert = Some(value),
            "capath" => self.capath = Some(value),
            "cipher" => self.cipher = Some(value),
            _ => {
                self.extra.insert(name.to_owned(), value);
            }
        }
    }
}
