// Copyright (c) 2016 Anatoly Ikorsky
//
// Licensed under the Apache License, Version 2.0
// <LICENSE-APACHE or http://www.apache.org/licenses/LICENSE-2.0> or the MIT
// license <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. All files in the project carrying such notice may not be copied,
// modified, or distributed except according to those terms.

//! Connection character set detection.
//!
//! The charset is found by an ordered list of [`CharsetStep`]s. Each step either yields a
//! charset, passes (`Ok(None)`) or fails with a connection error, which stops the chain.
//! A driver lacking an accessor is never an error.

use std::{
    collections::{BTreeMap, HashMap},
    fmt,
    hash::Hash,
};

use crate::{
    connection_like::{column_text, ConnectionLike},
    error::Result,
    version::ServerVersion,
};

/// Servers before this version are asked through the driver first.
pub const DEFAULT_CHARSET_THRESHOLD: &[u64] = &[4, 1, 0];

/// Query listing the `character_set%` server variables.
pub const CHARSET_VARIABLES_QUERY: &str = "SHOW VARIABLES LIKE 'character_set%'";

/// Charset assumed when nothing else is known.
pub const FALLBACK_CHARSET: &str = "latin1";

/// Constants used by the charset detection chain.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
pub struct CharsetConfig {
    /// Servers older than this prefer the driver accessor over the variables query.
    pub threshold: &'static [u64],
    pub variables_query: &'static str,
    /// Variable holding the charset of result sets.
    pub results_variable: &'static str,
    /// Variable reported by pre-4.1 servers.
    pub legacy_variable: &'static str,
    pub fallback: &'static str,
}

impl CharsetConfig {
    pub const MYSQLDB: CharsetConfig = CharsetConfig {
        threshold: DEFAULT_CHARSET_THRESHOLD,
        variables_query: CHARSET_VARIABLES_QUERY,
        results_variable: "character_set_results",
        legacy_variable: "character_set",
        fallback: FALLBACK_CHARSET,
    };
}

impl Default for CharsetConfig {
    fn default() -> Self {
        CharsetConfig::MYSQLDB
    }
}

/// Where a detected charset came from.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
pub enum CharsetSource {
    /// Caller supplied override.
    Forced,
    /// Driver-level accessor.
    Driver,
    /// `character_set_results` server variable.
    ResultsVariable,
    /// Pre-4.1 `character_set` server variable.
    LegacyVariable,
    /// Nothing was found, the fallback charset was assumed.
    Fallback,
}

/// Character set in effect for a connection.
#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub struct Charset {
    name: String,
    source: CharsetSource,
}

impl Charset {
    pub fn new<T: Into<String>>(name: T, source: CharsetSource) -> Self {
        Charset {
            name: name.into(),
            source,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn source(&self) -> CharsetSource {
        self.source
    }

    pub fn into_name(self) -> String {
        self.name
    }
}

impl fmt::Display for Charset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

impl PartialEq<str> for Charset {
    fn eq(&self, other: &str) -> bool {
        self.name == other
    }
}

impl PartialEq<&str> for Charset {
    fn eq(&self, other: &&str) -> bool {
        self.name == *other
    }
}

/// State shared by the steps of one detection run.
#[derive(Debug)]
pub struct ResolveState<'a> {
    forced_override: Option<&'a str>,
    version: &'a ServerVersion,
    config: &'a CharsetConfig,
    variables: Option<BTreeMap<String, String>>,
}

impl<'a> ResolveState<'a> {
    pub fn new(
        forced_override: Option<&'a str>,
        version: &'a ServerVersion,
        config: &'a CharsetConfig,
    ) -> Self {
        ResolveState {
            forced_override,
            version,
            config,
            variables: None,
        }
    }

    pub fn forced_override(&self) -> Option<&'a str> {
        self.forced_override
    }

    pub fn version(&self) -> &'a ServerVersion {
        self.version
    }

    pub fn config(&self) -> &'a CharsetConfig {
        self.config
    }

    /// `true` if the variables query was already executed.
    pub fn has_variables(&self) -> bool {
        self.variables.is_some()
    }

    /// Charset variables of the connection. The query runs at most once per state.
    pub fn variables(
        &mut self,
        conn: &mut dyn ConnectionLike,
    ) -> Result<&BTreeMap<String, String>> {
        if self.variables.is_none() {
            let rows = conn.execute(self.config.variables_query)?;
            let variables = rows
                .iter()
                .filter_map(|row| Some((column_text(row, 0)?, column_text(row, 1)?)))
                .collect();
            self.variables = Some(variables);
        }
        Ok(&*self.variables.get_or_insert_with(BTreeMap::new))
    }
}

/// Step of the detection chain.
pub type CharsetStrategy = fn(&mut dyn ConnectionLike, &mut ResolveState<'_>) -> Result<Option<Charset>>;

/// Named [`CharsetStrategy`].
#[derive(Clone, Copy)]
pub struct CharsetStep {
    pub name: &'static str,
    pub run: CharsetStrategy,
}

impl fmt::Debug for CharsetStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CharsetStep").field("name", &self.name).finish()
    }
}

/// Returns the caller's override without touching the connection.
pub fn forced_override(
    _: &mut dyn ConnectionLike,
    state: &mut ResolveState<'_>,
) -> Result<Option<Charset>> {
    Ok(state
        .forced_override()
        .map(|name| Charset::new(name, CharsetSource::Forced)))
}

/// Asks the driver, but only for servers older than [`CharsetConfig::threshold`].
pub fn pre_threshold_driver(
    conn: &mut dyn ConnectionLike,
    state: &mut ResolveState<'_>,
) -> Result<Option<Charset>> {
    let threshold = ServerVersion::numeric(state.config().threshold);
    if !state.version().is_before(&threshold)? {
        return Ok(None);
    }
    driver_accessor(conn, state)
}

/// Reads `character_set_results`, which reflects `SET NAMES` unlike the driver's view.
pub fn results_variable(
    conn: &mut dyn ConnectionLike,
    state: &mut ResolveState<'_>,
) -> Result<Option<Charset>> {
    let name = state.config().results_variable;
    Ok(state
        .variables(conn)?
        .get(name)
        .map(|value| Charset::new(value.as_str(), CharsetSource::ResultsVariable)))
}

/// Driver-level accessor. A driver without one passes.
pub fn driver_accessor(
    conn: &mut dyn ConnectionLike,
    _: &mut ResolveState<'_>,
) -> Result<Option<Charset>> {
    Ok(conn
        .character_set_name()?
        .map(|name| Charset::new(name, CharsetSource::Driver)))
}

/// Pre-4.1 servers report a single `character_set` variable.
pub fn legacy_variable(
    conn: &mut dyn ConnectionLike,
    state: &mut ResolveState<'_>,
) -> Result<Option<Charset>> {
    let name = state.config().legacy_variable;
    Ok(state
        .variables(conn)?
        .get(name)
        .map(|value| Charset::new(value.as_str(), CharsetSource::LegacyVariable)))
}

/// Always yields [`CharsetConfig::fallback`] and warns about it.
pub fn fallback(
    _: &mut dyn ConnectionLike,
    state: &mut ResolveState<'_>,
) -> Result<Option<Charset>> {
    let charset = state.config().fallback;

    #[cfg(feature = "tracing")]
    tracing::warn!(
        charset,
        "Could not detect the connection character set with this combination of MySQL server \
         and driver. A driver with a character set accessor is recommended. Assuming {}.",
        charset
    );

    Ok(Some(Charset::new(charset, CharsetSource::Fallback)))
}

/// The detection chain, in order.
pub const DEFAULT_CHARSET_STEPS: &[CharsetStep] = &[
    CharsetStep {
        name: "forced_override",
        run: forced_override,
    },
    CharsetStep {
        name: "pre_threshold_driver",
        run: pre_threshold_driver,
    },
    CharsetStep {
        name: "results_variable",
        run: results_variable,
    },
    CharsetStep {
        name: "driver_accessor",
        run: driver_accessor,
    },
    CharsetStep {
        name: "legacy_variable",
        run: legacy_variable,
    },
    CharsetStep {
        name: "fallback",
        run: fallback,
    },
];

/// Detects the connection charset with [`CharsetConfig::MYSQLDB`].
///
/// See [`resolve_charset_with`].
pub fn resolve_charset(
    conn: &mut dyn ConnectionLike,
    forced_override: Option<&str>,
    version: &ServerVersion,
) -> Result<Charset> {
    resolve_charset_with(
        conn,
        forced_override,
        version,
        &CharsetConfig::MYSQLDB,
        DEFAULT_CHARSET_STEPS,
    )
}

/// Runs `steps` until one yields a charset.
///
/// Connection errors and version comparison errors are returned as is. If no step yields,
/// [`CharsetConfig::fallback`] is returned.
pub fn resolve_charset_with(
    conn: &mut dyn ConnectionLike,
    forced_override: Option<&str>,
    version: &ServerVersion,
    config: &CharsetConfig,
    steps: &[CharsetStep],
) -> Result<Charset> {
    let mut state = ResolveState::new(forced_override, version, config);
    for step in steps {
        if let Some(charset) = (step.run)(conn, &mut state)? {
            #[cfg(feature = "tracing")]
            tracing::debug!(step = step.name, charset = charset.name(), "charset detected");
            return Ok(charset);
        }
    }
    Ok(Charset::new(config.fallback, CharsetSource::Fallback))
}

/// Remembers the detected charset of each connection.
#[derive(Debug, Clone)]
pub struct CharsetCache<K> {
    charsets: HashMap<K, Charset>,
}

impl<K: Hash + Eq> CharsetCache<K> {
    pub fn new() -> Self {
        CharsetCache {
            charsets: HashMap::new(),
        }
    }

    pub fn get(&self, id: &K) -> Option<&Charset> {
        self.charsets.get(id)
    }

    /// Returns the cached charset of connection `id`, detecting it on a miss.
    ///
    /// Failed detections are not cached.
    pub fn get_or_resolve(
        &mut self,
        id: K,
        conn: &mut dyn ConnectionLike,
        forced_override: Option<&str>,
        version: &ServerVersion,
    ) -> Result<Charset> {
        if let Some(charset) = self.charsets.get(&id) {
            return Ok(charset.clone());
        }
        let charset = resolve_charset(conn, forced_override, version)?;
        self.charsets.insert(id, charset.clone());
        Ok(charset)
    }

    /// Forgets connection `id`, e.g. after it was closed or ran `SET NAMES`.
    pub fn invalidate(&mut self, id: &K) -> Option<Charset> {
        self.charsets.remove(id)
    }

    pub fn len(&self) -> usize {
        self.charsets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.charsets.is_empty()
    }
}

impl<K: Hash + Eq> Default for CharsetCache<K> {
    fn default() -> Self {
        CharsetCache::new()
    }
}

#[cfg(test)]
mod test {
    use mysql_common::value::Value;

    use super::{
        driver_accessor, forced_override, legacy_variable, pre_threshold_driver,
        results_variable, CharsetConfig, CharsetSource, ResolveState,
    };
    use crate::{
        connection_like::{ConnectionLike, Row},
        error::ConnectionError,
        version::parse_version,
    };

    #[derive(Default)]
    struct Stub {
        rows: Vec<(&'static str, &'static str)>,
        driver_charset: Option<&'static str>,
        executed: usize,
    }

    impl ConnectionLike for Stub {
        fn execute(&mut self, _: &str) -> Result<Vec<Row>, ConnectionError> {
            self.executed += 1;
            Ok(self
                .rows
                .iter()
                .map(|(name, value)| {
                    vec![
                        Value::Bytes(name.as_bytes().to_vec()),
                        Value::Bytes(value.as_bytes().to_vec()),
                    ]
                })
                .collect())
        }

        fn character_set_name(&mut self) -> Result<Option<String>, ConnectionError> {
            Ok(self.driver_charset.map(String::from))
        }

        fn ping(&mut self) -> Result<(), ConnectionError> {
            Ok(())
        }
    }

    #[test]
    fn each_step_passes_when_it_has_nothing() {
        let version = parse_version("5.5.0");
        let mut conn = Stub::default();
        let mut state = ResolveState::new(None, &version, &CharsetConfig::MYSQLDB);

        assert_eq!(forced_override(&mut conn, &mut state).unwrap(), None);
        assert_eq!(pre_threshold_driver(&mut conn, &mut state).unwrap(), None);
        assert_eq!(results_variable(&mut conn, &mut state).unwrap(), None);
        assert_eq!(driver_accessor(&mut conn, &mut state).unwrap(), None);
        assert_eq!(legacy_variable(&mut conn, &mut state).unwrap(), None);
        assert_eq!(conn.executed, 1);
    }

    #[test]
    fn pre_threshold_step_skips_modern_servers() {
        let mut conn = Stub {
            driver_charset: Some("utf8"),
            ..Stub::default()
        };

        let modern = parse_version("4.1.0");
        let mut state = ResolveState::new(None, &modern, &CharsetConfig::MYSQLDB);
        assert_eq!(pre_threshold_driver(&mut conn, &mut state).unwrap(), None);

        let old = parse_version("4.0.27-standard");
        let mut state = ResolveState::new(None, &old, &CharsetConfig::MYSQLDB);
        let charset = pre_threshold_driver(&mut conn, &mut state).unwrap().unwrap();
        assert_eq!(charset, "utf8");
        assert_eq!(charset.source(), CharsetSource::Driver);
        assert!(!state.has_variables());
    }

    #[test]
    fn pre_threshold_step_reports_incomparable_versions() {
        let mut conn = Stub::default();
        let odd = parse_version("beta.1");
        let mut state = ResolveState::new(None, &odd, &CharsetConfig::MYSQLDB);
        assert!(pre_threshold_driver(&mut conn, &mut state).is_err());
    }

    #[test]
    fn variable_steps_share_one_query() {
        let version = parse_version("4.0.1");
        let mut conn = Stub {
            rows: vec![("character_set", "cp1251")],
            ..Stub::default()
        };
        let mut state = ResolveState::new(None, &version, &CharsetConfig::MYSQLDB);

        assert_eq!(results_variable(&mut conn, &mut state).unwrap(), None);
        let charset = legacy_variable(&mut conn, &mut state).unwrap().unwrap();
        assert_eq!(charset.name(), "cp1251");
        assert_eq!(charset.source(), CharsetSource::LegacyVariable);
        assert_eq!(conn.executed, 1);
    }
}
