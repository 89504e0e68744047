// Copyright (c) 2019 Anatoly Ikorsky
//
// Licensed under the Apache License, Version 2.0
// <LICENSE-APACHE or http://www.apache.org/licenses/LICENSE-2.0> or the MIT
// license <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. All files in the project carrying such notice may not be copied,
// modified, or distributed except according to those terms.

use mysqldb_dialect::{
    charset_steps, parse_version, prelude::*, resolve_charset, resolve_charset_with, Charset,
    CharsetCache, CharsetConfig, CharsetSource, CharsetStep, ConnectionError, Dialect, Error,
    Row, ServerError, Value, CHARSET_VARIABLES_QUERY,
};

use std::io;

/// Scripted connection recording every call made to it.
#[derive(Default)]
struct FakeConn {
    variables: Vec<(&'static str, &'static str)>,
    driver_charset: Option<&'static str>,
    server_info: Option<&'static str>,
    fail_execute: bool,
    fail_accessor: bool,
    executed: Vec<String>,
    accessor_calls: usize,
    pings: usize,
}

impl FakeConn {
    fn with_variables(variables: &[(&'static str, &'static str)]) -> Self {
        FakeConn {
            variables: variables.to_vec(),
            ..FakeConn::default()
        }
    }

    fn calls(&self) -> usize {
        self.executed.len() + self.accessor_calls
    }
}

impl ConnectionLike for FakeConn {
    fn execute(&mut self, sql: &str) -> Result<Vec<Row>, ConnectionError> {
        self.executed.push(sql.to_owned());
        if self.fail_execute {
            return Err(io::Error::new(io::ErrorKind::ConnectionReset, "connection reset").into());
        }
        Ok(self
            .variables
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
        self.accessor_calls += 1;
        if self.fail_accessor {
            return Err(ServerError::new(2006, "MySQL server has gone away").into());
        }
        Ok(self.driver_charset.map(String::from))
    }

    fn server_info(&mut self) -> Result<Option<String>, ConnectionError> {
        Ok(self.server_info.map(String::from))
    }

    fn ping(&mut self) -> Result<(), ConnectionError> {
        self.pings += 1;
        Ok(())
    }
}

#[test]
fn forced_override_does_not_touch_connection() {
    let mut conn = FakeConn::with_variables(&[("character_set_results", "latin1")]);
    let charset = resolve_charset(&mut conn, Some("utf8"), &parse_version("5.5.0")).unwrap();

    assert_eq!(charset, "utf8");
    assert_eq!(charset.source(), CharsetSource::Forced);
    assert_eq!(conn.calls(), 0);
}

#[test]
fn prefers_character_set_results() {
    let mut conn = FakeConn::with_variables(&[
        ("character_set_results", "utf8mb4"),
        ("character_set_client", "utf8mb4"),
    ]);
    conn.driver_charset = Some("latin1");

    let charset = resolve_charset(&mut conn, None, &parse_version("5.5.0")).unwrap();

    assert_eq!(charset.name(), "utf8mb4");
    assert_eq!(charset.source(), CharsetSource::ResultsVariable);
    assert_eq!(conn.executed, vec![CHARSET_VARIABLES_QUERY.to_owned()]);
    assert_eq!(conn.accessor_calls, 0);
}

#[test]
fn falls_back_to_driver_accessor() {
    let mut conn = FakeConn::with_variables(&[("character_set_client", "utf8")]);
    conn.driver_charset = Some("cp1251");

    let charset = resolve_charset(&mut conn, None, &parse_version("5.0.91")).unwrap();

    assert_eq!(charset, "cp1251");
    assert_eq!(charset.source(), CharsetSource::Driver);
    assert_eq!(conn.executed.len(), 1);
    assert_eq!(conn.accessor_calls, 1);
}

#[test]
fn falls_back_to_legacy_variable() {
    let mut conn = FakeConn::with_variables(&[("character_set", "latin1")]);

    let charset = resolve_charset(&mut conn, None, &parse_version("4.0.20")).unwrap();

    assert_eq!(charset, "latin1");
    assert_eq!(charset.source(), CharsetSource::LegacyVariable);
    // Asked once before the query (old server) and once after it.
    assert_eq!(conn.accessor_calls, 2);
}

#[test]
fn assumes_latin1_when_nothing_is_known() {
    let mut conn = FakeConn::with_variables(&[("character_set_client", "utf8")]);

    let charset = resolve_charset(&mut conn, None, &parse_version("5.5.0")).unwrap();

    assert_eq!(charset, "latin1");
    assert_eq!(charset.source(), CharsetSource::Fallback);
}

#[test]
fn old_servers_ask_the_driver_first() {
    let mut conn = FakeConn::with_variables(&[("character_set_results", "utf8")]);
    conn.driver_charset = Some("koi8r");

    let charset = resolve_charset(&mut conn, None, &parse_version("4.0.27")).unwrap();

    assert_eq!(charset, "koi8r");
    assert!(conn.executed.is_empty());
}

#[test]
fn old_servers_without_accessor_run_the_query() {
    let mut conn = FakeConn::with_variables(&[("character_set_results", "utf8")]);

    let charset = resolve_charset(&mut conn, None, &parse_version("4.0.27")).unwrap();

    assert_eq!(charset, "utf8");
    assert_eq!(conn.executed.len(), 1);
}

#[test]
fn propagates_query_failures() {
    let mut conn = FakeConn {
        fail_execute: true,
        ..FakeConn::default()
    };

    let err = resolve_charset(&mut conn, None, &parse_version("5.5.0")).unwrap_err();

    assert!(matches!(err, Error::Connection(ConnectionError::Io(_))));
    assert!(err.is_fatal());
}

#[test]
fn propagates_accessor_failures() {
    let mut conn = FakeConn {
        fail_accessor: true,
        ..FakeConn::default()
    };

    let err = resolve_charset(&mut conn, None, &parse_version("4.0.1")).unwrap_err();

    assert_eq!(mysqldb_dialect::extract_error_code(&err), Some(2006));
    assert!(conn.executed.is_empty());
}

#[test]
fn reports_incomparable_versions() {
    let mut conn = FakeConn::default();

    let err = resolve_charset(&mut conn, None, &parse_version("gamma")).unwrap_err();

    assert!(matches!(err, Error::Comparison(_)));
    assert_eq!(conn.calls(), 0);
}

#[test]
fn custom_chains_are_honored() {
    const DRIVER_ONLY: &[CharsetStep] = &[
        CharsetStep {
            name: "driver_accessor",
            run: charset_steps::driver_accessor,
        },
        CharsetStep {
            name: "fallback",
            run: charset_steps::fallback,
        },
    ];
    let config = CharsetConfig {
        fallback: "utf8",
        ..CharsetConfig::MYSQLDB
    };

    let mut conn = FakeConn::with_variables(&[("character_set_results", "latin1")]);
    let charset = resolve_charset_with(
        &mut conn,
        None,
        &parse_version("8.0.36"),
        &config,
        DRIVER_ONLY,
    )
    .unwrap();

    assert_eq!(charset, Charset::new("utf8", CharsetSource::Fallback));
    assert!(conn.executed.is_empty());

    let charset =
        resolve_charset_with(&mut conn, None, &parse_version("8.0.36"), &config, &[]).unwrap();
    assert_eq!(charset.source(), CharsetSource::Fallback);
}

#[test]
fn cache_resolves_each_connection_once() {
    let mut cache = CharsetCache::new();
    let version = parse_version("5.7.44");
    let mut conn = FakeConn::with_variables(&[("character_set_results", "utf8")]);

    for _ in 0..3 {
        let charset = cache.get_or_resolve(1u32, &mut conn, None, &version).unwrap();
        assert_eq!(charset, "utf8");
    }
    assert_eq!(conn.executed.len(), 1);

    assert!(cache.invalidate(&1).is_some());
    cache.get_or_resolve(1, &mut conn, None, &version).unwrap();
    assert_eq!(conn.executed.len(), 2);
    assert_eq!(cache.len(), 1);
}

#[test]
fn cache_does_not_keep_failures() {
    let mut cache = CharsetCache::new();
    let mut conn = FakeConn {
        fail_execute: true,
        ..FakeConn::default()
    };

    assert!(cache
        .get_or_resolve("conn-1", &mut conn, None, &parse_version("5.7.44"))
        .is_err());
    assert!(cache.is_empty());
}

#[test]
fn dialect_reads_version_and_pings() {
    let dialect = Dialect::mysqldb();
    let mut conn = FakeConn {
        server_info: Some("5.1.44-beta"),
        ..FakeConn::default()
    };

    let version = dialect.server_version_info(&mut conn).unwrap();
    assert_eq!(version, parse_version("5.1.44-beta"));
    assert_eq!(version.tokens().len(), 4);

    dialect.do_ping(&mut conn).unwrap();
    assert_eq!(conn.pings, 1);

    let mut conn = FakeConn::default();
    assert!(dialect.server_version_info(&mut conn).unwrap().is_empty());
    assert_eq!(dialect.last_insert_id(&conn), None);
}
