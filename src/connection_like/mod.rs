// Copyright (c) 2017 Anatoly Ikorsky
//
// Licensed under the Apache License, Version 2.0
// <LICENSE-APACHE or http://www.apache.org/licenses/LICENSE-2.0> or the MIT
// license <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. All files in the project carrying such notice may not be copied,
// modified, or distributed except according to those terms.

use mysql_common::value::{convert::from_value_opt, Value};

use crate::error::ConnectionError;

/// Result row, indexable by column position.
pub type Row = Vec<Value>;

/// Some open driver connection.
///
/// Calls are blocking and use whatever timeouts the underlying handle has.
/// Every method takes `&mut self`, so statements on one connection are serialized.
pub trait ConnectionLike {
    /// Executes a text query and returns all rows of its result set.
    fn execute(&mut self, sql: &str) -> Result<Vec<Row>, ConnectionError>;

    /// Driver's view of the connection character set.
    ///
    /// `Ok(None)` means the driver has no such accessor (defaults to `Ok(None)`).
    fn character_set_name(&mut self) -> Result<Option<String>, ConnectionError> {
        Ok(None)
    }

    /// Raw server version string, e.g. `5.1.44-beta`.
    ///
    /// `Ok(None)` means the driver has no such accessor (defaults to `Ok(None)`).
    fn server_info(&mut self) -> Result<Option<String>, ConnectionError> {
        Ok(None)
    }

    /// Checks that the connection is alive.
    fn ping(&mut self) -> Result<(), ConnectionError>;

    /// Id generated by the last `INSERT`, if the driver reports one (defaults to `None`).
    fn last_insert_id(&self) -> Option<u64> {
        None
    }
}

impl<T: ConnectionLike + ?Sized> ConnectionLike for &mut T {
    fn execute(&mut self, sql: &str) -> Result<Vec<Row>, ConnectionError> {
        (**self).execute(sql)
    }

    fn character_set_name(&mut self) -> Result<Option<String>, ConnectionError> {
        (**self).character_set_name()
    }

    fn server_info(&mut self) -> Result<Option<String>, ConnectionError> {
        (**self).server_info()
    }

    fn ping(&mut self) -> Result<(), ConnectionError> {
        (**self).ping()
    }

    fn last_insert_id(&self) -> Option<u64> {
        (**self).last_insert_id()
    }
}

impl<T: ConnectionLike + ?Sized> ConnectionLike for Box<T> {
    fn execute(&mut self, sql: &str) -> Result<Vec<Row>, ConnectionError> {
        (**self).execute(sql)
    }

    fn character_set_name(&mut self) -> Result<Option<String>, ConnectionError> {
        (**self).character_set_name()
    }

    fn server_info(&mut self) -> Result<Option<String>, ConnectionError> {
        (**self).server_info()
    }

    fn ping(&mut self) -> Result<(), ConnectionError> {
        (**self).ping()
    }

    fn last_insert_id(&self) -> Option<u64> {
        (**self).last_insert_id()
    }
}

/// Reads column `index` of `row` as text. `NULL`, missing and non-text columns give `None`.
pub fn column_text(row: &[Value], index: usize) -> Option<String> {
    row.get(index)
        .cloned()
        .and_then(|value| from_value_opt::<String>(value).ok())
}
