// Copyright (c) 2016 Anatoly Ikorsky
//
// Licensed under the Apache License, Version 2.0
// <LICENSE-APACHE or http://www.apache.org/licenses/LICENSE-2.0> or the MIT
// license <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. All files in the project carrying such notice may not be copied,
// modified, or distributed except according to those terms.

use std::borrow::Cow;

/// How bound parameters are written in statement text.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
pub enum Paramstyle {
    /// `?`
    Qmark,
    /// `:1`
    Numeric,
    /// `:name`
    Named,
    /// `%s`
    Format,
    /// `%(name)s`
    Pyformat,
}

impl Paramstyle {
    /// Whether `%` starts a placeholder, so a literal `%` has to be doubled.
    pub fn uses_percent(&self) -> bool {
        matches!(self, Paramstyle::Format | Paramstyle::Pyformat)
    }

    /// Placeholder for the parameter at `index` (zero based) named `name`.
    pub fn placeholder(&self, index: usize, name: &str) -> String {
        match self {
            Paramstyle::Qmark => "?".into(),
            Paramstyle::Numeric => format!(":{}", index + 1),
            Paramstyle::Named => format!(":{}", name),
            Paramstyle::Format => "%s".into(),
            Paramstyle::Pyformat => format!("%({})s", name),
        }
    }
}

/// Binary operators whose spelling may depend on the driver.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
pub enum Operator {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    Like,
    NotLike,
}

impl Operator {
    /// Spelling of the operator in MySQL.
    pub fn mysql_spelling(&self) -> &'static str {
        match self {
            Operator::Add => "+",
            Operator::Sub => "-",
            Operator::Mul => "*",
            Operator::Div => "/",
            Operator::Mod => "%",
            Operator::Eq => "=",
            Operator::Ne => "!=",
            Operator::Lt => "<",
            Operator::Le => "<=",
            Operator::Gt => ">",
            Operator::Ge => ">=",
            Operator::Like => "LIKE",
            Operator::NotLike => "NOT LIKE",
        }
    }
}

/// Driver-specific operator spellings layered over the MySQL ones.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
pub struct OperatorTable {
    overrides: &'static [(Operator, &'static str)],
}

impl OperatorTable {
    pub const MYSQL: OperatorTable = OperatorTable { overrides: &[] };

    /// `%` is a placeholder marker for MySQL-python, so modulo is `%%`.
    pub const MYSQLDB: OperatorTable = OperatorTable {
        overrides: &[(Operator::Mod, "%%")],
    };

    pub const fn new(overrides: &'static [(Operator, &'static str)]) -> Self {
        OperatorTable { overrides }
    }

    pub fn spell(&self, op: Operator) -> &'static str {
        self.overrides
            .iter()
            .find(|(candidate, _)| *candidate == op)
            .map(|(_, spelling)| *spelling)
            .unwrap_or_else(|| op.mysql_spelling())
    }

    /// Renders `left <op> right`.
    pub fn binary(&self, left: &str, op: Operator, right: &str) -> String {
        format!("{} {} {}", left, self.spell(op), right)
    }
}

impl Default for OperatorTable {
    fn default() -> Self {
        OperatorTable::MYSQL
    }
}

/// Escapes literal `%` of a textual SQL fragment for percent based paramstyles.
pub fn post_process_text(text: &str, paramstyle: Paramstyle) -> Cow<'_, str> {
    if paramstyle.uses_percent() && text.contains('%') {
        Cow::Owned(text.replace('%', "%%"))
    } else {
        Cow::Borrowed(text)
    }
}
