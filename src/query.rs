use std::marker::PhantomData;
use std::sync::Arc;

use anyhow::{anyhow, Result};

use crate::db::DatabaseRef;
use crate::executor::SqlExecutor;
use crate::mapping::FromRowNamed;
use crate::statement::{SqlStatement, StatementKind};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PlaceholderStyle {
    AtP,
    Dollar,
}

impl PlaceholderStyle {
    pub fn placeholder(self, idx: usize) -> String {
        match self {
            PlaceholderStyle::AtP => format!("@P{}", idx),
            PlaceholderStyle::Dollar => format!("${}", idx),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ValueClass {
    Quoted,
    Bare,
}

#[derive(Clone, Debug, PartialEq)]
pub enum SqlParam {
    I32(i32),
    I64(i64),
    Bool(bool),
    Text(String),
    Date(chrono::NaiveDate),
    DateTime(chrono::NaiveDateTime),
    Null,
}

impl SqlParam {
    pub fn is_null(&self) -> bool {
        matches!(self, SqlParam::Null)
    }

    pub fn value_class(&self) -> ValueClass {
        match self {
            SqlParam::Text(_) | SqlParam::Date(_) | SqlParam::DateTime(_) => ValueClass::Quoted,
            _ => ValueClass::Bare,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            SqlParam::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn to_literal(&self, class: ValueClass) -> String {
        let raw = match self {
            SqlParam::Null => return "NULL".to_string(),
            SqlParam::I32(v) => v.to_string(),
            SqlParam::I64(v) => v.to_string(),
            SqlParam::Bool(v) => v.to_string(),
            SqlParam::Text(v) => v.clone(),
            SqlParam::Date(v) => v.format("%Y-%m-%d").to_string(),
            SqlParam::DateTime(v) => v.format("%Y-%m-%d %H:%M:%S").to_string(),
        };
        match class {
            ValueClass::Quoted => format!("'{}'", escape_single_quotes(&raw)),
            ValueClass::Bare => raw,
        }
    }
}

pub fn escape_single_quotes(value: &str) -> String {
    value.replace('\'', "''")
}

pub trait ToParam {
    fn to_param(self) -> SqlParam;
}

impl ToParam for i32 {
    fn to_param(self) -> SqlParam {
        SqlParam::I32(self)
    }
}
impl ToParam for i64 {
    fn to_param(self) -> SqlParam {
        SqlParam::I64(self)
    }
}
impl ToParam for bool {
    fn to_param(self) -> SqlParam {
        SqlParam::Bool(self)
    }
}
impl ToParam for String {
    fn to_param(self) -> SqlParam {
        SqlParam::Text(self)
    }
}
impl<'a> ToParam for &'a str {
    fn to_param(self) -> SqlParam {
        SqlParam::Text(self.to_string())
    }
}
impl ToParam for chrono::NaiveDate {
    fn to_param(self) -> SqlParam {
        SqlParam::Date(self)
    }
}
impl ToParam for chrono::NaiveDateTime {
    fn to_param(self) -> SqlParam {
        SqlParam::DateTime(self)
    }
}

impl<T: ToParam> ToParam for Option<T> {
    fn to_param(self) -> SqlParam {
        match self {
            Some(v) => v.to_param(),
            None => SqlParam::Null,
        }
    }
}

/// Accumulates a statement twice: once with bound placeholders for
/// execution and once with literal values for logs and assertions.
#[derive(Debug)]
pub struct SqlWriter {
    style: PlaceholderStyle,
    sql: String,
    inline: String,
    params: Vec<SqlParam>,
}

impl SqlWriter {
    pub fn new(style: PlaceholderStyle) -> Self {
        Self {
            style,
            sql: String::new(),
            inline: String::new(),
            params: Vec::new(),
        }
    }

    pub fn push(&mut self, text: &str) {
        self.sql.push_str(text);
        self.inline.push_str(text);
    }

    pub fn push_param(&mut self, param: SqlParam, class: ValueClass) {
        self.inline.push_str(&param.to_literal(class));
        self.params.push(param);
        let placeholder = self.style.placeholder(self.params.len());
        self.sql.push_str(&placeholder);
    }

    pub fn into_parts(self) -> (String, String, Vec<SqlParam>) {
        (self.sql, self.inline, self.params)
    }
}

#[derive(Clone, Debug)]
pub enum Expr {
    Col(String),
    Param(SqlParam),
    Binary {
        left: Box<Expr>,
        op: &'static str,
        right: Box<Expr>,
    },
    InList {
        left: Box<Expr>,
        list: Vec<SqlParam>,
    },
    Group(Box<Expr>),
}

impl Expr {
    fn binary(self, op: &'static str, rhs: Expr) -> Expr {
        Expr::Binary {
            left: Box::new(self),
            op,
            right: Box::new(rhs),
        }
    }

    pub fn eq(self, rhs: Expr) -> Expr {
        self.binary("=", rhs)
    }
    pub fn ne(self, rhs: Expr) -> Expr {
        self.binary("<>", rhs)
    }
    pub fn gt(self, rhs: Expr) -> Expr {
        self.binary(">", rhs)
    }
    pub fn ge(self, rhs: Expr) -> Expr {
        self.binary(">=", rhs)
    }
    pub fn lt(self, rhs: Expr) -> Expr {
        self.binary("<", rhs)
    }
    pub fn le(self, rhs: Expr) -> Expr {
        self.binary("<=", rhs)
    }
    pub fn and(self, rhs: Expr) -> Expr {
        self.binary("AND", rhs)
    }
    pub fn or(self, rhs: Expr) -> Expr {
        self.binary("OR", rhs)
    }
    pub fn in_list(self, list: Vec<SqlParam>) -> Expr {
        Expr::InList {
            left: Box::new(self),
            list,
        }
    }
    pub fn group(self) -> Expr {
        Expr::Group(Box::new(self))
    }

    pub fn write_to(&self, w: &mut SqlWriter) {
        match self {
            Expr::Col(c) => w.push(c),
            Expr::Param(p) => w.push_param(p.clone(), p.value_class()),
            Expr::Binary { left, op, right } => {
                let logical = *op == "AND" || *op == "OR";
                if !logical {
                    w.push("(");
                }
                left.write_to(w);
                w.push(" ");
                w.push(op);
                w.push(" ");
                right.write_to(w);
                if !logical {
                    w.push(")");
                }
            }
            Expr::InList { left, list } => {
                left.write_to(w);
                w.push(" IN (");
                for (i, p) in list.iter().enumerate() {
                    if i > 0 {
                        w.push(", ");
                    }
                    w.push_param(p.clone(), p.value_class());
                }
                w.push(")");
            }
            Expr::Group(e) => {
                w.push("(");
                e.write_to(w);
                w.push(")");
            }
        }
    }

    pub fn to_sql_with(&self, style: PlaceholderStyle, params: &mut Vec<SqlParam>) -> String {
        let mut w = SqlWriter {
            style,
            sql: String::new(),
            inline: String::new(),
            params: std::mem::take(params),
        };
        self.write_to(&mut w);
        let (sql, _, collected) = w.into_parts();
        *params = collected;
        sql
    }
}

#[macro_export]
macro_rules! col {
    ($name:expr) => {
        $crate::query::Expr::Col($name.to_string())
    };
}

#[macro_export]
macro_rules! val {
    ($v:expr) => {
        $crate::query::Expr::Param($crate::query::ToParam::to_param($v))
    };
}

pub(crate) fn render_select(
    w: &mut SqlWriter,
    table: &str,
    filters: &[Expr],
    order_by: Option<&str>,
    top: Option<i64>,
) {
    match (w.style, top) {
        (PlaceholderStyle::AtP, Some(n)) => w.push(&format!("SELECT TOP({}) * FROM {}", n, table)),
        _ => w.push(&format!("SELECT * FROM {}", table)),
    }
    let mut it = filters.iter();
    if let Some(first) = it.next() {
        w.push(" WHERE ");
        first.write_to(w);
        for f in it {
            w.push(" AND ");
            f.write_to(w);
        }
    }
    if let Some(ob) = order_by {
        w.push(" ORDER BY ");
        w.push(ob);
    }
    if let (PlaceholderStyle::Dollar, Some(n)) = (w.style, top) {
        w.push(&format!(" LIMIT {}", n));
    }
}

#[allow(non_snake_case)]
pub struct Query<T, E = DatabaseRef>
where
    T: FromRowNamed + Send + 'static,
    E: SqlExecutor,
{
    table: String,
    style: PlaceholderStyle,
    executor: Option<Arc<E>>,
    filters: Vec<Expr>,
    order_by: Option<String>,
    top: Option<i64>,
    _t: PhantomData<T>,
}

#[allow(non_snake_case)]
impl<T, E> Query<T, E>
where
    T: FromRowNamed + Send + 'static,
    E: SqlExecutor,
{
    pub fn new(table: &str, style: PlaceholderStyle) -> Self {
        Self {
            table: table.to_string(),
            style,
            executor: None,
            filters: Vec::new(),
            order_by: None,
            top: None,
            _t: PhantomData,
        }
    }

    pub fn with_executor(mut self, executor: Arc<E>) -> Self {
        self.executor = Some(executor);
        self
    }

    pub fn Where(mut self, expr: Expr) -> Self {
        self.filters.push(expr);
        self
    }

    pub fn OrderBy(mut self, ob: &str) -> Self {
        self.order_by = Some(ob.to_string());
        self
    }

    pub fn Top(mut self, n: i64) -> Self {
        self.top = Some(n);
        self
    }

    pub fn to_statement(&self) -> SqlStatement {
        let mut w = SqlWriter::new(self.style);
        render_select(
            &mut w,
            &self.table,
            &self.filters,
            self.order_by.as_deref(),
            self.top,
        );
        SqlStatement::from_writer(StatementKind::Select, &self.table, Vec::new(), w)
    }

    pub fn to_sql(&self) -> (String, Vec<SqlParam>) {
        let statement = self.to_statement();
        (statement.sql, statement.params)
    }

    pub async fn to_list_async(self) -> Result<Vec<T>> {
        let executor = self
            .executor
            .clone()
            .ok_or_else(|| anyhow!("executor not set on query for {}", self.table))?;
        let statement = self.to_statement();
        executor.query::<T>(&statement).await
    }

    pub async fn to_single_async(self) -> Result<Option<T>> {
        let mut list = self.Top(1).to_list_async().await?;
        Ok(list.pop())
    }
}
