use crate::error::VaultError;
use crate::sql::template::SqlTemplate;
use chrono::{DateTime, SecondsFormat, Utc};
use sqlx::Sqlite;
use sqlx::query::Query;
use sqlx::sqlite::SqliteArguments;
use std::collections::BTreeMap;

/// A value bound to one positional parameter.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
    Bool(bool),
}

impl From<i64> for SqlValue {
    fn from(v: i64) -> Self {
        SqlValue::Integer(v)
    }
}

impl From<i32> for SqlValue {
    fn from(v: i32) -> Self {
        SqlValue::Integer(v.into())
    }
}

impl From<u32> for SqlValue {
    fn from(v: u32) -> Self {
        SqlValue::Integer(v.into())
    }
}

impl From<f64> for SqlValue {
    fn from(v: f64) -> Self {
        SqlValue::Real(v)
    }
}

impl From<bool> for SqlValue {
    fn from(v: bool) -> Self {
        SqlValue::Bool(v)
    }
}

impl From<String> for SqlValue {
    fn from(v: String) -> Self {
        SqlValue::Text(v)
    }
}

impl From<&str> for SqlValue {
    fn from(v: &str) -> Self {
        SqlValue::Text(v.to_string())
    }
}

impl From<&String> for SqlValue {
    fn from(v: &String) -> Self {
        SqlValue::Text(v.clone())
    }
}

/// Timestamps are stored as fixed-width RFC 3339 text (UTC, microseconds),
/// so text order is chronological order.
impl From<DateTime<Utc>> for SqlValue {
    fn from(v: DateTime<Utc>) -> Self {
        SqlValue::Text(v.to_rfc3339_opts(SecondsFormat::Micros, true))
    }
}

impl<T: Into<SqlValue>> From<Option<T>> for SqlValue {
    fn from(v: Option<T>) -> Self {
        v.map_or(SqlValue::Null, Into::into)
    }
}

/// Arguments for one statement: a name → value map for `:name` templates, or
/// an ordered list for plain `?` SQL.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Params {
    #[default]
    None,
    Named(BTreeMap<String, SqlValue>),
    Positional(Vec<SqlValue>),
}

impl Params {
    pub fn named() -> Self {
        Params::Named(BTreeMap::new())
    }

    pub fn positional<I, V>(values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<SqlValue>,
    {
        Params::Positional(values.into_iter().map(Into::into).collect())
    }

    /// Add one value. Turns `None` into a named map; appends to a positional
    /// list, in which case the name is ignored.
    pub fn with(self, name: impl Into<String>, value: impl Into<SqlValue>) -> Self {
        match self {
            Params::None => {
                let mut map = BTreeMap::new();
                map.insert(name.into(), value.into());
                Params::Named(map)
            }
            Params::Named(mut map) => {
                map.insert(name.into(), value.into());
                Params::Named(map)
            }
            Params::Positional(mut values) => {
                values.push(value.into());
                Params::Positional(values)
            }
        }
    }
}

/// Check that `args` names exactly the template's placeholders and return
/// the values in placeholder order. A name used twice is bound twice.
pub fn bind_named(
    template: &SqlTemplate,
    args: &BTreeMap<String, SqlValue>,
) -> Result<Vec<SqlValue>, VaultError> {
    let declared = template.distinct_keys();

    let missing: Vec<String> = declared
        .iter()
        .filter(|k| !args.contains_key(**k))
        .map(|k| k.to_string())
        .collect();
    if !missing.is_empty() {
        return Err(VaultError::MissingParameters(missing));
    }

    let extra: Vec<String> = args
        .keys()
        .filter(|k| !declared.contains(k.as_str()))
        .cloned()
        .collect();
    if !extra.is_empty() {
        return Err(VaultError::ExtraParameters(extra));
    }

    Ok(template
        .keys()
        .iter()
        .filter_map(|k| args.get(k).cloned())
        .collect())
}

/// A statement ready for execution: positional SQL plus its ordered values.
#[derive(Debug, Clone)]
pub struct Prepared {
    sql: String,
    values: Vec<SqlValue>,
}

impl Prepared {
    pub fn new(sql: &str, params: Params) -> Result<Self, VaultError> {
        match params {
            Params::Named(args) => {
                let template = SqlTemplate::parse(sql);
                let values = bind_named(&template, &args)?;
                Ok(Self {
                    sql: template.sql().to_string(),
                    values,
                })
            }
            Params::None => {
                let template = SqlTemplate::parse(sql);
                if !template.keys().is_empty() {
                    return Err(VaultError::MissingParameters(
                        template.distinct_keys().into_iter().map(String::from).collect(),
                    ));
                }
                Ok(Self {
                    sql: template.sql().to_string(),
                    values: Vec::new(),
                })
            }
            Params::Positional(values) => Ok(Self {
                sql: sql.to_string(),
                values,
            }),
        }
    }

    pub fn sql(&self) -> &str {
        &self.sql
    }

    pub fn values(&self) -> &[SqlValue] {
        &self.values
    }

    /// Build a sqlx query with every value bound in order.
    pub fn query(&self) -> Query<'_, Sqlite, SqliteArguments<'_>> {
        self.values
            .iter()
            .fold(sqlx::query(&self.sql), |query, value| match value {
                SqlValue::Null => query.bind(None::<String>),
                SqlValue::Integer(v) => query.bind(*v),
                SqlValue::Real(v) => query.bind(*v),
                SqlValue::Text(v) => query.bind(v.as_str()),
                SqlValue::Bool(v) => query.bind(*v),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(pairs: &[(&str, SqlValue)]) -> BTreeMap<String, SqlValue> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn binds_in_placeholder_order() {
        let t = SqlTemplate::parse("update t set a = :a, b = :b where a = :a");
        let values = bind_named(
            &t,
            &args(&[("b", 2i64.into()), ("a", "x".into())]),
        )
        .expect("bind");
        assert_eq!(
            values,
            vec![SqlValue::from("x"), SqlValue::Integer(2), SqlValue::from("x")]
        );
    }

    #[test]
    fn missing_parameter_is_named() {
        let t = SqlTemplate::parse("select * from t where a = :a and b = :b");
        let err = bind_named(&t, &args(&[("a", 1i64.into())])).unwrap_err();
        match err {
            VaultError::MissingParameters(names) => assert_eq!(names, ["b"]),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn extra_parameters_are_named() {
        let t = SqlTemplate::parse("select * from t where a = :a");
        let err = bind_named(
            &t,
            &args(&[("a", 1i64.into()), ("z", 2i64.into()), ("y", SqlValue::Null)]),
        )
        .unwrap_err();
        match err {
            VaultError::ExtraParameters(names) => assert_eq!(names, ["y", "z"]),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn none_option_becomes_null() {
        let note: Option<String> = None;
        assert_eq!(SqlValue::from(note), SqlValue::Null);
        assert_eq!(SqlValue::from(Some(3i64)), SqlValue::Integer(3));
    }

    #[test]
    fn builder_collects_named_values() {
        let params = Params::named().with("a", 1i64).with("b", None::<String>);
        let prepared = Prepared::new("select :a, :b", params).expect("prepare");
        assert_eq!(prepared.sql(), "select ?, ?");
        assert_eq!(prepared.values(), [SqlValue::Integer(1), SqlValue::Null]);
    }

    #[test]
    fn positional_sql_is_left_untouched() {
        let prepared =
            Prepared::new("select ? where x = '::'", Params::positional([5i64])).expect("prepare");
        assert_eq!(prepared.sql(), "select ? where x = '::'");
        assert_eq!(prepared.values(), [SqlValue::Integer(5)]);
    }

    #[test]
    fn named_sql_without_arguments_is_rejected() {
        let err = Prepared::new("select :a", Params::None).unwrap_err();
        assert!(matches!(err, VaultError::MissingParameters(ref n) if n == &["a"]));
    }
}
