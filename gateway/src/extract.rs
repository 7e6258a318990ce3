//! 请求提取与字段转换
//!
//! 前端提交的数值字段可能是数字也可能是数字字符串，这里统一宽松转换。
//! 必填检查按真值语义：缺失、null、空串、0、false 都视为缺失。

use std::collections::HashMap;

use axum::{
    Json,
    extract::{FromRequest, Request, rejection::JsonRejection},
};
use gestion_errors::{AppError, AppResult};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

/// JSON 请求体提取器
///
/// 解析失败时返回 400 失败信封，而不是 axum 默认的纯文本。
pub struct JsonBody<T>(pub T);

impl<S, T> FromRequest<S> for JsonBody<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(Self(value)),
            Err(rejection) => Err(json_rejection(rejection)),
        }
    }
}

fn json_rejection(rejection: JsonRejection) -> AppError {
    AppError::validation(format!("Invalid JSON body: {}", rejection.body_text()))
}

/// 请求字段集合（JSON 对象或查询串）
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(transparent)]
pub struct Fields(Map<String, Value>);

impl From<HashMap<String, String>> for Fields {
    fn from(params: HashMap<String, String>) -> Self {
        Self(
            params
                .into_iter()
                .map(|(key, value)| (key, Value::String(value)))
                .collect(),
        )
    }
}

impl From<Value> for Fields {
    fn from(value: Value) -> Self {
        match value {
            Value::Object(map) => Self(map),
            _ => Self::default(),
        }
    }
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

fn invalid_number(key: &str) -> AppError {
    AppError::validation(format!("Invalid numeric value for '{}'", key))
}

fn parse_f64(key: &str, value: &Value) -> AppResult<f64> {
    let parsed = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    parsed
        .filter(|f| f.is_finite())
        .ok_or_else(|| invalid_number(key))
}

fn parse_i64(key: &str, value: &Value) -> AppResult<i64> {
    if let Value::Number(n) = value {
        if let Some(i) = n.as_i64() {
            return Ok(i);
        }
    }
    if let Value::String(s) = value {
        if let Ok(i) = s.trim().parse::<i64>() {
            return Ok(i);
        }
    }
    // 允许 "3.0" 这类整数值的浮点写法
    let f = parse_f64(key, value)?;
    if f.fract() == 0.0 && f >= i64::MIN as f64 && f <= i64::MAX as f64 {
        Ok(f as i64)
    } else {
        Err(invalid_number(key))
    }
}

impl Fields {
    /// 字段已提供：存在、非 null、非空串
    fn provided(&self, key: &str) -> Option<&Value> {
        self.0.get(key).filter(|value| match value {
            Value::Null => false,
            Value::String(s) => !s.is_empty(),
            _ => true,
        })
    }

    pub fn is_truthy(&self, key: &str) -> bool {
        self.0.get(key).is_some_and(is_truthy)
    }

    /// 所有字段都为真值，否则以给定提示返回 400
    pub fn require(&self, keys: &[&str], message: &str) -> AppResult<()> {
        if keys.iter().all(|key| self.is_truthy(key)) {
            Ok(())
        } else {
            Err(AppError::validation(message))
        }
    }

    pub fn string(&self, key: &str) -> Option<String> {
        self.provided(key).map(|value| match value {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        })
    }

    pub fn f64(&self, key: &str) -> AppResult<Option<f64>> {
        self.provided(key).map(|v| parse_f64(key, v)).transpose()
    }

    pub fn i64(&self, key: &str) -> AppResult<Option<i64>> {
        self.provided(key).map(|v| parse_i64(key, v)).transpose()
    }

    pub fn i32(&self, key: &str) -> AppResult<Option<i32>> {
        self.i64(key)?
            .map(|v| i32::try_from(v).map_err(|_| invalid_number(key)))
            .transpose()
    }

    pub fn required_string(&self, key: &str) -> AppResult<String> {
        self.string(key).ok_or_else(|| missing(key))
    }

    pub fn required_f64(&self, key: &str) -> AppResult<f64> {
        self.f64(key)?.ok_or_else(|| missing(key))
    }

    pub fn required_i64(&self, key: &str) -> AppResult<i64> {
        self.i64(key)?.ok_or_else(|| missing(key))
    }

    pub fn required_i32(&self, key: &str) -> AppResult<i32> {
        self.i32(key)?.ok_or_else(|| missing(key))
    }
}

fn missing(key: &str) -> AppError {
    AppError::validation(format!("Field '{}' is required", key))
}

/// 解析路径中的数字段
pub fn path_i64(key: &str, raw: &str) -> AppResult<i64> {
    parse_i64(key, &Value::String(raw.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn fields(value: Value) -> Fields {
        Fields::from(value)
    }

    #[test]
    fn test_truthiness_matches_form_semantics() {
        let f = fields(json!({"a": 0, "b": "", "c": null, "d": "0", "e": 2.5, "f": false}));
        assert!(!f.is_truthy("a"));
        assert!(!f.is_truthy("b"));
        assert!(!f.is_truthy("c"));
        assert!(f.is_truthy("d"));
        assert!(f.is_truthy("e"));
        assert!(!f.is_truthy("f"));
        assert!(!f.is_truthy("missing"));
    }

    #[test]
    fn test_numeric_strings_are_coerced() {
        let f = fields(json!({"prixA": "12.5", "codetva": "2", "qtestk": 7, "n": "3.0"}));
        assert_eq!(f.f64("prixA").unwrap(), Some(12.5));
        assert_eq!(f.i32("codetva").unwrap(), Some(2));
        assert_eq!(f.i64("qtestk").unwrap(), Some(7));
        assert_eq!(f.i64("n").unwrap(), Some(3));
    }

    #[test]
    fn test_non_numeric_is_rejected() {
        let f = fields(json!({"prixA": "abc", "qtecde": 1.5}));
        assert_eq!(f.f64("prixA").unwrap_err().status_code(), 400);
        assert!(f.i64("qtecde").is_err());
    }

    #[test]
    fn test_blank_is_not_provided() {
        let f = fields(json!({"designation": "", "categorie": null, "qtestk": 0}));
        assert_eq!(f.string("designation"), None);
        assert_eq!(f.string("categorie"), None);
        assert_eq!(f.i64("qtestk").unwrap(), Some(0));
    }

    #[test]
    fn test_require_reports_message() {
        let f = fields(json!({"nocde": 1}));
        let err = f.require(&["nocde", "refart"], "refart missing").unwrap_err();
        assert_eq!(err.to_string(), "refart missing");
    }

    #[test]
    fn test_query_params() {
        let mut params = HashMap::new();
        params.insert("nocde".to_string(), "42".to_string());
        params.insert("date".to_string(), String::new());
        let f = Fields::from(params);
        assert_eq!(f.i64("nocde").unwrap(), Some(42));
        assert_eq!(f.string("date"), None);
    }

    #[test]
    fn test_path_number() {
        assert_eq!(path_i64("nocde", "17").unwrap(), 17);
        assert!(path_i64("nocde", "x17").is_err());
    }
}
