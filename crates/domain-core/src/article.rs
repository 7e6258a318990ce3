//! 商品

use gestion_errors::{AppError, AppResult};
use serde::{Deserialize, Serialize};

/// 可选的商品类别
pub const CATEGORIES: [&str; 6] = [
    "Électronique",
    "Informatique",
    "Bureau",
    "Fournitures",
    "Mobilier",
    "Divers",
];

/// 商品编码长度（数据库生成）
pub const REFART_LEN: usize = 4;

/// 商品记录
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Article {
    pub refart: String,
    pub designation: String,
    pub prix_a: f64,
    pub prix_v: f64,
    pub codetva: i32,
    pub categorie: Option<String>,
    pub qtestk: i64,
}

impl Article {
    /// 去掉 CHAR(4) 补齐的空格
    pub fn normalized(mut self) -> Self {
        self.refart = self.refart.trim().to_string();
        self
    }
}

/// 新建商品参数
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NouvelArticle {
    pub designation: String,
    pub prix_a: f64,
    pub prix_v: f64,
    pub codetva: i32,
    pub categorie: Option<String>,
    #[serde(default)]
    pub qtestk: i64,
}

/// 修改商品参数，None 表示不修改
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModificationArticle {
    pub designation: Option<String>,
    pub prix_a: Option<f64>,
    pub prix_v: Option<f64>,
    pub codetva: Option<i32>,
    pub categorie: Option<String>,
    pub qtestk: Option<i64>,
}

impl ModificationArticle {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// 商品搜索条件
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ArticleFiltre {
    pub refart: Option<String>,
    pub designation: Option<String>,
    pub categorie: Option<String>,
}

/// TVA 编码的显示标签
pub fn libelle_tva(codetva: i32) -> &'static str {
    match codetva {
        1 => "TVA 7%",
        2 => "TVA 19%",
        _ => "TVA ?",
    }
}

/// 售价必须高于进价
///
/// 仅用于界面提示，数据库包才是权威。
pub fn verifier_prix(prix_a: f64, prix_v: f64) -> AppResult<()> {
    if prix_v <= prix_a {
        return Err(AppError::validation(
            "The selling price must be greater than the purchase price",
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_article_json_field_names() {
        let article = Article {
            refart: "A001".to_string(),
            designation: "Clavier".to_string(),
            prix_a: 10.0,
            prix_v: 15.5,
            codetva: 2,
            categorie: Some("Informatique".to_string()),
            qtestk: 3,
        };

        let json = serde_json::to_value(&article).unwrap();
        assert_eq!(json["prixA"], 10.0);
        assert_eq!(json["prixV"], 15.5);
        assert_eq!(json["qtestk"], 3);
    }

    #[test]
    fn test_normalized_trims_refart() {
        let article = Article {
            refart: "B12 ".to_string(),
            designation: "Stylo".to_string(),
            prix_a: 1.0,
            prix_v: 2.0,
            codetva: 1,
            categorie: None,
            qtestk: 0,
        };
        assert_eq!(article.normalized().refart, "B12");
    }

    #[test]
    fn test_price_check() {
        assert!(verifier_prix(10.0, 12.0).is_ok());
        assert!(verifier_prix(10.0, 10.0).is_err());
        assert!(verifier_prix(10.0, 9.99).is_err());
    }

    #[test]
    fn test_empty_modification() {
        assert!(ModificationArticle::default().is_empty());
        let patch = ModificationArticle {
            qtestk: Some(5),
            ..Default::default()
        };
        assert!(!patch.is_empty());
    }
}
