//! 查询结果行
//!
//! 数值列在 SQL 中显式转换为 float8/int8，状态列以两位编码读取后再解析。

use chrono::NaiveDate;
use gestion_domain::{Article, Commande, EtatCommande, EtatLivraison, LigCde, LigCdeDetail, Livraison};
use gestion_errors::{AppError, AppResult};

/// 商品查询列
pub(crate) const ARTICLE_COLUMNS: &str = "refart, designation, prixa::float8 AS prix_a, \
     prixv::float8 AS prix_v, codetva::int4 AS codetva, categorie, qtestk::int8 AS qtestk";

/// 订单查询列
pub(crate) const COMMANDE_COLUMNS: &str =
    "nocde::int8 AS nocde, noclt::int8 AS noclt, datecde::date AS datecde, etatcde";

/// 配送查询列
pub(crate) const LIVRAISON_COLUMNS: &str = "nocde::int8 AS nocde, dateliv::date AS dateliv, \
     livreur::int8 AS livreur, modepay, etatliv";

#[derive(sqlx::FromRow)]
pub(crate) struct ArticleRow {
    refart: String,
    designation: String,
    prix_a: f64,
    prix_v: f64,
    codetva: i32,
    categorie: Option<String>,
    qtestk: Option<i64>,
}

impl From<ArticleRow> for Article {
    fn from(row: ArticleRow) -> Self {
        Article {
            refart: row.refart,
            designation: row.designation,
            prix_a: row.prix_a,
            prix_v: row.prix_v,
            codetva: row.codetva,
            categorie: row.categorie,
            qtestk: row.qtestk.unwrap_or(0),
        }
        .normalized()
    }
}

#[derive(sqlx::FromRow)]
pub(crate) struct CommandeRow {
    nocde: i64,
    noclt: i64,
    datecde: NaiveDate,
    etatcde: String,
}

impl TryFrom<CommandeRow> for Commande {
    type Error = AppError;

    fn try_from(row: CommandeRow) -> AppResult<Self> {
        let etatcde = EtatCommande::from_code(&row.etatcde).ok_or_else(|| {
            AppError::database(format!(
                "Unknown etatcde '{}' for order {}",
                row.etatcde, row.nocde
            ))
        })?;
        Ok(Commande {
            nocde: row.nocde,
            noclt: row.noclt,
            datecde: row.datecde,
            etatcde,
        })
    }
}

#[derive(sqlx::FromRow)]
pub(crate) struct LigCdeRow {
    nocde: i64,
    refart: String,
    qtecde: i64,
}

impl From<LigCdeRow> for LigCde {
    fn from(row: LigCdeRow) -> Self {
        LigCde {
            nocde: row.nocde,
            refart: row.refart.trim().to_string(),
            qtecde: row.qtecde,
        }
    }
}

#[derive(sqlx::FromRow)]
pub(crate) struct LigCdeDetailRow {
    nocde: i64,
    refart: String,
    qtecde: i64,
    designation: String,
    prix_v: f64,
}

impl From<LigCdeDetailRow> for LigCdeDetail {
    fn from(row: LigCdeDetailRow) -> Self {
        LigCdeDetail {
            nocde: row.nocde,
            refart: row.refart.trim().to_string(),
            qtecde: row.qtecde,
            designation: row.designation,
            prix_v: row.prix_v,
        }
    }
}

#[derive(sqlx::FromRow)]
pub(crate) struct LivraisonRow {
    nocde: i64,
    dateliv: NaiveDate,
    livreur: i64,
    modepay: Option<String>,
    etatliv: String,
}

impl TryFrom<LivraisonRow> for Livraison {
    type Error = AppError;

    fn try_from(row: LivraisonRow) -> AppResult<Self> {
        let etatliv = EtatLivraison::from_code(&row.etatliv).ok_or_else(|| {
            AppError::database(format!(
                "Unknown etatliv '{}' for order {}",
                row.etatliv, row.nocde
            ))
        })?;
        Ok(Livraison {
            nocde: row.nocde,
            dateliv: row.dateliv,
            livreur: row.livreur,
            modepay: row.modepay.unwrap_or_default(),
            etatliv,
        })
    }
}

pub(crate) fn collect_commandes(rows: Vec<CommandeRow>) -> AppResult<Vec<Commande>> {
    rows.into_iter().map(Commande::try_from).collect()
}

pub(crate) fn collect_livraisons(rows: Vec<LivraisonRow>) -> AppResult<Vec<Livraison>> {
    rows.into_iter().map(Livraison::try_from).collect()
}
