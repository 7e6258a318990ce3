//! 配送

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use gestion_errors::AppError;
use serde::{Deserialize, Serialize};

use crate::EtatCommande;

/// 默认付款方式
pub const MODE_PAIEMENT_DEFAUT: &str = "avant_livraison";

/// 可选付款方式
pub const MODES_PAIEMENT: [&str; 2] = ["avant_livraison", "apres_livraison"];

/// 配送状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EtatLivraison {
    #[serde(rename = "EC")]
    EnCours,
    #[serde(rename = "LI")]
    Livree,
    #[serde(rename = "AL")]
    Annulee,
}

impl EtatLivraison {
    pub const ALL: [EtatLivraison; 3] = [Self::EnCours, Self::Livree, Self::Annulee];

    pub fn code(&self) -> &'static str {
        match self {
            Self::EnCours => "EC",
            Self::Livree => "LI",
            Self::Annulee => "AL",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|etat| etat.code() == code.trim())
    }

    pub fn libelle(&self) -> &'static str {
        match self {
            Self::EnCours => "En cours",
            Self::Livree => "Livrée",
            Self::Annulee => "Annulée",
        }
    }

    /// 配送状态变更后订单应写入的状态
    ///
    /// LI/AL 直接镜像到订单；回到 EC 时仅当订单当前为 PR 才重新写入 PR，否则不动。
    pub fn miroir_commande(&self, actuel: Option<EtatCommande>) -> Option<EtatCommande> {
        match self {
            Self::Livree => Some(EtatCommande::Livree),
            Self::Annulee => Some(EtatCommande::AnnuleeEnLivraison),
            Self::EnCours => actuel.filter(|etat| *etat == EtatCommande::Prete),
        }
    }
}

impl fmt::Display for EtatLivraison {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for EtatLivraison {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_code(s)
            .ok_or_else(|| AppError::validation("Invalid etatliv (allowed: EC,LI,AL)"))
    }
}

/// 配送记录，主键 (nocde, dateliv)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Livraison {
    pub nocde: i64,
    pub dateliv: NaiveDate,
    pub livreur: i64,
    pub modepay: String,
    pub etatliv: EtatLivraison,
}

/// 新建配送参数
#[derive(Debug, Clone, PartialEq)]
pub struct NouvelleLivraison {
    pub nocde: i64,
    pub livreur: i64,
    /// UTC 正午
    pub dateliv: DateTime<Utc>,
    pub modepay: String,
}

/// 修改配送参数，None 表示不修改
#[derive(Debug, Clone, PartialEq)]
pub struct ModificationLivraison {
    pub nocde: i64,
    pub dateliv: DateTime<Utc>,
    pub nouvelle_date: Option<DateTime<Utc>>,
    pub nouveau_livreur: Option<i64>,
}

/// 配送搜索条件
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LivraisonFiltre {
    pub nocde: Option<i64>,
    pub livreur: Option<i64>,
    pub code_postal: Option<i64>,
    pub date: Option<DateTime<Utc>>,
}
