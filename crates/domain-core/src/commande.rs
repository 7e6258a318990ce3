//! 订单与订单状态

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use gestion_errors::{AppError, AppResult};
use serde::{Deserialize, Serialize};

/// 订单状态
///
/// 状态机由数据库包维护；这里的后继表只描述应用层会发起的迁移。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EtatCommande {
    #[serde(rename = "EC")]
    EnCours,
    #[serde(rename = "PR")]
    Prete,
    #[serde(rename = "LI")]
    Livree,
    #[serde(rename = "SO")]
    Soldee,
    #[serde(rename = "AN")]
    Annulee,
    #[serde(rename = "AL")]
    AnnuleeEnLivraison,
}

impl EtatCommande {
    pub const ALL: [EtatCommande; 6] = [
        Self::EnCours,
        Self::Prete,
        Self::Livree,
        Self::Soldee,
        Self::Annulee,
        Self::AnnuleeEnLivraison,
    ];

    /// 两位状态码
    pub fn code(&self) -> &'static str {
        match self {
            Self::EnCours => "EC",
            Self::Prete => "PR",
            Self::Livree => "LI",
            Self::Soldee => "SO",
            Self::Annulee => "AN",
            Self::AnnuleeEnLivraison => "AL",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|etat| etat.code() == code.trim())
    }

    /// 显示标签
    pub fn libelle(&self) -> &'static str {
        match self {
            Self::EnCours => "En cours",
            Self::Prete => "Prête",
            Self::Livree => "Livrée",
            Self::Soldee => "Soldée",
            Self::Annulee => "Annulée",
            Self::AnnuleeEnLivraison => "Annulée (en cours de livraison)",
        }
    }

    /// 可请求的后继状态
    pub fn suivants(&self) -> &'static [EtatCommande] {
        match self {
            Self::EnCours => &[Self::Prete, Self::Annulee],
            Self::Prete => &[Self::Livree, Self::Annulee, Self::AnnuleeEnLivraison],
            Self::Livree => &[Self::Soldee],
            Self::Soldee | Self::Annulee | Self::AnnuleeEnLivraison => &[],
        }
    }

    pub fn est_terminal(&self) -> bool {
        self.suivants().is_empty()
    }

    /// 只有在途订单可以追加明细
    pub fn accepte_lignes(&self) -> bool {
        *self == Self::EnCours
    }

    /// 迁移到该状态前订单至少需要一条明细
    pub fn exige_lignes(&self) -> bool {
        *self == Self::Prete
    }
}

impl fmt::Display for EtatCommande {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for EtatCommande {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_code(s).ok_or_else(|| {
            AppError::validation(format!(
                "Invalid order state '{}' (allowed: EC,PR,LI,SO,AN,AL)",
                s
            ))
        })
    }
}

/// 应用层在请求迁移前检查的前置条件
///
/// 其余迁移规则由数据库包裁决。
pub fn verifier_preconditions(cible: EtatCommande, nb_lignes: i64) -> AppResult<()> {
    if cible.exige_lignes() && nb_lignes == 0 {
        return Err(AppError::validation(
            "The order must contain at least one article before it can become ready (PR)",
        ));
    }
    Ok(())
}

/// 订单记录
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Commande {
    pub nocde: i64,
    pub noclt: i64,
    pub datecde: NaiveDate,
    pub etatcde: EtatCommande,
}

/// 订单搜索条件
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CommandeFiltre {
    pub nocde: Option<i64>,
    pub noclt: Option<i64>,
    pub date: Option<DateTime<Utc>>,
}
