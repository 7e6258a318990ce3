//! 订单明细

use serde::{Deserialize, Serialize};

/// 订单明细记录，(nocde, refart) 唯一
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LigCde {
    pub nocde: i64,
    pub refart: String,
    pub qtecde: i64,
}

/// 联表商品后的明细行
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LigCdeDetail {
    pub nocde: i64,
    pub refart: String,
    pub qtecde: i64,
    pub designation: String,
    #[serde(rename = "prixV")]
    pub prix_v: f64,
}

impl LigCdeDetail {
    pub fn montant(&self) -> f64 {
        self.qtecde as f64 * self.prix_v
    }
}
