//! 数据库包抛出的业务规则编码
//!
//! 存储过程以 `-20xxx` 形式的应用错误号拒绝请求，这里把错误号映射为固定的用户提示。

use serde::Serialize;

/// 业务规则拒绝
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum BusinessRule {
    /// 20011: 当前状态下不能取消订单
    AnnulationImpossible,
    /// 20013: 订单已有配送，需先取消配送
    LivraisonExistante,
    /// 20020: 订单未就绪，不能安排配送
    CommandeNonPrete,
    /// 20021: 配送员当天该邮编已满 15 单
    QuotaLivreurAtteint,
    /// 20022: 配送日期早于今天
    DateLivraisonPassee,
    /// 20023: 订单、客户或配送员不存在
    ReferenceIntrouvable,
}

impl BusinessRule {
    /// 全部已知规则
    pub const ALL: [BusinessRule; 6] = [
        Self::AnnulationImpossible,
        Self::LivraisonExistante,
        Self::CommandeNonPrete,
        Self::QuotaLivreurAtteint,
        Self::DateLivraisonPassee,
        Self::ReferenceIntrouvable,
    ];

    /// 应用错误号（不带符号）
    pub fn code(&self) -> u32 {
        match self {
            Self::AnnulationImpossible => 20011,
            Self::LivraisonExistante => 20013,
            Self::CommandeNonPrete => 20020,
            Self::QuotaLivreurAtteint => 20021,
            Self::DateLivraisonPassee => 20022,
            Self::ReferenceIntrouvable => 20023,
        }
    }

    /// 按错误号查找规则，未知错误号返回 None
    pub fn from_code(code: u32) -> Option<Self> {
        Self::ALL.into_iter().find(|rule| rule.code() == code)
    }

    /// 解析数据库返回的错误码字符串，如 `"20022"`、`"-20022"` 或 `"ORA-20022"`
    pub fn from_db_code(raw: &str) -> Option<Self> {
        let digits = raw
            .trim()
            .trim_start_matches("ORA")
            .trim_start_matches('-');
        digits.parse::<u32>().ok().and_then(Self::from_code)
    }

    /// 面向用户的固定提示
    pub fn message(&self) -> &'static str {
        match self {
            Self::AnnulationImpossible => "Cannot cancel an order in this state.",
            Self::LivraisonExistante => {
                "A delivery exists for this order; cancel the delivery first."
            }
            Self::CommandeNonPrete => "The order is not ready for delivery.",
            Self::QuotaLivreurAtteint => {
                "The courier already has the maximum of 15 deliveries for this day and postal code."
            }
            Self::DateLivraisonPassee => "The delivery date must be today or later.",
            Self::ReferenceIntrouvable => "Order, customer, or courier not found.",
        }
    }
}

impl std::fmt::Display for BusinessRule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.message())
    }
}
