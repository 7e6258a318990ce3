//! Repository trait 定义
//!
//! 方法与数据库包的过程一一对应；少数方法是直接 SQL（存在性检查、明细增删、状态写入）。

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use gestion_domain::{
    Article, ArticleFiltre, Commande, CommandeFiltre, EtatCommande, EtatLivraison, LigCde,
    LigCdeDetail, Livraison, LivraisonFiltre, ModificationArticle, ModificationLivraison,
    NouvelArticle, NouvelleLivraison,
};
use gestion_errors::AppResult;

/// 商品 Repository（`pkg_gestion_articles`）
#[async_trait]
pub trait ArticleRepository: Send + Sync {
    /// 新建商品，返回数据库生成的 refart
    async fn ajouter(&self, article: &NouvelArticle) -> AppResult<String>;

    /// 按条件搜索，条件全部为空时返回全部
    async fn chercher(&self, filtre: &ArticleFiltre) -> AppResult<Vec<Article>>;

    /// 直接扫描 articles 表
    async fn lister(&self) -> AppResult<Vec<Article>>;

    async fn supprimer(&self, refart: &str) -> AppResult<()>;

    async fn modifier(&self, refart: &str, patch: &ModificationArticle) -> AppResult<()>;

    async fn existe(&self, refart: &str) -> AppResult<bool>;
}

/// 订单 Repository（`pkg_gestion_commandes`）
#[async_trait]
pub trait CommandeRepository: Send + Sync {
    /// 新建订单，返回生成的 nocde
    async fn ajouter(&self, noclt: i64) -> AppResult<i64>;

    /// 请求状态迁移，由数据库包裁决
    async fn modifier_etat(&self, nocde: i64, etat: EtatCommande) -> AppResult<()>;

    async fn annuler(&self, nocde: i64) -> AppResult<()>;

    async fn chercher(&self, filtre: &CommandeFiltre) -> AppResult<Vec<Commande>>;

    async fn trouver(&self, nocde: i64) -> AppResult<Option<Commande>>;

    /// 直接写入状态，不经过数据库包，返回受影响行数
    async fn forcer_etat(&self, nocde: i64, etat: EtatCommande) -> AppResult<u64>;
}

/// 订单明细 Repository（直接 SQL）
#[async_trait]
pub trait LigCdeRepository: Send + Sync {
    async fn compter(&self, nocde: i64) -> AppResult<i64>;

    async fn existe(&self, nocde: i64, refart: &str) -> AppResult<bool>;

    async fn inserer(&self, ligne: &LigCde) -> AppResult<()>;

    async fn trouver(&self, nocde: i64, refart: &str) -> AppResult<Option<LigCde>>;

    /// 订单的全部明细，联表商品，按 refart 排序
    async fn lister_par_commande(&self, nocde: i64) -> AppResult<Vec<LigCdeDetail>>;

    /// 返回受影响行数
    async fn supprimer(&self, nocde: i64, refart: &str) -> AppResult<u64>;
}

/// 配送 Repository（`pkg_gestion_livraisons`）
///
/// 日期参数均为 UTC 正午，比较时只看日历日。
#[async_trait]
pub trait LivraisonRepository: Send + Sync {
    async fn ajouter(&self, livraison: &NouvelleLivraison) -> AppResult<()>;

    async fn chercher(&self, filtre: &LivraisonFiltre) -> AppResult<Vec<Livraison>>;

    async fn supprimer(&self, nocde: i64, dateliv: DateTime<Utc>) -> AppResult<()>;

    async fn modifier(&self, modification: &ModificationLivraison) -> AppResult<()>;

    /// 直接写入配送状态，返回受影响行数
    async fn modifier_etat(
        &self,
        nocde: i64,
        dateliv: DateTime<Utc>,
        etat: EtatLivraison,
    ) -> AppResult<u64>;

    async fn trouver(&self, nocde: i64, dateliv: DateTime<Utc>) -> AppResult<Option<Livraison>>;
}
