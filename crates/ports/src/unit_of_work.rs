//! 会话（Unit of Work）trait 定义

use async_trait::async_trait;
use gestion_errors::AppResult;

use crate::{ArticleRepository, CommandeRepository, LigCdeRepository, LivraisonRepository};

/// 一次请求的数据库会话
///
/// 所有 Repository 共享同一事务。未提交就被丢弃的会话回滚并归还连接。
///
/// ```ignore
/// let session = factory.begin().await?;
/// let nocde = session.commandes().ajouter(7).await?;
/// session.commit().await?;
/// ```
#[async_trait]
pub trait GestionSession: Send + Sync {
    fn articles(&self) -> &dyn ArticleRepository;

    fn commandes(&self) -> &dyn CommandeRepository;

    fn ligcdes(&self) -> &dyn LigCdeRepository;

    fn livraisons(&self) -> &dyn LivraisonRepository;

    /// 提交事务
    async fn commit(self: Box<Self>) -> AppResult<()>;
}

/// 会话工厂（连接池）
#[async_trait]
pub trait SessionFactory: Send + Sync {
    /// 从池中取一个连接并开始事务
    async fn begin(&self) -> AppResult<Box<dyn GestionSession>>;

    /// 最简单的连通性查询
    async fn ping(&self) -> AppResult<()>;
}
