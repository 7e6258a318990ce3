//! PostgreSQL 会话实现
//!
//! 一个会话就是池中一个连接上的一个事务，所有 Repository 共享它。
//! 会话未提交就被丢弃时，sqlx 回滚事务并把连接还给连接池。

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use gestion_domain::{
    Article, ArticleFiltre, Commande, CommandeFiltre, EtatCommande, EtatLivraison, LigCde,
    LigCdeDetail, Livraison, LivraisonFiltre, ModificationArticle, ModificationLivraison,
    NouvelArticle, NouvelleLivraison,
};
use gestion_errors::{AppError, AppResult};
use gestion_ports::{
    ArticleRepository, CommandeRepository, GestionSession, LigCdeRepository, LivraisonRepository,
    SessionFactory,
};
use sqlx::{PgPool, Postgres, Transaction};
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::error_mapper::map_sqlx_error;
use crate::rows::{
    ARTICLE_COLUMNS, ArticleRow, COMMANDE_COLUMNS, CommandeRow, LIVRAISON_COLUMNS, LigCdeDetailRow,
    LigCdeRow, LivraisonRow, collect_commandes, collect_livraisons,
};

/// 共享事务类型
type SharedTx = Arc<Mutex<Option<Transaction<'static, Postgres>>>>;

fn active<'a>(
    slot: &'a mut Option<Transaction<'static, Postgres>>,
) -> AppResult<&'a mut Transaction<'static, Postgres>> {
    slot.as_mut()
        .ok_or_else(|| AppError::internal("Transaction consumed"))
}

/// PostgreSQL 会话工厂
#[derive(Clone)]
pub struct PgSessionFactory {
    pool: PgPool,
}

impl PgSessionFactory {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SessionFactory for PgSessionFactory {
    async fn begin(&self) -> AppResult<Box<dyn GestionSession>> {
        let tx = self.pool.begin().await.map_err(map_sqlx_error)?;
        Ok(Box::new(PgSession::new(tx)))
    }

    async fn ping(&self) -> AppResult<()> {
        crate::check_connection(&self.pool).await
    }
}

macro_rules! define_tx_repo {
    ($name:ident) => {
        struct $name {
            tx: SharedTx,
        }

        impl $name {
            fn new(tx: SharedTx) -> Self {
                Self { tx }
            }
        }
    };
}

define_tx_repo!(TxArticleRepository);
define_tx_repo!(TxCommandeRepository);
define_tx_repo!(TxLigCdeRepository);
define_tx_repo!(TxLivraisonRepository);

/// PostgreSQL 会话
pub struct PgSession {
    tx: SharedTx,
    articles: TxArticleRepository,
    commandes: TxCommandeRepository,
    ligcdes: TxLigCdeRepository,
    livraisons: TxLivraisonRepository,
}

impl PgSession {
    fn new(tx: Transaction<'static, Postgres>) -> Self {
        let tx = Arc::new(Mutex::new(Some(tx)));

        Self {
            articles: TxArticleRepository::new(tx.clone()),
            commandes: TxCommandeRepository::new(tx.clone()),
            ligcdes: TxLigCdeRepository::new(tx.clone()),
            livraisons: TxLivraisonRepository::new(tx.clone()),
            tx,
        }
    }
}

#[async_trait]
impl GestionSession for PgSession {
    fn articles(&self) -> &dyn ArticleRepository {
        &self.articles
    }

    fn commandes(&self) -> &dyn CommandeRepository {
        &self.commandes
    }

    fn ligcdes(&self) -> &dyn LigCdeRepository {
        &self.ligcdes
    }

    fn livraisons(&self) -> &dyn LivraisonRepository {
        &self.livraisons
    }

    async fn commit(self: Box<Self>) -> AppResult<()> {
        let mut guard = self.tx.lock().await;
        let tx = guard
            .take()
            .ok_or_else(|| AppError::internal("Transaction already consumed"))?;

        tx.commit().await.map_err(map_sqlx_error)
    }
}

// =============================================================================
// ArticleRepository 实现
// =============================================================================

#[async_trait]
impl ArticleRepository for TxArticleRepository {
    async fn ajouter(&self, article: &NouvelArticle) -> AppResult<String> {
        let mut guard = self.tx.lock().await;
        let tx = active(&mut guard)?;

        let refart: String = sqlx::query_scalar(
            "SELECT pkg_gestion_articles.ajouter_article($1, $2::numeric, $3::numeric, $4, $5, $6)",
        )
        .bind(&article.designation)
        .bind(article.prix_a)
        .bind(article.prix_v)
        .bind(article.codetva)
        .bind(&article.categorie)
        .bind(article.qtestk)
        .fetch_one(&mut **tx)
        .await
        .map_err(map_sqlx_error)?;

        Ok(refart.trim().to_string())
    }

    async fn chercher(&self, filtre: &ArticleFiltre) -> AppResult<Vec<Article>> {
        let mut guard = self.tx.lock().await;
        let tx = active(&mut guard)?;

        let rows: Vec<ArticleRow> = sqlx::query_as(&format!(
            "SELECT {} FROM pkg_gestion_articles.chercher_article($1, $2, $3)",
            ARTICLE_COLUMNS
        ))
        .bind(&filtre.refart)
        .bind(&filtre.designation)
        .bind(&filtre.categorie)
        .fetch_all(&mut **tx)
        .await
        .map_err(map_sqlx_error)?;

        Ok(rows.into_iter().map(Article::from).collect())
    }

    async fn lister(&self) -> AppResult<Vec<Article>> {
        let mut guard = self.tx.lock().await;
        let tx = active(&mut guard)?;

        let rows: Vec<ArticleRow> = sqlx::query_as(&format!(
            "SELECT {} FROM articles ORDER BY refart",
            ARTICLE_COLUMNS
        ))
        .fetch_all(&mut **tx)
        .await
        .map_err(map_sqlx_error)?;

        Ok(rows.into_iter().map(Article::from).collect())
    }

    async fn supprimer(&self, refart: &str) -> AppResult<()> {
        let mut guard = self.tx.lock().await;
        let tx = active(&mut guard)?;

        sqlx::query("SELECT pkg_gestion_articles.supprimer_article($1)")
            .bind(refart)
            .execute(&mut **tx)
            .await
            .map_err(map_sqlx_error)?;
        Ok(())
    }

    async fn modifier(&self, refart: &str, patch: &ModificationArticle) -> AppResult<()> {
        let mut guard = self.tx.lock().await;
        let tx = active(&mut guard)?;

        sqlx::query(
            "SELECT pkg_gestion_articles.modifier_article($1, $2, $3::numeric, $4::numeric, $5, $6, $7)",
        )
        .bind(refart)
        .bind(&patch.designation)
        .bind(patch.prix_a)
        .bind(patch.prix_v)
        .bind(patch.codetva)
        .bind(&patch.categorie)
        .bind(patch.qtestk)
        .execute(&mut **tx)
        .await
        .map_err(map_sqlx_error)?;
        Ok(())
    }

    async fn existe(&self, refart: &str) -> AppResult<bool> {
        let mut guard = self.tx.lock().await;
        let tx = active(&mut guard)?;

        sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM articles WHERE refart = $1)")
            .bind(refart)
            .fetch_one(&mut **tx)
            .await
            .map_err(map_sqlx_error)
    }
}

// =============================================================================
// CommandeRepository 实现
// =============================================================================

#[async_trait]
impl CommandeRepository for TxCommandeRepository {
    async fn ajouter(&self, noclt: i64) -> AppResult<i64> {
        let mut guard = self.tx.lock().await;
        let tx = active(&mut guard)?;

        sqlx::query_scalar("SELECT pkg_gestion_commandes.ajouter_commande($1)::int8")
            .bind(noclt)
            .fetch_one(&mut **tx)
            .await
            .map_err(map_sqlx_error)
    }

    async fn modifier_etat(&self, nocde: i64, etat: EtatCommande) -> AppResult<()> {
        let mut guard = self.tx.lock().await;
        let tx = active(&mut guard)?;

        sqlx::query("SELECT pkg_gestion_commandes.modifier_etat($1, $2)")
            .bind(nocde)
            .bind(etat.code())
            .execute(&mut **tx)
            .await
            .map_err(map_sqlx_error)?;
        Ok(())
    }

    async fn annuler(&self, nocde: i64) -> AppResult<()> {
        let mut guard = self.tx.lock().await;
        let tx = active(&mut guard)?;

        sqlx::query("SELECT pkg_gestion_commandes.annuler_commande($1)")
            .bind(nocde)
            .execute(&mut **tx)
            .await
            .map_err(map_sqlx_error)?;
        Ok(())
    }

    async fn chercher(&self, filtre: &CommandeFiltre) -> AppResult<Vec<Commande>> {
        let mut guard = self.tx.lock().await;
        let tx = active(&mut guard)?;

        let rows: Vec<CommandeRow> = sqlx::query_as(&format!(
            "SELECT {} FROM pkg_gestion_commandes.chercher_commande($1, $2, $3)",
            COMMANDE_COLUMNS
        ))
        .bind(filtre.nocde)
        .bind(filtre.noclt)
        .bind(filtre.date)
        .fetch_all(&mut **tx)
        .await
        .map_err(map_sqlx_error)?;

        collect_commandes(rows)
    }

    async fn trouver(&self, nocde: i64) -> AppResult<Option<Commande>> {
        let mut guard = self.tx.lock().await;
        let tx = active(&mut guard)?;

        let row: Option<CommandeRow> = sqlx::query_as(&format!(
            "SELECT {} FROM commandes WHERE nocde = $1",
            COMMANDE_COLUMNS
        ))
        .bind(nocde)
        .fetch_optional(&mut **tx)
        .await
        .map_err(map_sqlx_error)?;

        row.map(Commande::try_from).transpose()
    }

    async fn forcer_etat(&self, nocde: i64, etat: EtatCommande) -> AppResult<u64> {
        let mut guard = self.tx.lock().await;
        let tx = active(&mut guard)?;

        let result = sqlx::query("UPDATE commandes SET etatcde = $1 WHERE nocde = $2")
            .bind(etat.code())
            .bind(nocde)
            .execute(&mut **tx)
            .await
            .map_err(map_sqlx_error)?;
        Ok(result.rows_affected())
    }
}

// =============================================================================
// LigCdeRepository 实现
// =============================================================================

#[async_trait]
impl LigCdeRepository for TxLigCdeRepository {
    async fn compter(&self, nocde: i64) -> AppResult<i64> {
        let mut guard = self.tx.lock().await;
        let tx = active(&mut guard)?;

        let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM ligcdes WHERE nocde = $1")
            .bind(nocde)
            .fetch_one(&mut **tx)
            .await
            .map_err(map_sqlx_error)?;
        Ok(count.0)
    }

    async fn existe(&self, nocde: i64, refart: &str) -> AppResult<bool> {
        let mut guard = self.tx.lock().await;
        let tx = active(&mut guard)?;

        sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM ligcdes WHERE nocde = $1 AND refart = $2)",
        )
        .bind(nocde)
        .bind(refart)
        .fetch_one(&mut **tx)
        .await
        .map_err(map_sqlx_error)
    }

    async fn inserer(&self, ligne: &LigCde) -> AppResult<()> {
        let mut guard = self.tx.lock().await;
        let tx = active(&mut guard)?;

        sqlx::query("INSERT INTO ligcdes (nocde, refart, qtecde) VALUES ($1, $2, $3)")
            .bind(ligne.nocde)
            .bind(&ligne.refart)
            .bind(ligne.qtecde)
            .execute(&mut **tx)
            .await
            .map_err(map_sqlx_error)?;
        Ok(())
    }

    async fn trouver(&self, nocde: i64, refart: &str) -> AppResult<Option<LigCde>> {
        let mut guard = self.tx.lock().await;
        let tx = active(&mut guard)?;

        let row: Option<LigCdeRow> = sqlx::query_as(
            "SELECT nocde::int8 AS nocde, refart, qtecde::int8 AS qtecde \
             FROM ligcdes WHERE nocde = $1 AND refart = $2",
        )
        .bind(nocde)
        .bind(refart)
        .fetch_optional(&mut **tx)
        .await
        .map_err(map_sqlx_error)?;

        Ok(row.map(LigCde::from))
    }

    async fn lister_par_commande(&self, nocde: i64) -> AppResult<Vec<LigCdeDetail>> {
        let mut guard = self.tx.lock().await;
        let tx = active(&mut guard)?;

        let rows: Vec<LigCdeDetailRow> = sqlx::query_as(
            r#"
            SELECT l.nocde::int8 AS nocde, l.refart, l.qtecde::int8 AS qtecde,
                   a.designation, a.prixv::float8 AS prix_v
            FROM ligcdes l
            JOIN articles a ON a.refart = l.refart
            WHERE l.nocde = $1
            ORDER BY l.refart
            "#,
        )
        .bind(nocde)
        .fetch_all(&mut **tx)
        .await
        .map_err(map_sqlx_error)?;

        Ok(rows.into_iter().map(LigCdeDetail::from).collect())
    }

    async fn supprimer(&self, nocde: i64, refart: &str) -> AppResult<u64> {
        let mut guard = self.tx.lock().await;
        let tx = active(&mut guard)?;

        let result = sqlx::query("DELETE FROM ligcdes WHERE nocde = $1 AND refart = $2")
            .bind(nocde)
            .bind(refart)
            .execute(&mut **tx)
            .await
            .map_err(map_sqlx_error)?;
        Ok(result.rows_affected())
    }
}

// =============================================================================
// LivraisonRepository 实现
// =============================================================================

#[async_trait]
impl LivraisonRepository for TxLivraisonRepository {
    async fn ajouter(&self, livraison: &NouvelleLivraison) -> AppResult<()> {
        let mut guard = self.tx.lock().await;
        let tx = active(&mut guard)?;

        sqlx::query("SELECT pkg_gestion_livraisons.ajouter_livraison($1, $2, $3, $4)")
            .bind(livraison.nocde)
            .bind(livraison.livreur)
            .bind(livraison.dateliv)
            .bind(&livraison.modepay)
            .execute(&mut **tx)
            .await
            .map_err(map_sqlx_error)?;
        Ok(())
    }

    async fn chercher(&self, filtre: &LivraisonFiltre) -> AppResult<Vec<Livraison>> {
        let mut guard = self.tx.lock().await;
        let tx = active(&mut guard)?;

        let rows: Vec<LivraisonRow> = sqlx::query_as(&format!(
            "SELECT {} FROM pkg_gestion_livraisons.chercher_livraison($1, $2, $3, $4)",
            LIVRAISON_COLUMNS
        ))
        .bind(filtre.nocde)
        .bind(filtre.livreur)
        .bind(filtre.code_postal)
        .bind(filtre.date)
        .fetch_all(&mut **tx)
        .await
        .map_err(map_sqlx_error)?;

        collect_livraisons(rows)
    }

    async fn supprimer(&self, nocde: i64, dateliv: DateTime<Utc>) -> AppResult<()> {
        let mut guard = self.tx.lock().await;
        let tx = active(&mut guard)?;

        sqlx::query("SELECT pkg_gestion_livraisons.supprimer_livraison($1, $2)")
            .bind(nocde)
            .bind(dateliv)
            .execute(&mut **tx)
            .await
            .map_err(map_sqlx_error)?;
        Ok(())
    }

    async fn modifier(&self, modification: &ModificationLivraison) -> AppResult<()> {
        let mut guard = self.tx.lock().await;
        let tx = active(&mut guard)?;

        sqlx::query("SELECT pkg_gestion_livraisons.modifier_livraison($1, $2, $3, $4)")
            .bind(modification.nocde)
            .bind(modification.dateliv)
            .bind(modification.nouvelle_date)
            .bind(modification.nouveau_livreur)
            .execute(&mut **tx)
            .await
            .map_err(map_sqlx_error)?;
        Ok(())
    }

    async fn modifier_etat(
        &self,
        nocde: i64,
        dateliv: DateTime<Utc>,
        etat: EtatLivraison,
    ) -> AppResult<u64> {
        let mut guard = self.tx.lock().await;
        let tx = active(&mut guard)?;

        let result = sqlx::query(
            "UPDATE LivraisonCom SET etatliv = $1 WHERE nocde = $2 AND dateliv::date = $3",
        )
        .bind(etat.code())
        .bind(nocde)
        .bind(dateliv.date_naive())
        .execute(&mut **tx)
        .await
        .map_err(map_sqlx_error)?;
        Ok(result.rows_affected())
    }

    async fn trouver(&self, nocde: i64, dateliv: DateTime<Utc>) -> AppResult<Option<Livraison>> {
        let mut guard = self.tx.lock().await;
        let tx = active(&mut guard)?;

        let row: Option<LivraisonRow> = sqlx::query_as(&format!(
            "SELECT {} FROM LivraisonCom WHERE nocde = $1 AND dateliv::date = $2",
            LIVRAISON_COLUMNS
        ))
        .bind(nocde)
        .bind(dateliv.date_naive())
        .fetch_optional(&mut **tx)
        .await
        .map_err(map_sqlx_error)?;

        row.map(Livraison::try_from).transpose()
    }
}
