//! 内存实现
//!
//! 模拟三个数据库包的可观察行为（编码生成、编码错误、搜索条件）。
//! 会话在整个生命周期内独占存储，依次执行：开始时复制一份工作副本，
//! 提交时写回，未提交的修改随会话丢弃。

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use gestion_domain::{
    Article, ArticleFiltre, BusinessRule, Commande, CommandeFiltre, EtatCommande, EtatLivraison,
    LigCde, LigCdeDetail, Livraison, LivraisonFiltre, ModificationArticle, ModificationLivraison,
    NouvelArticle, NouvelleLivraison,
};
use gestion_errors::{AppError, AppResult};
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::{
    ArticleRepository, CommandeRepository, GestionSession, LigCdeRepository, LivraisonRepository,
    SessionFactory,
};

/// 每个配送员每天的配送上限
const QUOTA_LIVREUR: usize = 15;

#[derive(Debug, Clone, Default)]
struct Store {
    articles: BTreeMap<String, Article>,
    commandes: BTreeMap<i64, Commande>,
    ligcdes: Vec<LigCde>,
    livraisons: Vec<Livraison>,
    sequence_article: u32,
    sequence_commande: i64,
}

impl Store {
    fn next_refart(&mut self) -> String {
        self.sequence_article += 1;
        let n = self.sequence_article;
        let prefix = char::from(b'A' + ((n / 1000) % 26) as u8);
        format!("{}{:03}", prefix, n % 1000)
    }

    fn commande_mut(&mut self, nocde: i64) -> AppResult<&mut Commande> {
        self.commandes
            .get_mut(&nocde)
            .ok_or_else(|| AppError::rejected(BusinessRule::ReferenceIntrouvable))
    }

    fn livraison_index(&self, nocde: i64, jour: NaiveDate) -> Option<usize> {
        self.livraisons
            .iter()
            .position(|l| l.nocde == nocde && l.dateliv == jour)
    }
}

type SharedStore = Arc<Mutex<Store>>;

fn today() -> NaiveDate {
    Utc::now().date_naive()
}

fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

/// 内存会话工厂
#[derive(Clone, Default)]
pub struct MemorySessionFactory {
    store: SharedStore,
    indisponible: bool,
}

impl MemorySessionFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// 所有连接都失败的工厂，用于测试 500 路径
    pub fn indisponible() -> Self {
        Self {
            indisponible: true,
            ..Self::default()
        }
    }

    /// 已提交的订单明细
    pub async fn ligcdes(&self) -> Vec<LigCde> {
        self.store.lock().await.ligcdes.clone()
    }

    /// 已提交的订单
    pub async fn commande(&self, nocde: i64) -> Option<Commande> {
        self.store.lock().await.commandes.get(&nocde).cloned()
    }

    /// 已提交的配送
    pub async fn livraisons(&self) -> Vec<Livraison> {
        self.store.lock().await.livraisons.clone()
    }

    fn connection_refused() -> AppError {
        AppError::database("connection refused")
    }
}

#[async_trait]
impl SessionFactory for MemorySessionFactory {
    async fn begin(&self) -> AppResult<Box<dyn GestionSession>> {
        if self.indisponible {
            return Err(Self::connection_refused());
        }
        // 持有存储锁直到会话结束，并发会话排队执行
        let shared = self.store.clone().lock_owned().await;
        let work = Arc::new(Mutex::new(shared.clone()));
        Ok(Box::new(MemorySession::new(shared, work)))
    }

    async fn ping(&self) -> AppResult<()> {
        if self.indisponible {
            return Err(Self::connection_refused());
        }
        Ok(())
    }
}

macro_rules! define_memory_repo {
    ($name:ident) => {
        struct $name {
            work: SharedStore,
        }
    };
}

define_memory_repo!(MemoryArticles);
define_memory_repo!(MemoryCommandes);
define_memory_repo!(MemoryLigCdes);
define_memory_repo!(MemoryLivraisons);

struct MemorySession {
    shared: OwnedMutexGuard<Store>,
    work: SharedStore,
    articles: MemoryArticles,
    commandes: MemoryCommandes,
    ligcdes: MemoryLigCdes,
    livraisons: MemoryLivraisons,
}

impl MemorySession {
    fn new(shared: OwnedMutexGuard<Store>, work: SharedStore) -> Self {
        Self {
            shared,
            articles: MemoryArticles { work: work.clone() },
            commandes: MemoryCommandes { work: work.clone() },
            ligcdes: MemoryLigCdes { work: work.clone() },
            livraisons: MemoryLivraisons { work: work.clone() },
            work,
        }
    }
}

#[async_trait]
impl GestionSession for MemorySession {
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
        let MemorySession {
            mut shared, work, ..
        } = *self;
        *shared = work.lock().await.clone();
        Ok(())
    }
}

// =============================================================================
// ArticleRepository
// =============================================================================

#[async_trait]
impl ArticleRepository for MemoryArticles {
    async fn ajouter(&self, article: &NouvelArticle) -> AppResult<String> {
        let mut store = self.work.lock().await;
        let refart = store.next_refart();
        store.articles.insert(
            refart.clone(),
            Article {
                refart: refart.clone(),
                designation: article.designation.clone(),
                prix_a: article.prix_a,
                prix_v: article.prix_v,
                codetva: article.codetva,
                categorie: article.categorie.clone(),
                qtestk: article.qtestk,
            },
        );
        Ok(refart)
    }

    async fn chercher(&self, filtre: &ArticleFiltre) -> AppResult<Vec<Article>> {
        let store = self.work.lock().await;
        Ok(store
            .articles
            .values()
            .filter(|a| {
                filtre
                    .refart
                    .as_deref()
                    .is_none_or(|r| a.refart.eq_ignore_ascii_case(r.trim()))
            })
            .filter(|a| {
                filtre
                    .designation
                    .as_deref()
                    .is_none_or(|d| contains_ignore_case(&a.designation, d))
            })
            .filter(|a| {
                filtre
                    .categorie
                    .as_deref()
                    .is_none_or(|c| a.categorie.as_deref() == Some(c))
            })
            .cloned()
            .collect())
    }

    async fn lister(&self) -> AppResult<Vec<Article>> {
        Ok(self.work.lock().await.articles.values().cloned().collect())
    }

    async fn supprimer(&self, refart: &str) -> AppResult<()> {
        let mut store = self.work.lock().await;
        if store.ligcdes.iter().any(|l| l.refart == refart) {
            return Err(AppError::database(format!(
                "update or delete on table \"articles\" violates foreign key constraint (refart {})",
                refart
            )));
        }
        store
            .articles
            .remove(refart)
            .map(|_| ())
            .ok_or_else(|| AppError::database(format!("Article {} not found", refart)))
    }

    async fn modifier(&self, refart: &str, patch: &ModificationArticle) -> AppResult<()> {
        let mut store = self.work.lock().await;
        let article = store
            .articles
            .get_mut(refart)
            .ok_or_else(|| AppError::database(format!("Article {} not found", refart)))?;

        if let Some(designation) = &patch.designation {
            article.designation = designation.clone();
        }
        if let Some(prix_a) = patch.prix_a {
            article.prix_a = prix_a;
        }
        if let Some(prix_v) = patch.prix_v {
            article.prix_v = prix_v;
        }
        if let Some(codetva) = patch.codetva {
            article.codetva = codetva;
        }
        if let Some(categorie) = &patch.categorie {
            article.categorie = Some(categorie.clone());
        }
        if let Some(qtestk) = patch.qtestk {
            article.qtestk = qtestk;
        }
        Ok(())
    }

    async fn existe(&self, refart: &str) -> AppResult<bool> {
        Ok(self.work.lock().await.articles.contains_key(refart))
    }
}

// =============================================================================
// CommandeRepository
// =============================================================================

#[async_trait]
impl CommandeRepository for MemoryCommandes {
    async fn ajouter(&self, noclt: i64) -> AppResult<i64> {
        if noclt <= 0 {
            return Err(AppError::rejected(BusinessRule::ReferenceIntrouvable));
        }
        let mut store = self.work.lock().await;
        store.sequence_commande += 1;
        let nocde = store.sequence_commande;
        store.commandes.insert(
            nocde,
            Commande {
                nocde,
                noclt,
                datecde: today(),
                etatcde: EtatCommande::EnCours,
            },
        );
        Ok(nocde)
    }

    async fn modifier_etat(&self, nocde: i64, etat: EtatCommande) -> AppResult<()> {
        let mut store = self.work.lock().await;
        let commande = store.commande_mut(nocde)?;
        if !commande.etatcde.suivants().contains(&etat) {
            return Err(AppError::database(format!(
                "Transition {} -> {} refused for order {}",
                commande.etatcde, etat, nocde
            )));
        }
        commande.etatcde = etat;
        Ok(())
    }

    async fn annuler(&self, nocde: i64) -> AppResult<()> {
        let mut store = self.work.lock().await;
        let livraison_en_cours = store
            .livraisons
            .iter()
            .any(|l| l.nocde == nocde && l.etatliv == EtatLivraison::EnCours);
        let commande = store.commande_mut(nocde)?;
        match commande.etatcde {
            EtatCommande::EnCours => {}
            EtatCommande::Prete if livraison_en_cours => {
                return Err(AppError::rejected(BusinessRule::LivraisonExistante));
            }
            EtatCommande::Prete => {}
            _ => return Err(AppError::rejected(BusinessRule::AnnulationImpossible)),
        }
        commande.etatcde = EtatCommande::Annulee;
        Ok(())
    }

    async fn chercher(&self, filtre: &CommandeFiltre) -> AppResult<Vec<Commande>> {
        let store = self.work.lock().await;
        let jour = filtre.date.map(|d| d.date_naive());
        Ok(store
            .commandes
            .values()
            .filter(|c| filtre.nocde.is_none_or(|n| c.nocde == n))
            .filter(|c| filtre.noclt.is_none_or(|n| c.noclt == n))
            .filter(|c| jour.is_none_or(|j| c.datecde == j))
            .cloned()
            .collect())
    }

    async fn trouver(&self, nocde: i64) -> AppResult<Option<Commande>> {
        Ok(self.work.lock().await.commandes.get(&nocde).cloned())
    }

    async fn forcer_etat(&self, nocde: i64, etat: EtatCommande) -> AppResult<u64> {
        let mut store = self.work.lock().await;
        Ok(match store.commandes.get_mut(&nocde) {
            Some(commande) => {
                commande.etatcde = etat;
                1
            }
            None => 0,
        })
    }
}

// =============================================================================
// LigCdeRepository
// =============================================================================

#[async_trait]
impl LigCdeRepository for MemoryLigCdes {
    async fn compter(&self, nocde: i64) -> AppResult<i64> {
        let store = self.work.lock().await;
        Ok(store.ligcdes.iter().filter(|l| l.nocde == nocde).count() as i64)
    }

    async fn existe(&self, nocde: i64, refart: &str) -> AppResult<bool> {
        let store = self.work.lock().await;
        Ok(store
            .ligcdes
            .iter()
            .any(|l| l.nocde == nocde && l.refart == refart))
    }

    async fn inserer(&self, ligne: &LigCde) -> AppResult<()> {
        let mut store = self.work.lock().await;
        if store
            .ligcdes
            .iter()
            .any(|l| l.nocde == ligne.nocde && l.refart == ligne.refart)
        {
            return Err(AppError::database(
                "duplicate key value violates unique constraint \"ligcdes_pkey\"",
            ));
        }
        store.ligcdes.push(ligne.clone());
        Ok(())
    }

    async fn trouver(&self, nocde: i64, refart: &str) -> AppResult<Option<LigCde>> {
        let store = self.work.lock().await;
        Ok(store
            .ligcdes
            .iter()
            .find(|l| l.nocde == nocde && l.refart == refart)
            .cloned())
    }

    async fn lister_par_commande(&self, nocde: i64) -> AppResult<Vec<LigCdeDetail>> {
        let store = self.work.lock().await;
        let mut lignes: Vec<LigCdeDetail> = store
            .ligcdes
            .iter()
            .filter(|l| l.nocde == nocde)
            .filter_map(|l| {
                store.articles.get(&l.refart).map(|a| LigCdeDetail {
                    nocde: l.nocde,
                    refart: l.refart.clone(),
                    qtecde: l.qtecde,
                    designation: a.designation.clone(),
                    prix_v: a.prix_v,
                })
            })
            .collect();
        lignes.sort_by(|a, b| a.refart.cmp(&b.refart));
        Ok(lignes)
    }

    async fn supprimer(&self, nocde: i64, refart: &str) -> AppResult<u64> {
        let mut store = self.work.lock().await;
        let before = store.ligcdes.len();
        store
            .ligcdes
            .retain(|l| !(l.nocde == nocde && l.refart == refart));
        Ok((before - store.ligcdes.len()) as u64)
    }
}

// =============================================================================
// LivraisonRepository
// =============================================================================

#[async_trait]
impl LivraisonRepository for MemoryLivraisons {
    async fn ajouter(&self, livraison: &NouvelleLivraison) -> AppResult<()> {
        let mut store = self.work.lock().await;
        let jour = livraison.dateliv.date_naive();

        let etat = store
            .commandes
            .get(&livraison.nocde)
            .map(|c| c.etatcde)
            .ok_or_else(|| AppError::rejected(BusinessRule::ReferenceIntrouvable))?;
        if livraison.livreur <= 0 {
            return Err(AppError::rejected(BusinessRule::ReferenceIntrouvable));
        }
        if jour < today() {
            return Err(AppError::rejected(BusinessRule::DateLivraisonPassee));
        }
        if etat != EtatCommande::Prete {
            return Err(AppError::rejected(BusinessRule::CommandeNonPrete));
        }
        // 内存实现没有客户地址，配额只按配送员和日期计算
        let charge = store
            .livraisons
            .iter()
            .filter(|l| l.livreur == livraison.livreur && l.dateliv == jour)
            .count();
        if charge >= QUOTA_LIVREUR {
            return Err(AppError::rejected(BusinessRule::QuotaLivreurAtteint));
        }
        if store.livraison_index(livraison.nocde, jour).is_some() {
            return Err(AppError::database(
                "duplicate key value violates unique constraint \"livraisoncom_pkey\"",
            ));
        }

        store.livraisons.push(Livraison {
            nocde: livraison.nocde,
            dateliv: jour,
            livreur: livraison.livreur,
            modepay: livraison.modepay.clone(),
            etatliv: EtatLivraison::EnCours,
        });
        Ok(())
    }

    async fn chercher(&self, filtre: &LivraisonFiltre) -> AppResult<Vec<Livraison>> {
        let store = self.work.lock().await;
        let jour = filtre.date.map(|d| d.date_naive());
        // 内存实现没有客户地址，忽略邮编条件
        Ok(store
            .livraisons
            .iter()
            .filter(|l| filtre.nocde.is_none_or(|n| l.nocde == n))
            .filter(|l| filtre.livreur.is_none_or(|n| l.livreur == n))
            .filter(|l| jour.is_none_or(|j| l.dateliv == j))
            .cloned()
            .collect())
    }

    async fn supprimer(&self, nocde: i64, dateliv: DateTime<Utc>) -> AppResult<()> {
        let mut store = self.work.lock().await;
        let index = store
            .livraison_index(nocde, dateliv.date_naive())
            .ok_or_else(|| AppError::rejected(BusinessRule::ReferenceIntrouvable))?;
        store.livraisons.remove(index);
        Ok(())
    }

    async fn modifier(&self, modification: &ModificationLivraison) -> AppResult<()> {
        let mut store = self.work.lock().await;
        let index = store
            .livraison_index(modification.nocde, modification.dateliv.date_naive())
            .ok_or_else(|| AppError::rejected(BusinessRule::ReferenceIntrouvable))?;

        if let Some(nouvelle) = modification.nouvelle_date {
            if nouvelle.date_naive() < today() {
                return Err(AppError::rejected(BusinessRule::DateLivraisonPassee));
            }
            store.livraisons[index].dateliv = nouvelle.date_naive();
        }
        if let Some(livreur) = modification.nouveau_livreur {
            store.livraisons[index].livreur = livreur;
        }
        Ok(())
    }

    async fn modifier_etat(
        &self,
        nocde: i64,
        dateliv: DateTime<Utc>,
        etat: EtatLivraison,
    ) -> AppResult<u64> {
        let mut store = self.work.lock().await;
        Ok(match store.livraison_index(nocde, dateliv.date_naive()) {
            Some(index) => {
                store.livraisons[index].etatliv = etat;
                1
            }
            None => 0,
        })
    }

    async fn trouver(&self, nocde: i64, dateliv: DateTime<Utc>) -> AppResult<Option<Livraison>> {
        let store = self.work.lock().await;
        Ok(store
            .livraison_index(nocde, dateliv.date_naive())
            .map(|index| store.livraisons[index].clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn clavier() -> NouvelArticle {
        NouvelArticle {
            designation: "Clavier".to_string(),
            prix_a: 10.0,
            prix_v: 15.0,
            codetva: 2,
            categorie: Some("Informatique".to_string()),
            qtestk: 0,
        }
    }

    fn noon(jour: NaiveDate) -> DateTime<Utc> {
        Utc.from_utc_datetime(&jour.and_hms_opt(12, 0, 0).unwrap())
    }

    #[tokio::test]
    async fn test_uncommitted_session_is_discarded() {
        let factory = MemorySessionFactory::new();

        let session = factory.begin().await.unwrap();
        session.commandes().ajouter(7).await.unwrap();
        drop(session);

        assert!(factory.commande(1).await.is_none());
    }

    #[tokio::test]
    async fn test_overlapping_sessions_keep_both_orders() {
        let factory = MemorySessionFactory::new();
        let first = factory.begin().await.unwrap();

        let second = tokio::spawn({
            let factory = factory.clone();
            async move {
                let session = factory.begin().await.unwrap();
                let nocde = session.commandes().ajouter(2).await.unwrap();
                session.commit().await.unwrap();
                nocde
            }
        });
        tokio::task::yield_now().await;
        assert!(!second.is_finished());

        let nocde_first = first.commandes().ajouter(1).await.unwrap();
        first.commit().await.unwrap();
        let nocde_second = second.await.unwrap();

        assert_ne!(nocde_first, nocde_second);
        assert_eq!(factory.commande(nocde_first).await.unwrap().noclt, 1);
        assert_eq!(factory.commande(nocde_second).await.unwrap().noclt, 2);
    }

    #[tokio::test]
    async fn test_dropped_session_releases_the_store() {
        let factory = MemorySessionFactory::new();
        let session = factory.begin().await.unwrap();
        session.commandes().ajouter(1).await.unwrap();
        drop(session);

        let session = factory.begin().await.unwrap();
        assert_eq!(session.commandes().ajouter(2).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_generated_refart_has_four_chars() {
        let factory = MemorySessionFactory::new();
        let session = factory.begin().await.unwrap();
        let refart = session.articles().ajouter(&clavier()).await.unwrap();
        session.commit().await.unwrap();

        assert_eq!(refart.len(), gestion_domain::REFART_LEN);

        let session = factory.begin().await.unwrap();
        let found = session
            .articles()
            .chercher(&ArticleFiltre {
                refart: Some(refart.clone()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].refart, refart);
    }

    #[tokio::test]
    async fn test_cancel_rules() {
        let factory = MemorySessionFactory::new();
        let session = factory.begin().await.unwrap();
        let nocde = session.commandes().ajouter(3).await.unwrap();
        session
            .commandes()
            .forcer_etat(nocde, EtatCommande::Livree)
            .await
            .unwrap();

        let err = session.commandes().annuler(nocde).await.unwrap_err();
        assert_eq!(err.rule(), Some(BusinessRule::AnnulationImpossible));
    }

    #[tokio::test]
    async fn test_delivery_rules() {
        let factory = MemorySessionFactory::new();
        let session = factory.begin().await.unwrap();
        let nocde = session.commandes().ajouter(3).await.unwrap();
        let demain = noon(today() + Duration::days(1));

        let mut livraison = NouvelleLivraison {
            nocde,
            livreur: 4,
            dateliv: demain,
            modepay: "avant_livraison".to_string(),
        };
        let err = session.livraisons().ajouter(&livraison).await.unwrap_err();
        assert_eq!(err.rule(), Some(BusinessRule::CommandeNonPrete));

        livraison.dateliv = noon(today() - Duration::days(1));
        let err = session.livraisons().ajouter(&livraison).await.unwrap_err();
        assert_eq!(err.rule(), Some(BusinessRule::DateLivraisonPassee));

        session
            .commandes()
            .forcer_etat(nocde, EtatCommande::Prete)
            .await
            .unwrap();
        livraison.dateliv = demain;
        session.livraisons().ajouter(&livraison).await.unwrap();

        let err = session.commandes().annuler(nocde).await.unwrap_err();
        assert_eq!(err.rule(), Some(BusinessRule::LivraisonExistante));
    }

    #[tokio::test]
    async fn test_unavailable_factory() {
        let factory = MemorySessionFactory::indisponible();
        assert!(factory.ping().await.is_err());
        assert!(factory.begin().await.is_err());
    }
}
