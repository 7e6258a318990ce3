//! 页面控制器
//!
//! 页面只做三件事：加载列表、按条件重新加载、变更后刷新。
//! 调用 API 前的校验仅用于提示，服务端不依赖它。

use chrono::NaiveDate;
use gestion_domain::{
    Article, CATEGORIES, Commande, EtatCommande, EtatLivraison, LigCdeDetail, Livraison,
    ModificationArticle, NouvelArticle, parse_date_utc_noon, verifier_prix,
};
use thiserror::Error;

use crate::api::{ApiClient, ClientError};
use crate::log::ActivityLog;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum PageError {
    /// 表单未通过界面校验，未发出请求
    #[error("{0}")]
    Validation(String),

    #[error(transparent)]
    Api(#[from] ClientError),
}

pub type PageResult<T> = Result<T, PageError>;

fn invalid(message: impl Into<String>) -> PageError {
    PageError::Validation(message.into())
}

/// 记录失败并原样返回
fn logged<T>(log: &mut ActivityLog, action: &str, result: PageResult<T>) -> PageResult<T> {
    if let Err(e) = &result {
        log.error(format!("{} failed: {}", action, e));
    }
    result
}

fn push_param<T: ToString>(params: &mut Vec<(&'static str, String)>, key: &'static str, value: &Option<T>) {
    if let Some(value) = value {
        let value = value.to_string();
        if !value.trim().is_empty() {
            params.push((key, value));
        }
    }
}

// =============================================================================
// Articles
// =============================================================================

#[derive(Debug, Clone, Default)]
pub struct ArticleRecherche {
    pub refart: Option<String>,
    pub designation: Option<String>,
    pub categorie: Option<String>,
}

impl ArticleRecherche {
    pub fn params(&self) -> Vec<(&'static str, String)> {
        let mut params = Vec::new();
        push_param(&mut params, "refart", &self.refart);
        push_param(&mut params, "designation", &self.designation);
        push_param(&mut params, "categorie", &self.categorie);
        params
    }
}

/// 新建商品表单校验
/// 类别只能从固定列表中选择，未填写表示无类别
fn verifier_categorie(categorie: Option<&str>) -> PageResult<()> {
    match categorie {
        Some(c) if !CATEGORIES.contains(&c) => Err(invalid(format!(
            "Unknown category {} (expected one of: {})",
            c,
            CATEGORIES.join(", ")
        ))),
        _ => Ok(()),
    }
}

pub fn valider_article(article: &NouvelArticle) -> PageResult<()> {
    if article.designation.trim().is_empty() {
        return Err(invalid("Designation is required"));
    }
    if !(1..=2).contains(&article.codetva) {
        return Err(invalid("VAT code must be 1 or 2"));
    }
    verifier_categorie(article.categorie.as_deref())?;
    verifier_prix(article.prix_a, article.prix_v).map_err(|e| invalid(e.to_string()))
}

/// 修改表单：两个价格都填写时才比较
pub fn valider_modification(patch: &ModificationArticle) -> PageResult<()> {
    if patch.is_empty() {
        return Err(invalid("Nothing to update"));
    }
    verifier_categorie(patch.categorie.as_deref())?;
    if let (Some(prix_a), Some(prix_v)) = (patch.prix_a, patch.prix_v) {
        verifier_prix(prix_a, prix_v).map_err(|e| invalid(e.to_string()))?;
    }
    Ok(())
}

pub struct ArticlesPage<'a> {
    api: &'a ApiClient,
    log: &'a mut ActivityLog,
    articles: Vec<Article>,
}

impl<'a> ArticlesPage<'a> {
    pub fn new(api: &'a ApiClient, log: &'a mut ActivityLog) -> Self {
        Self {
            api,
            log,
            articles: Vec::new(),
        }
    }

    pub fn articles(&self) -> &[Article] {
        &self.articles
    }

    pub async fn mount(&mut self) -> PageResult<&[Article]> {
        self.rechercher(&ArticleRecherche::default()).await
    }

    pub async fn rechercher(&mut self, recherche: &ArticleRecherche) -> PageResult<&[Article]> {
        let result = self
            .api
            .chercher_articles(&recherche.params())
            .await
            .map_err(PageError::from);
        self.articles = logged(self.log, "Article search", result)?;
        self.log
            .info(format!("{} article(s) found", self.articles.len()));
        Ok(&self.articles)
    }

    pub async fn ajouter(&mut self, article: &NouvelArticle) -> PageResult<String> {
        let result = match valider_article(article) {
            Ok(()) => self
                .api
                .ajouter_article(article)
                .await
                .map_err(PageError::from),
            Err(e) => Err(e),
        };
        let ajoute = logged(self.log, "Article creation", result)?;
        self.log
            .success(format!("Article {} created", ajoute.refart));
        self.mount().await?;
        Ok(ajoute.refart)
    }

    pub async fn supprimer(&mut self, refart: &str) -> PageResult<()> {
        let result = self
            .api
            .supprimer_article(refart)
            .await
            .map_err(PageError::from);
        logged(self.log, "Article deletion", result)?;
        self.log.warning(format!("Article {} deleted", refart));
        self.mount().await?;
        Ok(())
    }

    pub async fn modifier(&mut self, refart: &str, patch: &ModificationArticle) -> PageResult<()> {
        let result = match valider_modification(patch) {
            Ok(()) => self
                .api
                .modifier_article(refart, patch)
                .await
                .map_err(PageError::from),
            Err(e) => Err(e),
        };
        logged(self.log, "Article update", result)?;
        self.log.info(format!("Article {} updated", refart));
        self.mount().await?;
        Ok(())
    }
}

// =============================================================================
// Commandes
// =============================================================================

#[derive(Debug, Clone, Default)]
pub struct CommandeRecherche {
    pub nocde: Option<i64>,
    pub noclt: Option<i64>,
    pub date: Option<String>,
}

impl CommandeRecherche {
    pub fn params(&self) -> Vec<(&'static str, String)> {
        let mut params = Vec::new();
        push_param(&mut params, "nocde", &self.nocde);
        push_param(&mut params, "noclt", &self.noclt);
        push_param(&mut params, "date", &self.date);
        params
    }
}

pub struct CommandesPage<'a> {
    api: &'a ApiClient,
    log: &'a mut ActivityLog,
    commandes: Vec<Commande>,
    lignes: Vec<LigCdeDetail>,
}

impl<'a> CommandesPage<'a> {
    pub fn new(api: &'a ApiClient, log: &'a mut ActivityLog) -> Self {
        Self {
            api,
            log,
            commandes: Vec::new(),
            lignes: Vec::new(),
        }
    }

    pub fn commandes(&self) -> &[Commande] {
        &self.commandes
    }

    /// 最近一次加载的订单明细
    pub fn lignes(&self) -> &[LigCdeDetail] {
        &self.lignes
    }

    pub async fn mount(&mut self) -> PageResult<&[Commande]> {
        self.rechercher(&CommandeRecherche::default()).await
    }

    pub async fn rechercher(&mut self, recherche: &CommandeRecherche) -> PageResult<&[Commande]> {
        let result = self
            .api
            .chercher_commandes(&recherche.params())
            .await
            .map_err(PageError::from);
        self.commandes = logged(self.log, "Order search", result)?;
        self.log
            .info(format!("{} order(s) found", self.commandes.len()));
        Ok(&self.commandes)
    }

    pub async fn ajouter(&mut self, noclt: i64) -> PageResult<i64> {
        let result = if noclt <= 0 {
            Err(invalid("Customer number is required"))
        } else {
            self.api
                .ajouter_commande(noclt)
                .await
                .map_err(PageError::from)
        };
        let nocde = logged(self.log, "Order creation", result)?;
        self.log
            .success(format!("Order #{} created for customer {}", nocde, noclt));
        self.mount().await?;
        Ok(nocde)
    }

    /// 已加载的订单只提供其后继状态
    fn verifier_transition(&self, nocde: i64, cible: EtatCommande) -> PageResult<()> {
        match self.commandes.iter().find(|c| c.nocde == nocde) {
            Some(commande) if !commande.etatcde.suivants().contains(&cible) => Err(invalid(
                format!("Order #{} cannot go from {} to {}", nocde, commande.etatcde, cible),
            )),
            _ => Ok(()),
        }
    }

    pub async fn modifier_etat(&mut self, nocde: i64, cible: EtatCommande) -> PageResult<()> {
        let result = match self.verifier_transition(nocde, cible) {
            Ok(()) => self
                .api
                .modifier_etat_commande(nocde, cible)
                .await
                .map_err(PageError::from),
            Err(e) => Err(e),
        };
        logged(self.log, "State change", result)?;
        self.log
            .success(format!("Order #{} -> {}", nocde, cible));
        self.mount().await?;
        Ok(())
    }

    pub async fn annuler(&mut self, nocde: i64) -> PageResult<Option<Commande>> {
        let result = self
            .api
            .annuler_commande(nocde)
            .await
            .map_err(PageError::from);
        let annulee = logged(self.log, "Order cancellation", result)?;
        self.log.warning(format!("Order #{} cancelled", nocde));
        self.mount().await?;
        Ok(annulee.commande)
    }

    pub async fn charger_lignes(&mut self, nocde: i64) -> PageResult<&[LigCdeDetail]> {
        let result = self
            .api
            .ligcdes_commande(nocde)
            .await
            .map_err(PageError::from);
        self.lignes = logged(self.log, "Order lines", result)?;
        Ok(&self.lignes)
    }

    pub async fn ajouter_ligne(&mut self, nocde: i64, refart: &str, qtecde: i64) -> PageResult<()> {
        let result = if refart.trim().is_empty() {
            Err(invalid("Article reference is required"))
        } else if qtecde <= 0 {
            Err(invalid("Quantity must be positive"))
        } else {
            self.api
                .ajouter_ligcde(nocde, refart.trim(), qtecde)
                .await
                .map_err(PageError::from)
        };
        logged(self.log, "Adding order line", result)?;
        self.log.success(format!(
            "Article {} x{} added to order #{}",
            refart.trim(),
            qtecde,
            nocde
        ));
        self.charger_lignes(nocde).await?;
        Ok(())
    }

    pub async fn supprimer_ligne(&mut self, nocde: i64, refart: &str) -> PageResult<()> {
        let result = self
            .api
            .supprimer_ligcde(nocde, refart)
            .await
            .map_err(PageError::from);
        logged(self.log, "Removing order line", result)?;
        self.log
            .warning(format!("Article {} removed from order #{}", refart, nocde));
        self.charger_lignes(nocde).await?;
        Ok(())
    }
}

// =============================================================================
// Livraisons
// =============================================================================

#[derive(Debug, Clone, Default)]
pub struct LivraisonRecherche {
    pub nocde: Option<i64>,
    pub livreur: Option<i64>,
    pub code_postal: Option<i64>,
    pub date: Option<String>,
}

impl LivraisonRecherche {
    pub fn params(&self) -> Vec<(&'static str, String)> {
        let mut params = Vec::new();
        push_param(&mut params, "nocde", &self.nocde);
        push_param(&mut params, "livreur", &self.livreur);
        push_param(&mut params, "code_postal", &self.code_postal);
        push_param(&mut params, "date", &self.date);
        params
    }
}

#[derive(Debug, Clone)]
pub struct LivraisonFormulaire {
    pub nocde: i64,
    pub livreur: i64,
    pub dateliv: String,
    pub modepay: Option<String>,
}

pub fn valider_livraison(form: &LivraisonFormulaire) -> PageResult<()> {
    if form.nocde <= 0 || form.livreur <= 0 || form.dateliv.trim().is_empty() {
        return Err(invalid("Order number, courier and date are required"));
    }
    if parse_date_utc_noon(&form.dateliv).is_none() {
        return Err(invalid("Invalid date (expected YYYY-MM-DD)"));
    }
    Ok(())
}

pub struct LivraisonsPage<'a> {
    api: &'a ApiClient,
    log: &'a mut ActivityLog,
    livraisons: Vec<Livraison>,
}

impl<'a> LivraisonsPage<'a> {
    pub fn new(api: &'a ApiClient, log: &'a mut ActivityLog) -> Self {
        Self {
            api,
            log,
            livraisons: Vec::new(),
        }
    }

    pub fn livraisons(&self) -> &[Livraison] {
        &self.livraisons
    }

    pub async fn mount(&mut self) -> PageResult<&[Livraison]> {
        self.rechercher(&LivraisonRecherche::default()).await
    }

    pub async fn rechercher(&mut self, recherche: &LivraisonRecherche) -> PageResult<&[Livraison]> {
        let result = self
            .api
            .chercher_livraisons(&recherche.params())
            .await
            .map_err(PageError::from);
        self.livraisons = logged(self.log, "Delivery search", result)?;
        self.log
            .info(format!("{} delivery(ies) found", self.livraisons.len()));
        Ok(&self.livraisons)
    }

    pub async fn ajouter(&mut self, form: &LivraisonFormulaire) -> PageResult<()> {
        let result = match valider_livraison(form) {
            Ok(()) => self
                .api
                .ajouter_livraison(form.nocde, form.livreur, &form.dateliv, form.modepay.as_deref())
                .await
                .map_err(PageError::from),
            Err(e) => Err(e),
        };
        logged(self.log, "Delivery planning", result)?;
        self.log
            .success(format!("Delivery planned for order #{}", form.nocde));
        self.mount().await?;
        Ok(())
    }

    pub async fn supprimer(&mut self, nocde: i64, dateliv: NaiveDate) -> PageResult<()> {
        let result = self
            .api
            .supprimer_livraison(nocde, dateliv)
            .await
            .map_err(PageError::from);
        logged(self.log, "Delivery deletion", result)?;
        self.log
            .warning(format!("Delivery of order #{} on {} deleted", nocde, dateliv));
        self.mount().await?;
        Ok(())
    }

    pub async fn modifier(
        &mut self,
        nocde: i64,
        dateliv: NaiveDate,
        nouvelle_date: Option<&str>,
        nouveau_livreur: Option<i64>,
    ) -> PageResult<()> {
        let result = if nouvelle_date.is_none() && nouveau_livreur.is_none() {
            Err(invalid("Nothing to update"))
        } else if nouvelle_date.is_some_and(|d| parse_date_utc_noon(d).is_none()) {
            Err(invalid("Invalid date (expected YYYY-MM-DD)"))
        } else {
            self.api
                .modifier_livraison(nocde, dateliv, nouvelle_date, nouveau_livreur)
                .await
                .map_err(PageError::from)
        };
        logged(self.log, "Delivery update", result)?;
        self.log
            .info(format!("Delivery of order #{} updated", nocde));
        self.mount().await?;
        Ok(())
    }

    pub async fn modifier_etat(
        &mut self,
        nocde: i64,
        dateliv: NaiveDate,
        etat: EtatLivraison,
    ) -> PageResult<Option<Commande>> {
        let result = self
            .api
            .modifier_etat_livraison(nocde, dateliv, etat)
            .await
            .map_err(PageError::from);
        let etats = logged(self.log, "Delivery state change", result)?;
        self.log
            .success(format!("Delivery of order #{} -> {}", nocde, etat));
        self.mount().await?;
        Ok(etats.commande)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn article(prix_a: f64, prix_v: f64) -> NouvelArticle {
        NouvelArticle {
            designation: "Stylo".to_string(),
            prix_a,
            prix_v,
            codetva: 1,
            categorie: None,
            qtestk: 0,
        }
    }

    #[test]
    fn test_sell_price_must_exceed_buy_price() {
        assert!(valider_article(&article(2.0, 3.0)).is_ok());
        assert!(matches!(
            valider_article(&article(3.0, 3.0)),
            Err(PageError::Validation(_))
        ));
    }

    #[test]
    fn test_partial_update_compares_only_when_both_prices_given() {
        let patch = ModificationArticle {
            prix_v: Some(1.0),
            ..Default::default()
        };
        assert!(valider_modification(&patch).is_ok());

        let patch = ModificationArticle {
            prix_a: Some(5.0),
            prix_v: Some(1.0),
            ..Default::default()
        };
        assert!(valider_modification(&patch).is_err());
        assert!(valider_modification(&ModificationArticle::default()).is_err());
    }

    #[test]
    fn test_category_comes_from_fixed_list() {
        let mut nouveau = article(2.0, 3.0);
        nouveau.categorie = Some("Bureau".to_string());
        assert!(valider_article(&nouveau).is_ok());

        nouveau.categorie = Some("Jardinage".to_string());
        assert!(matches!(
            valider_article(&nouveau),
            Err(PageError::Validation(_))
        ));

        let patch = ModificationArticle {
            categorie: Some("bureau".to_string()),
            ..Default::default()
        };
        assert!(valider_modification(&patch).is_err());
    }

    #[test]
    fn test_search_params_skip_blank_filters() {
        let recherche = LivraisonRecherche {
            nocde: Some(4),
            date: Some(" ".to_string()),
            ..Default::default()
        };
        assert_eq!(recherche.params(), vec![("nocde", "4".to_string())]);
        assert!(ArticleRecherche::default().params().is_empty());
    }

    #[test]
    fn test_delivery_form() {
        let mut form = LivraisonFormulaire {
            nocde: 1,
            livreur: 2,
            dateliv: "2026-11-02".to_string(),
            modepay: None,
        };
        assert!(valider_livraison(&form).is_ok());

        form.dateliv = "02/11/2026".to_string();
        assert!(valider_livraison(&form).is_err());
    }

    #[tokio::test]
    async fn test_validation_failure_is_logged_without_request() {
        // 端口 1 不可达，若发出请求会得到网络错误而不是校验错误
        let api = ApiClient::new("http://127.0.0.1:1/api").unwrap();
        let mut log = ActivityLog::new();
        let mut page = ArticlesPage::new(&api, &mut log);

        let err = page.ajouter(&article(5.0, 1.0)).await.unwrap_err();
        assert!(matches!(err, PageError::Validation(_)));
        drop(page);
        assert_eq!(log.len(), 1);
    }

    #[tokio::test]
    async fn test_unknown_category_is_rejected_without_request() {
        let api = ApiClient::new("http://127.0.0.1:1/api").unwrap();
        let mut log = ActivityLog::new();
        let mut page = ArticlesPage::new(&api, &mut log);

        let mut nouveau = article(2.0, 3.0);
        nouveau.categorie = Some("Jardinage".to_string());
        let err = page.ajouter(&nouveau).await.unwrap_err();
        assert!(err.to_string().starts_with("Unknown category Jardinage"));

        let patch = ModificationArticle {
            categorie: Some("Jardinage".to_string()),
            ..Default::default()
        };
        let err = page.modifier("A001", &patch).await.unwrap_err();
        assert!(matches!(err, PageError::Validation(_)));
    }
}
