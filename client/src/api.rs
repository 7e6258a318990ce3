//! HTTP API 客户端
//!
//! 每个网关端点对应一个方法；失败统一归一化为 [`ClientError`]。

use chrono::NaiveDate;
use gestion_domain::{
    Article, Commande, EtatCommande, EtatLivraison, LigCde, LigCdeDetail, Livraison,
    ModificationArticle, NouvelArticle,
};
use reqwest::{Client, Method, RequestBuilder, Url};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use thiserror::Error;
use tracing::{debug, warn};

/// 默认 API 地址
pub const DEFAULT_API_URL: &str = "http://localhost:3000/api";

/// 没有任何可用信息时的兜底提示
pub const NETWORK_ERROR: &str = "Erreur réseau";

/// 归一化后的客户端错误
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{message}")]
pub struct ClientError {
    pub message: String,
    pub status: Option<u16>,
    pub details: Option<Value>,
}

impl ClientError {
    /// 归一化：响应体 message → 响应体 error → 传输层描述 → 兜底提示
    pub fn normalize(status: Option<u16>, body: Option<Value>, transport: Option<String>) -> Self {
        let from_body = |key: &str| {
            body.as_ref()
                .and_then(|b| b.get(key))
                .and_then(Value::as_str)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
        };

        let message = from_body("message")
            .or_else(|| from_body("error"))
            .or(transport.filter(|t| !t.is_empty()))
            .unwrap_or_else(|| NETWORK_ERROR.to_string());

        Self {
            message,
            status,
            details: body,
        }
    }

    fn transport(err: reqwest::Error) -> Self {
        Self::normalize(err.status().map(|s| s.as_u16()), None, Some(err.to_string()))
    }
}

pub type ClientResult<T> = Result<T, ClientError>;

// =============================================================================
// 响应体
// =============================================================================

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Reponse {
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ArticleAjoute {
    pub refart: String,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct Articles {
    #[serde(default)]
    articles: Vec<Article>,
}

#[derive(Debug, Clone, Deserialize)]
struct CommandeAjoutee {
    nocde: i64,
}

#[derive(Debug, Clone, Deserialize)]
struct Commandes {
    #[serde(default)]
    commandes: Vec<Commande>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CommandeAnnulee {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub commande: Option<Commande>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LigneAjoutee {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub ligcde: Option<LigCde>,
}

#[derive(Debug, Clone, Deserialize)]
struct Lignes {
    #[serde(default)]
    ligcdes: Vec<LigCdeDetail>,
}

#[derive(Debug, Clone, Deserialize)]
struct Livraisons {
    #[serde(default)]
    livraisons: Vec<Livraison>,
}

/// 配送变更后回读的配送与订单
#[derive(Debug, Clone, Deserialize)]
pub struct EtatsLivraison {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub livraison: Option<Livraison>,
    #[serde(default)]
    pub commande: Option<Commande>,
}

// =============================================================================
// ApiClient
// =============================================================================

/// 网关客户端，克隆共享连接池
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: Client,
    base: Url,
}

impl ApiClient {
    pub fn new(base_url: &str) -> ClientResult<Self> {
        let base = Url::parse(base_url.trim_end_matches('/')).map_err(|e| {
            ClientError::normalize(None, None, Some(format!("Invalid API URL {}: {}", base_url, e)))
        })?;
        if base.cannot_be_a_base() {
            return Err(ClientError::normalize(
                None,
                None,
                Some(format!("Invalid API URL {}", base_url)),
            ));
        }
        Ok(Self {
            http: Client::new(),
            base,
        })
    }

    pub fn base_url(&self) -> &str {
        self.base.as_str()
    }

    /// 基地址后追加路径段，段内容按 URL 规则转义
    fn url(&self, segments: &[&str]) -> Url {
        let mut url = self.base.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    fn request(&self, method: Method, segments: &[&str]) -> RequestBuilder {
        self.http.request(method, self.url(segments))
    }

    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> ClientResult<T> {
        let response = request.send().await.map_err(ClientError::transport)?;
        let status = response.status();
        let bytes = response.bytes().await.map_err(ClientError::transport)?;
        let body: Option<Value> = serde_json::from_slice(&bytes).ok();

        if !status.is_success() {
            let err = ClientError::normalize(
                Some(status.as_u16()),
                body,
                Some(format!("Request failed with status code {}", status.as_u16())),
            );
            warn!(status = status.as_u16(), error = %err, "API error");
            return Err(err);
        }

        debug!(status = status.as_u16(), "API response");
        let body = body.unwrap_or(Value::Null);
        serde_json::from_value(body.clone()).map_err(|e| {
            ClientError::normalize(
                Some(status.as_u16()),
                Some(body),
                Some(format!("Unexpected response: {}", e)),
            )
        })
    }

    // -------------------------------------------------------------------------
    // Articles
    // -------------------------------------------------------------------------

    /// `GET /articles/test`
    pub async fn check(&self) -> ClientResult<Reponse> {
        self.send(self.request(Method::GET, &["articles", "test"]))
            .await
    }

    pub async fn ajouter_article(&self, article: &NouvelArticle) -> ClientResult<ArticleAjoute> {
        self.send(self.request(Method::POST, &["articles", "ajouter"]).json(article))
            .await
    }

    pub async fn chercher_articles(&self, params: &[(&str, String)]) -> ClientResult<Vec<Article>> {
        let reponse: Articles = self
            .send(self.request(Method::GET, &["articles", "chercher"]).query(params))
            .await?;
        Ok(reponse.articles)
    }

    pub async fn supprimer_article(&self, refart: &str) -> ClientResult<Reponse> {
        self.send(self.request(Method::DELETE, &["articles", "supprimer", refart]))
            .await
    }

    pub async fn modifier_article(
        &self,
        refart: &str,
        patch: &ModificationArticle,
    ) -> ClientResult<Reponse> {
        self.send(
            self.request(Method::PUT, &["articles", "modifier", refart])
                .json(patch),
        )
        .await
    }

    // -------------------------------------------------------------------------
    // Commandes
    // -------------------------------------------------------------------------

    pub async fn ajouter_commande(&self, noclt: i64) -> ClientResult<i64> {
        let reponse: CommandeAjoutee = self
            .send(
                self.request(Method::POST, &["commandes", "ajouter"])
                    .json(&json!({ "noclt": noclt })),
            )
            .await?;
        Ok(reponse.nocde)
    }

    pub async fn modifier_etat_commande(
        &self,
        nocde: i64,
        nouvel_etat: EtatCommande,
    ) -> ClientResult<Reponse> {
        self.send(
            self.request(Method::PUT, &["commandes", "modifier-etat"])
                .json(&json!({ "nocde": nocde, "nouvel_etat": nouvel_etat })),
        )
        .await
    }

    pub async fn annuler_commande(&self, nocde: i64) -> ClientResult<CommandeAnnulee> {
        self.send(
            self.request(Method::POST, &["commandes", "annuler"])
                .json(&json!({ "nocde": nocde })),
        )
        .await
    }

    pub async fn chercher_commandes(
        &self,
        params: &[(&str, String)],
    ) -> ClientResult<Vec<Commande>> {
        let reponse: Commandes = self
            .send(self.request(Method::GET, &["commandes", "chercher"]).query(params))
            .await?;
        Ok(reponse.commandes)
    }

    // -------------------------------------------------------------------------
    // LigCdes
    // -------------------------------------------------------------------------

    pub async fn ajouter_ligcde(
        &self,
        nocde: i64,
        refart: &str,
        qtecde: i64,
    ) -> ClientResult<LigneAjoutee> {
        self.send(
            self.request(Method::POST, &["ligcdes", "ajouter"])
                .json(&json!({ "nocde": nocde, "refart": refart, "qtecde": qtecde })),
        )
        .await
    }

    pub async fn ligcdes_commande(&self, nocde: i64) -> ClientResult<Vec<LigCdeDetail>> {
        let reponse: Lignes = self
            .send(self.request(Method::GET, &["ligcdes", "commande", &nocde.to_string()]))
            .await?;
        Ok(reponse.ligcdes)
    }

    pub async fn supprimer_ligcde(&self, nocde: i64, refart: &str) -> ClientResult<Reponse> {
        self.send(self.request(
            Method::DELETE,
            &["ligcdes", "supprimer", &nocde.to_string(), refart],
        ))
        .await
    }

    // -------------------------------------------------------------------------
    // Livraisons
    // -------------------------------------------------------------------------

    pub async fn ajouter_livraison(
        &self,
        nocde: i64,
        livreur: i64,
        dateliv: &str,
        modepay: Option<&str>,
    ) -> ClientResult<EtatsLivraison> {
        self.send(
            self.request(Method::POST, &["livraisons", "ajouter"])
                .json(&json!({
                    "nocde": nocde,
                    "livreur": livreur,
                    "dateliv": dateliv,
                    "modepay": modepay,
                })),
        )
        .await
    }

    pub async fn chercher_livraisons(
        &self,
        params: &[(&str, String)],
    ) -> ClientResult<Vec<Livraison>> {
        let reponse: Livraisons = self
            .send(self.request(Method::GET, &["livraisons", "chercher"]).query(params))
            .await?;
        Ok(reponse.livraisons)
    }

    pub async fn supprimer_livraison(
        &self,
        nocde: i64,
        dateliv: NaiveDate,
    ) -> ClientResult<EtatsLivraison> {
        self.send(self.request(
            Method::DELETE,
            &[
                "livraisons",
                "supprimer",
                &nocde.to_string(),
                &dateliv.format("%Y-%m-%d").to_string(),
            ],
        ))
        .await
    }

    pub async fn modifier_livraison(
        &self,
        nocde: i64,
        dateliv: NaiveDate,
        nouvelle_date: Option<&str>,
        nouveau_livreur: Option<i64>,
    ) -> ClientResult<Reponse> {
        self.send(
            self.request(Method::PUT, &["livraisons", "modifier"])
                .json(&json!({
                    "nocde": nocde,
                    "dateliv": dateliv.format("%Y-%m-%d").to_string(),
                    "nouvelle_date": nouvelle_date,
                    "nouveau_livreur": nouveau_livreur,
                })),
        )
        .await
    }

    pub async fn modifier_etat_livraison(
        &self,
        nocde: i64,
        dateliv: NaiveDate,
        etatliv: EtatLivraison,
    ) -> ClientResult<EtatsLivraison> {
        self.send(
            self.request(Method::PUT, &["livraisons", "modifier-etat"])
                .json(&json!({
                    "nocde": nocde,
                    "dateliv": dateliv.format("%Y-%m-%d").to_string(),
                    "etatliv": etatliv,
                })),
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_takes_precedence() {
        let err = ClientError::normalize(
            Some(400),
            Some(json!({"success": false, "message": "m", "error": "e"})),
            Some("transport".to_string()),
        );
        assert_eq!(err.message, "m");
        assert_eq!(err.status, Some(400));
    }

    #[test]
    fn test_error_field_used_for_envelopes() {
        let err = ClientError::normalize(
            Some(400),
            Some(json!({"success": false, "error": "Order not found"})),
            Some("Request failed with status code 400".to_string()),
        );
        assert_eq!(err.message, "Order not found");
        assert!(err.details.is_some());
    }

    #[test]
    fn test_transport_then_fallback() {
        let err = ClientError::normalize(None, None, Some("connection refused".to_string()));
        assert_eq!(err.message, "connection refused");
        assert_eq!(err.status, None);

        let err = ClientError::normalize(None, Some(json!({"error": ""})), None);
        assert_eq!(err.message, NETWORK_ERROR);
    }

    #[test]
    fn test_path_segments_are_escaped() {
        let api = ApiClient::new("http://localhost:3000/api/").unwrap();
        let url = api.url(&["articles", "supprimer", "A 01"]);
        assert_eq!(url.as_str(), "http://localhost:3000/api/articles/supprimer/A%2001");
    }

    #[test]
    fn test_invalid_base_url() {
        assert!(ApiClient::new("not a url").is_err());
        assert!(ApiClient::new("mailto:gestion@example.com").is_err());
    }
}
