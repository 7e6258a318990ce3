//! `/api/livraisons`
//!
//! 所有日期参数锚定在 UTC 正午；变更后的接口回读配送和订单的当前状态。

use std::collections::HashMap;

use axum::{
    Router,
    extract::{Path, Query, State},
    routing::{delete, get, post, put},
};
use chrono::{DateTime, Utc};
use gestion_domain::{
    Commande, DATE_FORMAT_MESSAGE, EtatLivraison, Livraison, LivraisonFiltre,
    MODE_PAIEMENT_DEFAUT, ModificationLivraison, NouvelleLivraison, parse_date_utc_noon,
};
use gestion_errors::{AppError, AppResult};
use gestion_ports::GestionSession;
use serde::Serialize;
use tracing::info;

use crate::extract::{Fields, JsonBody, path_i64};
use crate::response::{Message, Success, success};
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/ajouter", post(ajouter))
        .route("/chercher", get(chercher))
        .route("/supprimer/{nocde}/{dateliv}", delete(supprimer))
        .route("/modifier", put(modifier))
        .route("/modifier-etat", put(modifier_etat))
}

fn date_noon(raw: &str) -> AppResult<DateTime<Utc>> {
    parse_date_utc_noon(raw).ok_or_else(|| AppError::validation(DATE_FORMAT_MESSAGE))
}

fn date_noon_field(raw: &str, field: &str) -> AppResult<DateTime<Utc>> {
    parse_date_utc_noon(raw).ok_or_else(|| {
        AppError::validation(format!(
            "Invalid date format for {} (expected YYYY-MM-DD or ISO)",
            field
        ))
    })
}

/// 变更后的配送与订单
#[derive(Debug, Serialize)]
struct Etats {
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<&'static str>,
    livraison: Option<Livraison>,
    commande: Option<Commande>,
}

async fn relire(
    session: &dyn GestionSession,
    nocde: i64,
    dateliv: DateTime<Utc>,
    message: Option<&'static str>,
) -> AppResult<Etats> {
    Ok(Etats {
        message,
        livraison: session.livraisons().trouver(nocde, dateliv).await?,
        commande: session.commandes().trouver(nocde).await?,
    })
}

async fn ajouter(
    State(state): State<AppState>,
    JsonBody(fields): JsonBody<Fields>,
) -> AppResult<Success<Etats>> {
    fields.require(&["nocde", "livreur", "dateliv"], "Missing required fields")?;
    let dateliv = date_noon(&fields.required_string("dateliv")?)?;

    let livraison = NouvelleLivraison {
        nocde: fields.required_i64("nocde")?,
        livreur: fields.required_i64("livreur")?,
        dateliv,
        modepay: fields
            .string("modepay")
            .unwrap_or_else(|| MODE_PAIEMENT_DEFAUT.to_string()),
    };

    let session = state.sessions.begin().await?;
    session.livraisons().ajouter(&livraison).await?;
    let etats = relire(
        session.as_ref(),
        livraison.nocde,
        dateliv,
        Some("Delivery created"),
    )
    .await?;
    session.commit().await?;

    info!(
        nocde = livraison.nocde,
        livreur = livraison.livreur,
        dateliv = %dateliv.date_naive(),
        "Delivery created"
    );
    Ok(success(etats))
}

#[derive(Debug, Serialize)]
struct Livraisons {
    livraisons: Vec<Livraison>,
}

async fn chercher(
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
) -> AppResult<Success<Livraisons>> {
    let fields = Fields::from(params);
    let date = match fields.string("date") {
        Some(raw) => Some(date_noon(&raw)?),
        None => None,
    };
    let filtre = LivraisonFiltre {
        nocde: fields.i64("nocde")?,
        livreur: fields.i64("livreur")?,
        code_postal: fields.i64("code_postal")?,
        date,
    };

    let session = state.sessions.begin().await?;
    let livraisons = session.livraisons().chercher(&filtre).await?;
    session.commit().await?;

    Ok(success(Livraisons { livraisons }))
}

async fn supprimer(
    State(state): State<AppState>,
    Path((nocde, dateliv)): Path<(String, String)>,
) -> AppResult<Success<Etats>> {
    let nocde = path_i64("nocde", &nocde)?;
    let dateliv = date_noon(&dateliv)?;

    let session = state.sessions.begin().await?;
    session.livraisons().supprimer(nocde, dateliv).await?;
    let etats = relire(session.as_ref(), nocde, dateliv, Some("Delivery deleted")).await?;
    session.commit().await?;

    info!(nocde, dateliv = %dateliv.date_naive(), "Delivery deleted");
    Ok(success(etats))
}

async fn modifier(
    State(state): State<AppState>,
    JsonBody(fields): JsonBody<Fields>,
) -> AppResult<Success<Message>> {
    fields.require(&["nocde", "dateliv"], "Order number and date are required")?;
    let nocde = fields.required_i64("nocde")?;
    let dateliv = date_noon_field(&fields.required_string("dateliv")?, "dateliv")?;
    let nouvelle_date = match fields.string("nouvelle_date") {
        Some(raw) => Some(date_noon_field(&raw, "nouvelle_date")?),
        None => None,
    };

    let modification = ModificationLivraison {
        nocde,
        dateliv,
        nouvelle_date,
        nouveau_livreur: fields.i64("nouveau_livreur")?,
    };

    let session = state.sessions.begin().await?;
    session.livraisons().modifier(&modification).await?;
    session.commit().await?;

    info!(nocde, dateliv = %dateliv.date_naive(), "Delivery updated");
    Ok(success(Message::new("Delivery updated")))
}

/// 直接写配送状态，再把状态镜像到订单
async fn modifier_etat(
    State(state): State<AppState>,
    JsonBody(fields): JsonBody<Fields>,
) -> AppResult<Success<Etats>> {
    fields.require(
        &["nocde", "dateliv", "etatliv"],
        "nocde, dateliv and etatliv are required",
    )?;
    let etat: EtatLivraison = fields.required_string("etatliv")?.parse()?;
    let dateliv = date_noon(&fields.required_string("dateliv")?)?;
    let nocde = fields.required_i64("nocde")?;

    let session = state.sessions.begin().await?;
    let modifiees = session
        .livraisons()
        .modifier_etat(nocde, dateliv, etat)
        .await?;
    if modifiees == 0 {
        return Err(AppError::validation("Delivery not found"));
    }

    let actuel = session
        .commandes()
        .trouver(nocde)
        .await?
        .map(|commande| commande.etatcde);
    if let Some(cible) = etat.miroir_commande(actuel) {
        session.commandes().forcer_etat(nocde, cible).await?;
    }

    let etats = relire(session.as_ref(), nocde, dateliv, None).await?;
    session.commit().await?;

    info!(nocde, etatliv = %etat, "Delivery state updated");
    Ok(success(etats))
}
