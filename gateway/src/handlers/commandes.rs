//! `/api/commandes`

use std::collections::HashMap;

use axum::{
    Router,
    extract::{Query, State},
    routing::{get, post, put},
};
use gestion_domain::{
    Commande, CommandeFiltre, DATE_FORMAT_MESSAGE, EtatCommande, parse_date_lenient,
    verifier_preconditions,
};
use gestion_errors::{AppError, AppResult};
use serde::Serialize;
use tracing::info;

use crate::extract::{Fields, JsonBody};
use crate::response::{Message, Success, success};
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/ajouter", post(ajouter))
        .route("/modifier-etat", put(modifier_etat))
        .route("/annuler", post(annuler))
        .route("/chercher", get(chercher))
}

#[derive(Debug, Serialize)]
struct Ajoutee {
    nocde: i64,
    message: &'static str,
}

async fn ajouter(
    State(state): State<AppState>,
    JsonBody(fields): JsonBody<Fields>,
) -> AppResult<Success<Ajoutee>> {
    fields.require(&["noclt"], "Customer number is required")?;
    let noclt = fields.required_i64("noclt")?;

    let session = state.sessions.begin().await?;
    let nocde = session.commandes().ajouter(noclt).await?;
    session.commit().await?;

    info!(nocde, noclt, "Order created");
    Ok(success(Ajoutee {
        nocde,
        message: "Order created",
    }))
}

/// 迁移到 PR 前先确认订单至少有一条明细，其余迁移交给数据库包裁决
async fn modifier_etat(
    State(state): State<AppState>,
    JsonBody(fields): JsonBody<Fields>,
) -> AppResult<Success<Message>> {
    fields.require(
        &["nocde", "nouvel_etat"],
        "Order number and new state are required",
    )?;
    let nocde = fields.required_i64("nocde")?;
    let etat: EtatCommande = fields.required_string("nouvel_etat")?.parse()?;

    let session = state.sessions.begin().await?;
    if etat.exige_lignes() {
        let lignes = session.ligcdes().compter(nocde).await?;
        verifier_preconditions(etat, lignes)?;
    }
    session.commandes().modifier_etat(nocde, etat).await?;
    session.commit().await?;

    info!(nocde, etat = %etat, "Order state updated");
    Ok(success(Message::new("Order state updated")))
}

#[derive(Debug, Serialize)]
struct Annulee {
    message: &'static str,
    commande: Option<Commande>,
}

async fn annuler(
    State(state): State<AppState>,
    JsonBody(fields): JsonBody<Fields>,
) -> AppResult<Success<Annulee>> {
    fields.require(&["nocde"], "Order number is required")?;
    let nocde = fields.required_i64("nocde")?;

    let session = state.sessions.begin().await?;
    session.commandes().annuler(nocde).await?;
    let commande = session.commandes().trouver(nocde).await?;
    session.commit().await?;

    info!(nocde, "Order cancelled");
    Ok(success(Annulee {
        message: "Order cancelled",
        commande,
    }))
}

#[derive(Debug, Serialize)]
struct Commandes {
    commandes: Vec<Commande>,
}

async fn chercher(
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
) -> AppResult<Success<Commandes>> {
    let fields = Fields::from(params);
    let date = match fields.string("date") {
        Some(raw) => Some(
            parse_date_lenient(&raw).ok_or_else(|| AppError::validation(DATE_FORMAT_MESSAGE))?,
        ),
        None => None,
    };
    let filtre = CommandeFiltre {
        nocde: fields.i64("nocde")?,
        noclt: fields.i64("noclt")?,
        date,
    };

    let session = state.sessions.begin().await?;
    let commandes = session.commandes().chercher(&filtre).await?;
    session.commit().await?;

    Ok(success(Commandes { commandes }))
}
