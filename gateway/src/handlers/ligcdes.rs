//! `/api/ligcdes`
//!
//! 明细没有包过程，直接读写 ligcdes 表。

use axum::{
    Router,
    extract::{Path, State},
    routing::{delete, get, post},
};
use gestion_domain::{LigCde, LigCdeDetail};
use gestion_errors::{AppError, AppResult};
use serde::Serialize;
use tracing::info;

use crate::extract::{Fields, JsonBody, path_i64};
use crate::response::{Message, Success, success};
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/ajouter", post(ajouter))
        .route("/commande/{nocde}", get(par_commande))
        .route("/supprimer/{nocde}/{refart}", delete(supprimer))
}

#[derive(Debug, Serialize)]
struct Ajoutee {
    message: &'static str,
    ligcde: Option<LigCde>,
}

/// 依次检查：订单存在且在途、商品存在、明细不重复
async fn ajouter(
    State(state): State<AppState>,
    JsonBody(fields): JsonBody<Fields>,
) -> AppResult<Success<Ajoutee>> {
    fields.require(
        &["nocde", "refart", "qtecde"],
        "Order number, article reference and quantity are required",
    )?;
    let nocde = fields.required_i64("nocde")?;
    let refart = fields.required_string("refart")?.trim().to_string();
    let qtecde = fields.required_i64("qtecde")?;
    if qtecde <= 0 {
        return Err(AppError::validation("Quantity must be positive"));
    }

    let session = state.sessions.begin().await?;

    let commande = session
        .commandes()
        .trouver(nocde)
        .await?
        .ok_or_else(|| AppError::validation("Order not found"))?;
    if !commande.etatcde.accepte_lignes() {
        return Err(AppError::validation(format!(
            "Cannot add articles: the order is in state '{}'. It must be in progress (EC).",
            commande.etatcde
        )));
    }

    if !session.articles().existe(&refart).await? {
        return Err(AppError::validation("Article not found"));
    }

    if session.ligcdes().existe(nocde, &refart).await? {
        return Err(AppError::validation(
            "This article is already in this order",
        ));
    }

    session
        .ligcdes()
        .inserer(&LigCde {
            nocde,
            refart: refart.clone(),
            qtecde,
        })
        .await?;
    let ligcde = session.ligcdes().trouver(nocde, &refart).await?;
    session.commit().await?;

    info!(nocde, refart = %refart, qtecde, "Order line added");
    Ok(success(Ajoutee {
        message: "Article added to order",
        ligcde,
    }))
}

#[derive(Debug, Serialize)]
struct Lignes {
    ligcdes: Vec<LigCdeDetail>,
}

async fn par_commande(
    State(state): State<AppState>,
    Path(nocde): Path<String>,
) -> AppResult<Success<Lignes>> {
    let nocde = path_i64("nocde", &nocde)?;

    let session = state.sessions.begin().await?;
    let ligcdes = session.ligcdes().lister_par_commande(nocde).await?;
    session.commit().await?;

    Ok(success(Lignes { ligcdes }))
}

/// 没有删除任何行时返回 400，事务不提交
async fn supprimer(
    State(state): State<AppState>,
    Path((nocde, refart)): Path<(String, String)>,
) -> AppResult<Success<Message>> {
    let nocde = path_i64("nocde", &nocde)?;
    let refart = refart.trim();
    if refart.is_empty() {
        return Err(AppError::validation(
            "Order number and article reference are required",
        ));
    }

    let session = state.sessions.begin().await?;
    let supprimees = session.ligcdes().supprimer(nocde, refart).await?;
    if supprimees == 0 {
        return Err(AppError::validation("Order line not found"));
    }
    session.commit().await?;

    info!(nocde, refart = %refart, "Order line removed");
    Ok(success(Message::new("Article removed from order")))
}
