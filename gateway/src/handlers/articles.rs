//! `/api/articles`

use std::collections::HashMap;

use axum::{
    Router,
    extract::{Path, Query, State},
    routing::{delete, get, post, put},
};
use gestion_domain::{Article, ArticleFiltre, ModificationArticle, NouvelArticle};
use gestion_errors::{AppError, AppResult};
use serde::Serialize;
use tracing::info;

use crate::extract::{Fields, JsonBody};
use crate::response::{Message, Success, success};
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/test", get(test_connexion))
        .route("/ajouter", post(ajouter))
        .route("/chercher", get(chercher))
        .route("/supprimer/{refart}", delete(supprimer))
        .route("/modifier/{refart}", put(modifier))
}

async fn test_connexion(State(state): State<AppState>) -> AppResult<Success<Message>> {
    state.sessions.ping().await?;
    Ok(success(Message::new("Database connection established")))
}

#[derive(Debug, Serialize)]
struct Ajoute {
    refart: String,
    message: &'static str,
}

async fn ajouter(
    State(state): State<AppState>,
    JsonBody(fields): JsonBody<Fields>,
) -> AppResult<Success<Ajoute>> {
    fields.require(
        &["designation", "prixA", "prixV", "codetva"],
        "Missing required fields",
    )?;

    let article = NouvelArticle {
        designation: fields.required_string("designation")?,
        prix_a: fields.required_f64("prixA")?,
        prix_v: fields.required_f64("prixV")?,
        codetva: fields.required_i32("codetva")?,
        categorie: fields.string("categorie"),
        qtestk: fields.i64("qtestk")?.unwrap_or(0),
    };

    let session = state.sessions.begin().await?;
    let refart = session.articles().ajouter(&article).await?;
    session.commit().await?;

    info!(refart = %refart, "Article created");
    Ok(success(Ajoute {
        refart,
        message: "Article created",
    }))
}

#[derive(Debug, Serialize)]
struct Articles {
    articles: Vec<Article>,
}

/// 包过程没有返回行时退回直接扫描整张表
async fn chercher(
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
) -> AppResult<Success<Articles>> {
    let fields = Fields::from(params);
    let filtre = ArticleFiltre {
        refart: fields.string("refart"),
        designation: fields.string("designation"),
        categorie: fields.string("categorie"),
    };

    let session = state.sessions.begin().await?;
    let mut articles = session.articles().chercher(&filtre).await?;
    if articles.is_empty() {
        articles = session.articles().lister().await?;
    }
    session.commit().await?;

    Ok(success(Articles { articles }))
}

fn refart_param(raw: &str) -> AppResult<String> {
    let refart = raw.trim();
    if refart.is_empty() {
        return Err(AppError::validation("Article reference is required"));
    }
    Ok(refart.to_string())
}

async fn supprimer(
    State(state): State<AppState>,
    Path(refart): Path<String>,
) -> AppResult<Success<Message>> {
    let refart = refart_param(&refart)?;

    let session = state.sessions.begin().await?;
    session.articles().supprimer(&refart).await?;
    session.commit().await?;

    info!(refart = %refart, "Article deleted");
    Ok(success(Message::new("Article deleted")))
}

async fn modifier(
    State(state): State<AppState>,
    Path(refart): Path<String>,
    JsonBody(fields): JsonBody<Fields>,
) -> AppResult<Success<Message>> {
    let refart = refart_param(&refart)?;

    let patch = ModificationArticle {
        designation: fields.string("designation"),
        prix_a: fields.f64("prixA")?,
        prix_v: fields.f64("prixV")?,
        codetva: fields.i32("codetva")?,
        categorie: fields.string("categorie"),
        qtestk: fields.i64("qtestk")?,
    };

    let session = state.sessions.begin().await?;
    session.articles().modifier(&refart, &patch).await?;
    session.commit().await?;

    Ok(success(Message::new(format!("Article {} updated", refart))))
}
