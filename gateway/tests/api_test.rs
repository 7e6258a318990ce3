//! 网关路由测试，数据库由内存会话工厂代替

use std::sync::Arc;

use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Request, StatusCode, header},
};
use chrono::{Duration, Utc};
use gestion_domain::{BusinessRule, EtatCommande, EtatLivraison};
use gestion_gateway::{AppState, build_router};
use gestion_ports::memory::MemorySessionFactory;
use serde_json::{Value, json};
use tower::ServiceExt;

fn app(factory: &MemorySessionFactory) -> Router {
    build_router(AppState::new(Arc::new(factory.clone())))
}

async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, value)
}

async fn creer_article(app: &Router) -> String {
    let (status, body) = send(
        app,
        "POST",
        "/api/articles/ajouter",
        Some(json!({
            "designation": "Clavier",
            "prixA": "10.5",
            "prixV": 19.9,
            "codetva": "2",
            "categorie": "Informatique"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    body["refart"].as_str().unwrap().to_string()
}

async fn creer_commande(app: &Router, noclt: i64) -> i64 {
    let (status, body) = send(
        app,
        "POST",
        "/api/commandes/ajouter",
        Some(json!({ "noclt": noclt })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    body["nocde"].as_i64().unwrap()
}

async fn ajouter_ligne(app: &Router, nocde: i64, refart: &str, qtecde: i64) -> (StatusCode, Value) {
    send(
        app,
        "POST",
        "/api/ligcdes/ajouter",
        Some(json!({ "nocde": nocde, "refart": refart, "qtecde": qtecde })),
    )
    .await
}

fn demain() -> String {
    (Utc::now().date_naive() + Duration::days(1))
        .format("%Y-%m-%d")
        .to_string()
}

// =============================================================================
// Service
// =============================================================================

#[tokio::test]
async fn test_index_and_health() {
    let factory = MemorySessionFactory::new();
    let app = app(&factory);

    let (status, body) = send(&app, "GET", "/", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["endpoints"]["ligcdes"], "/api/ligcdes");

    let (status, body) = send(&app, "GET", "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");

    let (status, body) = send(&app, "GET", "/ready", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["healthy"], true);
}

#[tokio::test]
async fn test_database_down() {
    let factory = MemorySessionFactory::indisponible();
    let app = app(&factory);

    let (status, body) = send(&app, "GET", "/api/articles/test", None).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["success"], false);
    assert_eq!(body["error"], "connection refused");

    let (status, _) = send(&app, "GET", "/ready", None).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);

    let (status, _) = send(&app, "POST", "/api/commandes/ajouter", Some(json!({"noclt": 1}))).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn test_invalid_json_is_a_400_envelope() {
    let factory = MemorySessionFactory::new();
    let app = app(&factory);

    let request = Request::builder()
        .method("POST")
        .uri("/api/commandes/ajouter")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{noclt: 7"))
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["success"], false);
}

// =============================================================================
// Articles
// =============================================================================

#[tokio::test]
async fn test_created_article_is_found_by_refart() {
    let factory = MemorySessionFactory::new();
    let app = app(&factory);
    creer_article(&app).await;
    let refart = creer_article(&app).await;
    assert_eq!(refart.len(), 4);

    let (status, body) = send(
        &app,
        "GET",
        &format!("/api/articles/chercher?refart={}", refart),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let articles = body["articles"].as_array().unwrap();
    assert_eq!(articles.len(), 1);
    assert_eq!(articles[0]["refart"], refart.as_str());
    assert_eq!(articles[0]["prixA"], 10.5);
    assert_eq!(articles[0]["qtestk"], 0);
}

#[tokio::test]
async fn test_empty_search_falls_back_to_full_scan() {
    let factory = MemorySessionFactory::new();
    let app = app(&factory);
    creer_article(&app).await;
    creer_article(&app).await;

    let (status, body) = send(&app, "GET", "/api/articles/chercher?refart=ZZZZ", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["articles"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_article_missing_fields() {
    let factory = MemorySessionFactory::new();
    let app = app(&factory);

    let (status, body) = send(
        &app,
        "POST",
        "/api/articles/ajouter",
        Some(json!({ "designation": "Stylo", "prixA": 1, "prixV": "", "codetva": 1 })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Missing required fields");
}

#[tokio::test]
async fn test_article_update_and_delete() {
    let factory = MemorySessionFactory::new();
    let app = app(&factory);
    let refart = creer_article(&app).await;

    let (status, body) = send(
        &app,
        "PUT",
        &format!("/api/articles/modifier/{}", refart),
        Some(json!({ "qtestk": "12", "designation": "" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["message"].as_str().unwrap().contains(&refart));

    let (_, body) = send(
        &app,
        "GET",
        &format!("/api/articles/chercher?refart={}", refart),
        None,
    )
    .await;
    assert_eq!(body["articles"][0]["qtestk"], 12);
    assert_eq!(body["articles"][0]["designation"], "Clavier");

    let (status, _) = send(&app, "DELETE", &format!("/api/articles/supprimer/{}", refart), None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send(&app, "DELETE", "/api/articles/supprimer/%20%20", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Article reference is required");
}

// =============================================================================
// Commandes
// =============================================================================

#[tokio::test]
async fn test_new_order_is_in_progress() {
    let factory = MemorySessionFactory::new();
    let app = app(&factory);

    let (status, body) = send(
        &app,
        "POST",
        "/api/commandes/ajouter",
        Some(json!({ "noclt": 7 })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    let nocde = body["nocde"].as_i64().unwrap();

    let (status, body) = send(
        &app,
        "GET",
        &format!("/api/commandes/chercher?nocde={}", nocde),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let commandes = body["commandes"].as_array().unwrap();
    assert_eq!(commandes.len(), 1);
    assert_eq!(commandes[0]["etatcde"], "EC");
    assert_eq!(commandes[0]["noclt"], 7);
}

#[tokio::test]
async fn test_ready_requires_at_least_one_line() {
    let factory = MemorySessionFactory::new();
    let app = app(&factory);
    let nocde = creer_commande(&app, 3).await;

    let (status, body) = send(
        &app,
        "PUT",
        "/api/commandes/modifier-etat",
        Some(json!({ "nocde": nocde, "nouvel_etat": "PR" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
    assert_eq!(
        factory.commande(nocde).await.unwrap().etatcde,
        EtatCommande::EnCours
    );
}

#[tokio::test]
async fn test_unknown_state_code_is_rejected() {
    let factory = MemorySessionFactory::new();
    let app = app(&factory);
    let nocde = creer_commande(&app, 3).await;

    let (status, _) = send(
        &app,
        "PUT",
        "/api/commandes/modifier-etat",
        Some(json!({ "nocde": nocde, "nouvel_etat": "XX" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_cancel_returns_order_and_translates_rules() {
    let factory = MemorySessionFactory::new();
    let app = app(&factory);
    let nocde = creer_commande(&app, 3).await;

    let (status, body) = send(
        &app,
        "POST",
        "/api/commandes/annuler",
        Some(json!({ "nocde": nocde })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["commande"]["etatcde"], "AN");

    let (status, body) = send(
        &app,
        "POST",
        "/api/commandes/annuler",
        Some(json!({ "nocde": nocde })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], BusinessRule::AnnulationImpossible.message());
}

#[tokio::test]
async fn test_order_search_rejects_bad_date() {
    let factory = MemorySessionFactory::new();
    let app = app(&factory);

    let (status, _) = send(&app, "GET", "/api/commandes/chercher?date=demain", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let today = Utc::now().date_naive().format("%Y-%m-%d").to_string();
    creer_commande(&app, 9).await;
    let (status, body) = send(
        &app,
        "GET",
        &format!("/api/commandes/chercher?date={}", today),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["commandes"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_order_search_accepts_iso_without_offset() {
    let factory = MemorySessionFactory::new();
    let app = app(&factory);
    creer_commande(&app, 9).await;

    let today = Utc::now().date_naive().format("%Y-%m-%d").to_string();
    for suffix in ["T08:30:00", "T08:30", "T08:30:00.000"] {
        let (status, body) = send(
            &app,
            "GET",
            &format!("/api/commandes/chercher?date={}{}", today, suffix),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK, "{suffix}");
        assert_eq!(body["commandes"].as_array().unwrap().len(), 1, "{suffix}");
    }
}

// =============================================================================
// LigCdes
// =============================================================================

#[tokio::test]
async fn test_duplicate_line_is_rejected() {
    let factory = MemorySessionFactory::new();
    let app = app(&factory);
    let refart = creer_article(&app).await;
    let nocde = creer_commande(&app, 3).await;

    let (status, body) = ajouter_ligne(&app, nocde, &refart, 2).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["ligcde"]["qtecde"], 2);

    let avant = factory.ligcdes().await;
    let (status, body) = ajouter_ligne(&app, nocde, &refart, 5).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "This article is already in this order");
    assert_eq!(factory.ligcdes().await, avant);
}

#[tokio::test]
async fn test_line_validation_order() {
    let factory = MemorySessionFactory::new();
    let app = app(&factory);
    let refart = creer_article(&app).await;
    let nocde = creer_commande(&app, 3).await;

    let (status, body) = ajouter_ligne(&app, nocde, &refart, -1).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Quantity must be positive");

    let (_, body) = ajouter_ligne(&app, 999, &refart, 1).await;
    assert_eq!(body["error"], "Order not found");

    let (_, body) = ajouter_ligne(&app, nocde, "NOPE", 1).await;
    assert_eq!(body["error"], "Article not found");

    send(
        &app,
        "POST",
        "/api/commandes/annuler",
        Some(json!({ "nocde": nocde })),
    )
    .await;
    let (status, body) = ajouter_ligne(&app, nocde, &refart, 1).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("'AN'"));
}

#[tokio::test]
async fn test_lines_of_order_and_removal() {
    let factory = MemorySessionFactory::new();
    let app = app(&factory);
    let a = creer_article(&app).await;
    let b = creer_article(&app).await;
    let nocde = creer_commande(&app, 3).await;
    ajouter_ligne(&app, nocde, &b, 1).await;
    ajouter_ligne(&app, nocde, &a, 4).await;

    let (status, body) = send(&app, "GET", &format!("/api/ligcdes/commande/{}", nocde), None).await;
    assert_eq!(status, StatusCode::OK);
    let lignes = body["ligcdes"].as_array().unwrap();
    assert_eq!(lignes.len(), 2);
    assert_eq!(lignes[0]["refart"], a.as_str());
    assert_eq!(lignes[0]["designation"], "Clavier");
    assert_eq!(lignes[0]["prixV"], 19.9);

    let (status, _) = send(
        &app,
        "DELETE",
        &format!("/api/ligcdes/supprimer/{}/{}", nocde, a),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(factory.ligcdes().await.len(), 1);
}

#[tokio::test]
async fn test_removing_missing_line_is_a_400() {
    let factory = MemorySessionFactory::new();
    let app = app(&factory);

    let (status, body) = send(&app, "DELETE", "/api/ligcdes/supprimer/41/ZZ01", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Order line not found");
}

// =============================================================================
// Livraisons
// =============================================================================

async fn commande_prete(app: &Router) -> i64 {
    let refart = creer_article(app).await;
    let nocde = creer_commande(app, 5).await;
    ajouter_ligne(app, nocde, &refart, 1).await;
    let (status, body) = send(
        app,
        "PUT",
        "/api/commandes/modifier-etat",
        Some(json!({ "nocde": nocde, "nouvel_etat": "PR" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    nocde
}

#[tokio::test]
async fn test_past_delivery_date_is_rejected() {
    let factory = MemorySessionFactory::new();
    let app = app(&factory);
    let nocde = commande_prete(&app).await;

    let (status, body) = send(
        &app,
        "POST",
        "/api/livraisons/ajouter",
        Some(json!({ "nocde": nocde, "livreur": 2, "dateliv": "2020-01-15" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], BusinessRule::DateLivraisonPassee.message());
    assert!(factory.livraisons().await.is_empty());
}

#[tokio::test]
async fn test_delivery_date_format() {
    let factory = MemorySessionFactory::new();
    let app = app(&factory);

    let (status, body) = send(
        &app,
        "POST",
        "/api/livraisons/ajouter",
        Some(json!({ "nocde": 1, "livreur": 2, "dateliv": "2026-02-30" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], gestion_domain::DATE_FORMAT_MESSAGE);

    let (status, _) = send(&app, "GET", "/api/livraisons/chercher?date=15/01/2026", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_delivery_lifecycle() {
    let factory = MemorySessionFactory::new();
    let app = app(&factory);
    let nocde = commande_prete(&app).await;
    let dateliv = demain();

    let (status, body) = send(
        &app,
        "POST",
        "/api/livraisons/ajouter",
        Some(json!({ "nocde": nocde, "livreur": "2", "dateliv": format!("{}T00:00:00.000Z", dateliv) })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["livraison"]["modepay"], "avant_livraison");
    assert_eq!(body["livraison"]["dateliv"], dateliv.as_str());
    assert_eq!(body["livraison"]["etatliv"], "EC");
    assert_eq!(body["commande"]["etatcde"], "PR");

    let (status, body) = send(
        &app,
        "GET",
        &format!("/api/livraisons/chercher?livreur=2&date={}", dateliv),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["livraisons"].as_array().unwrap().len(), 1);

    let (status, body) = send(
        &app,
        "PUT",
        "/api/livraisons/modifier-etat",
        Some(json!({ "nocde": nocde, "dateliv": dateliv, "etatliv": "LI" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["livraison"]["etatliv"], "LI");
    assert_eq!(body["commande"]["etatcde"], "LI");
    assert_eq!(
        factory.livraisons().await[0].etatliv,
        EtatLivraison::Livree
    );

    let (status, body) = send(
        &app,
        "POST",
        "/api/commandes/annuler",
        Some(json!({ "nocde": nocde })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], BusinessRule::AnnulationImpossible.message());
}

#[tokio::test]
async fn test_delivery_state_validation() {
    let factory = MemorySessionFactory::new();
    let app = app(&factory);

    let (status, body) = send(
        &app,
        "PUT",
        "/api/livraisons/modifier-etat",
        Some(json!({ "nocde": 1, "dateliv": demain(), "etatliv": "SO" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("EC,LI,AL"));

    let (status, body) = send(
        &app,
        "PUT",
        "/api/livraisons/modifier-etat",
        Some(json!({ "nocde": 1, "dateliv": demain(), "etatliv": "LI" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Delivery not found");
}

#[tokio::test]
async fn test_cancelling_with_pending_delivery() {
    let factory = MemorySessionFactory::new();
    let app = app(&factory);
    let nocde = commande_prete(&app).await;
    send(
        &app,
        "POST",
        "/api/livraisons/ajouter",
        Some(json!({ "nocde": nocde, "livreur": 2, "dateliv": demain() })),
    )
    .await;

    let (status, body) = send(
        &app,
        "POST",
        "/api/commandes/annuler",
        Some(json!({ "nocde": nocde })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], BusinessRule::LivraisonExistante.message());
}

#[tokio::test]
async fn test_delivery_update_and_delete() {
    let factory = MemorySessionFactory::new();
    let app = app(&factory);
    let nocde = commande_prete(&app).await;
    let dateliv = demain();
    send(
        &app,
        "POST",
        "/api/livraisons/ajouter",
        Some(json!({ "nocde": nocde, "livreur": 2, "dateliv": dateliv })),
    )
    .await;

    let (status, body) = send(
        &app,
        "PUT",
        "/api/livraisons/modifier",
        Some(json!({ "nocde": nocde, "dateliv": dateliv, "nouvelle_date": "bientot" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("nouvelle_date"));

    let (status, _) = send(
        &app,
        "PUT",
        "/api/livraisons/modifier",
        Some(json!({ "nocde": nocde, "dateliv": dateliv, "nouveau_livreur": 8 })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(factory.livraisons().await[0].livreur, 8);

    let (status, body) = send(
        &app,
        "DELETE",
        &format!("/api/livraisons/supprimer/{}/{}", nocde, dateliv),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["livraison"].is_null());
    assert_eq!(body["commande"]["nocde"], nocde);
    assert!(factory.livraisons().await.is_empty());
}
