//! 仪表盘统计

use serde::Serialize;
use tracing::warn;

use crate::api::{ApiClient, ClientResult};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Statistiques {
    pub articles: usize,
    pub commandes: usize,
    pub livraisons: usize,
}

fn compter<T>(resource: &str, result: ClientResult<Vec<T>>) -> usize {
    match result {
        Ok(items) => items.len(),
        Err(e) => {
            warn!(resource, error = %e, "Count unavailable");
            0
        }
    }
}

/// 三个列表并发加载，失败的一项记为 0
pub async fn charger_statistiques(api: &ApiClient) -> Statistiques {
    let (articles, commandes, livraisons) = tokio::join!(
        api.chercher_articles(&[]),
        api.chercher_commandes(&[]),
        api.chercher_livraisons(&[]),
    );

    Statistiques {
        articles: compter("articles", articles),
        commandes: compter("commandes", commandes),
        livraisons: compter("livraisons", livraisons),
    }
}
