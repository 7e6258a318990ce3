//! 定宽文本表格

use gestion_domain::{Article, Commande, LigCdeDetail, Livraison, libelle_tva};

use crate::dashboard::Statistiques;
use crate::log::ActivityLog;

/// 表格：列宽取表头与各单元格的最大字符数
#[derive(Debug, Clone, Default)]
pub struct Table {
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl Table {
    pub fn new<I, S>(headers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            headers: headers.into_iter().map(Into::into).collect(),
            rows: Vec::new(),
        }
    }

    pub fn row(&mut self, cells: Vec<String>) -> &mut Self {
        self.rows.push(cells);
        self
    }

    fn widths(&self) -> Vec<usize> {
        let mut widths: Vec<usize> = self.headers.iter().map(|h| h.chars().count()).collect();
        for row in &self.rows {
            for (i, cell) in row.iter().enumerate() {
                let len = cell.chars().count();
                match widths.get_mut(i) {
                    Some(w) => *w = (*w).max(len),
                    None => widths.push(len),
                }
            }
        }
        widths
    }

    pub fn render(&self) -> String {
        let widths = self.widths();
        let line = |cells: &[String]| {
            widths
                .iter()
                .enumerate()
                .map(|(i, w)| {
                    let cell = cells.get(i).map(String::as_str).unwrap_or("");
                    format!("{:<width$}", cell, width = *w)
                })
                .collect::<Vec<_>>()
                .join(" | ")
                .trim_end()
                .to_string()
        };

        let mut out = line(&self.headers);
        out.push('\n');
        out.push_str(
            &widths
                .iter()
                .map(|w| "-".repeat(*w))
                .collect::<Vec<_>>()
                .join("-+-"),
        );
        for row in &self.rows {
            out.push('\n');
            out.push_str(&line(row));
        }
        if self.rows.is_empty() {
            out.push_str("\n(no data)");
        }
        out
    }
}

fn prix(value: f64) -> String {
    format!("{:.2}", value)
}

pub fn articles(articles: &[Article]) -> String {
    let mut table = Table::new(["Ref", "Designation", "Buy", "Sell", "VAT", "Category", "Stock"]);
    for a in articles {
        table.row(vec![
            a.refart.clone(),
            a.designation.clone(),
            prix(a.prix_a),
            prix(a.prix_v),
            libelle_tva(a.codetva).to_string(),
            a.categorie.clone().unwrap_or_default(),
            a.qtestk.to_string(),
        ]);
    }
    table.render()
}

pub fn commandes(commandes: &[Commande]) -> String {
    let mut table = Table::new(["Order", "Customer", "Date", "State"]);
    for c in commandes {
        table.row(vec![
            c.nocde.to_string(),
            c.noclt.to_string(),
            c.datecde.format("%Y-%m-%d").to_string(),
            format!("{} ({})", c.etatcde, c.etatcde.libelle()),
        ]);
    }
    table.render()
}

/// 明细表，末尾附合计
pub fn lignes(lignes: &[LigCdeDetail]) -> String {
    let mut table = Table::new(["Ref", "Designation", "Qty", "Unit price", "Amount"]);
    for l in lignes {
        table.row(vec![
            l.refart.clone(),
            l.designation.clone(),
            l.qtecde.to_string(),
            prix(l.prix_v),
            prix(l.montant()),
        ]);
    }
    let total: f64 = lignes.iter().map(LigCdeDetail::montant).sum();
    format!("{}\nTotal: {}", table.render(), prix(total))
}

pub fn livraisons(livraisons: &[Livraison]) -> String {
    let mut table = Table::new(["Order", "Date", "Courier", "Payment", "State"]);
    for l in livraisons {
        table.row(vec![
            l.nocde.to_string(),
            l.dateliv.format("%Y-%m-%d").to_string(),
            l.livreur.to_string(),
            l.modepay.clone(),
            format!("{} ({})", l.etatliv, l.etatliv.libelle()),
        ]);
    }
    table.render()
}

pub fn statistiques(stats: &Statistiques) -> String {
    let mut table = Table::new(["Resource", "Count"]);
    table
        .row(vec!["Articles".to_string(), stats.articles.to_string()])
        .row(vec!["Orders".to_string(), stats.commandes.to_string()])
        .row(vec!["Deliveries".to_string(), stats.livraisons.to_string()]);
    table.render()
}

pub fn journal(log: &ActivityLog) -> String {
    let mut table = Table::new(["Time", "Type", "Message"]);
    for entry in log.entries() {
        table.row(vec![
            entry.timestamp.format("%H:%M:%S").to_string(),
            entry.level.to_string(),
            entry.message.clone(),
        ]);
    }
    table.render()
}
