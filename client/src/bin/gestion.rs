//! gestion CLI - Système de Gestion terminal client

use chrono::NaiveDate;
use clap::builder::PossibleValuesParser;
use clap::{Args, Parser, Subcommand};
use gestion_client::pages::{
    ArticleRecherche, CommandeRecherche, LivraisonFormulaire, LivraisonRecherche,
};
use gestion_client::{
    ActivityLog, ApiClient, ArticlesPage, CommandesPage, DEFAULT_API_URL, LivraisonsPage,
    PageError, charger_statistiques, views,
};
use gestion_domain::{
    CATEGORIES, EtatCommande, EtatLivraison, ModificationArticle, NouvelArticle,
};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "gestion")]
#[command(version, about = "Terminal client for the Système de Gestion API", long_about = None)]
struct Cli {
    /// Base URL of the API
    #[arg(long, env = "GESTION_API_URL", default_value = DEFAULT_API_URL, global = true)]
    api_url: String,

    /// Do not print the activity log after the command
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check the API and database connection
    Check,

    /// Show article, order and delivery counts
    Dashboard,

    /// Manage articles
    #[command(subcommand)]
    Articles(ArticleCommand),

    /// Manage orders and order lines
    #[command(subcommand)]
    Commandes(CommandeCommand),

    /// Manage deliveries
    #[command(subcommand)]
    Livraisons(LivraisonCommand),
}

#[derive(Args)]
struct ArticleFields {
    #[arg(long)]
    designation: Option<String>,
    #[arg(long)]
    prix_a: Option<f64>,
    #[arg(long)]
    prix_v: Option<f64>,
    /// 1 = TVA 7%, 2 = TVA 19%
    #[arg(long)]
    codetva: Option<i32>,
    #[arg(long, value_parser = PossibleValuesParser::new(CATEGORIES))]
    categorie: Option<String>,
    #[arg(long)]
    qtestk: Option<i64>,
}

#[derive(Subcommand)]
enum ArticleCommand {
    /// List all articles
    List,
    /// Search articles
    Search {
        #[arg(long)]
        refart: Option<String>,
        #[arg(long)]
        designation: Option<String>,
        #[arg(long, value_parser = PossibleValuesParser::new(CATEGORIES))]
        categorie: Option<String>,
    },
    /// Create an article
    Add {
        #[arg(long)]
        designation: String,
        #[arg(long)]
        prix_a: f64,
        #[arg(long)]
        prix_v: f64,
        #[arg(long)]
        codetva: i32,
        #[arg(long, value_parser = PossibleValuesParser::new(CATEGORIES))]
        categorie: Option<String>,
        #[arg(long, default_value_t = 0)]
        qtestk: i64,
    },
    /// Update the given fields of an article
    Update {
        refart: String,
        #[command(flatten)]
        fields: ArticleFields,
    },
    /// Delete an article
    Delete { refart: String },
}

#[derive(Subcommand)]
enum CommandeCommand {
    /// List all orders
    List,
    /// Search orders
    Search {
        #[arg(long)]
        nocde: Option<i64>,
        #[arg(long)]
        noclt: Option<i64>,
        /// YYYY-MM-DD or RFC 3339
        #[arg(long)]
        date: Option<String>,
    },
    /// Create an order for a customer
    Add { noclt: i64 },
    /// Change the state of an order (EC, PR, LI, SO, AN, AL)
    State { nocde: i64, etat: EtatCommande },
    /// Cancel an order
    Cancel { nocde: i64 },
    /// Show the lines of an order
    Lines { nocde: i64 },
    /// Add an article to an order
    AddLine {
        nocde: i64,
        refart: String,
        qtecde: i64,
    },
    /// Remove an article from an order
    RemoveLine { nocde: i64, refart: String },
}

#[derive(Subcommand)]
enum LivraisonCommand {
    /// List all deliveries
    List,
    /// Search deliveries
    Search {
        #[arg(long)]
        nocde: Option<i64>,
        #[arg(long)]
        livreur: Option<i64>,
        #[arg(long)]
        code_postal: Option<i64>,
        /// YYYY-MM-DD
        #[arg(long)]
        date: Option<String>,
    },
    /// Plan a delivery
    Add {
        nocde: i64,
        livreur: i64,
        /// YYYY-MM-DD
        dateliv: String,
        #[arg(long)]
        modepay: Option<String>,
    },
    /// Move a delivery to another date or courier
    Update {
        nocde: i64,
        dateliv: NaiveDate,
        #[arg(long)]
        nouvelle_date: Option<String>,
        #[arg(long)]
        nouveau_livreur: Option<i64>,
    },
    /// Change the state of a delivery (EC, LI, AL)
    State {
        nocde: i64,
        dateliv: NaiveDate,
        etat: EtatLivraison,
    },
    /// Delete a delivery
    Delete { nocde: i64, dateliv: NaiveDate },
}

async fn articles(
    api: &ApiClient,
    log: &mut ActivityLog,
    command: ArticleCommand,
) -> Result<(), PageError> {
    let mut page = ArticlesPage::new(api, log);
    match command {
        ArticleCommand::List => {
            page.mount().await?;
        }
        ArticleCommand::Search {
            refart,
            designation,
            categorie,
        } => {
            page.rechercher(&ArticleRecherche {
                refart,
                designation,
                categorie,
            })
            .await?;
        }
        ArticleCommand::Add {
            designation,
            prix_a,
            prix_v,
            codetva,
            categorie,
            qtestk,
        } => {
            let refart = page
                .ajouter(&NouvelArticle {
                    designation,
                    prix_a,
                    prix_v,
                    codetva,
                    categorie,
                    qtestk,
                })
                .await?;
            println!("Article created: {}", refart);
        }
        ArticleCommand::Update { refart, fields } => {
            page.modifier(
                &refart,
                &ModificationArticle {
                    designation: fields.designation,
                    prix_a: fields.prix_a,
                    prix_v: fields.prix_v,
                    codetva: fields.codetva,
                    categorie: fields.categorie,
                    qtestk: fields.qtestk,
                },
            )
            .await?;
        }
        ArticleCommand::Delete { refart } => page.supprimer(&refart).await?,
    }
    println!("{}", views::articles(page.articles()));
    Ok(())
}

async fn commandes(
    api: &ApiClient,
    log: &mut ActivityLog,
    command: CommandeCommand,
) -> Result<(), PageError> {
    let mut page = CommandesPage::new(api, log);
    match command {
        CommandeCommand::List => {
            page.mount().await?;
        }
        CommandeCommand::Search { nocde, noclt, date } => {
            page.rechercher(&CommandeRecherche { nocde, noclt, date })
                .await?;
        }
        CommandeCommand::Add { noclt } => {
            let nocde = page.ajouter(noclt).await?;
            println!("Order created: #{}", nocde);
        }
        CommandeCommand::State { nocde, etat } => {
            // 先加载列表，界面校验才能知道当前状态
            page.mount().await?;
            page.modifier_etat(nocde, etat).await?;
        }
        CommandeCommand::Cancel { nocde } => {
            page.annuler(nocde).await?;
        }
        CommandeCommand::Lines { nocde } => {
            page.charger_lignes(nocde).await?;
            println!("{}", views::lignes(page.lignes()));
            return Ok(());
        }
        CommandeCommand::AddLine {
            nocde,
            refart,
            qtecde,
        } => {
            page.ajouter_ligne(nocde, &refart, qtecde).await?;
            println!("{}", views::lignes(page.lignes()));
            return Ok(());
        }
        CommandeCommand::RemoveLine { nocde, refart } => {
            page.supprimer_ligne(nocde, &refart).await?;
            println!("{}", views::lignes(page.lignes()));
            return Ok(());
        }
    }
    println!("{}", views::commandes(page.commandes()));
    Ok(())
}

async fn livraisons(
    api: &ApiClient,
    log: &mut ActivityLog,
    command: LivraisonCommand,
) -> Result<(), PageError> {
    let mut page = LivraisonsPage::new(api, log);
    match command {
        LivraisonCommand::List => {
            page.mount().await?;
        }
        LivraisonCommand::Search {
            nocde,
            livreur,
            code_postal,
            date,
        } => {
            page.rechercher(&LivraisonRecherche {
                nocde,
                livreur,
                code_postal,
                date,
            })
            .await?;
        }
        LivraisonCommand::Add {
            nocde,
            livreur,
            dateliv,
            modepay,
        } => {
            page.ajouter(&LivraisonFormulaire {
                nocde,
                livreur,
                dateliv,
                modepay,
            })
            .await?;
        }
        LivraisonCommand::Update {
            nocde,
            dateliv,
            nouvelle_date,
            nouveau_livreur,
        } => {
            page.modifier(nocde, dateliv, nouvelle_date.as_deref(), nouveau_livreur)
                .await?;
        }
        LivraisonCommand::State {
            nocde,
            dateliv,
            etat,
        } => {
            if let Some(commande) = page.modifier_etat(nocde, dateliv, etat).await? {
                println!("Order #{} is now {}", commande.nocde, commande.etatcde);
            }
        }
        LivraisonCommand::Delete { nocde, dateliv } => page.supprimer(nocde, dateliv).await?,
    }
    println!("{}", views::livraisons(page.livraisons()));
    Ok(())
}

async fn run(api: &ApiClient, log: &mut ActivityLog, command: Commands) -> Result<(), PageError> {
    match command {
        Commands::Check => match api.check().await {
            Ok(reponse) => {
                log.success("API connection established");
                if let Some(message) = reponse.message {
                    println!("{}", message);
                }
                Ok(())
            }
            Err(e) => {
                log.error(format!("API unavailable: {}", e));
                Err(e.into())
            }
        },
        Commands::Dashboard => {
            let stats = charger_statistiques(api).await;
            println!("{}", views::statistiques(&stats));
            Ok(())
        }
        Commands::Articles(command) => articles(api, log, command).await,
        Commands::Commandes(command) => commandes(api, log, command).await,
        Commands::Livraisons(command) => livraisons(api, log, command).await,
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let api = ApiClient::new(&cli.api_url)?;
    let mut log = ActivityLog::new();

    let result = run(&api, &mut log, cli.command).await;

    if !cli.quiet && !log.is_empty() {
        eprintln!("\n{}", views::journal(&log));
    }
    result?;
    Ok(())
}
