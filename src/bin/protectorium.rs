use std::collections::VecDeque;

use sqlx::postgres::PgPoolOptions;

use protectorium::client::{ClientConfig, IncidentDashboard};
use protectorium::infra::{seed_demo_data, LocalProofEngine, PgIncidentStore};
use protectorium::{CompanyId, Incident, IncidentId, Role, Session};

fn print_help() {
    eprintln!(
        "\
protectorium

USAGE:
  protectorium <command> [options]

COMMANDS:
  incidents                       List incidents visible to the role
  incident <id>                   Show incident details
  generate <id>                   Generate a proof for an incident
  portfolio                       List insured companies (insurer view)
  company-incidents               List a company's incidents (insurer view)
  verify <id>                     Verify an incident's proof (insurer only)
  init-db                         Create database tables
  seed                            Load demo data into an empty database

CLIENT OPTIONS:
  --api-url <url>                 (defaults to env PROTECTORIUM_API_URL)
  --prefix <path>                 (defaults to env PROTECTORIUM_API_PREFIX)
  --role <policyholder|insurer>   (default: policyholder)
  --company <id>                  Company the insurer session is scoped to
  --wallet <address>              Connected wallet address

generate OPTIONS:
  --wait                          Poll until the proof leaves `generating`

DATABASE OPTIONS (init-db, seed):
  --database-url <postgres_url>   (defaults to env DATABASE_URL)
"
    );
}

#[derive(Debug, Default)]
struct ClientArgs {
    api_url: Option<String>,
    prefix: Option<String>,
    role: Role,
    company: Option<CompanyId>,
    wallet: Option<String>,
    wait: bool,
    positional: Vec<String>,
}

fn next_value(args: &mut VecDeque<String>, flag: &str) -> anyhow::Result<String> {
    args.pop_front()
        .ok_or_else(|| anyhow::anyhow!("missing value for {flag}"))
}

/// Parse client options. Returns `None` when help was requested.
fn parse_client_args(mut args: VecDeque<String>) -> anyhow::Result<Option<ClientArgs>> {
    let mut parsed = ClientArgs::default();
    while let Some(arg) = args.pop_front() {
        match arg.as_str() {
            "--api-url" => parsed.api_url = Some(next_value(&mut args, "--api-url")?),
            "--prefix" => parsed.prefix = Some(next_value(&mut args, "--prefix")?),
            "--role" => {
                parsed.role = next_value(&mut args, "--role")?
                    .parse()
                    .map_err(|e: String| anyhow::anyhow!(e))?;
            }
            "--company" => {
                parsed.company = Some(CompanyId::new(next_value(&mut args, "--company")?));
            }
            "--wallet" => parsed.wallet = Some(next_value(&mut args, "--wallet")?),
            "--wait" => parsed.wait = true,
            "-h" | "--help" => return Ok(None),
            other if other.starts_with("--") => anyhow::bail!("unexpected argument: {other}"),
            other => parsed.positional.push(other.to_string()),
        }
    }
    Ok(Some(parsed))
}

impl ClientArgs {
    fn dashboard(&self) -> anyhow::Result<IncidentDashboard> {
        let mut config = ClientConfig::from_env()?;
        if let Some(url) = &self.api_url {
            config = config.with_base_url(url.clone());
        }
        if let Some(prefix) = &self.prefix {
            config = config.with_prefix(prefix.clone());
        }

        let mut session = Session::new(self.role);
        if let Some(company) = &self.company {
            session = session.with_company(company.clone());
        }
        if let Some(wallet) = &self.wallet {
            session = session.with_wallet(wallet.clone());
        }

        Ok(IncidentDashboard::new(config, session)?)
    }

    fn incident_id(&self) -> anyhow::Result<IncidentId> {
        match self.positional.as_slice() {
            [id] => Ok(IncidentId::new(id.clone())),
            [] => anyhow::bail!("missing incident id"),
            _ => anyhow::bail!("expected a single incident id"),
        }
    }

    fn no_positional(&self) -> anyhow::Result<()> {
        match self.positional.first() {
            Some(extra) => anyhow::bail!("unexpected argument: {extra}"),
            None => Ok(()),
        }
    }
}

fn print_incident(dashboard: &IncidentDashboard, incident: &Incident) {
    println!("incident:        {}", incident.incident_id);
    println!(
        "company:         {} ({})",
        incident.company_name.as_deref().unwrap_or("-"),
        incident.company_id
    );
    println!("detected at:     {}", incident.detected_at.to_rfc3339());
    println!("commitment:      {}", incident.commitment);
    println!("status:          {}", incident.proof_status.label());
    if let Some(severity) = incident.severity {
        println!("severity:        {severity}");
    }
    if let Some(count) = incident.event_count {
        println!("events:          {count}");
    }
    if let Some(version) = &incident.agent_version {
        println!("agent version:   {version}");
    }

    let Some(proof) = &incident.proof else {
        return;
    };
    println!("proof hash:      {}", proof.proof_hash);
    println!("public inputs:   {}", proof.public_inputs.join(", "));
    if let Some(tx) = &proof.transaction_hash {
        println!("transaction:     {}", dashboard.explorer_url(tx));
    }
    if let Some(chain) = proof.blockchain_status {
        println!("chain status:    {}", chain.label());
    }
    if let Some(url) = dashboard.proof_json_url(incident) {
        println!("proof document:  {url}");
    }
}

fn require_database_url(database_url: Option<String>) -> anyhow::Result<String> {
    database_url
        .or_else(|| std::env::var("DATABASE_URL").ok())
        .ok_or_else(|| anyhow::anyhow!("DATABASE_URL is required (or pass --database-url)"))
}

/// Parse `--database-url`. Returns `None` when help was requested.
fn parse_database_args(mut args: VecDeque<String>) -> anyhow::Result<Option<Option<String>>> {
    let mut database_url = None;
    while let Some(arg) = args.pop_front() {
        match arg.as_str() {
            "--database-url" => database_url = Some(next_value(&mut args, "--database-url")?),
            "-h" | "--help" => return Ok(None),
            other => anyhow::bail!("unexpected argument: {other}"),
        }
    }
    Ok(Some(database_url))
}

async fn connect_store(database_url: Option<String>) -> anyhow::Result<PgIncidentStore> {
    let database_url = require_database_url(database_url)?;
    let pool = PgPoolOptions::new()
        .max_connections(2)
        .connect(&database_url)
        .await?;
    Ok(PgIncidentStore::new(pool))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let mut args: VecDeque<String> = std::env::args().skip(1).collect();
    let Some(command) = args.pop_front() else {
        print_help();
        return Ok(());
    };

    if matches!(command.as_str(), "-h" | "--help" | "help") {
        print_help();
        return Ok(());
    }

    match command.as_str() {
        "init-db" | "seed" => {
            let Some(database_url) = parse_database_args(args)? else {
                print_help();
                return Ok(());
            };
            let store = connect_store(database_url).await?;
            store.initialize().await?;

            if command == "seed" {
                let inserted = seed_demo_data(&store, &LocalProofEngine::new()).await?;
                if inserted == 0 {
                    println!("ok: database already holds incidents, nothing seeded");
                } else {
                    println!("ok: seeded {inserted} incidents");
                }
            } else {
                println!("ok: tables created");
            }
            Ok(())
        }
        "incidents" | "incident" | "generate" | "portfolio" | "company-incidents" | "verify" => {
            let Some(client_args) = parse_client_args(args)? else {
                print_help();
                return Ok(());
            };
            run_client_command(&command, client_args).await
        }
        other => {
            print_help();
            anyhow::bail!("unknown command: {other}")
        }
    }
}

async fn run_client_command(command: &str, args: ClientArgs) -> anyhow::Result<()> {
    let dashboard = args.dashboard()?;

    match command {
        "incidents" | "company-incidents" => {
            args.no_positional()?;
            if command == "company-incidents" && args.role != Role::Insurer {
                anyhow::bail!("company-incidents requires --role insurer");
            }
            let incidents = dashboard.list_incidents().await?;
            if incidents.is_empty() {
                println!("no incidents");
            }
            for item in incidents {
                println!(
                    "{:<16} {:<26} {}",
                    item.incident_id.as_str(),
                    item.detected_at.to_rfc3339(),
                    item.proof_status.label()
                );
            }
        }
        "incident" => {
            let incident = dashboard.incident(&args.incident_id()?).await?;
            print_incident(&dashboard, &incident);
        }
        "generate" => {
            let id = args.incident_id()?;
            let incident = dashboard.incident(&id).await?;
            let mut incident = dashboard.generate_proof(&incident).await?;
            if args.wait {
                incident = dashboard.wait_for_proof(&id).await?;
            }
            print_incident(&dashboard, &incident);
        }
        "verify" => {
            let incident = dashboard.incident(&args.incident_id()?).await?;
            let incident = dashboard.verify_proof(&incident).await?;
            print_incident(&dashboard, &incident);
        }
        "portfolio" => {
            args.no_positional()?;
            for entry in dashboard.portfolio().await? {
                println!(
                    "{:<14} {:<24} {}",
                    entry.company_id.as_str(),
                    entry.company_name,
                    entry.incident_count
                );
            }
        }
        other => anyhow::bail!("unknown command: {other}"),
    }

    Ok(())
}
